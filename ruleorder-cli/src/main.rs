use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ruleorder::discovery::{default_filters_dir, list_filter_files};
use ruleorder::shell::{Command, Shell};
use ruleorder::{EditorConfig, Workspace};

#[derive(Parser)]
#[command(name = "ruleorder")]
#[command(about = "Reorder, move and delete the rules of XML loot filters")]
struct Args {
    /// Filter files to open, one editor each
    files: Vec<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory the file picker lists (overrides filters_dir)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// List the filter files in the picker directory and exit
    #[arg(long)]
    list: bool,

    /// Only allow drags within a single file's list
    #[arg(long)]
    no_cross_drag: bool,

    /// Log every gesture
    #[arg(short, long)]
    verbose: bool,

    /// Read commands from a file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("🦀 Ruleorder Filter Editor");

    let mut config = EditorConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    // Apply CLI overrides to config
    if let Some(dir) = &args.dir {
        config.filters_dir = Some(dir.clone());
    }
    if args.no_cross_drag {
        config.allow_cross_document_drag = false;
    }

    if args.list {
        return list_files(&config);
    }

    let mut workspace = Workspace::new(&config);
    for (path, result) in args.files.iter().zip(workspace.open_files(&args.files)) {
        match result {
            Ok(handle) => println!("✅ Opened {} as {}", path.display(), handle),
            Err(e) => println!("❌ {}", e),
        }
    }

    let mut shell = Shell::new(workspace, &config);
    let mut stdout = io::stdout();

    if shell.workspace().is_empty() {
        // Nothing opened: start from the picker
        if let Err(e) = shell.execute(Command::Files, &mut stdout) {
            println!("⚠️  {:#}", e);
        }
    } else {
        shell.render(&mut stdout)?;
    }

    match &args.script {
        Some(script) => {
            let file = File::open(script)
                .with_context(|| format!("Failed to open script {}", script.display()))?;
            shell.run(BufReader::new(file), &mut stdout, false)?;
        }
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            if interactive {
                println!("Type 'help' for commands.");
            }
            shell.run(stdin.lock(), &mut stdout, interactive)?;
        }
    }

    let unsaved = shell.workspace().unsaved();
    if !unsaved.is_empty() {
        println!("⚠️  Exiting with {} unsaved file(s)", unsaved.len());
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("ruleorder=debug,ruleorder_core=debug")
        } else {
            EnvFilter::new("ruleorder=info,ruleorder_core=info")
        }
    });

    // Logs go to stderr so the rendered lists stay readable on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn list_files(config: &EditorConfig) -> Result<()> {
    let dir = default_filters_dir(config)
        .context("No filter directory found; pass --dir or set filters_dir")?;
    let files = list_filter_files(&dir, &config.file_extension)?;

    println!("📁 {}", dir.display());
    for path in &files {
        println!("   {}", path.display());
    }
    println!("📊 {} filter file(s)", files.len());
    Ok(())
}
