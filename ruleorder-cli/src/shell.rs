//! Interactive shell
//!
//! Renders every open editor as text and maps typed commands onto the
//! gestures a windowed frontend would produce (clicks, move buttons, drags).
//! Editors and rows are numbered from 1, matching the row labels.

use anyhow::{anyhow, bail, Context, Result};
use ruleorder_core::discovery::{default_filters_dir, list_filter_files};
use ruleorder_core::{DropOutcome, EditorConfig, EditorHandle, ListEditor, Workspace};
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Files,
    /// A path, or a number from the last `files` listing
    Open(String),
    Focus(usize),
    Select(usize),
    Up,
    Down,
    Delete,
    Drag {
        from_editor: usize,
        from_row: usize,
        to_editor: usize,
        /// `None` drops below the last row
        to_row: Option<usize>,
    },
    Save,
    Help,
    Quit { force: bool },
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let name = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match (name.as_str(), args.as_slice()) {
        ("list" | "ls", []) => Command::List,
        ("files", []) => Command::Files,
        ("open", [_, ..]) => Command::Open(args.join(" ")),
        ("focus", [editor]) => Command::Focus(parse_number(editor, "editor")?),
        ("select" | "sel", [row]) => Command::Select(parse_number(row, "row")?),
        ("up", []) => Command::Up,
        ("down", []) => Command::Down,
        ("delete" | "del", []) => Command::Delete,
        ("drag", [from_editor, from_row, to_editor, to_row]) => Command::Drag {
            from_editor: parse_number(from_editor, "editor")?,
            from_row: parse_number(from_row, "row")?,
            to_editor: parse_number(to_editor, "editor")?,
            to_row: match *to_row {
                "end" => None,
                row => Some(parse_number(row, "row")?),
            },
        },
        ("save", []) => Command::Save,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit" | "q", []) => Command::Quit { force: false },
        ("quit!" | "q!", []) => Command::Quit { force: true },
        _ => bail!("unrecognized command '{line}' (type 'help')"),
    };
    Ok(Some(command))
}

fn parse_number(text: &str, what: &str) -> Result<usize> {
    let number: usize = text
        .parse()
        .with_context(|| format!("'{text}' is not a valid {what} number"))?;
    if number == 0 {
        bail!("{what}s are numbered from 1");
    }
    Ok(number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    workspace: Workspace,
    picker_dir: Option<PathBuf>,
    extension: String,
    /// Files from the last `files` listing, for `open <n>`
    picker: Vec<PathBuf>,
}

impl Shell {
    pub fn new(workspace: Workspace, config: &EditorConfig) -> Self {
        Self {
            workspace,
            picker_dir: default_filters_dir(config),
            extension: config.file_extension.clone(),
            picker: Vec::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Read commands until end of input or `quit`
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W, prompt: bool) -> Result<()> {
        if prompt {
            self.prompt(out)?;
        }
        for line in input.lines() {
            let line = line.context("failed to read command")?;
            let result = match parse_command(&line) {
                Ok(Some(command)) => self.execute(command, out),
                Ok(None) => Ok(Flow::Continue),
                Err(e) => Err(e),
            };
            // A failed command is reported and the shell keeps going
            let flow = result.or_else(|e| writeln!(out, "⚠️  {e:#}").map(|_| Flow::Continue))?;
            if flow == Flow::Quit {
                return Ok(());
            }
            if prompt {
                self.prompt(out)?;
            }
        }
        Ok(())
    }

    fn prompt<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.workspace.active() {
            Some(handle) => write!(out, "ruleorder {handle}> ")?,
            None => write!(out, "ruleorder> ")?,
        }
        out.flush()?;
        Ok(())
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        match command {
            Command::List => self.render(out)?,
            Command::Files => self.list_files(out)?,
            Command::Open(target) => self.open(&target, out)?,
            Command::Focus(number) => {
                let handle = self.handle(number)?;
                self.workspace.focus(handle);
                writeln!(out, "🎯 Editor {handle} is active")?;
            }
            Command::Select(row) => {
                let handle = self.active()?;
                if !self.workspace.select(handle, row - 1) {
                    bail!("editor {handle} has no row {row}");
                }
                self.render_editor(handle, out)?;
            }
            Command::Up => self.button(out, "⬆️  Moved up", Workspace::move_up)?,
            Command::Down => self.button(out, "⬇️  Moved down", Workspace::move_down)?,
            Command::Delete => self.button(out, "🗑️  Deleted", Workspace::delete_selected)?,
            Command::Drag {
                from_editor,
                from_row,
                to_editor,
                to_row,
            } => self.drag(from_editor, from_row, to_editor, to_row, out)?,
            Command::Save => self.save(out)?,
            Command::Help => print_help(out)?,
            Command::Quit { force } => {
                let unsaved = self.workspace.unsaved();
                if !force && !unsaved.is_empty() {
                    writeln!(
                        out,
                        "⚠️  {} file(s) have unsaved changes; 'save' first or 'quit!' to discard",
                        unsaved.len()
                    )?;
                    return Ok(Flow::Continue);
                }
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn handle(&self, number: usize) -> Result<EditorHandle> {
        self.workspace
            .handle_for(number)
            .ok_or_else(|| anyhow!("no editor #{number} ({} open)", self.workspace.len()))
    }

    fn active(&self) -> Result<EditorHandle> {
        self.workspace
            .active()
            .ok_or_else(|| anyhow!("no active editor; use 'focus <editor>' first"))
    }

    /// Move/delete buttons act on the last focused list
    fn button<W: Write>(
        &mut self,
        out: &mut W,
        done: &str,
        action: fn(&mut Workspace, EditorHandle) -> bool,
    ) -> Result<()> {
        let handle = self.active()?;
        if action(&mut self.workspace, handle) {
            writeln!(out, "{done}")?;
            self.render_editor(handle, out)?;
        } else {
            writeln!(out, "ℹ️  Nothing to do")?;
        }
        Ok(())
    }

    fn drag<W: Write>(
        &mut self,
        from_editor: usize,
        from_row: usize,
        to_editor: usize,
        to_row: Option<usize>,
        out: &mut W,
    ) -> Result<()> {
        let source = self.handle(from_editor)?;
        let target = self.handle(to_editor)?;

        if !self.workspace.select(source, from_row - 1) {
            bail!("editor {source} has no row {from_row}");
        }
        if !self.workspace.begin_drag(source) {
            bail!("could not start dragging row {from_row} of {source}");
        }

        if self.workspace.drag_over(target, to_row.map(|row| row - 1)).is_none() {
            self.workspace.cancel_drag();
            if source != target && !self.workspace.allows_cross_document_drag() {
                writeln!(out, "🚫 Dragging between files is disabled")?;
            } else {
                writeln!(out, "🚫 Editor {target} does not accept rules from {source}")?;
            }
            return Ok(());
        }

        match self.workspace.complete_drop() {
            DropOutcome::Moved { editor, row } => {
                writeln!(out, "↕️  Moved to row {} of {editor}", row + 1)?;
                self.render_editor(editor, out)?;
            }
            DropOutcome::Copied { editor, row } => {
                writeln!(out, "📋 Copied to row {} of {editor}", row + 1)?;
                self.render_editor(editor, out)?;
            }
            DropOutcome::Cancelled | DropOutcome::NoDrag => {
                writeln!(out, "🚫 Drop cancelled")?;
            }
        }
        Ok(())
    }

    fn list_files<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let dir = self
            .picker_dir
            .clone()
            .ok_or_else(|| anyhow!("no filter directory; pass --dir or set filters_dir"))?;
        self.picker = list_filter_files(&dir, &self.extension)?;

        writeln!(out, "📁 {}", dir.display())?;
        if self.picker.is_empty() {
            writeln!(out, "   (no *.{} files)", self.extension)?;
        }
        for (i, path) in self.picker.iter().enumerate() {
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            writeln!(out, "   {}. {name}", i + 1)?;
        }
        Ok(())
    }

    fn open<W: Write>(&mut self, target: &str, out: &mut W) -> Result<()> {
        let path = match target.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.picker.len() => self.picker[n - 1].clone(),
            _ => PathBuf::from(target),
        };

        match self.workspace.open_file(&path) {
            Ok(handle) => {
                writeln!(out, "✅ Opened {} as {handle}", path.display())?;
                self.render_editor(handle, out)?;
            }
            Err(e) => writeln!(out, "❌ {e}")?,
        }
        Ok(())
    }

    fn save<W: Write>(&mut self, out: &mut W) -> Result<()> {
        match self.workspace.save_all() {
            Ok(count) => writeln!(out, "💾 Saved {count} file(s)")?,
            Err(ruleorder_core::RuleOrderError::SaveAll(failures)) => {
                for (path, error) in &failures.failures {
                    writeln!(out, "❌ {}: {error}", path.display())?;
                }
                let saved = self.workspace.len() - failures.len();
                writeln!(out, "💾 Saved {saved} file(s), {} failed", failures.len())?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    pub fn render<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.workspace.is_empty() {
            writeln!(out, "ℹ️  No files open; use 'files' and 'open <n>'")?;
        }
        for handle in self.workspace.handles() {
            self.render_editor(handle, out)?;
        }
        Ok(())
    }

    fn render_editor<W: Write>(&self, handle: EditorHandle, out: &mut W) -> Result<()> {
        let Some(editor) = self.workspace.editor(handle) else {
            return Ok(());
        };
        let mut flags = Vec::new();
        if self.workspace.active() == Some(handle) {
            flags.push("active");
        }
        if editor.document().is_modified() {
            flags.push("modified");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };

        writeln!(out, "📄 {handle} {}{flags}", editor.path().display())?;
        write_rows(editor, out)?;
        Ok(())
    }
}

fn write_rows<W: Write>(editor: &ListEditor, out: &mut W) -> Result<()> {
    let indicator = editor.drop_indicator();
    for (i, row) in editor.rows().iter().enumerate() {
        if indicator == Some(i) {
            writeln!(out, "   ──────────")?;
        }
        let marker = if editor.selection() == Some(i) { '>' } else { ' ' };
        writeln!(out, " {marker} {}", row.label)?;
    }
    if indicator == Some(editor.rows().len()) {
        writeln!(out, "   ──────────")?;
    }
    if editor.rows().is_empty() {
        writeln!(out, "   (no rules)")?;
    }
    Ok(())
}

fn print_help<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "\n📋 Commands:")?;
    writeln!(out, "  list                      Show every open file and its rules")?;
    writeln!(out, "  files                     List filter files in the filter directory")?;
    writeln!(out, "  open <path|n>             Open a file (n: number from 'files')")?;
    writeln!(out, "  focus <editor>            Make an editor the active one")?;
    writeln!(out, "  select <row>              Select a row in the active editor")?;
    writeln!(out, "  up | down | delete        Move or delete the selected row")?;
    writeln!(out, "  drag <ed> <row> <ed> <row|end>")?;
    writeln!(out, "                            Drag a row onto a row of any editor")?;
    writeln!(out, "  save                      Save every open file")?;
    writeln!(out, "  quit | quit!              Leave (quit! discards unsaved edits)")?;
    writeln!(out, "\n📝 Rows are listed in game priority order: row 1 is the last rule in the file.")?;
    Ok(())
}
