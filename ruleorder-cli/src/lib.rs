// All editing functionality is in ruleorder-core
// This CLI acts as a thin terminal frontend over the core library

// CLI-specific modules
pub mod shell;

// Re-export core types for convenience
pub use ruleorder_core::*;

// Re-export CLI utilities
pub use shell::{parse_command, Command, Shell};
