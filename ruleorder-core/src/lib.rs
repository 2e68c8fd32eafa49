// Ruleorder Core Library
//
// Document model and list editing for XML loot filters.
// Frontends open files into a Workspace and drive it with gestures.

pub mod config;
pub mod discovery;
pub mod document;
pub mod drag;
pub mod editor;
pub mod error;
pub mod fragment;
pub mod workspace;

// Re-export main types for easy use
pub use config::EditorConfig;
pub use document::Document;
pub use drag::{DragPayload, DragSession, DropOutcome, RULE_PAYLOAD_FORMAT};
pub use editor::{EditorState, ListEditor, ListRow};
pub use error::{Result, RuleOrderError, SaveFailures};
pub use fragment::{RuleFragment, NO_NAME_PLACEHOLDER};
pub use workspace::{EditorHandle, Workspace};
