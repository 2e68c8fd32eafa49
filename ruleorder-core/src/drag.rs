//! Drag and drop payloads
//!
//! A drag carries a serialized copy of the rule, never a handle to the live
//! fragment: the payload may be dropped into another document, and the
//! source row may be removed while the drag is still in flight.

use crate::fragment::RuleFragment;
use crate::workspace::EditorHandle;
use tracing::debug;

/// Format tag of payloads produced by rule lists
pub const RULE_PAYLOAD_FORMAT: &str = "application/x-rule-item";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    format: String,
    data: String,
}

impl DragPayload {
    pub fn new(format: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            data: data.into(),
        }
    }

    pub fn from_fragment(fragment: &RuleFragment) -> Self {
        Self::new(RULE_PAYLOAD_FORMAT, fragment.xml())
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn is_rule_payload(&self) -> bool {
        self.format == RULE_PAYLOAD_FORMAT
    }

    /// Rebuild the rule carried by this payload.
    ///
    /// Foreign formats and data that is not a `Rule` element yield `None`;
    /// dropping them is a no-op rather than an error.
    pub fn to_fragment(&self) -> Option<RuleFragment> {
        if !self.is_rule_payload() {
            debug!("Ignoring drag payload of format '{}'", self.format);
            return None;
        }
        match RuleFragment::from_xml(&self.data) {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                debug!("Ignoring malformed rule payload: {e}");
                None
            }
        }
    }
}

/// The one drag gesture in progress, owned by the workspace
#[derive(Debug, Clone)]
pub struct DragSession {
    source: EditorHandle,
    /// The dragged rule itself, tracked by identity so a drop back into the
    /// source list finds it wherever edits during the drag have put it
    fragment: RuleFragment,
    payload: DragPayload,
    /// Editor currently under the cursor and showing a drop indicator
    hover: Option<EditorHandle>,
}

impl DragSession {
    pub(crate) fn new(source: EditorHandle, fragment: RuleFragment) -> Self {
        Self {
            source,
            payload: DragPayload::from_fragment(&fragment),
            fragment,
            hover: None,
        }
    }

    pub fn source(&self) -> EditorHandle {
        self.source
    }

    pub fn fragment(&self) -> &RuleFragment {
        &self.fragment
    }

    pub fn payload(&self) -> &DragPayload {
        &self.payload
    }

    pub fn hover(&self) -> Option<EditorHandle> {
        self.hover
    }

    pub(crate) fn set_hover(&mut self, hover: Option<EditorHandle>) {
        self.hover = hover;
    }
}

/// What a drop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Dropped back into the originating list: the row was relocated
    Moved { editor: EditorHandle, row: usize },
    /// Dropped into another list: a copy was inserted, the source is unchanged
    Copied { editor: EditorHandle, row: usize },
    /// Released outside a valid target, or the payload was not a rule
    Cancelled,
    /// No drag was in progress
    NoDrag,
}
