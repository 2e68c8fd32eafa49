//! List Editor
//!
//! Binds one [`Document`] to the rows of a reorderable list view and turns
//! gestures (clicks, move buttons, drags) into document edits. After every
//! edit the rows are rebuilt from the document, so row `i` always shows
//! `document.rules()[i]`.
//!
//! ```text
//!            select              begin_drag
//!   Idle ───────────▶ Selecting ───────────▶ Dragging
//!    ▲                                          │
//!    └──────────── drop / cancel ◀──────────────┘
//! ```

use crate::document::Document;
use crate::drag::DragPayload;
use crate::error::Result;
use crate::fragment::RuleFragment;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Selecting,
    Dragging,
}

/// One visual row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    /// `"{n}. {name}"` with a 1-based `n`
    pub label: String,
    pub name: String,
    pub fragment: RuleFragment,
}

#[derive(Debug)]
pub struct ListEditor {
    document: Document,
    rows: Vec<ListRow>,
    selection: Option<usize>,
    state: EditorState,
    /// Row boundary a drop would insert at; only set while a drag hovers this list
    pending_drop: Option<usize>,
}

impl ListEditor {
    pub fn new(document: Document) -> Self {
        let mut editor = Self {
            document,
            rows: Vec::new(),
            selection: None,
            state: EditorState::Idle,
            pending_drop: None,
        };
        editor.refresh();
        editor
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Document::open(path)?))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Where the insertion line is drawn, if a drag hovers this list
    pub fn drop_indicator(&self) -> Option<usize> {
        self.pending_drop
    }

    /// Discard all rows and rebuild them from the document
    pub fn refresh(&mut self) {
        self.rows = self
            .document
            .rules()
            .iter()
            .enumerate()
            .map(|(index, fragment)| {
                let name = fragment.display_name().to_string();
                ListRow {
                    label: format!("{}. {}", index + 1, name),
                    name,
                    fragment: fragment.clone(),
                }
            })
            .collect();

        if matches!(self.selection, Some(row) if row >= self.rows.len()) {
            self.selection = None;
        }
    }

    /// Click on a row. Returns false when the row does not exist.
    pub fn select(&mut self, row: usize) -> bool {
        if row >= self.rows.len() {
            return false;
        }
        self.selection = Some(row);
        if self.state == EditorState::Idle {
            self.state = EditorState::Selecting;
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        if self.state == EditorState::Selecting {
            self.state = EditorState::Idle;
        }
    }

    /// Move the selected row one up. Returns whether anything moved.
    pub fn move_up(&mut self) -> bool {
        let Some(index) = self.selection else {
            return false;
        };
        debug!("[move_up] selected row {index}");
        if index == 0 {
            return false;
        }
        self.relocate(index, index - 1)
    }

    /// Move the selected row one down. Returns whether anything moved.
    pub fn move_down(&mut self) -> bool {
        let Some(index) = self.selection else {
            return false;
        };
        debug!("[move_down] selected row {index}");
        if index + 1 >= self.rows.len() {
            return false;
        }
        self.relocate(index, index + 1)
    }

    fn relocate(&mut self, from: usize, to: usize) -> bool {
        if self.document.swap(from, to).is_err() {
            return false;
        }
        self.refresh();
        self.selection = Some(to);
        true
    }

    /// Delete the selected row and keep a nearby row selected
    pub fn delete_selected(&mut self) -> Option<RuleFragment> {
        let index = self.selection?;
        let removed = self.document.remove(index).ok()?;
        debug!("[delete] removed rule '{}'", removed.display_name());

        self.refresh();
        self.selection = if self.rows.is_empty() {
            None
        } else {
            Some(index.min(self.rows.len() - 1))
        };
        if self.selection.is_none() && self.state == EditorState::Selecting {
            self.state = EditorState::Idle;
        }
        Some(removed)
    }

    /// Start dragging the selected row; the payload is a serialized copy
    pub fn begin_drag(&mut self) -> Option<DragPayload> {
        let row = self.selection?;
        let payload = DragPayload::from_fragment(&self.rows.get(row)?.fragment);
        self.state = EditorState::Dragging;
        debug!("[drag] started on row {row} of {}", self.path().display());
        Some(payload)
    }

    /// The drag this list started ended, wherever it landed
    pub fn end_drag(&mut self) {
        if self.state == EditorState::Dragging {
            self.state = EditorState::Idle;
        }
    }

    /// A drag moved over `row` (or below the last row when `None`).
    ///
    /// Returns the clamped drop index, or `None` when the payload is not a
    /// rule, in which case no indicator is shown.
    pub fn drag_over(&mut self, payload: &DragPayload, row: Option<usize>) -> Option<usize> {
        if !payload.is_rule_payload() {
            self.pending_drop = None;
            return None;
        }
        let count = self.document.rule_count();
        let index = row.map_or(count, |row| row.min(count));
        self.pending_drop = Some(index);
        Some(index)
    }

    /// The drag left this list or was abandoned
    pub fn drag_leave(&mut self) {
        self.pending_drop = None;
    }

    /// Insert the payload's rule at the pending drop index.
    ///
    /// Returns the row the copy landed on, or `None` (and no mutation) when
    /// nothing hovers this list or the payload is unusable.
    pub fn drop_payload(&mut self, payload: &DragPayload) -> Option<usize> {
        let index = self.pending_drop.take()?;
        let fragment = payload.to_fragment()?;
        let name = fragment.display_name().to_string();

        let row = self.document.insert(fragment, index);
        self.refresh();
        self.selection = Some(row);
        self.state = EditorState::Idle;
        debug!("[drop] inserted rule '{name}' at row {row}");
        Some(row)
    }

    /// Drop of a drag that started in this same list: relocate `from` to the
    /// pending drop boundary instead of inserting a copy.
    pub fn drop_move(&mut self, from: usize) -> Option<usize> {
        let boundary = self.pending_drop.take()?;
        if from >= self.document.rule_count() {
            return None;
        }
        // Boundaries below the source shift up once it is taken out
        let to = if from < boundary { boundary - 1 } else { boundary };

        if to != from {
            let fragment = self.document.remove(from).ok()?;
            self.document.insert(fragment, to);
            self.refresh();
        }
        self.selection = Some(to);
        self.state = EditorState::Idle;
        debug!("[drop] moved row {from} to row {to}");
        Some(to)
    }

    pub fn save(&mut self) -> Result<()> {
        self.document.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(names: &[&str]) -> ListEditor {
        // File order is the reverse of display order
        let rules: String = names
            .iter()
            .rev()
            .map(|n| format!("<Rule><nameOverride>{n}</nameOverride></Rule>"))
            .collect();
        let xml = format!("<ItemFilter><rules>{rules}</rules></ItemFilter>");
        ListEditor::new(Document::parse_str("test.xml", &xml).unwrap())
    }

    fn labels(editor: &ListEditor) -> Vec<&str> {
        editor.rows().iter().map(|r| r.name.as_str()).collect()
    }

    fn assert_rows_match_document(editor: &ListEditor) {
        let rules = editor.document().rules();
        assert_eq!(editor.rows().len(), rules.len());
        for (row, rule) in editor.rows().iter().zip(rules) {
            assert!(row.fragment.same_as(rule));
        }
    }

    #[test]
    fn test_rows_have_one_based_labels() {
        let editor = editor(&["A", "B"]);
        let rows: Vec<&str> = editor.rows().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(rows, vec!["1. A", "2. B"]);
        assert_rows_match_document(&editor);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut editor = editor(&["A", "B", "C"]);
        let before = editor.rows().to_vec();
        editor.refresh();
        editor.refresh();
        assert_eq!(editor.rows(), before.as_slice());
    }

    #[test]
    fn test_move_up_then_down() {
        let mut editor = editor(&["A", "B", "C"]);
        editor.select(1);
        assert!(editor.move_up());
        assert_eq!(labels(&editor), vec!["B", "A", "C"]);
        assert_eq!(editor.selection(), Some(0));

        assert!(editor.move_down());
        assert_eq!(labels(&editor), vec!["A", "B", "C"]);
        assert_eq!(editor.selection(), Some(1));
        assert_rows_match_document(&editor);
    }

    #[test]
    fn test_moves_at_edges_are_no_ops() {
        let mut editor = editor(&["A", "B"]);
        assert!(!editor.move_up());
        assert!(!editor.move_down());

        editor.select(0);
        assert!(!editor.move_up());
        editor.select(1);
        assert!(!editor.move_down());
        assert_eq!(labels(&editor), vec!["A", "B"]);
        assert!(!editor.document().is_modified());
    }

    #[test]
    fn test_delete_keeps_a_clamped_selection() {
        let mut editor = editor(&["A", "B", "C"]);
        editor.select(1);

        editor.delete_selected().unwrap();
        assert_eq!(labels(&editor), vec!["A", "C"]);
        assert_eq!(editor.selection(), Some(1));

        editor.delete_selected().unwrap();
        assert_eq!(labels(&editor), vec!["A"]);
        assert_eq!(editor.selection(), Some(0));

        editor.delete_selected().unwrap();
        assert!(labels(&editor).is_empty());
        assert_eq!(editor.selection(), None);
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(editor.delete_selected().is_none());
    }

    #[test]
    fn test_select_out_of_range_is_rejected() {
        let mut editor = editor(&["A"]);
        assert!(!editor.select(1));
        assert_eq!(editor.selection(), None);
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(editor.select(0));
        assert_eq!(editor.state(), EditorState::Selecting);
    }

    #[test]
    fn test_clear_selection_returns_to_idle() {
        let mut editor = editor(&["A", "B"]);
        editor.select(1);
        editor.clear_selection();
        assert_eq!(editor.selection(), None);
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(!editor.move_up());
        assert!(editor.begin_drag().is_none());
    }

    #[test]
    fn test_drag_over_clamps_and_defaults_to_append() {
        let mut editor = editor(&["A", "B", "C"]);
        let payload = DragPayload::from_fragment(&editor.rows()[0].fragment);

        assert_eq!(editor.drag_over(&payload, Some(1)), Some(1));
        assert_eq!(editor.drop_indicator(), Some(1));
        assert_eq!(editor.drag_over(&payload, Some(42)), Some(3));
        assert_eq!(editor.drag_over(&payload, None), Some(3));

        editor.drag_leave();
        assert_eq!(editor.drop_indicator(), None);
    }

    #[test]
    fn test_drop_inserts_copy_and_selects_it() {
        let mut target = editor(&["A", "B", "C"]);
        let x = RuleFragment::from_xml("<Rule><nameOverride>X</nameOverride></Rule>").unwrap();
        let payload = DragPayload::from_fragment(&x);

        for (row, expected) in [
            (1, vec!["A", "X", "B", "C"]),
            (0, vec!["X", "A", "B", "C"]),
            (3, vec!["A", "B", "C", "X"]),
        ] {
            let mut target = editor(&["A", "B", "C"]);
            target.drag_over(&payload, Some(row));
            assert_eq!(target.drop_payload(&payload), Some(row));
            assert_eq!(labels(&target), expected);
            assert_eq!(target.selection(), Some(row));
            assert_eq!(target.drop_indicator(), None);
            assert_rows_match_document(&target);
        }

        // Without a hover there is nowhere to drop
        assert_eq!(target.drop_payload(&payload), None);
        assert_eq!(labels(&target), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unrecognized_payload_is_ignored() {
        let mut editor = editor(&["A"]);
        let foreign = DragPayload::new("text/uri-list", "file:///tmp/a.xml");

        assert_eq!(editor.drag_over(&foreign, Some(0)), None);
        assert_eq!(editor.drop_indicator(), None);
        assert_eq!(editor.drop_payload(&foreign), None);
        assert_eq!(labels(&editor), vec!["A"]);
        assert!(!editor.document().is_modified());
    }

    #[test]
    fn test_drag_state_transitions() {
        let mut editor = editor(&["A", "B"]);
        assert!(editor.begin_drag().is_none());
        assert_eq!(editor.state(), EditorState::Idle);

        editor.select(0);
        let payload = editor.begin_drag().unwrap();
        assert_eq!(editor.state(), EditorState::Dragging);
        assert_eq!(payload.data(), editor.rows()[0].fragment.xml());

        editor.end_drag();
        assert_eq!(editor.state(), EditorState::Idle);
    }

    #[test]
    fn test_drop_move_within_same_list() {
        let mut editor = editor(&["A", "B", "C"]);
        editor.select(0);
        let payload = editor.begin_drag().unwrap();
        let original = editor.rows()[0].fragment.clone();

        // Boundary 2 sits between B and C
        editor.drag_over(&payload, Some(2));
        assert_eq!(editor.drop_move(0), Some(1));
        assert_eq!(labels(&editor), vec!["B", "A", "C"]);
        assert_eq!(editor.selection(), Some(1));
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(editor.rows()[1].fragment.same_as(&original));

        editor.drag_over(&payload, None);
        assert_eq!(editor.drop_move(0), Some(2));
        assert_eq!(labels(&editor), vec!["A", "C", "B"]);

        editor.drag_over(&payload, Some(0));
        assert_eq!(editor.drop_move(2), Some(0));
        assert_eq!(labels(&editor), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_drop_move_onto_itself_changes_nothing() {
        let mut editor = editor(&["A", "B"]);
        let payload = DragPayload::from_fragment(&editor.rows()[0].fragment);
        editor.drag_over(&payload, Some(1));
        assert_eq!(editor.drop_move(0), Some(0));
        assert_eq!(labels(&editor), vec!["A", "B"]);
        assert!(!editor.document().is_modified());
    }
}
