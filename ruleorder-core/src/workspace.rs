//! Workspace: the application shell's state
//!
//! Owns one [`ListEditor`] per opened file, the active-editor pointer used
//! by editor-less commands (move buttons, keyboard shortcuts), and the drag
//! gesture in progress. Frontends drive everything through this type.

use crate::config::EditorConfig;
use crate::drag::{DragSession, DropOutcome};
use crate::editor::ListEditor;
use crate::error::{Result, RuleOrderError, SaveFailures};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Stable index of an editor inside its workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorHandle(pub(crate) usize);

impl EditorHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EditorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

#[derive(Debug)]
pub struct Workspace {
    editors: Vec<ListEditor>,
    /// Last focused editor; may be stale, only read for convenience actions
    active: Option<EditorHandle>,
    drag: Option<DragSession>,
    allow_cross_document_drag: bool,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl Workspace {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            allow_cross_document_drag: config.allow_cross_document_drag,
            editors: Vec::new(),
            active: None,
            drag: None,
        }
    }

    pub fn allows_cross_document_drag(&self) -> bool {
        self.allow_cross_document_drag
    }

    /// Open every path; a file that fails does not affect the others
    pub fn open_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<Result<EditorHandle>> {
        paths.iter().map(|path| self.open_file(path)).collect()
    }

    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<EditorHandle> {
        let editor = ListEditor::open(path.as_ref()).inspect_err(|e| {
            warn!("Skipping {}: {e}", path.as_ref().display());
        })?;
        Ok(self.add_editor(editor))
    }

    pub fn add_editor(&mut self, editor: ListEditor) -> EditorHandle {
        self.editors.push(editor);
        EditorHandle(self.editors.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = EditorHandle> {
        (0..self.editors.len()).map(EditorHandle)
    }

    /// Handle for a 1-based editor number, as shown to users
    pub fn handle_for(&self, number: usize) -> Option<EditorHandle> {
        (1..=self.editors.len())
            .contains(&number)
            .then(|| EditorHandle(number - 1))
    }

    pub fn editor(&self, handle: EditorHandle) -> Option<&ListEditor> {
        self.editors.get(handle.0)
    }

    pub fn editor_mut(&mut self, handle: EditorHandle) -> Option<&mut ListEditor> {
        self.editors.get_mut(handle.0)
    }

    pub fn editors(&self) -> impl Iterator<Item = (EditorHandle, &ListEditor)> {
        self.editors
            .iter()
            .enumerate()
            .map(|(i, editor)| (EditorHandle(i), editor))
    }

    /// Focus gain: this editor becomes the target of editor-less commands
    pub fn focus(&mut self, handle: EditorHandle) -> bool {
        if self.editor(handle).is_none() {
            return false;
        }
        self.active = Some(handle);
        true
    }

    pub fn active(&self) -> Option<EditorHandle> {
        self.active.filter(|h| h.0 < self.editors.len())
    }

    /// Click on a row: focuses the editor and selects the row
    pub fn select(&mut self, handle: EditorHandle, row: usize) -> bool {
        if !self.focus(handle) {
            return false;
        }
        self.editors[handle.0].select(row)
    }

    pub fn move_up(&mut self, handle: EditorHandle) -> bool {
        self.focus(handle) && self.editors[handle.0].move_up()
    }

    pub fn move_down(&mut self, handle: EditorHandle) -> bool {
        self.focus(handle) && self.editors[handle.0].move_down()
    }

    pub fn delete_selected(&mut self, handle: EditorHandle) -> bool {
        self.focus(handle) && self.editors[handle.0].delete_selected().is_some()
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Start dragging the selected row of `source`.
    ///
    /// A drag still in flight is cancelled first.
    pub fn begin_drag(&mut self, source: EditorHandle) -> bool {
        self.cancel_drag();
        let Some(editor) = self.editors.get_mut(source.0) else {
            return false;
        };
        let Some(fragment) = editor
            .selection()
            .and_then(|row| editor.rows().get(row))
            .map(|row| row.fragment.clone())
        else {
            return false;
        };
        if editor.begin_drag().is_none() {
            return false;
        }
        self.drag = Some(DragSession::new(source, fragment));
        true
    }

    /// The cursor moved over `row` of `target` (`None`: below the last row).
    ///
    /// Returns the drop index the indicator now shows, or `None` when the
    /// target does not accept this drag.
    pub fn drag_over(&mut self, target: EditorHandle, row: Option<usize>) -> Option<usize> {
        let session = self.drag.as_ref()?;
        let (source, previous) = (session.source(), session.hover());

        if previous.is_some_and(|h| h != target) {
            self.leave(previous);
        }
        if self.editor(target).is_none()
            || (target != source && !self.allow_cross_document_drag)
        {
            debug!("Drag over {target} rejected");
            return None;
        }

        let payload = self.drag.as_ref()?.payload().clone();
        let index = self.editors[target.0].drag_over(&payload, row)?;
        if let Some(session) = self.drag.as_mut() {
            session.set_hover(Some(target));
        }
        Some(index)
    }

    /// The cursor left `target`
    pub fn drag_leave(&mut self, target: EditorHandle) {
        let hovered = self.drag.as_ref().and_then(DragSession::hover);
        if hovered == Some(target) {
            self.leave(hovered);
        } else if let Some(editor) = self.editors.get_mut(target.0) {
            editor.drag_leave();
        }
    }

    fn leave(&mut self, hovered: Option<EditorHandle>) {
        if let Some(editor) = hovered.and_then(|h| self.editors.get_mut(h.0)) {
            editor.drag_leave();
        }
        if let Some(session) = self.drag.as_mut() {
            session.set_hover(None);
        }
    }

    /// Release the drag over whatever list it currently hovers
    pub fn complete_drop(&mut self) -> DropOutcome {
        let Some(session) = self.drag.take() else {
            return DropOutcome::NoDrag;
        };

        let source = session.source();
        let outcome = match session.hover() {
            Some(target) if target == source => self.drop_on_source(&session),
            Some(target) => self.editors[target.0]
                .drop_payload(session.payload())
                .map(|row| DropOutcome::Copied { editor: target, row }),
            None => None,
        }
        .unwrap_or(DropOutcome::Cancelled);

        if let Some(target) = session.hover() {
            self.editors[target.0].drag_leave();
        }
        if let Some(editor) = self.editors.get_mut(source.0) {
            editor.end_drag();
        }
        debug!("Drop finished: {outcome:?}");
        outcome
    }

    /// Drop back into the list the drag started from.
    ///
    /// The rule is looked up by identity, since the list may have been
    /// reordered while the drag was in flight. If it was deleted meanwhile
    /// the payload is inserted as a copy instead.
    fn drop_on_source(&mut self, session: &DragSession) -> Option<DropOutcome> {
        let editor = session.source();
        let target = &mut self.editors[editor.0];
        let from = target
            .document()
            .rules()
            .iter()
            .position(|rule| rule.same_as(session.fragment()));

        match from {
            Some(from) => target
                .drop_move(from)
                .map(|row| DropOutcome::Moved { editor, row }),
            None => {
                debug!("Dragged rule left {editor} during the drag, inserting a copy");
                target
                    .drop_payload(session.payload())
                    .map(|row| DropOutcome::Copied { editor, row })
            }
        }
    }

    /// Abandon the drag without touching any document
    pub fn cancel_drag(&mut self) {
        let Some(session) = self.drag.take() else {
            return;
        };
        if let Some(target) = session.hover() {
            self.editors[target.0].drag_leave();
        }
        if let Some(source) = self.editors.get_mut(session.source().0) {
            source.end_drag();
        }
        debug!("Drag from {} cancelled", session.source());
    }

    /// Editors with edits that have not been saved yet
    pub fn unsaved(&self) -> Vec<EditorHandle> {
        self.editors()
            .filter(|(_, editor)| editor.document().is_modified())
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Save every open document.
    ///
    /// All saves are attempted; the error lists each failure, first one
    /// named in the message. Returns the number of files written.
    pub fn save_all(&mut self) -> Result<usize> {
        let mut failures = SaveFailures::default();
        let mut saved = 0;

        for editor in &mut self.editors {
            match editor.save() {
                Ok(()) => saved += 1,
                Err(e) => {
                    warn!("Save failed: {e}");
                    failures.failures.push((editor.path().to_path_buf(), e));
                }
            }
        }

        if failures.is_empty() {
            info!("Saved {saved} filter files");
            Ok(saved)
        } else {
            Err(RuleOrderError::SaveAll(failures))
        }
    }
}
