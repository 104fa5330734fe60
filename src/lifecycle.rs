use crate::lock::LockGuard;
use crate::model::{Field, Note, NoteColor, NoteError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Active { pinned: bool },
    Trashed,
}

/// Per-note handlers. A note only responds to the actions bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Edit,
    Pin,
    Color,
    Share,
    Download,
    Lock,
    Delete,
    Restore,
    PermanentDelete,
}

pub const ACTIVE_ACTIONS: &[Action] = &[
    Action::Edit,
    Action::Pin,
    Action::Color,
    Action::Share,
    Action::Download,
    Action::Lock,
    Action::Delete,
];

pub const TRASH_ACTIONS: &[Action] = &[Action::Restore, Action::PermanentDelete];

/// Which handler set a persisted note expects to have reattached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affordances {
    Active,
    Trash,
}

impl NoteState {
    pub fn label(&self) -> &'static str {
        match self {
            NoteState::Active { pinned: true } => "pinned",
            NoteState::Active { pinned: false } => "active",
            NoteState::Trashed => "trashed",
        }
    }

    pub fn affordances(&self) -> Affordances {
        match self {
            NoteState::Active { .. } => Affordances::Active,
            NoteState::Trashed => Affordances::Trash,
        }
    }
}

impl Affordances {
    pub fn actions(self) -> &'static [Action] {
        match self {
            Affordances::Active => ACTIVE_ACTIONS,
            Affordances::Trash => TRASH_ACTIONS,
        }
    }
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::Pin => "pin",
            Action::Color => "color",
            Action::Share => "share",
            Action::Download => "download",
            Action::Lock => "lock",
            Action::Delete => "delete",
            Action::Restore => "restore",
            Action::PermanentDelete => "permanently delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Note {
    /// Attach the handler set that matches the note's current state.
    pub fn bind_actions(&mut self) {
        self.actions = self.state.affordances().actions();
    }

    pub fn is_bound(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn ensure_bound(&self, action: Action) -> Result<(), NoteError> {
        if self.actions.contains(&action) {
            return Ok(());
        }
        Err(NoteError::InvalidTransition {
            id: self.id.clone(),
            transition: action.name(),
            state: if self.is_bound() {
                self.state.label()
            } else {
                "unbound"
            },
        })
    }

    pub(crate) fn apply_delete(&mut self) -> Result<(), NoteError> {
        self.ensure_bound(Action::Delete)?;
        self.state = NoteState::Trashed;
        self.bind_actions();
        Ok(())
    }

    /// Restored notes come back unpinned with a fresh rank; color and lock
    /// survive the round trip.
    pub(crate) fn apply_restore(&mut self, order: u64) -> Result<(), NoteError> {
        self.ensure_bound(Action::Restore)?;
        self.state = NoteState::Active { pinned: false };
        self.order = order;
        self.bind_actions();
        Ok(())
    }

    pub(crate) fn check_permanent_delete(&self) -> Result<(), NoteError> {
        self.ensure_bound(Action::PermanentDelete)
    }

    /// Returns whether the pin flag changed.
    pub(crate) fn apply_pin(&mut self, pinned: bool) -> Result<bool, NoteError> {
        self.ensure_bound(Action::Pin)?;
        match self.state {
            NoteState::Active { pinned: current } if current == pinned => Ok(false),
            NoteState::Active { .. } => {
                self.state = NoteState::Active { pinned };
                Ok(true)
            }
            NoteState::Trashed => Err(NoteError::InvalidTransition {
                id: self.id.clone(),
                transition: Action::Pin.name(),
                state: self.state.label(),
            }),
        }
    }

    pub(crate) fn apply_edit(&mut self, field: Field, value: &str) -> Result<(), NoteError> {
        self.ensure_bound(Action::Edit)?;
        LockGuard::check_edit(self, field)?;
        match field {
            Field::Title => self.title = value.to_string(),
            Field::Body => self.body = value.to_string(),
        }
        self.touch();
        Ok(())
    }

    pub(crate) fn apply_color(&mut self, color: Option<NoteColor>) -> Result<(), NoteError> {
        self.ensure_bound(Action::Color)?;
        self.color = color;
        Ok(())
    }

    pub(crate) fn apply_lock(&mut self, password: &str) -> Result<bool, NoteError> {
        self.ensure_bound(Action::Lock)?;
        LockGuard::lock(self, password)
    }

    pub(crate) fn apply_unlock(&mut self, attempt: &str) -> Result<(), NoteError> {
        self.ensure_bound(Action::Lock)?;
        LockGuard::unlock(self, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_note() -> Note {
        let mut note = Note::new("n1".into(), 0);
        note.bind_actions();
        note
    }

    #[test]
    fn unbound_note_is_inert() {
        let mut note = Note::new("n1".into(), 0);
        let err = note.apply_edit(Field::Title, "x").unwrap_err();
        assert_eq!(
            err,
            NoteError::InvalidTransition {
                id: "n1".into(),
                transition: "edit",
                state: "unbound",
            }
        );
        assert_eq!(note.title, crate::model::DEFAULT_TITLE);
    }

    #[test]
    fn delete_swaps_affordances() {
        let mut note = bound_note();
        note.apply_pin(true).unwrap();
        note.apply_delete().unwrap();
        assert!(note.is_trashed());
        assert_eq!(note.actions(), TRASH_ACTIONS);
        assert!(!note.is_pinned());
    }

    #[test]
    fn trashed_note_rejects_active_transitions() {
        let mut note = bound_note();
        note.apply_delete().unwrap();
        for result in [
            note.apply_edit(Field::Body, "x").map(|_| ()),
            note.apply_pin(true).map(|_| ()),
            note.apply_color(None),
            note.apply_lock("pw").map(|_| ()),
            note.apply_delete(),
        ] {
            assert!(matches!(
                result,
                Err(NoteError::InvalidTransition {
                    state: "trashed",
                    ..
                })
            ));
        }
    }

    #[test]
    fn restore_only_from_trash() {
        let mut note = bound_note();
        assert!(matches!(
            note.apply_restore(5),
            Err(NoteError::InvalidTransition {
                transition: "restore",
                state: "active",
                ..
            })
        ));
        assert_eq!(note.order, 0);
        note.apply_delete().unwrap();
        note.apply_restore(5).unwrap();
        assert_eq!(note.order, 5);
        assert_eq!(note.actions(), ACTIVE_ACTIONS);
    }

    #[test]
    fn pin_reports_changes_only() {
        let mut note = bound_note();
        assert_eq!(note.apply_pin(false), Ok(false));
        assert_eq!(note.apply_pin(true), Ok(true));
        assert_eq!(note.apply_pin(true), Ok(false));
        assert_eq!(note.state.label(), "pinned");
    }

    #[test]
    fn locked_body_edit_keeps_timestamp() {
        let mut note = bound_note();
        note.apply_lock("pw").unwrap();
        let before = note.last_edited;
        assert_eq!(
            note.apply_edit(Field::Body, "leak"),
            Err(NoteError::BodyLocked("n1".into()))
        );
        assert_eq!(note.last_edited, before);
        note.apply_edit(Field::Title, "Still editable").unwrap();
        assert_eq!(note.title, "Still editable");
    }
}
