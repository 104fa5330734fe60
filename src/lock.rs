use crate::model::{Field, Note, NoteError};

/// Password gate over a note's body. The password is kept in plaintext: this
/// hides content from a casual glance and is not an access control.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked {
        password: String,
    },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            LockState::Locked { password } => Some(password),
            LockState::Unlocked => None,
        }
    }
}

/// Stateless policy: the body is never shown or edited while locked, the
/// title always stays editable.
pub struct LockGuard;

impl LockGuard {
    pub fn check_edit(note: &Note, field: Field) -> Result<(), NoteError> {
        match field {
            Field::Title => Ok(()),
            Field::Body if note.is_locked() => Err(NoteError::BodyLocked(note.id.clone())),
            Field::Body => Ok(()),
        }
    }

    pub fn visible_body(note: &Note) -> Option<&str> {
        if note.is_locked() {
            None
        } else {
            Some(&note.body)
        }
    }

    /// Returns `false` without touching the note when the password is empty.
    pub fn lock(note: &mut Note, password: &str) -> Result<bool, NoteError> {
        if note.is_locked() {
            return Err(NoteError::InvalidTransition {
                id: note.id.clone(),
                transition: "lock",
                state: "locked",
            });
        }
        if password.is_empty() {
            return Ok(false);
        }
        note.lock = LockState::Locked {
            password: password.to_string(),
        };
        Ok(true)
    }

    pub fn unlock(note: &mut Note, attempt: &str) -> Result<(), NoteError> {
        let matches = match note.lock.password() {
            Some(password) => password == attempt,
            None => {
                return Err(NoteError::InvalidTransition {
                    id: note.id.clone(),
                    transition: "unlock",
                    state: "unlocked",
                })
            }
        };
        if !matches {
            return Err(NoteError::AuthenticationFailure);
        }
        note.lock = LockState::Unlocked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_leaves_note_unlocked() {
        let mut note = Note::new("n1".into(), 0);
        assert_eq!(LockGuard::lock(&mut note, ""), Ok(false));
        assert!(!note.is_locked());
    }

    #[test]
    fn locked_body_is_hidden_and_not_editable() {
        let mut note = Note::new("n1".into(), 0);
        assert_eq!(LockGuard::lock(&mut note, "hunter2"), Ok(true));
        assert_eq!(LockGuard::visible_body(&note), None);
        assert_eq!(
            LockGuard::check_edit(&note, Field::Body),
            Err(NoteError::BodyLocked("n1".into()))
        );
        assert_eq!(LockGuard::check_edit(&note, Field::Title), Ok(()));
    }

    #[test]
    fn unlock_requires_exact_password() {
        let mut note = Note::new("n1".into(), 0);
        LockGuard::lock(&mut note, "Secret").unwrap();
        assert_eq!(
            LockGuard::unlock(&mut note, "secret"),
            Err(NoteError::AuthenticationFailure)
        );
        assert!(note.is_locked());
        assert_eq!(LockGuard::unlock(&mut note, "Secret"), Ok(()));
        assert_eq!(LockGuard::visible_body(&note), Some(note.body.as_str()));
    }

    #[test]
    fn lock_twice_is_rejected() {
        let mut note = Note::new("n1".into(), 0);
        LockGuard::lock(&mut note, "a").unwrap();
        assert!(matches!(
            LockGuard::lock(&mut note, "b"),
            Err(NoteError::InvalidTransition { .. })
        ));
        assert_eq!(note.lock.password(), Some("a"));
    }
}
