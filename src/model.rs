use crate::lifecycle::{Action, NoteState};
use crate::lock::LockState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type NoteId = String;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_BODY: &str = "Write something...";

/// A single sticky note. Which sequence it lives in is mirrored by `state`,
/// and the handlers it currently responds to by `actions`.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub last_edited: DateTime<Utc>,
    pub color: Option<NoteColor>,
    pub lock: LockState,
    pub state: NoteState,
    /// Rank assigned when the note last entered the active sequence.
    pub order: u64,
    pub(crate) actions: &'static [Action],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Body,
}

/// Background color override, always stored as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteColor {
    r: u8,
    g: u8,
    b: u8,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),
    #[error("cannot {transition} note {id} while it is {state}")]
    InvalidTransition {
        id: NoteId,
        transition: &'static str,
        state: &'static str,
    },
    #[error("note {0} is locked; unlock it before editing the body")]
    BodyLocked(NoteId),
    #[error("incorrect password")]
    AuthenticationFailure,
    #[error("{0} is not supported here")]
    UnsupportedCapability(&'static str),
    #[error("invalid color {0:?} (use #rrggbb)")]
    InvalidColor(String),
    #[error("export failed: {0}")]
    ExportFailure(String),
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl Note {
    /// A fresh, unbound note with the placeholder title and body.
    pub fn new(id: NoteId, order: u64) -> Self {
        Note {
            id,
            title: DEFAULT_TITLE.to_string(),
            body: DEFAULT_BODY.to_string(),
            last_edited: Utc::now(),
            color: None,
            lock: LockState::Unlocked,
            state: NoteState::Active { pinned: false },
            order,
            actions: &[],
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self.state, NoteState::Active { pinned: true })
    }

    pub fn is_trashed(&self) -> bool {
        self.state == NoteState::Trashed
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn actions(&self) -> &'static [Action] {
        self.actions
    }

    pub fn last_edited_label(&self) -> String {
        format!(
            "Last Edited: {}",
            self.last_edited
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
        )
    }

    pub(crate) fn touch(&mut self) {
        self.last_edited = Utc::now();
    }
}

impl NoteColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

impl FromStr for NoteColor {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(NoteError::InvalidColor(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| NoteError::InvalidColor(s.to_string()))
        };
        Ok(NoteColor {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for NoteColor {
    type Error = NoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteColor> for String {
    fn from(color: NoteColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for NoteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
