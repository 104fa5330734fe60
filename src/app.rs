use crate::collection::NoteCollection;
use crate::export::{download_filename, download_text, share_payload, FileSaver, ShareTarget};
use crate::lifecycle::{Action, Affordances};
use crate::model::{Field, Note, NoteColor, NoteError, NoteId};
use crate::search::note_matches_query;
use crate::storage::KeyValueStore;
use crate::sync::SyncEngine;
use std::path::PathBuf;

/// Root controller: owns the note collection and the engine that mirrors it
/// into storage. Every successful mutation is persisted before returning.
pub struct AppState<S> {
    notes: NoteCollection,
    sync: SyncEngine<S>,
}

impl<S: KeyValueStore> AppState<S> {
    pub fn load(store: S) -> Result<Self, NoteError> {
        let sync = SyncEngine::new(store);
        let notes = sync.rehydrate()?;
        Ok(AppState { notes, sync })
    }

    pub fn notes(&self) -> &NoteCollection {
        &self.notes
    }

    pub fn active(&self) -> &[Note] {
        self.notes.active()
    }

    pub fn trashed(&self) -> &[Note] {
        self.notes.trashed()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn store(&self) -> &S {
        self.sync.store()
    }

    pub fn filter_active<P>(&self, predicate: P) -> Vec<&Note>
    where
        P: Fn(&Note) -> bool,
    {
        self.notes.filter_active(predicate)
    }

    pub fn search(&self, term: &str) -> Vec<&Note> {
        self.filter_active(|note| note_matches_query(note, term))
    }

    pub fn create_note(&mut self) -> Result<NoteId, NoteError> {
        let id = self.notes.create_note();
        self.commit()?;
        Ok(id)
    }

    pub fn edit(&mut self, id: &str, field: Field, value: &str) -> Result<(), NoteError> {
        self.notes.edit(id, field, value)?;
        self.commit()
    }

    pub fn pin(&mut self, id: &str) -> Result<bool, NoteError> {
        let changed = self.notes.pin(id)?;
        self.commit_if(changed)?;
        Ok(changed)
    }

    pub fn unpin(&mut self, id: &str) -> Result<bool, NoteError> {
        let changed = self.notes.unpin(id)?;
        self.commit_if(changed)?;
        Ok(changed)
    }

    /// Returns the new pin flag.
    pub fn toggle_pin(&mut self, id: &str) -> Result<bool, NoteError> {
        let pinned = self.notes.note(id)?.is_pinned();
        if pinned {
            self.unpin(id)?;
        } else {
            self.pin(id)?;
        }
        Ok(!pinned)
    }

    pub fn set_color(&mut self, id: &str, color: Option<NoteColor>) -> Result<(), NoteError> {
        self.notes.set_color(id, color)?;
        self.commit()
    }

    /// An empty password is a silent no-op and returns `false`.
    pub fn lock(&mut self, id: &str, password: &str) -> Result<bool, NoteError> {
        let locked = self.notes.lock(id, password)?;
        self.commit_if(locked)?;
        Ok(locked)
    }

    pub fn unlock(&mut self, id: &str, attempt: &str) -> Result<(), NoteError> {
        if let Err(err) = self.notes.unlock(id, attempt) {
            if err == NoteError::AuthenticationFailure {
                log::info!("failed unlock attempt on note {}", id);
            }
            return Err(err);
        }
        self.commit()
    }

    pub fn delete(&mut self, id: &str) -> Result<(), NoteError> {
        self.notes.delete(id)?;
        self.sync.persist_gaining(&self.notes, Affordances::Trash)
    }

    pub fn restore(&mut self, id: &str) -> Result<(), NoteError> {
        self.notes.restore(id)?;
        self.commit()
    }

    pub fn permanent_delete(&mut self, id: &str) -> Result<(), NoteError> {
        self.notes.permanent_delete(id)?;
        self.commit()
    }

    /// Hands `{title, text}` to the share facility, if there is one.
    pub fn share(&self, id: &str, target: Option<&mut dyn ShareTarget>) -> Result<(), NoteError> {
        let note = self.notes.note(id)?;
        note.ensure_bound(Action::Share)?;
        let target = target.ok_or(NoteError::UnsupportedCapability("sharing"))?;
        target.share(&share_payload(note)).map_err(|err| {
            log::warn!("share of note {} failed: {:#}", id, err);
            NoteError::ExportFailure(format!("{:#}", err))
        })
    }

    pub fn download(&self, id: &str, saver: &mut dyn FileSaver) -> Result<PathBuf, NoteError> {
        let note = self.notes.note(id)?;
        note.ensure_bound(Action::Download)?;
        saver
            .save(&download_filename(note), &download_text(note))
            .map_err(|err| {
                log::warn!("download of note {} failed: {:#}", id, err);
                NoteError::ExportFailure(format!("{:#}", err))
            })
    }

    fn commit_if(&mut self, changed: bool) -> Result<(), NoteError> {
        if changed {
            self.commit()
        } else {
            Ok(())
        }
    }

    fn commit(&mut self) -> Result<(), NoteError> {
        self.sync.persist(&self.notes)
    }
}
