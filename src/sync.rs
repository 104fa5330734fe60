use crate::collection::NoteCollection;
use crate::lifecycle::{Affordances, NoteState};
use crate::lock::LockState;
use crate::model::{Note, NoteColor, NoteError, NoteId};
use crate::storage::KeyValueStore;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const NOTES_KEY: &str = "notes";
pub const TRASH_KEY: &str = "trash";

/// Behaviorless persisted form of a note. Enough to rebuild the entity and
/// decide which handlers to reattach without any other state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub last_edited: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<NoteColor>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub order: u64,
    pub affordances: Affordances,
}

pub struct SyncEngine<S> {
    store: S,
}

impl From<&Note> for NoteRecord {
    fn from(note: &Note) -> Self {
        NoteRecord {
            id: note.id.clone(),
            title: note.title.clone(),
            body: note.body.clone(),
            last_edited: note.last_edited,
            pinned: note.is_pinned(),
            color: note.color,
            locked: note.is_locked(),
            password: note.lock.password().map(str::to_string),
            order: note.order,
            affordances: note.state.affordances(),
        }
    }
}

impl NoteRecord {
    /// Plain data conversion. The result has no actions bound.
    fn into_note(self, home: Affordances) -> Result<Note, NoteError> {
        if self.affordances != home {
            log::warn!(
                "note {} stored with {:?} affordances under the {:?} key; treating it as {:?}",
                self.id,
                self.affordances,
                home,
                home
            );
        }
        let lock = match (self.locked, self.password) {
            (false, _) => LockState::Unlocked,
            (true, Some(password)) if !password.is_empty() => LockState::Locked { password },
            (true, _) => {
                return Err(NoteError::PersistenceFailure(format!(
                    "note {} is locked but has no password",
                    self.id
                )))
            }
        };
        let state = match home {
            Affordances::Active => NoteState::Active {
                pinned: self.pinned,
            },
            Affordances::Trash => NoteState::Trashed,
        };
        let mut note = Note::new(self.id, self.order);
        note.title = self.title;
        note.body = self.body;
        note.last_edited = self.last_edited;
        note.color = self.color;
        note.lock = lock;
        note.state = state;
        Ok(note)
    }
}

impl<S: KeyValueStore> SyncEngine<S> {
    pub fn new(store: S) -> Self {
        SyncEngine { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write both sequences in full. Called after every mutation.
    pub fn persist(&mut self, notes: &NoteCollection) -> Result<(), NoteError> {
        self.persist_gaining(notes, Affordances::Active)
    }

    /// Write both sequences, starting with the one a note just moved into.
    /// A failure between the two writes then leaves the note stored twice,
    /// which rehydrate collapses, instead of not at all.
    pub fn persist_gaining(
        &mut self,
        notes: &NoteCollection,
        gaining: Affordances,
    ) -> Result<(), NoteError> {
        let active = encode(notes.active())?;
        let trashed = encode(notes.trashed())?;
        let writes = match gaining {
            Affordances::Active => [(NOTES_KEY, &active), (TRASH_KEY, &trashed)],
            Affordances::Trash => [(TRASH_KEY, &trashed), (NOTES_KEY, &active)],
        };
        for (key, payload) in writes {
            self.store
                .save(key, payload)
                .with_context(|| format!("saving {}", key))
                .map_err(persistence_failure)?;
        }
        log::debug!(
            "persisted {} active and {} trashed notes",
            notes.active().len(),
            notes.trashed().len()
        );
        Ok(())
    }

    /// Rebuild the collection from storage: decode every record into an inert
    /// note, then bind handlers to each note in both sequences.
    pub fn rehydrate(&self) -> Result<NoteCollection, NoteError> {
        let mut seen = HashSet::new();
        let mut active = self.load_sequence(NOTES_KEY, Affordances::Active, &mut seen)?;
        let mut trashed = self.load_sequence(TRASH_KEY, Affordances::Trash, &mut seen)?;
        for note in active.iter_mut().chain(trashed.iter_mut()) {
            note.bind_actions();
        }
        log::debug!(
            "rehydrated {} active and {} trashed notes",
            active.len(),
            trashed.len()
        );
        Ok(NoteCollection::from_parts(active, trashed))
    }

    fn load_sequence(
        &self,
        key: &str,
        home: Affordances,
        seen: &mut HashSet<NoteId>,
    ) -> Result<Vec<Note>, NoteError> {
        let raw = match self.store.load(key).map_err(persistence_failure)? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };
        let records: Vec<NoteRecord> = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing stored {}", key))
            .map_err(persistence_failure)?;
        let mut notes = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.id.clone()) {
                log::warn!("dropping duplicate note {} from {}", record.id, key);
                continue;
            }
            notes.push(record.into_note(home)?);
        }
        Ok(notes)
    }
}

fn encode(notes: &[Note]) -> Result<String, NoteError> {
    let records: Vec<NoteRecord> = notes.iter().map(NoteRecord::from).collect();
    serde_yaml::to_string(&records)
        .context("serializing notes")
        .map_err(persistence_failure)
}

fn persistence_failure(err: anyhow::Error) -> NoteError {
    log::error!("{:#}", err);
    NoteError::PersistenceFailure(format!("{:#}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ACTIVE_ACTIONS, TRASH_ACTIONS};
    use crate::model::Field;
    use crate::storage::MemoryStore;

    fn snapshot(notes: &[Note]) -> Vec<NoteRecord> {
        notes.iter().map(NoteRecord::from).collect()
    }

    #[test]
    fn empty_store_rehydrates_empty_collection() {
        let engine = SyncEngine::new(MemoryStore::new());
        let notes = engine.rehydrate().unwrap();
        assert_eq!(notes.len(), 0);
    }

    #[test]
    fn round_trip_preserves_partition_and_attributes() {
        let mut notes = NoteCollection::default();
        let a = notes.create_note();
        let b = notes.create_note();
        let c = notes.create_note();
        notes.edit(&a, Field::Title, "Alpha").unwrap();
        notes.edit(&b, Field::Body, "bravo body").unwrap();
        notes.pin(&c).unwrap();
        notes.set_color(&b, Some("#fff475".parse().unwrap())).unwrap();
        notes.lock(&b, "pw").unwrap();
        notes.delete(&a).unwrap();

        let mut engine = SyncEngine::new(MemoryStore::new());
        engine.persist(&notes).unwrap();
        let restored = engine.rehydrate().unwrap();

        assert_eq!(snapshot(restored.active()), snapshot(notes.active()));
        assert_eq!(snapshot(restored.trashed()), snapshot(notes.trashed()));
    }

    #[test]
    fn rehydrate_binds_every_note() {
        let mut notes = NoteCollection::default();
        for _ in 0..3 {
            notes.create_note();
        }
        let first = notes.active()[0].id.clone();
        let second = notes.active()[1].id.clone();
        notes.delete(&first).unwrap();
        notes.delete(&second).unwrap();

        let mut engine = SyncEngine::new(MemoryStore::new());
        engine.persist(&notes).unwrap();
        let restored = engine.rehydrate().unwrap();

        assert!(restored.active().iter().all(|n| n.actions() == ACTIVE_ACTIONS));
        assert_eq!(restored.trashed().len(), 2);
        assert!(restored.trashed().iter().all(|n| n.actions() == TRASH_ACTIONS));
    }

    #[test]
    fn pin_order_survives_reload() {
        let mut notes = NoteCollection::default();
        let ids: Vec<_> = (0..3).map(|_| notes.create_note()).collect();
        notes.pin(&ids[1]).unwrap();

        let mut engine = SyncEngine::new(MemoryStore::new());
        engine.persist(&notes).unwrap();
        let mut restored = engine.rehydrate().unwrap();
        restored.unpin(&ids[1]).unwrap();

        let order: Vec<_> = restored.active().iter().map(|n| n.id.clone()).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn key_decides_home_sequence() {
        let mut store = MemoryStore::new();
        store.insert(
            NOTES_KEY,
            "- id: abc123\n  title: Stray\n  body: b\n  last_edited: 2024-01-01T00:00:00Z\n  affordances: trash\n",
        );
        let restored = SyncEngine::new(store).rehydrate().unwrap();
        assert_eq!(restored.active().len(), 1);
        assert_eq!(restored.active()[0].actions(), ACTIVE_ACTIONS);
        assert!(!restored.active()[0].is_trashed());
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let record = "- id: dup001\n  title: T\n  body: b\n  last_edited: 2024-01-01T00:00:00Z\n  affordances: active\n";
        let mut store = MemoryStore::new();
        store.insert(NOTES_KEY, record);
        store.insert(TRASH_KEY, &record.replace("active", "trash"));
        let restored = SyncEngine::new(store).rehydrate().unwrap();
        assert_eq!(restored.active().len(), 1);
        assert!(restored.trashed().is_empty());
    }

    #[test]
    fn locked_record_without_password_is_rejected() {
        let mut store = MemoryStore::new();
        store.insert(
            NOTES_KEY,
            "- id: lck001\n  title: T\n  body: b\n  last_edited: 2024-01-01T00:00:00Z\n  locked: true\n  affordances: active\n",
        );
        assert!(matches!(
            SyncEngine::new(store).rehydrate(),
            Err(NoteError::PersistenceFailure(_))
        ));
    }

    #[test]
    fn maximal_rank_loads_and_accepts_new_notes() {
        let mut store = MemoryStore::new();
        store.insert(
            NOTES_KEY,
            "- id: big001\n  title: Old\n  body: b\n  last_edited: 2024-01-01T00:00:00Z\n  order: 18446744073709551615\n  affordances: active\n",
        );
        let mut restored = SyncEngine::new(store).rehydrate().unwrap();
        assert_eq!(restored.active()[0].order, u64::MAX);
        let id = restored.create_note();
        assert_eq!(restored.active().len(), 2);
        assert_eq!(restored.active()[0].id, "big001");
        assert_eq!(restored.active()[1].id, id);
    }

    #[test]
    fn corrupt_payload_surfaces_failure() {
        let mut store = MemoryStore::new();
        store.insert(TRASH_KEY, "{not: [a list");
        assert!(matches!(
            SyncEngine::new(store).rehydrate(),
            Err(NoteError::PersistenceFailure(_))
        ));
    }

    struct FailingKey {
        inner: MemoryStore,
        key: &'static str,
    }

    impl KeyValueStore for FailingKey {
        fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.load(key)
        }

        fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            if key == self.key {
                anyhow::bail!("disk full");
            }
            self.inner.save(key, value)
        }
    }

    #[test]
    fn interrupted_delete_keeps_the_note() {
        let mut notes = NoteCollection::default();
        let id = notes.create_note();
        let mut engine = SyncEngine::new(MemoryStore::new());
        engine.persist(&notes).unwrap();
        notes.delete(&id).unwrap();

        let mut failing = SyncEngine::new(FailingKey {
            inner: engine.store().clone(),
            key: NOTES_KEY,
        });
        let err = failing
            .persist_gaining(&notes, Affordances::Trash)
            .unwrap_err();
        assert!(matches!(&err, NoteError::PersistenceFailure(msg) if msg.contains("notes")));

        let restored = SyncEngine::new(failing.store.inner).rehydrate().unwrap();
        assert_eq!(restored.len(), 1);
        assert!(restored.get(&id).is_some());
    }

    #[test]
    fn failure_names_the_stale_key() {
        let notes = NoteCollection::default();
        let mut engine = SyncEngine::new(FailingKey {
            inner: MemoryStore::new(),
            key: TRASH_KEY,
        });
        match engine.persist(&notes) {
            Err(NoteError::PersistenceFailure(msg)) => {
                assert!(msg.contains("saving trash"));
                assert!(msg.contains("disk full"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(engine.store().inner.raw(NOTES_KEY).is_some());
    }

    #[test]
    fn persisted_form_carries_lock_and_color() {
        let mut notes = NoteCollection::default();
        let id = notes.create_note();
        notes.set_color(&id, Some("#cbf0f8".parse().unwrap())).unwrap();
        notes.lock(&id, "open sesame").unwrap();
        let mut engine = SyncEngine::new(MemoryStore::new());
        engine.persist(&notes).unwrap();

        let raw = engine.store().raw(NOTES_KEY).unwrap();
        assert!(raw.contains("locked: true"));
        assert!(raw.contains("open sesame"));
        assert!(raw.contains("#cbf0f8"));
        assert!(raw.contains("affordances: active"));
    }
}
