use crate::lifecycle::Action;
use crate::model::{Field, Note, NoteColor, NoteError, NoteId};
use rand::{distributions::Alphanumeric, Rng};

/// The active and trashed sequences. Active notes are kept pinned-first, each
/// group in insertion order; trashed notes stay in deletion order.
#[derive(Debug, Clone, Default)]
pub struct NoteCollection {
    active: Vec<Note>,
    trashed: Vec<Note>,
    next_order: u64,
}

impl NoteCollection {
    /// Assemble a collection from already-bound notes, e.g. after rehydration.
    pub(crate) fn from_parts(active: Vec<Note>, trashed: Vec<Note>) -> Self {
        let next_order = active
            .iter()
            .chain(trashed.iter())
            .map(|n| n.order.saturating_add(1))
            .max()
            .unwrap_or(0);
        let mut collection = NoteCollection {
            active,
            trashed,
            next_order,
        };
        collection.sort_active();
        collection
    }

    pub fn active(&self) -> &[Note] {
        &self.active
    }

    pub fn trashed(&self) -> &[Note] {
        &self.trashed
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.active
            .iter()
            .chain(self.trashed.iter())
            .find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.trashed.len()
    }

    pub fn create_note(&mut self) -> NoteId {
        let id = self.generate_id();
        let order = self.take_order();
        let mut note = Note::new(id.clone(), order);
        note.bind_actions();
        self.active.push(note);
        self.sort_active();
        log::debug!("created note {}", id);
        id
    }

    pub fn edit(&mut self, id: &str, field: Field, value: &str) -> Result<(), NoteError> {
        self.note_mut(id)?.apply_edit(field, value)
    }

    pub fn set_color(&mut self, id: &str, color: Option<NoteColor>) -> Result<(), NoteError> {
        self.note_mut(id)?.apply_color(color)
    }

    pub fn lock(&mut self, id: &str, password: &str) -> Result<bool, NoteError> {
        self.note_mut(id)?.apply_lock(password)
    }

    pub fn unlock(&mut self, id: &str, attempt: &str) -> Result<(), NoteError> {
        self.note_mut(id)?.apply_unlock(attempt)
    }

    pub fn pin(&mut self, id: &str) -> Result<bool, NoteError> {
        self.set_pinned(id, true)
    }

    pub fn unpin(&mut self, id: &str) -> Result<bool, NoteError> {
        self.set_pinned(id, false)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), NoteError> {
        self.note(id)?.ensure_bound(Action::Delete)?;
        let idx = position(&self.active, id)?;
        let mut note = self.active.remove(idx);
        note.apply_delete()?;
        self.trashed.push(note);
        log::debug!("moved note {} to trash", id);
        Ok(())
    }

    pub fn restore(&mut self, id: &str) -> Result<(), NoteError> {
        self.note(id)?.ensure_bound(Action::Restore)?;
        let idx = position(&self.trashed, id)?;
        let order = self.take_order();
        let mut note = self.trashed.remove(idx);
        note.apply_restore(order)?;
        self.active.push(note);
        self.sort_active();
        log::debug!("restored note {}", id);
        Ok(())
    }

    pub fn permanent_delete(&mut self, id: &str) -> Result<Note, NoteError> {
        self.note(id)?.check_permanent_delete()?;
        let idx = position(&self.trashed, id)?;
        log::debug!("permanently deleted note {}", id);
        Ok(self.trashed.remove(idx))
    }

    /// Visibility filter over active notes; membership is untouched.
    pub fn filter_active<P>(&self, predicate: P) -> Vec<&Note>
    where
        P: Fn(&Note) -> bool,
    {
        self.active.iter().filter(|&note| predicate(note)).collect()
    }

    pub(crate) fn note(&self, id: &str) -> Result<&Note, NoteError> {
        self.get(id)
            .ok_or_else(|| NoteError::NoteNotFound(id.to_string()))
    }

    fn note_mut(&mut self, id: &str) -> Result<&mut Note, NoteError> {
        self.active
            .iter_mut()
            .chain(self.trashed.iter_mut())
            .find(|n| n.id == id)
            .ok_or_else(|| NoteError::NoteNotFound(id.to_string()))
    }

    fn set_pinned(&mut self, id: &str, pinned: bool) -> Result<bool, NoteError> {
        let changed = self.note_mut(id)?.apply_pin(pinned)?;
        if changed {
            self.sort_active();
            log::debug!("note {} pinned={}", id, pinned);
        }
        Ok(changed)
    }

    fn sort_active(&mut self) {
        self.active.sort_by_key(|n| (!n.is_pinned(), n.order));
    }

    fn take_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order = self.next_order.saturating_add(1);
        order
    }

    fn generate_id(&self) -> NoteId {
        loop {
            let id: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(6)
                .map(char::from)
                .collect();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

fn position(notes: &[Note], id: &str) -> Result<usize, NoteError> {
    notes
        .iter()
        .position(|n| n.id == id)
        .ok_or_else(|| NoteError::NoteNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::note_matches_query;

    fn titles(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|n| n.title.as_str()).collect()
    }

    fn abc() -> (NoteCollection, NoteId, NoteId, NoteId) {
        let mut notes = NoteCollection::default();
        let ids: Vec<NoteId> = ["A", "B", "C"]
            .iter()
            .map(|title| {
                let id = notes.create_note();
                notes.edit(&id, Field::Title, title).unwrap();
                id
            })
            .collect();
        (notes, ids[0].clone(), ids[1].clone(), ids[2].clone())
    }

    #[test]
    fn create_appends_active_note() {
        let (notes, a, _, c) = abc();
        assert_eq!(titles(notes.active()), ["A", "B", "C"]);
        assert_eq!(notes.active()[0].id, a);
        assert_eq!(notes.active()[2].id, c);
        assert!(notes.trashed().is_empty());
    }

    #[test]
    fn pin_moves_to_front_and_unpin_returns_to_insertion_slot() {
        let (mut notes, _, b, _) = abc();
        assert_eq!(notes.pin(&b), Ok(true));
        assert_eq!(titles(notes.active()), ["B", "A", "C"]);
        assert_eq!(notes.unpin(&b), Ok(true));
        assert_eq!(titles(notes.active()), ["A", "B", "C"]);
    }

    #[test]
    fn pinned_group_keeps_insertion_order() {
        let (mut notes, a, _, c) = abc();
        notes.pin(&c).unwrap();
        notes.pin(&a).unwrap();
        assert_eq!(titles(notes.active()), ["A", "C", "B"]);
    }

    #[test]
    fn delete_and_restore_drops_pin_but_keeps_color_and_lock() {
        let (mut notes, a, b, _) = abc();
        let teal: NoteColor = "#008080".parse().unwrap();
        notes.pin(&a).unwrap();
        notes.set_color(&a, Some(teal)).unwrap();
        assert_eq!(notes.lock(&a, "pw"), Ok(true));

        notes.delete(&a).unwrap();
        notes.delete(&b).unwrap();
        assert_eq!(titles(notes.active()), ["C"]);
        assert_eq!(titles(notes.trashed()), ["A", "B"]);

        notes.restore(&a).unwrap();
        assert_eq!(titles(notes.active()), ["C", "A"]);
        let restored = notes.get(&a).unwrap();
        assert!(!restored.is_pinned());
        assert_eq!(restored.color, Some(teal));
        assert_eq!(restored.lock.password(), Some("pw"));
    }

    #[test]
    fn wrong_state_transitions_leave_collection_untouched() {
        let (mut notes, a, b, _) = abc();
        assert!(matches!(
            notes.restore(&a),
            Err(NoteError::InvalidTransition { .. })
        ));
        assert!(matches!(
            notes.permanent_delete(&a),
            Err(NoteError::InvalidTransition { .. })
        ));
        notes.delete(&b).unwrap();
        assert!(matches!(
            notes.pin(&b),
            Err(NoteError::InvalidTransition { .. })
        ));
        assert!(matches!(
            notes.delete(&b),
            Err(NoteError::InvalidTransition { .. })
        ));
        assert_eq!(titles(notes.active()), ["A", "C"]);
        assert_eq!(titles(notes.trashed()), ["B"]);
    }

    #[test]
    fn unknown_id_is_reported() {
        let mut notes = NoteCollection::default();
        assert_eq!(
            notes.delete("nope"),
            Err(NoteError::NoteNotFound("nope".into()))
        );
    }

    #[test]
    fn permanent_delete_removes_everywhere() {
        let (mut notes, a, _, _) = abc();
        notes.delete(&a).unwrap();
        let gone = notes.permanent_delete(&a).unwrap();
        assert_eq!(gone.id, a);
        assert!(notes.get(&a).is_none());
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn filter_does_not_change_membership() {
        let mut notes = NoteCollection::default();
        let meeting = notes.create_note();
        notes.edit(&meeting, Field::Title, "Team meeting").unwrap();
        let groceries = notes.create_note();
        notes.edit(&groceries, Field::Title, "Groceries").unwrap();

        let hits = notes.filter_active(|n| note_matches_query(n, "meet"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, meeting);
        assert_eq!(notes.active().len(), 2);
    }

    #[test]
    fn from_parts_continues_ranks() {
        let (notes, ..) = abc();
        let mut rebuilt =
            NoteCollection::from_parts(notes.active().to_vec(), notes.trashed().to_vec());
        let id = rebuilt.create_note();
        assert_eq!(rebuilt.get(&id).unwrap().order, 3);
    }
}
