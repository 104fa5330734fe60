use crate::model::Note;

/// Case-insensitive substring match against the title or the body.
/// An empty query matches everything.
pub fn note_matches_query(note: &Note, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let query_lower = query.to_lowercase();
    note.title.to_lowercase().contains(&query_lower)
        || note.body.to_lowercase().contains(&query_lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, body: &str) -> Note {
        let mut note = Note::new("n".into(), 0);
        note.title = title.into();
        note.body = body.into();
        note
    }

    #[test]
    fn matches_title_or_body_ignoring_case() {
        let meeting = note("Team meeting", "agenda");
        let groceries = note("Groceries", "milk, MEETballs");
        assert!(note_matches_query(&meeting, "meet"));
        assert!(note_matches_query(&meeting, "AGENDA"));
        assert!(note_matches_query(&groceries, "meet"));
        assert!(!note_matches_query(&meeting, "milk"));
    }

    #[test]
    fn empty_query_matches_all() {
        assert!(note_matches_query(&note("", ""), ""));
    }
}
