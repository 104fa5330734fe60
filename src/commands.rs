use crate::app::AppState;
use crate::export::{DirectorySaver, WriterShare};
use crate::lock::LockGuard;
use crate::logging;
use crate::model::{Field, Note, NoteColor};
use crate::storage::{init_project_store, locate_store, FileStore, StoreLocation};
use crate::ui;
use anyhow::{bail, Context, Result};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

type State = AppState<FileStore>;

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    let state = open_state(&location)?;
    println!(
        "Initialized store at {} ({} notes)",
        location.dir.display(),
        state.notes().len()
    );
    Ok(())
}

pub fn list(store: Option<&Path>, trash: bool, search: Option<String>) -> Result<()> {
    let (state, location) = load_current_state(store)?;
    println!(
        "Store: {} ({})",
        location.dir.display(),
        location.scope.label()
    );
    let notes: Vec<&Note> = if trash {
        state.trashed().iter().collect()
    } else {
        state.search(search.as_deref().unwrap_or_default())
    };
    println!("{}", if trash { "trash" } else { "notes" });
    if notes.is_empty() {
        println!("  (empty)");
    }
    for note in notes {
        print_note(note);
    }
    Ok(())
}

pub fn add(store: Option<&Path>, title: Option<String>, body: Option<String>) -> Result<()> {
    let (mut state, _) = load_current_state(store)?;
    let id = state.create_note()?;
    if let Some(title) = title {
        state.edit(&id, Field::Title, &title)?;
    }
    if let Some(body) = body {
        state.edit(&id, Field::Body, &body)?;
    }
    println!("Added note {}", id);
    Ok(())
}

pub fn show(store: Option<&Path>, note_id: String) -> Result<()> {
    let (state, _) = load_current_state(store)?;
    let note = state
        .get(&note_id)
        .with_context(|| format!("note {} not found", note_id))?;
    print_note(note);
    let actions = note
        .actions()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    println!("    actions: {}", actions.join(", "));
    Ok(())
}

pub fn edit(
    store: Option<&Path>,
    note_id: String,
    title: Option<String>,
    body: Option<String>,
) -> Result<()> {
    if title.is_none() && body.is_none() {
        bail!("nothing to change; pass --title and/or --body");
    }
    let (mut state, _) = load_current_state(store)?;
    if let Some(title) = title {
        state
            .edit(&note_id, Field::Title, &title)
            .with_context(|| format!("editing note {}", note_id))?;
    }
    if let Some(body) = body {
        state
            .edit(&note_id, Field::Body, &body)
            .with_context(|| format!("editing note {}", note_id))?;
    }
    println!("Updated note {}", note_id);
    Ok(())
}

pub fn pin(store: Option<&Path>, note_id: String, pinned: bool) -> Result<()> {
    let (mut state, _) = load_current_state(store)?;
    let changed = if pinned {
        state.pin(&note_id)
    } else {
        state.unpin(&note_id)
    }
    .with_context(|| format!("updating pin on note {}", note_id))?;
    let verb = if pinned { "Pinned" } else { "Unpinned" };
    if changed {
        println!("{} note {}", verb, note_id);
    } else {
        println!("Note {} already {}", note_id, verb.to_lowercase());
    }
    Ok(())
}

pub fn color(store: Option<&Path>, note_id: String, color: Option<String>, clear: bool) -> Result<()> {
    let parsed = match (clear, color) {
        (true, _) | (false, None) => None,
        (false, Some(raw)) => Some(raw.parse::<NoteColor>()?),
    };
    let (mut state, _) = load_current_state(store)?;
    state
        .set_color(&note_id, parsed)
        .with_context(|| format!("coloring note {}", note_id))?;
    match parsed {
        Some(c) => println!("Colored note {} {}", note_id, c),
        None => println!("Cleared color on note {}", note_id),
    }
    Ok(())
}

pub fn lock(store: Option<&Path>, note_id: String, password: Option<String>) -> Result<()> {
    let (mut state, _) = load_current_state(store)?;
    let password = match password {
        Some(p) => p,
        None => prompt("Set a password for this note: ")?,
    };
    if state
        .lock(&note_id, &password)
        .with_context(|| format!("locking note {}", note_id))?
    {
        println!("Locked note {}", note_id);
    } else {
        println!("No password given; note {} left unlocked", note_id);
    }
    Ok(())
}

pub fn unlock(store: Option<&Path>, note_id: String, password: Option<String>) -> Result<()> {
    let (mut state, _) = load_current_state(store)?;
    let attempt = match password {
        Some(p) => p,
        None => prompt("Enter password to unlock: ")?,
    };
    state
        .unlock(&note_id, &attempt)
        .with_context(|| format!("unlocking note {}", note_id))?;
    println!("Unlocked note {}", note_id);
    Ok(())
}

pub fn delete(store: Option<&Path>, note_id: String) -> Result<()> {
    let (mut state, _) = load_current_state(store)?;
    state
        .delete(&note_id)
        .with_context(|| format!("deleting note {}", note_id))?;
    println!("Moved note {} to trash", note_id);
    Ok(())
}

pub fn restore(store: Option<&Path>, note_id: String) -> Result<()> {
    let (mut state, _) = load_current_state(store)?;
    state
        .restore(&note_id)
        .with_context(|| format!("restoring note {}", note_id))?;
    println!("Restored note {}", note_id);
    Ok(())
}

pub fn purge(store: Option<&Path>, note_id: String) -> Result<()> {
    let (mut state, _) = load_current_state(store)?;
    state
        .permanent_delete(&note_id)
        .with_context(|| format!("purging note {}", note_id))?;
    println!("Permanently deleted note {}", note_id);
    Ok(())
}

pub fn share(store: Option<&Path>, note_id: String) -> Result<()> {
    let (state, _) = load_current_state(store)?;
    let mut target = WriterShare::new(io::stdout());
    state
        .share(&note_id, Some(&mut target))
        .with_context(|| format!("sharing note {}", note_id))?;
    Ok(())
}

pub fn download(store: Option<&Path>, note_id: String, dir: Option<PathBuf>) -> Result<()> {
    let (state, _) = load_current_state(store)?;
    let dir = match dir {
        Some(d) => d,
        None => env::current_dir()?,
    };
    let mut saver = DirectorySaver::new(dir);
    let path = state
        .download(&note_id, &mut saver)
        .with_context(|| format!("downloading note {}", note_id))?;
    println!("Saved {}", path.display());
    Ok(())
}

pub fn tui(store: Option<&Path>) -> Result<()> {
    let (state, location) = open_tui_state(store)?;
    ui::run(state, location)
}

/// The log file has to be in place before loading, or rehydrate warnings
/// are dropped.
fn open_tui_state(store: Option<&Path>) -> Result<(State, StoreLocation)> {
    let location = current_location(store)?;
    let file_store = FileStore::open(&location)?;
    logging::init_tui_logging(file_store.dir())?;
    let state = load_state(file_store, &location)?;
    Ok((state, location))
}

fn current_location(store: Option<&Path>) -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    locate_store(store, &cwd)
}

fn load_current_state(store: Option<&Path>) -> Result<(State, StoreLocation)> {
    let location = current_location(store)?;
    let state = open_state(&location)?;
    Ok((state, location))
}

fn open_state(location: &StoreLocation) -> Result<State> {
    load_state(FileStore::open(location)?, location)
}

fn load_state(store: FileStore, location: &StoreLocation) -> Result<State> {
    let state = AppState::load(store)
        .with_context(|| format!("loading notes from {}", location.dir.display()))?;
    log::debug!(
        "loaded {} notes from {}",
        state.notes().len(),
        state.store().dir().display()
    );
    Ok(state)
}

fn prompt(message: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", message)?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_note(note: &Note) {
    let mut flags = Vec::new();
    if note.is_trashed() {
        flags.push("trashed".to_string());
    }
    if note.is_pinned() {
        flags.push("pinned".to_string());
    }
    if note.is_locked() {
        flags.push("locked".to_string());
    }
    if let Some(color) = note.color {
        flags.push(color.to_string());
    }
    if flags.is_empty() {
        println!("  - {}: {}", note.id, note.title);
    } else {
        println!("  - {}: {} [{}]", note.id, note.title, flags.join(", "));
    }
    match LockGuard::visible_body(note) {
        Some(body) => {
            for line in body.lines() {
                println!("    {}", line);
            }
        }
        None => println!("    [locked]"),
    }
    println!("    {}", note.last_edited_label());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn tui_load_warnings_reach_the_log_file() {
        let dir = tempdir().unwrap();
        let record = "- id: dup001\n  title: T\n  body: b\n  last_edited: 2024-01-01T00:00:00Z\n  affordances: active\n";
        fs::write(dir.path().join("notes.yml"), record).unwrap();
        fs::write(
            dir.path().join("trash.yml"),
            record.replace("active", "trash"),
        )
        .unwrap();

        let (state, location) = open_tui_state(Some(dir.path())).unwrap();
        assert_eq!(location.dir, dir.path());
        assert_eq!(state.active().len(), 1);
        assert!(state.trashed().is_empty());

        let log = fs::read_to_string(dir.path().join("notepin.log")).unwrap();
        assert!(log.contains("dropping duplicate note dup001"));
    }
}
