use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT_DIR: &str = ".notepin";

/// Synchronous string store the sync engine writes through.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
    Explicit,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub dir: PathBuf,
    pub scope: StoreScope,
}

/// One YAML file per key inside the store directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
            StoreScope::Explicit => "explicit",
        }
    }
}

impl FileStore {
    pub fn open(location: &StoreLocation) -> Result<Self> {
        fs::create_dir_all(&location.dir)
            .with_context(|| format!("creating {:?}", location.dir))?;
        Ok(FileStore {
            dir: location.dir.clone(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.yml", key))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        Ok(Some(data))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        fs::write(&path, value).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).context("failed to create .notepin directory")?;
    Ok(StoreLocation {
        dir,
        scope: StoreScope::Project,
    })
}

/// An explicit directory wins, then the nearest `.notepin/` above `start`,
/// then the per-user data directory.
pub fn locate_store(explicit: Option<&Path>, start: &Path) -> Result<StoreLocation> {
    if let Some(dir) = explicit {
        return Ok(StoreLocation {
            dir: dir.to_path_buf(),
            scope: StoreScope::Explicit,
        });
    }
    if let Some(dir) = find_project_store(start) {
        return Ok(StoreLocation {
            dir,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        dir: global_store_dir()?,
        scope: StoreScope::Global,
    })
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "notepin").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

/// In-memory store for tests; counts writes so callers can assert on them.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
    pub writes: usize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.writes += 1;
        self.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_keys() {
        let temp_dir = tempdir().unwrap();
        let location = StoreLocation {
            dir: temp_dir.path().join("store"),
            scope: StoreScope::Explicit,
        };
        let mut store = FileStore::open(&location).unwrap();
        assert_eq!(store.load("notes").unwrap(), None);
        store.save("notes", "- a").unwrap();
        assert_eq!(store.load("notes").unwrap().as_deref(), Some("- a"));
        assert!(store.dir().join("notes.yml").exists());
    }

    #[test]
    fn explicit_location_wins() {
        let temp_dir = tempdir().unwrap();
        let explicit = temp_dir.path().join("elsewhere");
        let location = locate_store(Some(&explicit), temp_dir.path()).unwrap();
        assert_eq!(location.scope, StoreScope::Explicit);
        assert_eq!(location.dir, explicit);
    }

    #[test]
    fn project_store_found_from_subdirectory() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(PROJECT_DIR)).unwrap();
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let location = locate_store(None, &nested).unwrap();
        assert_eq!(location.scope, StoreScope::Project);
        assert_eq!(location.dir, root.join(PROJECT_DIR));
    }
}
