use crate::lock::LockGuard;
use crate::model::Note;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCKED_PLACEHOLDER: &str = "[locked]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
}

/// Something that can take a note off the device, e.g. a share sheet.
pub trait ShareTarget {
    fn share(&mut self, payload: &SharePayload) -> Result<()>;
}

/// Something that can save a text file on behalf of the user.
pub trait FileSaver {
    fn save(&mut self, filename: &str, text: &str) -> Result<PathBuf>;
}

/// Shares by writing the payload to a stream (stdout for the CLI).
pub struct WriterShare<W> {
    out: W,
}

/// Saves downloads into a fixed directory.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl<W: Write> WriterShare<W> {
    pub fn new(out: W) -> Self {
        WriterShare { out }
    }
}

impl<W: Write> ShareTarget for WriterShare<W> {
    fn share(&mut self, payload: &SharePayload) -> Result<()> {
        log::debug!("sharing {:?}", payload.title);
        writeln!(self.out, "{}", payload.text).context("writing shared note")?;
        self.out.flush()?;
        Ok(())
    }
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySaver { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSaver for DirectorySaver {
    fn save(&mut self, filename: &str, text: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {:?}", self.dir))?;
        let path = self.dir.join(filename);
        fs::write(&path, text).with_context(|| format!("writing {:?}", path))?;
        Ok(path)
    }
}

pub fn share_payload(note: &Note) -> SharePayload {
    SharePayload {
        title: note.title.clone(),
        text: format!(
            "📝 {}\n\n{}\n\n{}",
            note.title,
            exported_body(note),
            note.last_edited_label()
        ),
    }
}

pub fn download_text(note: &Note) -> String {
    format!(
        "Title: {}\n\n{}\n\n{}",
        note.title,
        exported_body(note),
        note.last_edited_label()
    )
}

/// `<title>.txt`, with path separators and control characters replaced.
pub fn download_filename(note: &Note) -> String {
    let stem: String = note
        .title
        .trim()
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | ':') || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "note.txt".to_string()
    } else {
        format!("{}.txt", stem)
    }
}

fn exported_body(note: &Note) -> &str {
    LockGuard::visible_body(note).unwrap_or(LOCKED_PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockState;
    use tempfile::tempdir;

    fn sample() -> Note {
        let mut note = Note::new("n1".into(), 0);
        note.title = "Plans".into();
        note.body = "ship it".into();
        note
    }

    #[test]
    fn share_text_includes_title_body_and_time() {
        let note = sample();
        let payload = share_payload(&note);
        assert_eq!(payload.title, "Plans");
        assert!(payload.text.starts_with("📝 Plans\n\nship it\n\nLast Edited: "));
    }

    #[test]
    fn locked_body_is_withheld() {
        let mut note = sample();
        note.lock = LockState::Locked {
            password: "pw".into(),
        };
        assert!(!download_text(&note).contains("ship it"));
        assert!(share_payload(&note).text.contains(LOCKED_PLACEHOLDER));
    }

    #[test]
    fn filename_falls_back_and_sanitizes() {
        let mut note = sample();
        assert_eq!(download_filename(&note), "Plans.txt");
        note.title = "a/b\\c".into();
        assert_eq!(download_filename(&note), "a_b_c.txt");
        note.title = "  ".into();
        assert_eq!(download_filename(&note), "note.txt");
        note.title = "..".into();
        assert_eq!(download_filename(&note), "note.txt");
    }

    #[test]
    fn writer_share_emits_text() {
        let mut out = Vec::new();
        WriterShare::new(&mut out)
            .share(&share_payload(&sample()))
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("ship it"));
    }

    #[test]
    fn directory_saver_writes_file() {
        let temp_dir = tempdir().unwrap();
        let mut saver = DirectorySaver::new(temp_dir.path());
        let note = sample();
        let path = saver
            .save(&download_filename(&note), &download_text(&note))
            .unwrap();
        assert_eq!(path, temp_dir.path().join("Plans.txt"));
        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("Title: Plans\n\nship it"));
    }
}
