use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notepin", version, about = "Terminal sticky notes with pins, colors, locks and a trash can")]
pub struct Cli {
    /// Use this store directory instead of searching for one
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project store in the current directory
    Init,
    /// List notes (active by default)
    List {
        /// Show the trash instead
        #[arg(long)]
        trash: bool,
        /// Only show active notes whose title or body contains this text
        #[arg(long, short = 's')]
        search: Option<String>,
    },
    /// Create a new note
    Add {
        /// Title (defaults to "Untitled")
        #[arg(long)]
        title: Option<String>,
        /// Body (defaults to "Write something...")
        #[arg(long)]
        body: Option<String>,
    },
    /// Show a single note
    Show { note_id: String },
    /// Edit the title and/or body of a note
    Edit {
        note_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Pin a note to the top
    Pin { note_id: String },
    /// Unpin a note
    Unpin { note_id: String },
    /// Set or clear a note's background color
    Color {
        note_id: String,
        /// Color as #rrggbb
        #[arg(required_unless_present = "clear")]
        color: Option<String>,
        /// Remove the color override
        #[arg(long, conflicts_with = "color")]
        clear: bool,
    },
    /// Lock a note's body behind a password
    Lock {
        note_id: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Unlock a locked note
    Unlock {
        note_id: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Move a note to the trash
    Delete { note_id: String },
    /// Bring a note back from the trash
    Restore { note_id: String },
    /// Permanently delete a trashed note
    Purge { note_id: String },
    /// Print a note in share format
    Share { note_id: String },
    /// Save a note as a text file
    Download {
        note_id: String,
        /// Target directory (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Launch the interactive TUI
    Tui,
}
