mod app;
mod cli;
mod collection;
mod commands;
mod export;
mod lifecycle;
mod lock;
mod logging;
mod model;
mod search;
mod storage;
mod sync;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let store = args.store.as_deref();
    let command = args.command.unwrap_or(cli::Command::Tui);
    if !matches!(command, cli::Command::Tui) {
        logging::init_cli_logging();
    }
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { trash, search } => commands::list(store, trash, search),
        cli::Command::Add { title, body } => commands::add(store, title, body),
        cli::Command::Show { note_id } => commands::show(store, note_id),
        cli::Command::Edit {
            note_id,
            title,
            body,
        } => commands::edit(store, note_id, title, body),
        cli::Command::Pin { note_id } => commands::pin(store, note_id, true),
        cli::Command::Unpin { note_id } => commands::pin(store, note_id, false),
        cli::Command::Color {
            note_id,
            color,
            clear,
        } => commands::color(store, note_id, color, clear),
        cli::Command::Lock { note_id, password } => commands::lock(store, note_id, password),
        cli::Command::Unlock { note_id, password } => commands::unlock(store, note_id, password),
        cli::Command::Delete { note_id } => commands::delete(store, note_id),
        cli::Command::Restore { note_id } => commands::restore(store, note_id),
        cli::Command::Purge { note_id } => commands::purge(store, note_id),
        cli::Command::Share { note_id } => commands::share(store, note_id),
        cli::Command::Download { note_id, dir } => commands::download(store, note_id, dir),
        cli::Command::Tui => commands::tui(store),
    }
}
