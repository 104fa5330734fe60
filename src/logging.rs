use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;

pub const LOG_ENV: &str = "NOTEPIN_LOG";
const LOG_FILE: &str = "notepin.log";

pub fn init_cli_logging() {
    builder().init()
}

/// The TUI owns the terminal, so its log goes to a file inside the store.
pub fn init_tui_logging(store_dir: &Path) -> Result<()> {
    let path = store_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {:?}", path))?;
    builder()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("initializing logger")?;
    Ok(())
}

fn builder() -> env_logger::Builder {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, default_level))
}
