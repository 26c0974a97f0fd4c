use std::{env, fs::File, path::PathBuf, sync::Mutex};

use anyhow::{Context, Result};
use flowtune::{config::Config, ui};
use tracing::info;

fn main() -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = env::args_os().nth(1) {
        config.library_dir = PathBuf::from(dir);
    }
    init_logging(&config)?;

    info!(library = %config.library_dir.display(), "starting flowtune");
    ui::run(config)
}

/// Log to a file; stdout belongs to the terminal UI.
fn init_logging(config: &Config) -> Result<()> {
    let file = File::create(&config.log_file)
        .with_context(|| format!("creating log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(config.log_level)
        .init();
    Ok(())
}
