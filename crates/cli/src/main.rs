mod console;
mod menu;

use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use mindtrack_core::{
    config::{self, AppConfig},
    FlatFileStore, Repository,
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

use crate::{console::Console, menu::Menu};

fn main() -> Result<()> {
    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir)?;
    info!("using configuration {}", config_path.display());

    let mut repo = Repository::new(FlatFileStore::from_config(&config));
    repo.load_all().with_context(|| {
        format!(
            "FATAL ERROR: could not load data from {}",
            config.data_dir.display()
        )
    })?;

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());
    match Menu::new(&mut repo, &mut console).run() {
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            info!("input closed, exiting");
            Ok(())
        }
        other => other.context("console I/O failed"),
    }
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("mindtrack.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .with_filter(LevelFilter::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
