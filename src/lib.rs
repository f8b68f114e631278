pub mod clock;
pub mod commands;
pub mod db;
pub mod history;
pub mod rating;
pub mod settings;
pub mod store;
pub mod tracker;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info};

use clock::SystemClock;
use commands::{run_command, HostCommand};
use db::Database;
use settings::SettingsStore;
use store::SessionStore;
use tracker::SessionTracker;

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    let default_level = if settings::debug_enabled() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let command = match HostCommand::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(execute(command)) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    }
}

async fn execute(command: HostCommand) -> Result<String> {
    let settings = SettingsStore::new(SettingsStore::default_data_dir())?;
    if settings.save_if_missing()? {
        info!("Wrote default settings to {}", settings.data_dir().display());
    }
    let database = Database::open(settings.database_path())
        .with_context(|| "failed to open sleep database")?;
    if let Some(path) = database.path() {
        debug!("Using sleep database at {}", path.display());
    }
    let store: Arc<dyn SessionStore> = Arc::new(database);

    let tracker = SessionTracker::new(
        store.clone(),
        Arc::new(SystemClock),
        settings.history_formatter(),
    )
    .await?;
    info!("Sleep tracker ready (data in {})", settings.data_dir().display());

    let result = run_command(&tracker, store.as_ref(), command).await;
    tracker.close();
    result
}
