use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uplift_core::{Config, FileStore, FormState, UpliftClient};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "uplift-playground")]
#[command(version, about = "Terminal playground for the JSON uplift backend")]
struct Cli {
    /// Backend base URL (overrides config file and UPLIFT_BACKEND_URL)
    #[arg(short, long)]
    backend: Option<String>,

    /// File remembering the last-used form values
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Log file (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Directory zip bundles are saved to
    #[arg(long, default_value = ".")]
    archive_dir: PathBuf,

    /// Write the given backend/storage options to the config file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|_| Config::new());
    if let Some(storage) = &cli.storage {
        config.storage_path = Some(storage.clone());
    }
    if cli.save_config {
        if let Some(backend) = &cli.backend {
            config.backend_url = Some(backend.clone());
        }
        config.save().context("Failed to save configuration")?;
    }

    init_logging(cli.log_file.clone())?;

    let backend_url = cli.backend.clone().unwrap_or_else(|| config.backend_url());
    let storage_path = config.storage_path()?;
    info!(
        backend = %backend_url,
        storage = %storage_path.display(),
        "Starting uplift playground v{}",
        env!("CARGO_PKG_VERSION")
    );

    let store = FileStore::open(&storage_path)
        .with_context(|| format!("Failed to open storage file: {}", storage_path.display()))?;
    let form = FormState::restore(&store);
    let client = UpliftClient::with_timeout(&backend_url, config.request_timeout())?;

    let mut app = App::new(form, Box::new(store), client, cli.archive_dir);
    app.start_policy_fetch();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

fn init_logging(log_file: Option<PathBuf>) -> Result<()> {
    let path = match log_file {
        Some(path) => path,
        None => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?
            .join("uplift-playground")
            .join("uplift-playground.log"),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;

    Ok(())
}
