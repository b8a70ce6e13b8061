use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Parser;
use log::{info, warn};
use parley_core::{Config, Conversation, SystemClipboard};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "parley", version)]
#[command(about = "Chat with a language model from your terminal")]
struct Cli {
    /// Chat-completion endpoint URL
    #[arg(long, env = "PARLEY_ENDPOINT")]
    endpoint: Option<String>,
    /// Model identifier sent with every request
    #[arg(short, long, env = "PARLEY_MODEL")]
    model: Option<String>,
    /// API key (falls back to OPENROUTER_API_KEY, then the config file)
    #[arg(long, env = "PARLEY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// The terminal owns stderr, so logs go to a file
fn init_logging(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?
            .join("parley")
            .join("parley.log"),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Falling back to default config: {}", e);
            Config::new()
        }),
    };

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    config.api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .or(config.api_key);

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let settings = load_config(&cli)?.settings();
    if settings.completion.api_key.is_none() {
        warn!("No API key configured; requests will be sent without credentials");
    }
    info!(
        "Starting session with model {} at {}",
        settings.completion.model, settings.completion.endpoint
    );

    let model = settings.completion.model.clone();
    let (conversation, conversation_events) =
        Conversation::connect(settings, Box::new(SystemClipboard::new()))?;
    let mut app = App::new(conversation, model);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    events.forward_conversation(conversation_events);

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("Session ended after {} messages", app.conversation.messages().len());
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
