mod app;
mod client;
mod config;
mod handler;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use client::AgentClient;
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "pdfagent")]
#[command(version)]
#[command(about = "Upload PDFs and ask questions against a remote QA service")]
struct Args {
    /// Upload a PDF and exit
    #[arg(short, long, value_name = "FILE")]
    upload: Option<PathBuf>,

    /// Ask a single question and exit
    #[arg(short, long, value_name = "QUESTION")]
    ask: Option<String>,

    /// Override the service base URL
    #[arg(short, long, value_name = "URL")]
    base_url: Option<String>,

    /// Starting directory for the PDF browser
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = Config::load().unwrap_or_else(|_| Config::new());

    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.base_url().to_string());
    let client = AgentClient::new(&base_url, config.timeout())?;

    // Handle CLI-only commands
    if let Some(path) = args.upload {
        let file_name = client.upload_pdf(&path).await?;
        println!("{} ({})", app::UPLOAD_SUCCESS_NOTICE, file_name);
        return Ok(());
    }

    if let Some(question) = args.ask {
        let answer = client.ask(&question).await?;
        println!("{}", answer);
        return Ok(());
    }

    let start_dir = match args.dir.or_else(|| config.start_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("could not determine working directory")?,
    };

    run_tui(client, start_dir).await
}

async fn run_tui(client: AgentClient, start_dir: PathBuf) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(tui::TICK_INTERVAL);
    let mut app = App::new(client, start_dir)?;

    tracing::info!(base_url = %app.client.base_url(), "starting TUI");

    let result = run_app(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run_app(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        }

        // Apply outcomes of requests that settled since the last pass
        app.poll_requests().await;
    }
    Ok(())
}

/// Log to a file under the config directory so output never corrupts the
/// alternate-screen TUI. Best effort: without a usable config directory the
/// app simply runs unlogged.
fn init_tracing() {
    let Some(log_dir) = dirs::config_dir().map(|p| p.join("pdfagent")) else {
        return;
    };
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(log_dir.join("pdfagent.log")) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
