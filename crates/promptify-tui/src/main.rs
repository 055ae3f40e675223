use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use promptify_core::{
    format, Attachment, ChatSession, Config, Conversation, Extractor, GeminiClient, PdfRuntime,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "promptify", version)]
#[command(about = "Chat with Gemini about your PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// PDF files to attach to the first message
    files: Vec<PathBuf>,

    /// Gemini model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API base URL (e.g. a proxy that holds the API key)
    #[arg(long, global = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Your message
        text: String,
        /// PDF files to include
        #[arg(short, long)]
        attach: Vec<PathBuf>,
    },
    /// Update the config file
    Config {
        /// Store an API key in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Seconds to wait for the PDF backend
        #[arg(long)]
        pdf_init_timeout_secs: Option<u64>,
        /// Seconds before a Gemini request is abandoned
        #[arg(long)]
        request_timeout_secs: Option<u64>,
        /// Print the resulting config
        #[arg(long)]
        show: bool,
    },
}

/// Log to a file: the terminal belongs to the TUI.
fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "promptify.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("promptify=info,promptify_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("could not install log subscriber: {}", e))?;

    Ok(guard)
}

fn build_session(config: &Config, cli: &Cli) -> ChatSession {
    let endpoint = cli.endpoint.clone().unwrap_or_else(|| config.resolved_endpoint());
    let model = cli.model.clone().unwrap_or_else(|| config.resolved_model());
    let api_key = config.resolved_api_key();
    if api_key.is_none() {
        warn!(%endpoint, "no API key configured, requests go out unauthenticated");
    }

    let runtime = Arc::new(PdfRuntime::new(config.pdf_init_timeout()));
    let client = GeminiClient::new(&endpoint, &model, api_key, config.request_timeout());
    info!(%endpoint, %model, "session configured");

    ChatSession::new(Extractor::new(runtime), client)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Without a log file the app still runs, just unlogged
    let _log_guard = match Config::config_dir().and_then(|dir| init_logging(&dir.join("logs"))) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {}", e);
            None
        }
    };

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });

    match &cli.command {
        Some(Commands::Config {
            api_key,
            pdf_init_timeout_secs,
            request_timeout_secs,
            show,
        }) => {
            if let Some(model) = &cli.model {
                config.model = Some(model.clone());
            }
            if let Some(endpoint) = &cli.endpoint {
                config.endpoint = Some(endpoint.clone());
            }
            if let Some(key) = api_key {
                config.api_key = Some(key.clone());
            }
            if let Some(secs) = pdf_init_timeout_secs {
                config.pdf_init_timeout_secs = Some(*secs);
            }
            if let Some(secs) = request_timeout_secs {
                config.request_timeout_secs = Some(*secs);
            }
            config.save()?;

            if *show {
                println!("{}", config.redacted_json()?);
            }
            Ok(())
        }
        Some(Commands::Ask { text, attach }) => {
            let session = build_session(&config, &cli);
            ask(&session, text, attach).await
        }
        None => {
            let session = build_session(&config, &cli);
            run_tui(session, &cli.files, &config).await
        }
    }
}

async fn ask(session: &ChatSession, text: &str, attach: &[PathBuf]) -> Result<()> {
    let mut conversation = Conversation::new();
    for path in attach {
        conversation.add_attachment(Attachment::from_path(path)?);
    }
    conversation.input = text.to_string();

    if !session.send(&mut conversation, None).await {
        bail!("Nothing to send: provide a message or a PDF");
    }

    if let Some(reply) = conversation.last_bot_text() {
        println!("{}", format::to_plain_text(reply));
    }
    Ok(())
}

async fn run_tui(session: ChatSession, files: &[PathBuf], config: &Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(session, events.sender());
    for file in files {
        app.attach_path(&file.to_string_lossy());
    }
    if config.resolved_api_key().is_none() {
        app.status = Some(format!(
            "No API key: set {} or run `promptify config --api-key`",
            promptify_core::config::API_KEY_ENV
        ));
    }

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
