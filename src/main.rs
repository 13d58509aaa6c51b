mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use penpal::config::PenpalConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "penpal", version, about = "AI journaling assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a journal entry
    Add {
        /// Entry text
        text: String,
    },
    /// Ask a question about your journal
    Ask {
        /// The question
        query: String,
    },
    /// Interactive question loop on stdin
    Chat,
    /// Create the vector collection if it does not exist
    Init,
    /// Serve the journal over HTTP
    Serve,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.penpal/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let config = PenpalConfig::load()?;

    // Log to stderr so stdout only carries answers.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Add { text } => cli::add(&config, &text).await?,
        Command::Ask { query } => cli::ask(&config, &query).await?,
        Command::Chat => cli::chat(&config).await?,
        Command::Init => cli::init(&config).await?,
        Command::Serve => penpal::server::serve(config).await?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
