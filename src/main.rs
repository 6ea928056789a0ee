use clap::{Parser, Subcommand};
use scheme_advisor::Result;
use scheme_advisor::commands::{ask, build_index, run_query, show_status, sync_sources};
use scheme_advisor::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scheme-advisor")]
#[command(about = "Grounded retrieval and answering over government welfare-scheme PDFs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and generation backends
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the search index from the PDF corpus
    Build {
        /// Directory of PDF files to ingest (defaults to the corpus directory)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Retrieve the passages most relevant to a question
    Query {
        /// The question to search for
        query: String,
        /// Number of passages to return
        #[arg(long, default_value_t = 6)]
        top_k: usize,
    },
    /// Retrieve passages and compose a grounded answer
    Ask {
        /// The question to answer
        query: String,
        /// Number of passages to ground the answer on
        #[arg(long, default_value_t = 6)]
        top_k: usize,
    },
    /// Show the state of the persisted index
    Status,
    /// Write the scheme link registry and optionally download its PDFs
    SyncSources {
        /// Also download the registry's PDF source links into the corpus
        #[arg(long)]
        download: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Build { corpus } => {
            build_index(Config::load()?, corpus).await?;
        }
        Commands::Query { query, top_k } => {
            run_query(&Config::load()?, &query, top_k).await?;
        }
        Commands::Ask { query, top_k } => {
            ask(&Config::load()?, &query, top_k).await?;
        }
        Commands::Status => {
            show_status(&Config::load()?).await?;
        }
        Commands::SyncSources { download } => {
            sync_sources(&Config::load()?, download)?;
        }
    }

    Ok(())
}
