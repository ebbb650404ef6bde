//! # NLQ CLI (`nlq`)
//!
//! ## Usage
//!
//! ```bash
//! nlq --config ./config/nlq.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nlq init` | Create the SQLite database and seed the demo tables |
//! | `nlq schema` | Print the discovered schema |
//! | `nlq ask "<question>"` | Answer a question |
//! | `nlq serve` | Start the HTTP server |
//! | `nlq completions <shell>` | Print shell completions |
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` (default
//! `info`) to change verbosity.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use nlq_engine::{config, migrate, query, schema, server};

/// NLQ: ask questions of a SQLite database and uploaded documents in plain
/// English.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/nlq.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "nlq",
    about = "Heuristic natural-language queries over SQLite and uploaded documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/nlq.toml`. When the file does not exist, built-in
    /// defaults are used with a database at `./data/nlq.sqlite`.
    #[arg(long, global = true, default_value = "./config/nlq.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and the demo `employees`/`departments` tables.
    ///
    /// Seeds demo rows when the tables are empty. Safe to run repeatedly.
    Init,

    /// Print the discovered database schema.
    Schema {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a natural-language question.
    Ask {
        /// The question, e.g. "How many employees do we have?".
        question: String,

        /// Document file or directory to ingest first. Repeatable.
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,

        /// Ask the same question N times (later answers come from the cache).
        #[arg(long, default_value_t = 1)]
        repeat: usize,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves the web page and JSON API.
    Serve,

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "nlq", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing()?;

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config not found, using defaults");
        config::Config::minimal()
    };

    match cli.command {
        Commands::Init => {
            let seeded = migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
            if seeded > 0 {
                println!("Seeded {} demo rows.", seeded);
            }
        }
        Commands::Schema { json } => {
            schema::run_schema(&cfg, json).await?;
        }
        Commands::Ask {
            question,
            docs,
            repeat,
            json,
        } => {
            query::run_ask(&cfg, &question, &docs, repeat, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
