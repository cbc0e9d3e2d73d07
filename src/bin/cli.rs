//! Barbershop CLI Client
//!
//! Command-line interface for interacting with a Barbershop server.

use std::path::PathBuf;

use barbershop::{Barbershop, Config, Value};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// Barbershop CLI
#[derive(Parser, Debug)]
#[command(name = "barbershop-cli")]
#[command(about = "CLI for the Barbershop priority counter server")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host (overrides the config file)
    #[arg(short = 'i', long)]
    host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add to an item's score
    Update {
        /// The item id
        item: u64,

        /// Amount to add
        #[arg(default_value = "1")]
        amount: i64,
    },

    /// Pop the highest-scored item
    Next,

    /// Show the highest-scored item
    Peek,

    /// Show one item's score
    Score {
        /// The item id
        item: u64,
    },

    /// Show server statistics
    Info,

    /// Check the server is answering
    Ping,

    /// Send an arbitrary inline command
    Raw {
        /// Command name followed by its arguments
        #[arg(required = true)]
        tokens: Vec<String>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,barbershop=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing::debug!("barbershop-cli v{} -> {}:{}", barbershop::VERSION, config.host, config.port);

    let client = Barbershop::new(config);
    let result = match args.command {
        Commands::Update { item, amount } => client.update(item, amount),
        Commands::Next => client.next(),
        Commands::Peek => client.peek(),
        Commands::Score { item } => client.score(item),
        Commands::Info => client.info(),
        Commands::Ping => client.ping(),
        Commands::Raw { tokens } => client.format_inline(tokens),
    };

    match result {
        Ok(Value::Error(e)) => {
            println!("(error) {}", e);
            std::process::exit(1);
        }
        Ok(value) => println!("{}", value),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
