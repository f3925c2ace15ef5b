#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::{Parser, Subcommand};
use iam_store::StoreConfig;
use tracing::Level;

mod commands;

use commands::query::QueryArgs;
use commands::OutputFormat;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.iam-store/iam-store.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty
    #[clap(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Shorthand for --format json
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if needed, then create every missing table
    Init {
        /// Do not issue CREATE DATABASE before connecting
        #[clap(long)]
        skip_create_database: bool,
    },

    /// Create the configured database if it does not exist
    CreateDatabase,

    /// Create every missing table
    Migrate,

    /// Show which entity tables exist
    Status,

    /// Show the effective configuration
    Config,

    /// Run a query session against one entity's table
    Query(QueryArgs),
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level TRACE or higher.
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match StoreConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        cli.format
    };

    let result = match cli.command {
        Commands::Init {
            skip_create_database,
        } => commands::database::run_init(&config, skip_create_database, output_format),
        Commands::CreateDatabase => commands::database::run_create_database(&config, output_format),
        Commands::Migrate => commands::database::run_migrate(&config, output_format),
        Commands::Status => commands::database::run_status(&config, output_format),
        Commands::Config => commands::config::run(&config, &cli.config, output_format),
        Commands::Query(args) => commands::query::run(&config, args, output_format),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
