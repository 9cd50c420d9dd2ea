//! Point d'entrée CLI pour pg-save

use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use pg_save::cli::{self, Commands, DbArgs};
use pg_save::config::load_env;

/// Voir le schéma d'une base PostgreSQL, lire des tables et les exporter
#[derive(Parser)]
#[command(name = "pg-save")]
#[command(author, version)]
#[command(about = "See a PostgreSQL database schema, select tables data and export it to csv, xlsx, json or geojson")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    db: DbArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Charger le fichier d'environnement avant de lire les options
    let env_file = load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    if let Some(path) = env_file {
        debug!(path = %path.display(), "Environment file loaded");
    }

    if let Err(e) = cli::run(cli.command, &cli.db).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (_, 0) => Level::WARN,
        (_, 1) => Level::INFO,
        (_, 2) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
