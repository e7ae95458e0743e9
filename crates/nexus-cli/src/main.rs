mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use nexus_core::SyncError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nexus-sync",
    about = "Sync repository sections and database exports into nexus data files",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from sections.yaml or .git/)
    #[arg(long, global = true, env = "NEXUS_ROOT")]
    root: Option<PathBuf>,

    /// Sections config file (default: <root>/sections.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone configured repos and write one JSON file per section plus data/nexus.json
    Sections,

    /// Export triage counts and tasks from the database into data/
    Export {
        /// Postgres connection string (falls back to postgresql://localhost/postgres)
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Inspect and validate the sections config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Sections | Commands::Export { .. } => tracing::Level::INFO,
        Commands::Config { .. } => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let config_path = cli
        .config
        .unwrap_or_else(|| nexus_core::paths::config_path(&root));

    let result = match cli.command {
        Commands::Sections => cmd::sections::run(&config_path, cli.json),
        Commands::Export { database_url } => cmd::export::run(&root, database_url, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Surface whatever git printed before the failure.
        if let Some(SyncError::CommandFailed { stdout, stderr, .. }) =
            e.chain().find_map(|c| c.downcast_ref::<SyncError>())
        {
            if !stdout.trim().is_empty() {
                println!("{}", stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                eprintln!("{}", stderr.trim_end());
            }
        }
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
