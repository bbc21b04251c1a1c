use clap::{Parser, Subcommand};
use cipher_academy_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "cipher-academy-cli", version, about = "Cipher Academy CLI")]
struct Cli {
    /// Evaluate as of this RFC 3339 instant instead of the current time
    #[arg(long, global = true)]
    now: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User enrollment and plans
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Curriculum lookup
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Show a user's weekly board
    Board(commands::board::BoardArgs),
    /// Submit an answer for a slot
    Submit(commands::submit::SubmitArgs),
    /// Progress summaries and attempt history
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Release scanning
    Releases {
        #[command(subcommand)]
        action: commands::releases::ReleasesAction,
    },
    /// Send a request through the API router
    Api(commands::api::ApiArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let configured = Config::load().map(|c| c.logging.filter).unwrap_or_default();
    let env_filter = EnvFilter::try_from_env("CIPHER_ACADEMY_LOG")
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = commands::clock(cli.now.as_deref()).and_then(|now| match cli.command {
        Commands::User { action } => commands::user::run(action, now),
        Commands::Catalog { action } => commands::catalog::run(action),
        Commands::Board(args) => commands::board::run(args, now),
        Commands::Submit(args) => commands::submit::run(args, now),
        Commands::Progress { action } => commands::progress::run(action, now),
        Commands::Releases { action } => commands::releases::run(action, now),
        Commands::Api(args) => commands::api::run(args, now),
        Commands::Config { action } => commands::config::run(action),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
