mod classify;
mod query;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kolpulse-cli")]
#[command(about = "KOL Pulse operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// List the most recently updated subject profiles
    Profiles {
        /// Maximum number of profiles to show (1-200)
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show per-emotion aggregates over a recent window
    Trends {
        /// Window length in seconds; defaults to KOLPULSE_TREND_WINDOW_SECS
        #[arg(long)]
        window_secs: Option<u64>,
    },
    /// Classify a piece of text with the configured classifier
    Classify {
        /// Text to classify
        text: String,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("kolpulse-cli: run with --help to list commands");
        return Ok(());
    };

    let config = kolpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Classify { text } = &command {
        return classify::run_classify(&config, text).await;
    }

    let pool_config = kolpulse_db::PoolConfig::from_app_config(&config);
    let pool = kolpulse_db::connect_pool(&config.database_url, pool_config).await?;

    let result: anyhow::Result<()> = match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => kolpulse_db::ping(&pool)
            .await
            .map(|()| println!("database ok"))
            .map_err(Into::into),
        Commands::Db {
            command: DbCommands::Migrate,
        } => kolpulse_db::run_migrations(&pool)
            .await
            .map(|()| println!("migrations applied"))
            .map_err(Into::into),
        Commands::Profiles { limit } => query::run_profiles(&pool, limit).await,
        Commands::Trends { window_secs } => {
            query::run_trends(
                &pool,
                window_secs.unwrap_or(config.trend_window_secs),
                config.alert_threshold,
            )
            .await
        }
        Commands::Classify { .. } => Ok(()),
    };

    pool.close().await;
    result
}
