mod pipeline;
mod status;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mavs-cli")]
#[command(about = "Mavs news ingestion and translation command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch all enabled sources and upsert the results
    Crawl {
        /// Articles requested from each source (default: PIPELINE_PER_SOURCE_LIMIT)
        #[arg(long)]
        limit: Option<usize>,
        /// Fetch and dedupe only; nothing is written to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Translate pending articles, newest first
    Translate {
        /// Articles to translate (default: PIPELINE_TRANSLATE_LIMIT)
        #[arg(long)]
        limit: Option<usize>,
        /// Pause between articles in milliseconds (default: PIPELINE_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Crawl, upsert and translate in one recorded pass
    Run {
        /// Articles to translate (default: PIPELINE_TRANSLATE_LIMIT)
        #[arg(long)]
        limit: Option<usize>,
        /// Pause between articles in milliseconds (default: PIPELINE_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Article counts and recent pipeline runs
    Status {
        /// Pipeline runs to show
        #[arg(long, default_value_t = 5)]
        runs: i64,
    },
    /// List the configured sources
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = mavs_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("mavs-cli: no command given; try --help");
        return Ok(());
    };

    match command {
        Commands::Sources => status::run_sources(&config),
        Commands::Crawl {
            limit,
            dry_run: true,
        } => pipeline::run_crawl_dry(&config, limit).await,
        Commands::Crawl {
            limit,
            dry_run: false,
        } => {
            let pool = connect(&config).await?;
            pipeline::run_crawl(&pool, &config, limit).await
        }
        Commands::Translate { limit, delay_ms } => {
            let pool = connect(&config).await?;
            pipeline::run_translate(&pool, &config, limit, delay_ms).await
        }
        Commands::Run { limit, delay_ms } => {
            let pool = connect(&config).await?;
            pipeline::run_full(&pool, &config, limit, delay_ms).await
        }
        Commands::Status { runs } => {
            let pool = connect(&config).await?;
            status::run_status(&pool, runs).await
        }
    }
}

async fn connect(config: &mavs_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = mavs_db::PoolConfig::from_app_config(config);
    let pool = mavs_db::connect_pool(&config.database_url, pool_config).await?;
    mavs_db::run_migrations(&pool).await?;
    Ok(pool)
}
