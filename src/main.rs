use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use options_wheel_bot::{
    client::market::MarketDataFetcher,
    engine::{self, ports::MarketDataSource, EnginePorts},
    insurance::InsuranceParams,
    monitoring::{
        logger,
        metrics::{log_metrics_snapshot, METRICS},
    },
    storage::{
        create_pg_pool,
        queue::RedisNotificationQueue,
        repos::{
            load_active_configs, PgBillingRepository, PgDecisionRepository,
            PgInsuranceCoverageRepository, PgPositionRepository,
        },
    },
    strategy::{self, DecisionParams, HeuristicPremiumEstimator},
    types::AppConfig,
};

fn redact_host(url: &str) -> String {
    url.split('@')
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("?")
        .to_string()
}

#[derive(Parser, Debug)]
#[command(name = "options-wheel-bot")]
#[command(about = "Options-wheel trading decision engine (one cycle per invocation)", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one decision cycle over all eligible users
    Run {},
    /// Fetch a market snapshot and log the technical analysis, touching no storage
    Analyze {},
}

fn build_http_client() -> anyhow::Result<reqwest::Client> {
    // Short timeout: a cron-triggered run should fail fast, not hang.
    Ok(reqwest::Client::builder()
        .user_agent("options-wheel-bot/0.1")
        .timeout(Duration::from_secs(15))
        .build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "options_wheel_bot=debug,bot=debug,info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(target: "bot", "options-wheel-bot starting");

    let cli = Cli::parse();
    tracing::debug!(target: "bot", config = %cli.config, "loading config");

    let settings = AppConfig::from_file(&cli.config)?;
    tracing::info!(
        target: "bot",
        config = %cli.config,
        symbol = %settings.market.symbol,
        postgres_host = redact_host(&settings.postgres.url),
        "config loaded"
    );

    match cli.command.unwrap_or(Commands::Run {}) {
        Commands::Run {} => {
            logger::log_startup(&settings);
            run_once(settings).await?;
        }
        Commands::Analyze {} => {
            analyze_once(settings).await?;
        }
    }

    Ok(())
}

/// Wire the ports together and execute one engine cycle.
async fn run_once(cfg: AppConfig) -> anyhow::Result<()> {
    let http = build_http_client()?;
    let market = MarketDataFetcher::new(http, &cfg.market);

    info!(target: "bot", "connecting to Postgres");
    let pool = create_pg_pool(&cfg.postgres).await?;
    info!(target: "bot", "Postgres connected");

    let positions = PgPositionRepository::new(pool.clone());
    let decisions = PgDecisionRepository::new(pool.clone());
    let billing = PgBillingRepository::new(pool.clone());
    let coverage = PgInsuranceCoverageRepository::new(pool.clone());

    info!(target: "bot", "connecting to Redis");
    let notifications = RedisNotificationQueue::new(&cfg.redis).await?;

    let configs = load_active_configs(&pool).await?;
    info!(target: "bot", configs = configs.len(), "active wheel configs loaded");

    let ports = EnginePorts {
        market: &market,
        positions: &positions,
        decisions: &decisions,
        billing: &billing,
        coverage: &coverage,
        notifications: &notifications,
    };

    let params = DecisionParams::from(&cfg.engine);
    let insurance = InsuranceParams::from(&cfg.insurance);

    let results = engine::run_cycle(
        &ports,
        &configs,
        &params,
        insurance,
        &HeuristicPremiumEstimator,
        Utc::now(),
    )
    .await?;

    for result in &results {
        info!(target: "bot", result = %serde_json::to_string(result).unwrap_or_default(), "user result");
    }
    log_metrics_snapshot(&METRICS.snapshot());

    Ok(())
}

/// Operator tool: compute and log the technical picture without touching
/// storage.
async fn analyze_once(cfg: AppConfig) -> anyhow::Result<()> {
    let http = build_http_client()?;
    let market = MarketDataFetcher::new(http, &cfg.market);

    let snapshot = market.fetch_snapshot().await?;
    let analysis = strategy::analyze(&snapshot);

    info!(
        target: "bot",
        price = analysis.price,
        rsi = analysis.rsi,
        macd = ?analysis.macd_trend,
        bollinger = ?analysis.bollinger_position,
        support = analysis.support,
        resistance = analysis.resistance,
        volatility = analysis.volatility_24h,
        history_points = snapshot.price_history.len(),
        "technical analysis"
    );

    Ok(())
}
