use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vendora_scheduler::config::SchedulerConfig;
use vendora_scheduler::runner::ImpressionRunner;
use vendora_scheduler::service::SchedulerService;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vendora_scheduler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = SchedulerConfig::from_env();
    tracing::info!(
        main_secs = config.main_sweep_interval.as_secs(),
        retry_secs = config.retry_sweep_interval.as_secs(),
        cleanup_secs = config.cleanup_sweep_interval.as_secs(),
        retention_days = config.retention_days,
        "Loaded scheduler configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vendora_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vendora_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    vendora_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Scheduler ---
    let runner = Arc::new(ImpressionRunner::new(pool.clone()));
    let service = SchedulerService::new(pool, runner, config);

    let started = service.start().await;
    tracing::info!(message = %started.message, "Scheduler control");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received");

    let stopped = service.stop().await;
    tracing::info!(message = %stopped.message, "Scheduler control");
}
