use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;

use pricewatch::config::{LoggingConfig, MetricsConfig};
use pricewatch::notifiers::{LogNotifier, Notifier, TelegramNotifier};
use pricewatch::scraper::ChromeFetcher;
use pricewatch::web::{self, AppState};
use pricewatch::{
    seed, AlertEvaluator, AlertThreshold, AppConfig, MonitorScheduler, PassOutcome, PassTrigger,
    PriceExtractor, PriceMonitor, ProductManager, ProductStore, SqliteProductStore,
};

#[derive(Debug, Parser)]
#[command(name = "pricewatch", version, about = "Competitor price monitor")]
struct Cli {
    /// Run a single monitoring pass and exit
    #[arg(long)]
    once: bool,

    /// Do not start the admin HTTP server
    #[arg(long)]
    no_server: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let _log_guard = init_tracing(&config.logging)?;
    info!("Starting pricewatch...");

    init_metrics(&config.metrics)?;

    let store = SqliteProductStore::connect(&config.database).await?;
    store.migrate().await?;
    let store: Arc<dyn ProductStore> = Arc::new(store);

    match seed::seed_if_empty(store.as_ref(), &config.seed).await {
        Ok(0) => {}
        Ok(inserted) => info!(inserted, "Seeded products"),
        Err(e) => tracing::error!(error = %e, "Seeding failed, continuing without it"),
    }

    let threshold = Arc::new(
        AlertThreshold::load(&config.alerts.threshold_file, config.alerts.default_threshold).await,
    );

    let notifier: Arc<dyn Notifier> = match TelegramNotifier::from_config(&config.notifications.telegram)? {
        Some(telegram) => Arc::new(telegram),
        None => {
            tracing::warn!("Telegram credentials missing, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let monitor = PriceMonitor::new(
        Arc::new(ChromeFetcher::new(config.scraper.clone())),
        PriceExtractor::new(),
        Duration::from_secs(config.scraper.fetch_timeout),
    );
    let scheduler = Arc::new(MonitorScheduler::new(
        Arc::clone(&store),
        monitor,
        AlertEvaluator::new(notifier, Arc::clone(&threshold)),
        Duration::from_millis(config.scheduler.item_delay_ms),
    ));

    if cli.once {
        match scheduler.run_pass(PassTrigger::Manual).await? {
            PassOutcome::Completed(report) => {
                info!(
                    checked = report.checked,
                    updated = report.updated,
                    failed = report.failed.len(),
                    "Single pass finished"
                );
            }
            PassOutcome::AlreadyRunning => {}
        }
        return Ok(());
    }

    let mut cron = scheduler.start_recurring(&config.scheduler.cron).await?;

    if config.scheduler.run_on_startup {
        scheduler.trigger_pass(PassTrigger::Startup).await;
    }

    if cli.no_server {
        tokio::signal::ctrl_c().await?;
        info!("Shutting down...");
    } else {
        let state = AppState {
            product_manager: Arc::new(ProductManager::new(
                Arc::clone(&store),
                Arc::clone(&scheduler),
                Arc::clone(&threshold),
            )),
            security: Arc::new(config.security.clone()),
            request_timeout: Duration::from_secs(config.server.request_timeout),
        };
        web::serve(&config.server, state).await?;
    }

    if let Err(e) = cron.shutdown().await {
        tracing::warn!(error = %e, "Job scheduler did not shut down cleanly");
    }
    info!("Stopped");
    Ok(())
}

/// Console output always; a daily rolling file as well when a log directory is configured.
fn init_tracing(config: &LoggingConfig) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("pricewatch=debug".parse()?);

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn init_metrics(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.port))
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(port = config.port, "Prometheus metrics exporter listening");
    Ok(())
}
