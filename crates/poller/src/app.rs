use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use designmail_infra::PollerConfig;
use designmail_infra::designs::PostgresDesigns;
use designmail_infra::ledger::PostgresLedger;
use designmail_infra::notifier::{MailNotifier, SmtpTransport};
use designmail_infra::order_source::HttpOrderSource;
use designmail_infra::reconcile::{PollScheduler, ReconciliationEngine};

pub type ProductionEngine =
    ReconciliationEngine<HttpOrderSource, PostgresLedger, PostgresDesigns, MailNotifier<SmtpTransport>>;

pub async fn connect_database(config: &PollerConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(config.call_timeout)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Build the engine over the production adapters and make sure both tables
/// exist.
pub async fn build_engine(config: &PollerConfig, pool: PgPool) -> anyhow::Result<ProductionEngine> {
    let ledger = PostgresLedger::new(pool.clone());
    ledger
        .ensure_schema()
        .await
        .context("failed to prepare processed_orders table")?;

    let designs = PostgresDesigns::new(pool);
    designs
        .ensure_schema()
        .await
        .context("failed to prepare designs table")?;

    let source = HttpOrderSource::new(config.order_source.clone())
        .context("failed to build order source client")?;

    let transport = SmtpTransport::new(&config.mail).context("failed to configure SMTP transport")?;
    let notifier = MailNotifier::new(transport, config.mail.from.clone(), config.mail.to.clone());

    Ok(ReconciliationEngine::new(source, ledger, designs, notifier)
        .with_lookback(config.lookback)
        .with_call_timeout(config.call_timeout))
}

/// Run the poller until Ctrl-C or SIGTERM, then stop after the current cycle.
pub async fn run(config: PollerConfig) -> anyhow::Result<()> {
    let pool = connect_database(&config).await?;
    let engine = build_engine(&config, pool.clone()).await?;

    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        lookback_secs = config.lookback.as_secs(),
        "starting design notification poller"
    );

    let handle = PollScheduler::new(engine, config.backoff_policy()).spawn();

    shutdown_signal().await;
    tracing::info!("shutdown requested; waiting for the current cycle to finish");

    let state = handle.shutdown().await.context("poller task panicked")?;
    tracing::info!(
        consecutive_failures = state.consecutive_failures(),
        "poller shut down"
    );

    close_pool(pool, Duration::from_secs(5)).await;
    Ok(())
}

async fn close_pool(pool: PgPool, grace: Duration) {
    if tokio::time::timeout(grace, pool.close()).await.is_err() {
        tracing::warn!("timed out closing database pool");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
