use anyhow::Context;

use designmail_infra::PollerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PollerConfig::from_env().context("invalid configuration")?;
    let _log_guard =
        designmail_observability::init(&config.log).context("failed to initialize logging")?;

    tracing::debug!(?config, "loaded configuration");

    designmail_poller::app::run(config).await
}
