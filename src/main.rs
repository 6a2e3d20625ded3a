//! newsdedup daemon: polls the article store and resolves near-duplicates
//! until shut down.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use newsdedup::{build_pipeline, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    let (_store, driver) = build_pipeline(&config)?;
    info!(
        name = config.name.as_deref().unwrap_or("newsdedup"),
        backend = %config.store.backend,
        "starting resolution driver"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested; stopping after the current batch");
        let _ = shutdown_tx.send(true);
    });

    let driver = Arc::new(driver);
    let stats = driver.run(shutdown_rx).await?;
    info!(
        processed = stats.processed,
        duplicates = stats.duplicates,
        deferred = stats.deferred,
        "driver exited"
    );
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
