#![forbid(unsafe_code)]

use std::future::Future;
use std::sync::Arc;

use suicare_adapter::{router, AdapterConfig, AdapterRuntime, SaltStoreConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AdapterConfig::from_env()?;
    let runtime = Arc::new(AdapterRuntime::from_config(&config)?);
    let app = router(runtime);

    let store = match &config.store {
        SaltStoreConfig::Memory => "memory".to_string(),
        SaltStoreConfig::File(path) => path.display().to_string(),
    };
    info!(addr = %config.bind, store = %store, "suicare_adapter_http listening");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("suicare_adapter_http stopped");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves when `signal` fires. If the signal cannot be installed the
/// server keeps running without graceful shutdown.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(error = %err, "ctrl-c handler unavailable; graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
}
