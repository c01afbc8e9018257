use std::sync::Arc;

use castcontrol::NullDeviceControl;
use castmeta::Services;
use caststore::MemoryStateStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ========== PHASE 1 : Collaborators ==========
    // The in-memory store and the null control binding keep the core
    // runnable on its own; real deployments swap in a database-backed
    // store and a cast binding here.
    let store = Arc::new(MemoryStateStore::new());
    let device_control = Arc::new(NullDeviceControl);

    // ========== PHASE 2 : Monitoring core ==========
    info!("wiring monitoring services...");
    let services = Arc::new(
        Services::builder()
            .device_control(device_control)
            .store(store)
            .build()?,
    );

    info!("CastNow is ready");
    info!("Press Ctrl+C to stop...");

    tokio::signal::ctrl_c().await?;

    // ========== PHASE 3 : Shutdown ==========
    info!("shutting down...");
    services.shutdown().await;

    Ok(())
}
