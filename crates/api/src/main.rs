use anyhow::Context;

use gatehouse_api::{ConfigLoader, ServerLifecycleManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loader = ConfigLoader::new();
    let config = loader
        .load()
        .with_context(|| format!("failed to load {}", loader.resolved_path().display()))?;

    gatehouse_observability::init(&config.log);

    let mut manager = ServerLifecycleManager::new();
    manager.start(&config).await.context("server failed to start")?;

    let handle = manager.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            handle.shutdown();
        }
    });

    manager.await_shutdown(config.server.run_duration()).await?;
    tracing::info!("server is shutting down... good bye!");

    Ok(())
}
