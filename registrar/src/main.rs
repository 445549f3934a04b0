use registrar::prelude::*;
use registrar::observability::shutdown_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    tracing::info!(
        environment = %config.service.environment,
        store = if config.uses_memory_store() { "memory" } else { "postgres" },
        "configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let state = AppState::new(config.clone(), shutdown.clone()).await?;

    let result = Server::new(config).serve(router(state), shutdown).await;

    shutdown_tracing();
    result
}
