use tokenizer_server::{app, apply_migrations, connect, ensure_database_exists, AppState, Config, DataLayer, Hooks};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tokenizer_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    if config.create_database {
        ensure_database_exists(&config.database_url).await?;
    }
    let pool = connect(&config).await?;
    apply_migrations(&pool).await?;

    let state = AppState::new(pool, DataLayer::new(Hooks::default()));
    let router = app(state, config.request_timeout);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("tokenizer-server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
