use std::net::SocketAddr;

use dotenvy::dotenv;
use envconfig::Envconfig;
use tokio::net::TcpListener;

use prescripto::{config::Config, db::init_db, handlers, state::AppState, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load environment variables from a .env file if present
    dotenv().ok();

    // Initialize the logger with default settings or "info" level if not specified
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting the prescripto API...");

    let config = Config::init_from_env()?;

    let pool = init_db(&config.database_url).await?;
    let state = AppState::from_config(pool, &config)?;
    let app = handlers::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("Server started on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
