use foodgram_sdk::{
    api::{self, AppState},
    config::Config,
};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use sqlx::postgres::PgPoolOptions;
use tokio::signal::{self, ctrl_c};

#[tokio::main]
async fn main() {
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
        eprintln!("Failed to initialize logger: {e}");
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };

    log::info!("Connecting to database...");
    let pool = match PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to connect to database: {e}");
            return;
        }
    };

    let state = AppState::new(pool.clone(), config.jwt_secret);

    let server = warp::serve(api::routes(state))
        .try_bind_with_graceful_shutdown(config.bind_address, shutdown_signal());

    match server {
        Ok((address, server)) => {
            log::info!("Server running on {address}");
            server.await;
        }
        Err(e) => log::error!("Failed to bind {}: {e}", config.bind_address),
    }

    pool.close().await;
    log::info!("Server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
