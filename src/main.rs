use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;

mod dto {
    pub mod audit_dto;
    pub mod claims_dto;
    pub mod entry_dto;
    pub mod message_dto;
    pub mod page_dto;
    pub mod pick_dto;
    pub mod pool_dto;
    pub mod schedule_dto;
    pub mod team_dto;
    pub mod user_dto;
}

mod routes;

mod services {
    pub mod audit_log;
    pub mod auth_user;
    pub mod lock_time;
    pub mod password;
    pub mod pick_ledger;
}

use config::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::load());

    let pool = match db::connect(&config.database_url, config.database_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Could not open database {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let app = routes::app(pool, config);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Could not bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Started server on {}.", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
