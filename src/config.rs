use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

const DEFAULT_SECRET_KEY: &str = "supersecretkey";

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub secret_key: String,
    pub access_token_ttl_minutes: i64,
    pub cors_origins: Vec<String>,
    pub frontend_url: String,
}

impl Config {
    pub fn load() -> Self {
        let secret_key = var("SECRET_KEY").unwrap_or_else(|_| {
            warn!("SECRET_KEY not set, signing tokens with the development key");
            DEFAULT_SECRET_KEY.to_string()
        });

        Self {
            port: try_load("PORT", "8000"),
            database_url: try_load("DATABASE_URL", "sqlite://./data/runmypool.db?mode=rwc"),
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5"),
            secret_key,
            access_token_ttl_minutes: try_load("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
            cors_origins: split_origins(&try_load::<String>("CORS_ORIGINS", "http://localhost:3000")),
            frontend_url: try_load("FRONTEND_URL", "http://localhost:3000"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
