use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use log::{log, Level};

pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_password: String,
    pub proof_dir: String,
    pub public_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL not set"))?,
            host: try_load("HACKWATCH_HOST", "0.0.0.0")?,
            port: try_load("HACKWATCH_PORT", "3000")?,
            admin_password: try_load("HACKWATCH_ADMIN_PASSWORD", "ffhacker2024")?,
            proof_dir: try_load("HACKWATCH_PROOF_DIR", "./proof-files")?,
            public_url: try_load("HACKWATCH_PUBLIC_URL", "http://localhost:3000")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        log!(Level::Info, "{key} not set, using default: {default}");
        default.to_string()
    });
    value
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value {value:?}: {e}"))
}
