use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use anyhow::anyhow;

pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Postgres connection string. Without one the server keeps everything
    /// in memory.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            host: try_load("ELEARNING_HOST", "127.0.0.1")?,
            port: try_load("ELEARNING_PORT", "5000")?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
        })
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        log::info!("{} not set, using default: {}", key, default);
        default.to_string()
    });
    parse(key, &raw)
}

fn parse<T: FromStr>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| anyhow!("Invalid {} value `{}`: {}", key, raw, e))
}
