use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::crypto::password::HashCost;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// The maximum number of pooled database connections.
    pub db_pool_size: usize,
    /// The secret used to sign session tokens.
    pub secret_key: Zeroizing<String>,
    /// The `Domain` attribute for the session cookie.
    pub cookie_domain: Option<String>,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
    /// Argon2 cost parameters for new password hashes.
    pub hash_cost: HashCost,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let secret_key = Zeroizing::new(
            get("SECRET_KEY")
                .context("SECRET_KEY must be set (generate with: openssl rand -hex 32)")?,
        );

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: parse_or(get("ARGON2_MEMORY_KIB"), defaults.memory_kib)
                .context("Invalid ARGON2_MEMORY_KIB")?,
            iterations: parse_or(get("ARGON2_ITERATIONS"), defaults.iterations)
                .context("Invalid ARGON2_ITERATIONS")?,
            parallelism: parse_or(get("ARGON2_PARALLELISM"), defaults.parallelism)
                .context("Invalid ARGON2_PARALLELISM")?,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            db_pool_size: parse_or(get("DB_POOL_SIZE"), 16).context("Invalid DB_POOL_SIZE")?,
            secret_key,
            cookie_domain: get("COOKIE_DOMAIN"),
            bind_addr: get("BIND_ADDR")
                .unwrap_or_else(|| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            cors_origins: get("CORS_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            hash_cost,
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => Ok(raw.trim().parse()?),
        None => Ok(default),
    }
}
