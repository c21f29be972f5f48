use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use lobby_gateway::broadcaster::DEFAULT_PENDING_LIMIT;
use lobby_gateway::chat::DEFAULT_INACTIVITY;
use lobby_gateway::sweep::DEFAULT_SWEEP_INTERVAL;

pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub history_path: PathBuf,
    pub jwt_secret: String,
    pub inactivity: Duration,
    pub sweep_interval: Duration,
    /// Undrained messages kept for pollers of the shared buffer.
    pub pending_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = var("LOBBY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("LOBBY_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("LOBBY_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let history_path: PathBuf = var("LOBBY_HISTORY_PATH")
            .unwrap_or_else(|| "chat_history.json".into())
            .into();
        let jwt_secret = var("LOBBY_JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.into());

        let inactivity = secs(&var, "LOBBY_INACTIVITY_SECS")?.unwrap_or(DEFAULT_INACTIVITY);
        let sweep_interval =
            secs(&var, "LOBBY_SWEEP_INTERVAL_SECS")?.unwrap_or(DEFAULT_SWEEP_INTERVAL);

        let pending_limit = match var("LOBBY_PENDING_LIMIT") {
            Some(raw) => {
                let limit: usize = raw
                    .parse()
                    .context("LOBBY_PENDING_LIMIT must be a whole number")?;
                anyhow::ensure!(limit > 0, "LOBBY_PENDING_LIMIT must be greater than zero");
                limit
            }
            None => DEFAULT_PENDING_LIMIT,
        };

        Ok(Self {
            addr,
            history_path,
            jwt_secret,
            inactivity,
            sweep_interval,
            pending_limit,
        })
    }
}

fn secs(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    let Some(raw) = var(key) else {
        return Ok(None);
    };
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds", key))?;
    anyhow::ensure!(secs > 0, "{} must be greater than zero", key);
    Ok(Some(Duration::from_secs(secs)))
}
