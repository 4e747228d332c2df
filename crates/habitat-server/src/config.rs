use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;

/// Secrets that ship in sample env files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["", "changeme", "change-me", "secret", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cron_secret: Option<String>,
    /// Seconds between in-process scheduler passes; 0 disables the loop.
    pub scheduler_interval_secs: u64,
    pub server_tz: Tz,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = var("HABITAT_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("HABITAT_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("HABITAT_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let jwt_secret = var("HABITAT_JWT_SECRET").context("HABITAT_JWT_SECRET must be set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("HABITAT_JWT_SECRET is a placeholder; set a real secret");
        }

        let cron_secret = var("HABITAT_CRON_SECRET").filter(|s| !s.trim().is_empty());

        let scheduler_interval_secs = var("HABITAT_SCHEDULER_INTERVAL_SECS")
            .unwrap_or_else(|| "300".into())
            .parse()
            .context("HABITAT_SCHEDULER_INTERVAL_SECS must be a whole number of seconds")?;

        let server_tz = match var("HABITAT_SERVER_TZ") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("HABITAT_SERVER_TZ: {}", e))?,
            None => chrono_tz::UTC,
        };

        Ok(Self {
            addr,
            db_path: PathBuf::from(var("HABITAT_DB_PATH").unwrap_or_else(|| "habitat.db".into())),
            jwt_secret,
            cron_secret,
            scheduler_interval_secs,
            server_tz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("HABITAT_JWT_SECRET", "s3cr3t-value")]).unwrap();
        assert_eq!(cfg.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(cfg.db_path, PathBuf::from("habitat.db"));
        assert_eq!(cfg.scheduler_interval_secs, 300);
        assert_eq!(cfg.server_tz, chrono_tz::UTC);
        assert!(cfg.cron_secret.is_none());
    }

    #[test]
    fn missing_or_placeholder_jwt_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("HABITAT_JWT_SECRET", "dev-secret-change-me")]).is_err());
        assert!(config(&[("HABITAT_JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("HABITAT_JWT_SECRET", "s3cr3t-value"),
            ("HABITAT_HOST", "127.0.0.1"),
            ("HABITAT_PORT", "8080"),
            ("HABITAT_CRON_SECRET", "cron"),
            ("HABITAT_SCHEDULER_INTERVAL_SECS", "0"),
            ("HABITAT_SERVER_TZ", "Europe/Paris"),
        ])
        .unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cfg.cron_secret.as_deref(), Some("cron"));
        assert_eq!(cfg.scheduler_interval_secs, 0);
        assert_eq!(cfg.server_tz, chrono_tz::Europe::Paris);
    }

    #[test]
    fn bad_timezone_is_an_error() {
        assert!(config(&[("HABITAT_JWT_SECRET", "s3cr3t-value"), ("HABITAT_SERVER_TZ", "Mars/Olympus")]).is_err());
    }
}
