use anyhow::{Context, Result};
use std::net::SocketAddr;

/// Default maximum accepted image size in megabytes.
pub const DEFAULT_MAX_SIZE_MB: u64 = 10;

/// Default bind host/port for the health listener.
pub const DEFAULT_HEALTH_HOST: &str = "0.0.0.0";
pub const DEFAULT_HEALTH_PORT: u16 = 8000;

/// Immutable service configuration, read once from the environment at
/// startup. Missing credentials abort startup; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub imgbb_api_key: String,
    pub max_size_mb: u64,
    pub upload_url: String,
    pub health_host: String,
    pub health_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `BOT_TOKEN` and `IMGBB_API_KEY` are mandatory. `MAX_SIZE_MB`,
    /// `IMGBB_UPLOAD_URL`, `HEALTH_HOST`, and `HEALTH_PORT` are optional
    /// overrides.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bot_token: require("BOT_TOKEN")?,
            imgbb_api_key: require("IMGBB_API_KEY")?,
            max_size_mb: parse_var("MAX_SIZE_MB", DEFAULT_MAX_SIZE_MB)?,
            upload_url: std::env::var("IMGBB_UPLOAD_URL")
                .unwrap_or_else(|_| crate::imgbb::DEFAULT_UPLOAD_URL.to_string()),
            health_host: std::env::var("HEALTH_HOST")
                .unwrap_or_else(|_| DEFAULT_HEALTH_HOST.to_string()),
            health_port: parse_var("HEALTH_PORT", DEFAULT_HEALTH_PORT)?,
        })
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }

    pub fn health_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.health_host, self.health_port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid health listener address {}:{}",
                    self.health_host, self.health_port
                )
            })
    }
}

fn require(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => anyhow::bail!("{name} must be set"),
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            bot_token: "123:abc".into(),
            imgbb_api_key: "key".into(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            upload_url: crate::imgbb::DEFAULT_UPLOAD_URL.into(),
            health_host: "127.0.0.1".into(),
            health_port: 8000,
        }
    }

    #[test]
    fn max_size_converts_to_bytes() {
        assert_eq!(config().max_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn health_addr_parses() {
        assert_eq!(
            config().health_addr().unwrap(),
            "127.0.0.1:8000".parse().unwrap()
        );
    }

    #[test]
    fn bad_host_is_an_error() {
        let mut cfg = config();
        cfg.health_host = "not a host".into();
        assert!(cfg.health_addr().is_err());
    }
}
