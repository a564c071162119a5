use std::time::Duration;

use game_types::{ConfigError, env_or, process_env};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_refill: Duration,
    pub connection_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let rate_limit_burst: u32 = env_or(&lookup, "RATE_LIMIT_BURST", 60)?;
        let refill_ms: u64 = env_or(&lookup, "RATE_LIMIT_REFILL_MS", 250)?;
        let timeout_secs: u64 = env_or(&lookup, "CONNECTION_TIMEOUT_SECONDS", 300)?;

        if rate_limit_burst == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_BURST".to_string(),
                value: "0".to_string(),
            });
        }
        if refill_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_REFILL_MS".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host: env_or(&lookup, "HOST", "127.0.0.1".to_string())?,
            port: env_or(&lookup, "PORT", 8080)?,
            rate_limit_burst,
            rate_limit_refill: Duration::from_millis(refill_ms),
            connection_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit_burst: 60,
            rate_limit_refill: Duration::from_millis(250),
            connection_timeout: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_limit_burst, 60);
        assert_eq!(config.rate_limit_refill, Duration::from_millis(250));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = ServerConfig::from_lookup(|key: &str| match key {
            "HOST" => Some("0.0.0.0".to_string()),
            "PORT" => Some(" 9001 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9001);

        let err = ServerConfig::from_lookup(|key: &str| {
            (key == "PORT").then(|| "eighty".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT".to_string(),
                value: "eighty".to_string()
            }
        );

        assert!(
            ServerConfig::from_lookup(|key: &str| (key == "RATE_LIMIT_REFILL_MS")
                .then(|| "0".to_string()))
            .is_err()
        );
    }
}
