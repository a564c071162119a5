use std::time::Duration;

use game_types::{ConfigError, env_flag, env_or, process_env};

pub const DEFAULT_DICTIONARY_API_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en/";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub dictionary_api_url: String,
    pub dictionary_timeout: Duration,
    pub reconcile_interval: Duration,
    pub room_code_attempts: usize,
    pub validate_guesses: bool,
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout_ms: u64 = env_or(&lookup, "DICTIONARY_TIMEOUT_MS", 3000)?;
        let reconcile_secs: u64 = env_or(&lookup, "RECONCILE_INTERVAL_SECS", 5)?;
        let room_code_attempts: usize = env_or(&lookup, "ROOM_CODE_ATTEMPTS", 5)?;

        if room_code_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "ROOM_CODE_ATTEMPTS".to_string(),
                value: "0".to_string(),
            });
        }
        if reconcile_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "RECONCILE_INTERVAL_SECS".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            dictionary_api_url: env_or(
                &lookup,
                "DICTIONARY_API_URL",
                DEFAULT_DICTIONARY_API_URL.to_string(),
            )?,
            dictionary_timeout: Duration::from_millis(timeout_ms),
            reconcile_interval: Duration::from_secs(reconcile_secs),
            room_code_attempts,
            validate_guesses: env_flag(&lookup, "VALIDATE_GUESSES", true)?,
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dictionary_api_url: DEFAULT_DICTIONARY_API_URL.to_string(),
            dictionary_timeout: Duration::from_millis(3000),
            reconcile_interval: Duration::from_secs(5),
            room_code_attempts: 5,
            validate_guesses: true,
        }
    }
}
