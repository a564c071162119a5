use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use game_core::{AcceptAll, GuessValidator, is_playable_word};
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::SessionConfig;

/// Checks guesses against a public dictionary HTTP API.
///
/// `GET {base_url}{word}` answering 2xx means the word exists and 404 means
/// it does not. A transport failure, timeout, 5xx or 429 accepts the word,
/// so a struggling dictionary never blocks play. Other statuses reject.
/// Only 2xx and 404 answers are cached.
pub struct DictionaryValidator {
    client: Client,
    base_url: String,
    cache: RwLock<HashMap<String, bool>>,
}

impl DictionaryValidator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build dictionary client, using defaults: {:?}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.dictionary_api_url.clone(), config.dictionary_timeout)
    }

    /// The validator a session should use: the dictionary, or any
    /// well-formed word when `VALIDATE_GUESSES` is off.
    pub fn for_config(config: &SessionConfig) -> Arc<dyn GuessValidator> {
        if config.validate_guesses {
            Arc::new(Self::from_config(config))
        } else {
            Arc::new(AcceptAll)
        }
    }

    /// Returns the verdict and whether it may be cached.
    async fn lookup(&self, word: &str) -> (bool, bool) {
        let url = format!("{}{}", self.base_url, word);
        debug!("Dictionary lookup: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Dictionary request failed, accepting {}: {:?}", word, e);
                return (true, false);
            }
        };

        let status = response.status();
        if status.is_success() {
            (true, true)
        } else if status == StatusCode::NOT_FOUND {
            (false, true)
        } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Dictionary returned {}, accepting {}", status, word);
            (true, false)
        } else {
            warn!("Dictionary returned {} for {}", status, word);
            (false, false)
        }
    }
}

#[async_trait]
impl GuessValidator for DictionaryValidator {
    async fn is_valid_guess(&self, word: &str) -> bool {
        if !is_playable_word(word) {
            return false;
        }
        let word = word.trim().to_ascii_lowercase();

        {
            let cache = self.cache.read().await;
            if let Some(&valid) = cache.get(&word) {
                return valid;
            }
        }

        let (valid, cacheable) = self.lookup(&word).await;
        if cacheable {
            self.cache.write().await.insert(word, valid);
        }
        valid
    }
}
