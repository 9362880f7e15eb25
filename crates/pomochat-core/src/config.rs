//! Session configuration.

use url::Url;

use crate::{error::ConfigError, message::ParticipantId};

/// Chat endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/chat";

/// Close code sent on a user-initiated disconnect (normal closure).
pub const DEFAULT_CLOSE_CODE: u16 = 1000;

/// Close reason sent on a user-initiated disconnect.
pub const DEFAULT_CLOSE_REASON: &str = "User disconnected";

/// Query parameter naming the local participant.
pub const USER_ID_PARAM: &str = "userID";

/// Query parameter naming the remote participant.
pub const CHAT_WITH_ID_PARAM: &str = "chatWithID";

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Chat endpoint (`ws` or `wss`), without participant parameters.
    endpoint: Url,
    /// Close code for `disconnect`
    pub close_code: u16,
    /// Close reason for `disconnect`
    pub close_reason: String,
}

impl SessionConfig {
    /// Create a configuration for the given endpoint.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidEndpoint` if `endpoint` does not parse as a URL
    /// - `ConfigError::UnsupportedScheme` if the scheme is not `ws`/`wss`
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "ws" | "wss" => {},
            other => return Err(ConfigError::UnsupportedScheme { scheme: other.to_string() }),
        }

        Ok(Self {
            endpoint: url,
            close_code: DEFAULT_CLOSE_CODE,
            close_reason: DEFAULT_CLOSE_REASON.to_string(),
        })
    }

    /// Configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Endpoint URL for a conversation between `current` and `target`.
    ///
    /// Existing query parameters on the endpoint are kept.
    pub fn chat_url(&self, current: &ParticipantId, target: &ParticipantId) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(USER_ID_PARAM, current.as_str())
            .append_pair(CHAT_WITH_ID_PARAM, target.as_str());
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn default_config() -> SessionConfig {
        SessionConfig::new(DEFAULT_ENDPOINT).unwrap()
    }

    #[test]
    fn default_endpoint() {
        let config = default_config();
        assert_eq!(config.endpoint().as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.close_code, 1000);
        assert_eq!(config.close_reason, "User disconnected");
    }

    #[test]
    fn chat_url_embeds_both_participants() {
        let config = default_config();
        let url = config.chat_url(&id("alice"), &id("bob"));
        assert_eq!(url.as_str(), "ws://localhost:8000/chat?userID=alice&chatWithID=bob");
    }

    #[test]
    fn chat_url_escapes_identifiers() {
        let config = default_config();
        let url = config.chat_url(&id("a&b"), &id("c d"));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![
            ("userID".to_string(), "a&b".to_string()),
            ("chatWithID".to_string(), "c d".to_string()),
        ]);
    }

    #[test]
    fn chat_url_keeps_existing_query() {
        let config = SessionConfig::new("wss://chat.example.com/chat?v=2").unwrap();
        let url = config.chat_url(&id("alice"), &id("bob"));
        assert_eq!(url.as_str(), "wss://chat.example.com/chat?v=2&userID=alice&chatWithID=bob");
    }

    #[test]
    fn rejects_non_websocket_scheme() {
        assert_eq!(
            SessionConfig::new("http://localhost:8000/chat"),
            Err(ConfigError::UnsupportedScheme { scheme: "http".into() })
        );
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        assert!(matches!(
            SessionConfig::new("not a url"),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }
}
