//! Session configuration types.
//!
//! [`SessionConfig`] is a plain struct with no environment reads; the
//! binary's CLI layer is responsible for populating it. The only logic here
//! is deriving the WebSocket endpoint from an HTTP(S) origin, which is how
//! deployments normally address the server: the qg backend serves its
//! WebSocket at `/api/<version>/ws` next to the pages it hosts.

use thiserror::Error;

/// Version segment of the WebSocket endpoint path.
pub const API_VERSION: &str = "v0";

/// Errors constructing a [`SessionConfig`] from an origin URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The origin does not start with `http://` or `https://`.
    #[error("unsupported origin scheme in {origin:?}: expected http:// or https://")]
    UnsupportedScheme { origin: String },
}

/// All runtime configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Full WebSocket URL of the qg server, e.g.
    /// `wss://quiz.example.com/api/v0/ws`.
    pub url: String,

    /// Capacity of the broadcast channel fanning events out to
    /// subscribers. A subscriber that falls further behind than this many
    /// notifications starts skipping (with a warning).
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Builds a config pointing at an explicit WebSocket URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event_capacity: 128,
        }
    }

    /// Derives the WebSocket URL from an HTTP(S) origin.
    ///
    /// `https` origins map to `wss`, `http` to `ws`; the endpoint path is
    /// `/api/v0/ws`.
    ///
    /// ```rust
    /// use qg_session::SessionConfig;
    ///
    /// let cfg = SessionConfig::for_origin("https://quiz.example.com").unwrap();
    /// assert_eq!(cfg.url, "wss://quiz.example.com/api/v0/ws");
    /// ```
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnsupportedScheme`] for non-HTTP(S) origins.
    pub fn for_origin(origin: &str) -> Result<Self, ConfigError> {
        let (scheme, rest) = if let Some(rest) = origin.strip_prefix("https://") {
            ("wss", rest)
        } else if let Some(rest) = origin.strip_prefix("http://") {
            ("ws", rest)
        } else {
            return Err(ConfigError::UnsupportedScheme {
                origin: origin.to_string(),
            });
        };

        let host = rest.trim_end_matches('/');
        Ok(Self::new(format!("{scheme}://{host}/api/{API_VERSION}/ws")))
    }
}

impl Default for SessionConfig {
    /// Points at a local development server.
    fn default() -> Self {
        Self::new(format!("ws://127.0.0.1:8080/api/{API_VERSION}/ws"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_origin_maps_to_wss() {
        let cfg = SessionConfig::for_origin("https://quiz.example.com").unwrap();
        assert_eq!(cfg.url, "wss://quiz.example.com/api/v0/ws");
    }

    #[test]
    fn test_http_origin_maps_to_ws() {
        let cfg = SessionConfig::for_origin("http://localhost:8080").unwrap();
        assert_eq!(cfg.url, "ws://localhost:8080/api/v0/ws");
    }

    #[test]
    fn test_trailing_slash_is_tolerated() {
        let cfg = SessionConfig::for_origin("http://localhost:8080/").unwrap();
        assert_eq!(cfg.url, "ws://localhost:8080/api/v0/ws");
    }

    #[test]
    fn test_non_http_scheme_is_rejected() {
        let result = SessionConfig::for_origin("ftp://example.com");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_default_points_at_local_dev_server() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.url, "ws://127.0.0.1:8080/api/v0/ws");
        assert_eq!(cfg.event_capacity, 128);
    }
}
