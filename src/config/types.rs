use std::time::Duration;

pub const AUTHORIZE_ENDPOINT: &str = "https://auth.tesla.com/oauth2/v3/authorize";
pub const TOKEN_ENDPOINT: &str = "https://auth.tesla.com/oauth2/v3/token";
pub const AUDIENCE: &str = "https://fleet-api.prd.na.vn.cloud.tesla.com";
pub const SCOPE: &str = "openid user_data vehicle_device_data vehicle_cmds vehicle_charging_cmds energy_device_data energy_cmds offline_access";
pub const LOCALE: &str = "en-US";

/// Callback served by the built-in local listener.
pub const DEFAULT_CALLBACK: &str = "http://localhost:8888/auth/callback";
pub const CALLBACK_PATH: &str = "/auth/callback";

pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Provider endpoints and flow parameters for one OAuth2 client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub audience: String,
    pub scope: String,
    pub locale: String,
    pub callback_uri: String,
    /// Overall deadline for the local callback listener.
    pub callback_timeout: Duration,
    /// Per-poll accept timeout; the deadline is re-checked between polls.
    pub poll_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authorize_endpoint: AUTHORIZE_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            audience: AUDIENCE.to_string(),
            scope: SCOPE.to_string(),
            locale: LOCALE.to_string(),
            callback_uri: DEFAULT_CALLBACK.to_string(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl AuthConfig {
    pub fn with_callback_uri(mut self, callback_uri: impl Into<String>) -> Self {
        self.callback_uri = callback_uri.into();
        self
    }

    pub fn with_token_endpoint(mut self, token_endpoint: impl Into<String>) -> Self {
        self.token_endpoint = token_endpoint.into();
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Whether the configured callback is the one the local listener serves.
    pub fn uses_local_listener(&self) -> bool {
        self.callback_uri == DEFAULT_CALLBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_production_endpoints() {
        let config = AuthConfig::default();
        assert_eq!(config.authorize_endpoint, AUTHORIZE_ENDPOINT);
        assert_eq!(config.token_endpoint, TOKEN_ENDPOINT);
        assert_eq!(config.callback_uri, DEFAULT_CALLBACK);
        assert_eq!(config.callback_timeout, Duration::from_secs(60));
        assert!(config.scope.contains("offline_access"));
    }

    #[test]
    fn default_callback_uses_local_listener() {
        assert!(AuthConfig::default().uses_local_listener());
    }

    #[test]
    fn custom_callback_uses_manual_entry() {
        let config =
            AuthConfig::default().with_callback_uri("https://example.com/auth/callback");
        assert!(!config.uses_local_listener());
    }

    #[test]
    fn default_callback_path_matches_constant() {
        assert!(DEFAULT_CALLBACK.ends_with(CALLBACK_PATH));
    }
}
