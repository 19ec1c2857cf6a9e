use std::path::PathBuf;
use std::time::Duration;

use super::types::AuthConfig;

pub const TOKEN_ENDPOINT_VAR: &str = "TESLA_AUTH_TOKEN_ENDPOINT";
pub const AUTHORIZE_ENDPOINT_VAR: &str = "TESLA_AUTH_AUTHORIZE_ENDPOINT";
pub const CALLBACK_TIMEOUT_VAR: &str = "TESLA_AUTH_CALLBACK_TIMEOUT_SECS";
pub const HOME_VAR: &str = "TESLA_AUTH_HOME";

impl AuthConfig {
    /// Defaults overlaid with `TESLA_AUTH_*` environment overrides.
    pub fn from_env() -> Self {
        Self::default().apply_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay overrides from an arbitrary lookup (the process environment in
    /// production, a map in tests). Empty values are treated as unset.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get(TOKEN_ENDPOINT_VAR) {
            self.token_endpoint = endpoint;
        }
        if let Some(endpoint) = get(AUTHORIZE_ENDPOINT_VAR) {
            self.authorize_endpoint = endpoint;
        }
        if let Some(raw) = get(CALLBACK_TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.callback_timeout = Duration::from_secs(secs),
                _ => tracing::warn!("Ignoring invalid {CALLBACK_TIMEOUT_VAR}={raw}"),
            }
        }
        self
    }
}

/// Directory holding the credential record: `$TESLA_AUTH_HOME` or `~/.tesla`.
pub fn storage_dir() -> PathBuf {
    resolve_storage_dir(std::env::var(HOME_VAR).ok(), dirs::home_dir())
}

fn resolve_storage_dir(override_dir: Option<String>, home: Option<PathBuf>) -> PathBuf {
    match override_dir.filter(|d| !d.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home.unwrap_or_else(|| PathBuf::from(".")).join(".tesla"),
    }
}
