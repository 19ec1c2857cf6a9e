use std::time::Duration;

use tracing::{debug, error};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::callback::parse_callback_params;
use crate::oauth::jwt::{self, JwtExpInfo};
use crate::oauth::state::{generate_state, validate_state};
use crate::oauth::token::{fetch_and_store_token_data, AuthResult};
use crate::storage::SecureStorage;

/// Below this share of its lifetime a cached access token gets refreshed.
pub const REFRESH_THRESHOLD_PERCENT: i64 = 20;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Freshness of the cached access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No complete token pair is stored.
    Missing,
    Fresh(JwtExpInfo),
    /// Below the refresh threshold, or the token could not be introspected.
    Stale(Option<JwtExpInfo>),
}

/// OAuth2 authorization-code client for a single provider, backed by the
/// credential store.
pub struct OAuth2Client {
    config: AuthConfig,
    storage: SecureStorage,
    http: reqwest::Client,
}

impl OAuth2Client {
    pub fn new(storage: SecureStorage, config: AuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .min_tls_version(reqwest::tls::Version::TLS_1_3)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            storage,
            http,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn storage(&self) -> &SecureStorage {
        &self.storage
    }

    pub fn callback_uri(&self) -> &str {
        &self.config.callback_uri
    }

    pub fn set_callback_uri(&mut self, callback_uri: impl Into<String>) {
        self.config.callback_uri = callback_uri.into();
    }

    /// Issue and persist a fresh state nonce, then build the authorization URL.
    pub fn initiate_auth_flow(&self) -> Result<String, AuthError> {
        let client_id = self.storage.retrieve_client_id();
        if client_id.is_empty() {
            debug!("Client ID is missing");
            return Err(AuthError::Config(
                "Client ID is missing. Run: tesla-auth config".into(),
            ));
        }

        let state = generate_state();
        self.storage.store_state(&state)?;

        let auth_url = self.authorization_url(&client_id, &state)?;
        debug!("Generated authorization URL");
        Ok(auth_url)
    }

    fn authorization_url(&self, client_id: &str, state: &str) -> Result<String, AuthError> {
        let params = [
            ("client_id", client_id),
            ("locale", self.config.locale.as_str()),
            ("prompt", "login"),
            ("redirect_uri", self.config.callback_uri.as_str()),
            ("response_type", "code"),
            ("scope", self.config.scope.as_str()),
            ("state", state),
        ];
        let url = url::Url::parse_with_params(&self.config.authorize_endpoint, params).map_err(
            |e| {
                AuthError::Config(format!(
                    "Invalid authorization endpoint '{}': {e}",
                    self.config.authorize_endpoint
                ))
            },
        )?;
        Ok(url.into())
    }

    /// Exchange the code carried by `redirect_uri` for a token pair. The
    /// stored state is consumed on a match and any cached pair is cleared
    /// before the network call.
    pub async fn exchange_code_for_tokens(&self, redirect_uri: &str) -> AuthResult {
        let params = parse_callback_params(redirect_uri);

        let Some(code) = params.code else {
            if let Some(err) = params.error {
                error!("Provider returned an error instead of a code: {err}");
                return AuthResult::failure(format!("Authorization denied: {err}"));
            }
            error!("Authorization code missing from callback URI");
            return AuthResult::failure("Authorization code missing from callback URI");
        };

        let Some(state) = params.state else {
            error!("Authorization state missing from callback URI");
            return AuthResult::failure("Authorization state missing from callback URI");
        };

        if !validate_state(&state, &self.storage.retrieve_state()) {
            return AuthResult::failure("State mismatch in OAuth callback");
        }
        if let Err(e) = self.storage.clear_state() {
            return AuthResult::failure(format!("Token exchange failed: {e}"));
        }

        let client_id = self.storage.retrieve_client_id();
        if client_id.is_empty() {
            return AuthResult::failure("Client ID is missing");
        }
        let client_secret = self.storage.retrieve_client_secret();
        if client_secret.is_empty() {
            return AuthResult::failure("Client Secret is missing");
        }

        if let Err(e) = self.storage.clear_token_pair() {
            return AuthResult::failure(format!("Token exchange failed: {e}"));
        }

        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("code", code.as_str()),
            ("audience", self.config.audience.as_str()),
            ("redirect_uri", self.config.callback_uri.as_str()),
        ];
        fetch_and_store_token_data(&self.http, &self.config.token_endpoint, &form, &self.storage)
            .await
    }

    /// Mint a new token pair from the stored refresh token.
    pub async fn refresh_access_token(&self) -> AuthResult {
        let client_id = self.storage.retrieve_client_id();
        if client_id.is_empty() {
            debug!("Client ID is missing");
            return AuthResult::failure("Client ID is missing");
        }
        let refresh_token = self.storage.retrieve_refresh_token();
        if refresh_token.is_empty() {
            debug!("Refresh token is missing");
            return AuthResult::failure("Refresh token is missing");
        }

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        let result =
            fetch_and_store_token_data(&self.http, &self.config.token_endpoint, &form, &self.storage)
                .await;
        if result.is_success() {
            debug!("Access token refreshed successfully");
        }
        result
    }

    pub fn token_status(&self) -> TokenStatus {
        let access_token = self.storage.retrieve_access_token();
        if access_token.is_empty() || self.storage.retrieve_refresh_token().is_empty() {
            return TokenStatus::Missing;
        }
        match jwt::exp_info(&access_token) {
            Some(info) if info.life_remaining >= REFRESH_THRESHOLD_PERCENT => {
                TokenStatus::Fresh(info)
            }
            other => TokenStatus::Stale(other),
        }
    }

    /// Current access token, refreshed first when stale. `None` when no
    /// usable token can be produced.
    pub async fn get_access_token(&self) -> Option<String> {
        match self.token_status() {
            TokenStatus::Missing => {
                debug!("Access or refresh token is missing");
                None
            }
            TokenStatus::Fresh(_) => Some(self.storage.retrieve_access_token()),
            TokenStatus::Stale(_) => {
                debug!("Token life below {REFRESH_THRESHOLD_PERCENT}%, refreshing");
                match self.refresh_access_token().await {
                    AuthResult::Success => {
                        let access_token = self.storage.retrieve_access_token();
                        if access_token.is_empty()
                            || self.storage.retrieve_refresh_token().is_empty()
                        {
                            debug!("New access or refresh token is missing");
                            return None;
                        }
                        Some(access_token)
                    }
                    AuthResult::Failure { error_message } => {
                        error!("Token refresh failed: {error_message}");
                        None
                    }
                }
            }
        }
    }

    /// Expiry info for `token`, or for the stored access token when `None`
    /// or empty.
    pub fn get_jwt_exp_info(&self, token: Option<&str>) -> Option<JwtExpInfo> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => jwt::exp_info(token),
            None => jwt::exp_info(&self.storage.retrieve_access_token()),
        }
    }
}
