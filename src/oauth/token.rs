use reqwest::StatusCode;
use tracing::{debug, error};

use crate::storage::SecureStorage;

/// Outcome of a code exchange or refresh. Expected protocol failures are
/// reported here rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Success,
    Failure { error_message: String },
}

impl AuthResult {
    pub fn failure(message: impl Into<String>) -> Self {
        AuthResult::Failure {
            error_message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AuthResult::Success => None,
            AuthResult::Failure { error_message } => Some(error_message),
        }
    }
}

/// A validated token-endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Sanity-checked only; expiry bookkeeping comes from the JWT `exp` claim.
    pub expires_in: i64,
}

/// Validate a token-endpoint body. Every field must be present before the
/// pair is accepted.
pub fn parse_token_response(body: &str) -> Result<TokenPair, String> {
    if body.trim().is_empty() {
        return Err("Empty response body".into());
    }

    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| format!("Failed to parse token response: {e}"))?;

    let string_field = |name: &str| {
        json.get(name)
            .and_then(serde_json::Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let access_token =
        string_field("access_token").ok_or("Access token is missing from response")?;
    let refresh_token =
        string_field("refresh_token").ok_or("Refresh token is missing from response")?;
    let token_type = string_field("token_type").ok_or("Token type is missing from response")?;

    let expires_in = json
        .get("expires_in")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0);
    if expires_in < 1 {
        return Err("Access token is expired".into());
    }

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type,
        expires_in,
    })
}

/// POST `form` to the token endpoint and, only if the response validates,
/// store both tokens in one write. Transport errors become failures.
pub async fn fetch_and_store_token_data(
    http: &reqwest::Client,
    token_endpoint: &str,
    form: &[(&str, &str)],
    storage: &SecureStorage,
) -> AuthResult {
    let resp = match http.post(token_endpoint).form(form).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Token endpoint request failed: {e}");
            return AuthResult::failure(format!("Token data fetch failed: {e}"));
        }
    };

    let status = resp.status();
    if status != StatusCode::OK {
        error!("Token endpoint returned status {status}");
        return AuthResult::failure(format!("Token data fetch failed: HTTP {status}"));
    }

    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to read token response body: {e}");
            return AuthResult::failure(format!("Token data fetch failed: {e}"));
        }
    };

    let pair = match parse_token_response(&body) {
        Ok(pair) => pair,
        Err(message) => {
            error!("Rejected token response: {message}");
            return AuthResult::failure(message);
        }
    };

    if let Err(e) = storage.store_token_pair(&pair.access_token, &pair.refresh_token) {
        return AuthResult::failure(format!("Token data fetch failed: {e}"));
    }
    debug!(
        token_type = %pair.token_type,
        expires_in = pair.expires_in,
        "Access and refresh tokens stored"
    );
    AuthResult::Success
}
