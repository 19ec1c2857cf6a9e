pub mod http_mock;

use std::time::Duration;

use tesla_auth::{AuthConfig, OAuth2Client, SecureStorage};

pub const CALLBACK: &str = "http://localhost:8888/auth/callback";

/// Temp-dir storage with client credentials configured.
pub fn configured_storage() -> (tempfile::TempDir, SecureStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SecureStorage::open_in(dir.path().join(".tesla")).unwrap();
    storage.store_client_id("client-id").unwrap();
    storage.store_client_secret("client-secret").unwrap();
    (dir, storage)
}

/// Client whose token endpoint points at `token_endpoint`.
pub fn client_for(storage: SecureStorage, token_endpoint: &str) -> OAuth2Client {
    let config = AuthConfig::default()
        .with_token_endpoint(token_endpoint)
        .with_callback_timeout(Duration::from_secs(5));
    OAuth2Client::new(storage, config).unwrap()
}

/// Unsigned JWT whose remaining life is roughly `percent` of a 1000s window.
pub fn token_with_life(percent: i64) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let now = chrono::Utc::now().timestamp();
    let exp = now + percent * 10;
    let iat = exp - 1000;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({"iat": iat, "exp": exp}).to_string());
    format!("{header}.{payload}.sig")
}
