use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth2/v3/token";

/// Mock token endpoint answering `grant_type` requests with `body`.
#[allow(dead_code)]
pub async fn start_token_server(grant_type: &str, status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains(format!("grant_type={grant_type}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

pub fn token_endpoint(server: &MockServer) -> String {
    format!("{}{TOKEN_PATH}", server.uri())
}
