use std::io::{BufRead, Write};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::error::AuthError;
use crate::oauth::client::OAuth2Client;
use crate::oauth::state::validate_state;
use crate::oauth::token::AuthResult;
use crate::prompt::prompt;

/// Served for every request, whatever the path, so a browser tab learns
/// nothing about the flow.
const RESPONSE_BODY: &str = "Authentication complete. Close this window.";

const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_REQUEST_BYTES: usize = 8192;

/// Query parameters carried by a provider redirect.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Extract `code`/`state`/`error` from the query of a URI or request path.
/// Empty values count as absent.
pub fn parse_callback_params(uri: &str) -> CallbackParams {
    let Some((_, query)) = uri.split_once('?') else {
        return CallbackParams::default();
    };
    let query = query.split('#').next().unwrap_or_default();

    let mut params = CallbackParams::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        let slot = match &*key {
            "code" => &mut params.code,
            "state" => &mut params.state,
            "error" => &mut params.error,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    params
}

/// Rebuild a redirect URI from the values captured by a receiver.
pub fn build_redirect_uri(callback_uri: &str, code: &str, state: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .append_pair("state", state)
        .finish();
    format!("{callback_uri}?{query}")
}

/// Port and path the local listener serves, taken from the callback URI.
pub fn listener_target(callback_uri: &str) -> Result<(u16, String), AuthError> {
    let url = url::Url::parse(callback_uri)
        .map_err(|e| AuthError::Config(format!("Invalid callback URI '{callback_uri}': {e}")))?;
    let port = url.port_or_known_default().ok_or_else(|| {
        AuthError::Config(format!("Callback URI '{callback_uri}' has no port"))
    })?;
    Ok((port, url.path().to_string()))
}

/// Handler state shared across requests of one listener run.
#[derive(Debug, Default)]
struct CallbackState {
    received: bool,
    result: Option<AuthResult>,
}

/// Bind the configured callback port and wait for the provider redirect.
pub async fn handle_local_callback(client: &OAuth2Client) -> Result<AuthResult, AuthError> {
    let (port, _) = listener_target(client.callback_uri())?;
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    debug!("Starting callback listener on port {port}");
    serve_callback(listener, client).await
}

/// Serve requests one at a time on `listener` until the callback path is hit
/// or the overall deadline passes. The listener is dropped on return, so no
/// second callback is ever processed.
pub async fn serve_callback(
    listener: TcpListener,
    client: &OAuth2Client,
) -> Result<AuthResult, AuthError> {
    let (_, callback_path) = listener_target(client.callback_uri())?;
    let timeout = client.config().callback_timeout;
    let poll_interval = client.config().poll_interval;
    let deadline = Instant::now() + timeout;
    let mut state = CallbackState::default();

    while !state.received {
        let now = Instant::now();
        if now >= deadline {
            error!("No callback received within {}s", timeout.as_secs());
            return Err(AuthError::Timeout { duration: timeout });
        }

        let poll = poll_interval.min(deadline - now);
        match tokio::time::timeout(poll, listener.accept()).await {
            Err(_) => continue,
            Ok(Err(e)) => warn!("Failed to accept callback connection: {e}"),
            Ok(Ok((stream, _))) => {
                handle_request(stream, &callback_path, deadline, client, &mut state).await;
            }
        }
    }

    Ok(state
        .result
        .unwrap_or_else(|| AuthResult::failure("Unknown error")))
}

async fn handle_request(
    mut stream: TcpStream,
    callback_path: &str,
    deadline: Instant,
    client: &OAuth2Client,
    state: &mut CallbackState,
) {
    let limit = REQUEST_READ_TIMEOUT.min(deadline.saturating_duration_since(Instant::now()));
    let request = match read_request(&mut stream, limit).await {
        Some(request) => request,
        None => return,
    };

    if let Err(e) = write_response(&mut stream).await {
        warn!("Failed to write callback response: {e}");
    }

    let Some(path) = request_path(&request) else {
        error!("Malformed callback request");
        state.result = Some(AuthResult::failure("Malformed callback request"));
        state.received = true;
        return;
    };

    if !path.starts_with(callback_path) {
        debug!("Ignoring request to {path}, waiting for {callback_path}");
        return;
    }

    let params = parse_callback_params(path);
    let received_state = params.state.unwrap_or_default();
    let result = if !validate_state(&received_state, &client.storage().retrieve_state()) {
        AuthResult::failure("State mismatch")
    } else {
        match params.code {
            Some(code) => {
                let redirect_uri = build_redirect_uri(client.callback_uri(), &code, &received_state);
                client.exchange_code_for_tokens(&redirect_uri).await
            }
            None => match params.error {
                Some(err) => AuthResult::failure(format!("Authorization denied: {err}")),
                None => AuthResult::failure("No code received"),
            },
        }
    };
    state.result = Some(result);
    state.received = true;
}

/// Read the request head within `limit`. `None` for connections that close
/// without sending anything or fail to finish their head in time.
async fn read_request(stream: &mut TcpStream, limit: Duration) -> Option<String> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let read_head = async {
        let mut len = 0;
        loop {
            match stream.read(&mut buf[len..]).await {
                Ok(0) => break,
                Ok(n) => {
                    len += n;
                    if len == buf.len() || buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Failed to read callback request: {e}");
                    break;
                }
            }
        }
        len
    };
    let len = match tokio::time::timeout(limit, read_head).await {
        Ok(len) => len,
        Err(_) => {
            debug!("Callback request not received within {}ms", limit.as_millis());
            return None;
        }
    };
    if len == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&buf[..len]).into_owned())
}

fn request_path(request: &str) -> Option<&str> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    let _method = parts.next()?;
    let path = parts.next()?;
    path.starts_with('/').then_some(path)
}

async fn write_response(stream: &mut TcpStream) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        RESPONSE_BODY.len(),
        RESPONSE_BODY
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Operator-paced fallback for custom callback URIs: ask for the `state`
/// and `code` seen in the browser's address bar. There is no deadline.
pub async fn handle_manual_callback(
    client: &OAuth2Client,
    reader: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<AuthResult, AuthError> {
    writeln!(
        out,
        "\nRedirect example: {}?code=abc123&state=xyz789",
        client.callback_uri()
    )?;
    let state = prompt(reader, out, "Enter the 'state' from the redirect URL: ")?;
    let code = prompt(reader, out, "Enter the 'code' from the redirect URL: ")?;

    if !validate_state(&state, &client.storage().retrieve_state()) {
        return Err(AuthError::Authentication(
            "State mismatch. Please try again.".into(),
        ));
    }

    let redirect_uri = build_redirect_uri(client.callback_uri(), &code, &state);
    Ok(client.exchange_code_for_tokens(&redirect_uri).await)
}
