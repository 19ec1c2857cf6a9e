use std::io::{BufRead, Write};

use tracing::{debug, error, warn};

use crate::config::{AuthConfig, DEFAULT_CALLBACK};
use crate::error::AuthError;
use crate::oauth::callback::{handle_local_callback, handle_manual_callback};
use crate::oauth::client::OAuth2Client;
use crate::oauth::token::AuthResult;
use crate::prompt::{confirm, prompt_with_default};
use crate::storage::SecureStorage;

const PROMPT_CALLBACK: &str = "Enter a custom callback URL or press Enter to use the default: ";
const PROMPT_LAUNCH: &str = "Would you like to launch the URL in your browser? [Y/n]: ";

/// Answers supplied up front instead of prompting.
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    pub callback_uri: Option<String>,
    pub open_browser: Option<bool>,
}

/// Run the full login: choose the callback, issue the authorization URL,
/// optionally open it, wait for the redirect, and exchange the code.
pub async fn init_auth(
    storage: SecureStorage,
    config: AuthConfig,
    options: LoginOptions,
    reader: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), AuthError> {
    writeln!(out, "Default callback: {DEFAULT_CALLBACK} (local server)")?;
    let callback_uri = match options.callback_uri {
        Some(uri) => uri,
        None => prompt_with_default(reader, out, PROMPT_CALLBACK, DEFAULT_CALLBACK)?,
    };

    let client = OAuth2Client::new(storage, config.with_callback_uri(callback_uri))?;

    let auth_url = client.initiate_auth_flow()?;
    writeln!(out, "Authorization URL: {auth_url}")?;

    let launch = match options.open_browser {
        Some(launch) => launch,
        None => confirm(reader, out, PROMPT_LAUNCH)?,
    };
    if launch {
        debug!("Launching browser");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!("Could not open browser automatically: {e}");
            writeln!(out, "Could not open a browser. Please visit the URL above.")?;
        }
        writeln!(
            out,
            "Authenticate in your browser and return here if using a custom callback."
        )?;
    }

    let result = if client.config().uses_local_listener() {
        writeln!(
            out,
            "Waiting for callback on {} (timeout in {}s)...",
            client.callback_uri(),
            client.config().callback_timeout.as_secs()
        )?;
        out.flush()?;
        handle_local_callback(&client).await?
    } else {
        handle_manual_callback(&client, reader, out).await?
    };

    process_auth_result(result, out)
}

/// Report an exchange outcome; failures become authentication errors.
pub fn process_auth_result(result: AuthResult, out: &mut impl Write) -> Result<(), AuthError> {
    match result {
        AuthResult::Success => {
            debug!("Successfully exchanged code for tokens");
            writeln!(out, "Authentication successful! Tokens stored.")?;
            Ok(())
        }
        AuthResult::Failure { error_message } => {
            error!("Token exchange failed: {error_message}");
            Err(AuthError::Authentication(error_message))
        }
    }
}
