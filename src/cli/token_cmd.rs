use std::io::Write;

use crate::cli::output::print_exp_info;
use crate::error::AuthError;
use crate::oauth::{AuthResult, OAuth2Client};

/// Report expiry and remaining life of the stored access token.
pub fn run_status(client: &OAuth2Client, out: &mut impl Write, is_tty: bool) -> Result<(), AuthError> {
    match client.get_jwt_exp_info(None) {
        Some(info) => print_exp_info(out, &info, "Expiration Time", "Life Remaining", is_tty),
        None => {
            writeln!(out, "No valid access token found.")?;
            Ok(())
        }
    }
}

/// Force a refresh and report the new token's expiry.
pub async fn run_refresh(
    client: &OAuth2Client,
    out: &mut impl Write,
    is_tty: bool,
) -> Result<(), AuthError> {
    if let AuthResult::Failure { error_message } = client.refresh_access_token().await {
        return Err(AuthError::Authentication(format!(
            "Failed to refresh token: {error_message}"
        )));
    }
    writeln!(out, "Access token refreshed successfully!")?;
    if let Some(info) = client.get_jwt_exp_info(None) {
        print_exp_info(out, &info, "New token expiration", "Life remaining", is_tty)?;
    }
    Ok(())
}

/// Print a usable access token for downstream tools, refreshing if needed.
pub async fn run_token(client: &OAuth2Client, out: &mut impl Write) -> Result<(), AuthError> {
    match client.get_access_token().await {
        Some(token) => {
            writeln!(out, "{token}")?;
            Ok(())
        }
        None => Err(AuthError::Authentication(
            "No access token available. Run: tesla-auth login".into(),
        )),
    }
}
