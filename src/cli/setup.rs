use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::AuthError;
use crate::prompt::prompt;
use crate::storage::SecureStorage;

/// Interactive setup: store VIN, proxy URL and client credentials. A blank
/// answer removes the stored value.
pub fn run_config_setup(
    storage: &SecureStorage,
    reader: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), AuthError> {
    let vin = prompt(reader, out, "Enter Vehicle Identification Number (VIN): ")?;
    storage.store_vin(&vin)?;
    debug!("Stored VIN");

    let proxy_url = prompt(reader, out, "Enter Proxy URL: ")?;
    storage.store_proxy_url(&proxy_url)?;
    debug!("Stored proxy URL");

    let client_id = prompt(reader, out, "Enter Client ID: ")?;
    storage.store_client_id(&client_id)?;
    debug!("Stored client ID");

    let client_secret = prompt(reader, out, "Enter Client Secret: ")?;
    storage.store_client_secret(&client_secret)?;
    debug!("Stored client secret");

    writeln!(out, "Configuration stored successfully.")?;
    Ok(())
}

/// Clear the whole credential record, or only the client credentials.
pub fn run_clear(
    storage: &SecureStorage,
    client_only: bool,
    out: &mut impl Write,
) -> Result<(), AuthError> {
    if client_only {
        storage.clear_client_credentials()?;
        writeln!(out, "Client credentials cleared.")?;
    } else {
        storage.clear_secure_storage()?;
        writeln!(out, "Secure storage cleared.")?;
    }
    Ok(())
}
