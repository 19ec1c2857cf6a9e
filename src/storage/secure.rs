use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error};

use crate::config::env::storage_dir;
use crate::error::AuthError;

use super::fs::{ensure_private_dir, ensure_private_file, write_atomic};

pub const AUTH_FILE_NAME: &str = "auth_data.json";

/// Sorted so the file is written with deterministic key order.
type Record = BTreeMap<String, String>;

/// Named fields of the credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AccessToken,
    RefreshToken,
    ClientId,
    ClientSecret,
    OAuthState,
    Vin,
    ProxyUrl,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::AccessToken => "access_token",
            Field::RefreshToken => "refresh_token",
            Field::ClientId => "client_id",
            Field::ClientSecret => "client_secret",
            Field::OAuthState => "oauth_state",
            Field::Vin => "vin",
            Field::ProxyUrl => "proxy_url",
        }
    }
}

/// Credential record persisted as a flat JSON object in a private directory.
///
/// Every mutation is a full read-modify-write of the record. Reads that fail
/// (missing file, corrupt JSON) degrade to an empty record; writes propagate
/// their errors.
#[derive(Debug, Clone)]
pub struct SecureStorage {
    dir: PathBuf,
    path: PathBuf,
}

impl SecureStorage {
    /// Open the store in the default location (`$TESLA_AUTH_HOME` or `~/.tesla`).
    pub fn open() -> Result<Self, AuthError> {
        Self::open_in(storage_dir())
    }

    /// Open the store in `dir`, creating it and the record file if needed and
    /// repairing their permissions to owner-only on every call.
    pub fn open_in(dir: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let dir = dir.into();
        let path = dir.join(AUTH_FILE_NAME);
        ensure_private_dir(&dir)?;
        ensure_private_file(&path, &render(&Record::new())?)?;
        Ok(Self { dir, path })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&self) -> Record {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to read {}: {e}", self.path.display());
                return Record::new();
            }
        };
        match serde_json::from_str(&data) {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to parse {}: {e}", self.path.display());
                Record::new()
            }
        }
    }

    fn write_record(&self, record: &Record) -> Result<(), AuthError> {
        let data = render(record).map_err(|e| self.storage_error(e))?;
        write_atomic(&self.path, &data).inspect_err(|e| {
            error!("Failed to write to {}: {e}", self.path.display());
        })
    }

    fn storage_error(&self, err: AuthError) -> AuthError {
        match err {
            AuthError::Storage { detail, .. } => AuthError::Storage {
                path: self.path.clone(),
                detail,
            },
            other => other,
        }
    }

    /// Apply a batch of field changes in one read-modify-write cycle. `None`
    /// or a blank value removes the field.
    fn update(&self, changes: &[(Field, Option<&str>)]) -> Result<(), AuthError> {
        let mut record = self.read_record();
        for (field, value) in changes {
            match value.filter(|v| !v.trim().is_empty()) {
                Some(v) => {
                    record.insert(field.key().to_string(), v.to_string());
                }
                None => {
                    record.remove(field.key());
                }
            }
        }
        self.write_record(&record)
    }

    /// Set `field` to `value`; a blank value removes the field.
    pub fn store(&self, field: Field, value: &str) -> Result<(), AuthError> {
        self.update(&[(field, Some(value))])
    }

    /// Value of `field`, or an empty string when unset.
    pub fn retrieve(&self, field: Field) -> String {
        self.read_record().remove(field.key()).unwrap_or_default()
    }

    pub fn remove(&self, field: Field) -> Result<(), AuthError> {
        self.update(&[(field, None)])
    }

    pub fn store_access_token(&self, access_token: &str) -> Result<(), AuthError> {
        self.store(Field::AccessToken, access_token)
    }

    pub fn retrieve_access_token(&self) -> String {
        self.retrieve(Field::AccessToken)
    }

    pub fn store_refresh_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.store(Field::RefreshToken, refresh_token)
    }

    pub fn retrieve_refresh_token(&self) -> String {
        self.retrieve(Field::RefreshToken)
    }

    /// Store both halves of a token pair in a single write.
    pub fn store_token_pair(&self, access_token: &str, refresh_token: &str) -> Result<(), AuthError> {
        self.update(&[
            (Field::AccessToken, Some(access_token)),
            (Field::RefreshToken, Some(refresh_token)),
        ])
    }

    pub fn clear_token_pair(&self) -> Result<(), AuthError> {
        self.update(&[(Field::AccessToken, None), (Field::RefreshToken, None)])
    }

    pub fn store_client_id(&self, client_id: &str) -> Result<(), AuthError> {
        self.store(Field::ClientId, client_id)
    }

    pub fn retrieve_client_id(&self) -> String {
        self.retrieve(Field::ClientId)
    }

    pub fn store_client_secret(&self, client_secret: &str) -> Result<(), AuthError> {
        self.store(Field::ClientSecret, client_secret)
    }

    pub fn retrieve_client_secret(&self) -> String {
        self.retrieve(Field::ClientSecret)
    }

    pub fn clear_client_credentials(&self) -> Result<(), AuthError> {
        debug!("Clearing client credentials");
        self.update(&[(Field::ClientId, None), (Field::ClientSecret, None)])
    }

    pub fn store_state(&self, state: &str) -> Result<(), AuthError> {
        self.store(Field::OAuthState, state)
    }

    pub fn retrieve_state(&self) -> String {
        self.retrieve(Field::OAuthState)
    }

    pub fn clear_state(&self) -> Result<(), AuthError> {
        self.remove(Field::OAuthState)
    }

    pub fn store_vin(&self, vin: &str) -> Result<(), AuthError> {
        self.store(Field::Vin, vin)
    }

    pub fn retrieve_vin(&self) -> String {
        self.retrieve(Field::Vin)
    }

    /// Store the proxy URL without trailing slashes.
    pub fn store_proxy_url(&self, proxy_url: &str) -> Result<(), AuthError> {
        self.store(Field::ProxyUrl, proxy_url.trim_end_matches('/'))
    }

    pub fn retrieve_proxy_url(&self) -> String {
        self.retrieve(Field::ProxyUrl)
    }

    /// Reset the whole record to empty.
    pub fn clear_secure_storage(&self) -> Result<(), AuthError> {
        debug!("Clearing secure storage");
        self.write_record(&Record::new())
    }
}

/// Pretty-print with four-space indentation.
fn render(record: &Record) -> Result<String, AuthError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record.serialize(&mut ser).map_err(|e| AuthError::Storage {
        path: PathBuf::from(AUTH_FILE_NAME),
        detail: format!("Failed to serialize credential record: {e}"),
    })?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| AuthError::Storage {
        path: PathBuf::from(AUTH_FILE_NAME),
        detail: e.to_string(),
    })
}
