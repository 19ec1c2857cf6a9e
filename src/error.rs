use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Timed out waiting for OAuth callback after {}s", .duration.as_secs())]
    Timeout { duration: Duration },

    #[error("Storage error in {}: {detail}", path.display())]
    Storage { path: PathBuf, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Error code string for scripted output.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Config(_) => "config_error",
            AuthError::Authentication(_) => "auth_error",
            AuthError::Timeout { .. } => "timeout",
            AuthError::Storage { .. } => "storage_error",
            AuthError::Io(_) => "io_error",
        }
    }
}
