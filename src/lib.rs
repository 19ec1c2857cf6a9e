pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;
pub mod prompt;
pub mod storage;

pub use config::AuthConfig;
pub use error::AuthError;
pub use oauth::{AuthResult, JwtExpInfo, OAuth2Client};
pub use storage::SecureStorage;
