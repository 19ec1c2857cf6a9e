pub mod fs;
pub mod secure;

pub use secure::{Field, SecureStorage, AUTH_FILE_NAME};
