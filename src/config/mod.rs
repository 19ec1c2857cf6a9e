pub mod env;
pub mod types;

pub use env::storage_dir;
pub use types::{AuthConfig, CALLBACK_PATH, DEFAULT_CALLBACK};
