pub mod callback;
pub mod client;
pub mod flow;
pub mod jwt;
pub mod state;
pub mod token;

pub use callback::{
    build_redirect_uri, handle_local_callback, handle_manual_callback, parse_callback_params,
    serve_callback, CallbackParams,
};
pub use client::{OAuth2Client, TokenStatus, REFRESH_THRESHOLD_PERCENT};
pub use flow::{init_auth, process_auth_result, LoginOptions};
pub use jwt::JwtExpInfo;
pub use state::generate_state;
pub use token::{AuthResult, TokenPair};
