pub mod output;
pub mod setup;
pub mod token_cmd;
