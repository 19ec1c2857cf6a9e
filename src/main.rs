use std::io::{self, Write};
use std::time::Duration;

use clap::{Parser, Subcommand};

use tesla_auth::cli::{setup, token_cmd};
use tesla_auth::oauth::{init_auth, LoginOptions};
use tesla_auth::prompt::is_tty_stdout;
use tesla_auth::{AuthConfig, AuthError, OAuth2Client, SecureStorage};

#[derive(Parser)]
#[command(name = "tesla-auth", version, about = "Tesla Fleet API OAuth2 authentication and token management")]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store VIN, proxy URL and client credentials
    Config,

    /// Run the OAuth2 login flow in the browser
    Login {
        /// Callback URI registered with the provider (skips the prompt)
        #[arg(long)]
        callback: Option<String>,

        /// Open the authorization URL without asking
        #[arg(long, conflicts_with = "no_browser")]
        browser: bool,

        /// Never open a browser; print the URL only
        #[arg(long)]
        no_browser: bool,

        /// Seconds to wait for the local callback
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Refresh the stored access token
    Refresh,

    /// Report token expiration time and life remaining
    Status,

    /// Print a valid access token, refreshing it if needed
    Token,

    /// Clear stored credentials
    Clear {
        /// Only remove the client id and secret
        #[arg(long)]
        client_only: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_env("TESLA_AUTH_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AuthError> {
    let storage = SecureStorage::open()?;
    let config = AuthConfig::from_env();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let is_tty = is_tty_stdout();

    match cli.command {
        Commands::Config => {
            writeln!(out, "Running configuration storage...")?;
            let stdin = io::stdin();
            setup::run_config_setup(&storage, &mut stdin.lock(), &mut out)
        }
        Commands::Login {
            callback,
            browser,
            no_browser,
            timeout,
        } => {
            let config = match timeout {
                Some(secs) => config.with_callback_timeout(Duration::from_secs(secs.max(1))),
                None => config,
            };
            let options = LoginOptions {
                callback_uri: callback,
                open_browser: if browser {
                    Some(true)
                } else if no_browser {
                    Some(false)
                } else {
                    None
                },
            };
            writeln!(out, "Running authentication flow...")?;
            let stdin = io::stdin();
            init_auth(storage, config, options, &mut stdin.lock(), &mut out).await
        }
        Commands::Refresh => {
            writeln!(out, "Refreshing access token...")?;
            let client = OAuth2Client::new(storage, config)?;
            token_cmd::run_refresh(&client, &mut out, is_tty).await
        }
        Commands::Status => {
            let client = OAuth2Client::new(storage, config)?;
            token_cmd::run_status(&client, &mut out, is_tty)
        }
        Commands::Token => {
            let client = OAuth2Client::new(storage, config)?;
            token_cmd::run_token(&client, &mut out).await
        }
        Commands::Clear { client_only } => setup::run_clear(&storage, client_only, &mut out),
    }
}
