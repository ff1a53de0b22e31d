/*
[INPUT]:  CLI arguments, optional configuration file, OS shutdown signals
[OUTPUT]: Wallet sign-in, session status, and profile commands
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or shutdown handling
*/

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clairvoyance_cli::{commands, App, CliConfig};

#[derive(Parser, Debug)]
#[command(name = "clairvoyance", version, about = "Clairvoyance wallet sign-in client")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List wallet providers and whether they are installed
    Wallets,
    /// Sign in by signing a server challenge with a wallet
    Login {
        /// Provider to use (Phantom or Solflare); prompts when omitted
        #[arg(long)]
        wallet: Option<String>,
    },
    /// Show the stored session
    Status,
    /// Re-fetch the signed-in profile
    Refresh,
    /// Answer the platform fee terms
    AcceptFees {
        #[arg(long)]
        reject: bool,
    },
    /// End the session and forget the stored token
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = CliConfig::load(args.config_path.as_deref()).context("load config")?;
    info!(
        api_url = %config.api_url,
        session_path = %config.session_path().display(),
        "configuration loaded"
    );
    let app = App::new(config)?;

    match args.command {
        Command::Wallets => commands::wallets(&app),
        Command::Login { wallet } => {
            let shutdown = CancellationToken::new();
            setup_signal_handlers(shutdown.clone());
            commands::login(&app, wallet, shutdown)
                .await
                .context("login")?;
        }
        Command::Status => commands::status(&app).await?,
        Command::Refresh => commands::refresh(&app).await?,
        Command::AcceptFees { reject } => commands::accept_fees(&app, !reject).await?,
        Command::Logout => commands::logout(&app).await,
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown.cancel();
    });
}
