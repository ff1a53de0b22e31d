/*
[INPUT]:  Parsed subcommand, CLI configuration, shutdown token
[OUTPUT]: Session changes on disk and console output
[POS]:    CLI command layer - wires the session and selection flow to the terminal
[UPDATE]: When adding subcommands or changing their output
*/

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clairvoyance_auth::flow::truncate_address;
use clairvoyance_auth::{
    ApiClient, FileSessionStore, SessionHandle, SessionPhase, User, WalletCapability,
    WalletSelectionFlow,
};
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CliConfig;
use crate::prompt::{TerminalInstallPrompt, choose_wallet, option_label};
use crate::wallets::build_wallets;

/// Session, wallets, and store assembled from configuration
pub struct App {
    config: CliConfig,
    session: SessionHandle,
}

impl App {
    pub fn new(config: CliConfig) -> Result<Self> {
        let client = ApiClient::with_config(config.client_config()).context("create API client")?;
        let wallets = WalletCapability::new(build_wallets(&config));
        let store = Arc::new(FileSessionStore::new(config.session_path()));
        let session = SessionHandle::new(client, wallets, store);
        Ok(Self { config, session })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn flow(&self) -> WalletSelectionFlow {
        WalletSelectionFlow::new(self.session.clone(), Arc::new(TerminalInstallPrompt))
    }

    /// Reconnect the default wallet for returning sessions, then bootstrap
    pub async fn start(&self) -> SessionPhase {
        if let (true, Some(name)) = (self.session.should_auto_connect(), &self.config.default_wallet) {
            match self.session.wallet().auto_connect(name).await {
                Ok(connected) => debug!(wallet = %name, connected, "wallet auto-connect"),
                Err(err) => warn!(wallet = %name, error = %err, "wallet auto-connect failed"),
            }
        }
        let phase = self.session.bootstrap().await;
        debug!(?phase, "session bootstrapped");
        phase
    }
}

pub fn wallets(app: &App) {
    println!("{}", style("Wallets").bold().cyan());
    for option in app.flow().options() {
        println!("  {}  {}", option_label(&option), style(option.url).dim());
        if option.installed {
            println!("    key: {}", app.config.keypair_path(option.name).display());
        }
    }
}

/// Run the wallet selection flow until authenticated, failed, or interrupted.
///
/// Without `wallet` the user is prompted, and may pick again after a failure.
pub async fn login(app: &App, wallet: Option<String>, shutdown: CancellationToken) -> Result<()> {
    app.start().await;
    if let Some(user) = signed_in_user(&app.session) {
        println!("Already signed in as {}", style(truncate_address(&user.wallet_address)).green());
        return Ok(());
    }

    let flow = app.flow();
    flow.open();

    let watchers = shutdown.child_token();
    let auto_login = app.session.spawn_auto_login(watchers.clone());
    let flow_task = {
        let flow = flow.clone();
        let watchers = watchers.clone();
        tokio::spawn(async move { flow.run(watchers).await })
    };

    let interactive = wallet.is_none() && app.config.default_wallet.is_none();
    let mut choice = wallet.or_else(|| app.config.default_wallet.clone());
    let mut rx = flow.subscribe();
    let mut session_rx = app.session.subscribe();

    let result = loop {
        let name = match choice.take() {
            Some(name) => name,
            None => match choose_wallet(flow.options()).await {
                Ok(Some(name)) => name.to_string(),
                Ok(None) => break Err(anyhow!("wallet selection cancelled")),
                Err(err) => break Err(err),
            },
        };

        if let Err(err) = flow.select(&name).await {
            print_error(&err.to_string());
            if interactive {
                continue;
            }
            break Err(err.into());
        }

        let state = flow.state();
        if state.open && state.connecting.is_none() && state.error.is_none() {
            if app.session.is_authenticated() {
                break Ok(());
            }
            debug!(wallet = %name, "selection ignored");
            if interactive {
                continue;
            }
            break Err(anyhow!("wallet selection was ignored; try again"));
        }

        tokio::select! {
            _ = shutdown.cancelled() => break Err(anyhow!("interrupted")),
            changed = rx.wait_for(|state| !state.open || (state.connecting.is_none() && state.error.is_some())) => {
                if changed.is_err() {
                    break Err(anyhow!("wallet selection stopped"));
                }
            }
            changed = session_rx.wait_for(|snapshot| snapshot.is_authenticated()) => {
                if changed.is_err() {
                    break Err(anyhow!("session stopped"));
                }
            }
        }

        let state = flow.state();
        if !state.open || app.session.is_authenticated() {
            break Ok(());
        }
        let message = state.error.unwrap_or_else(|| "Failed to connect wallet".to_string());
        print_error(&message);
        if !interactive {
            break Err(anyhow!(message));
        }
    };

    watchers.cancel();
    for task in [auto_login, flow_task] {
        if let Err(err) = task.await {
            warn!(error = %err, "watcher task failed");
        }
    }

    result?;
    let user = signed_in_user(&app.session).context("session ended before login completed")?;
    info!(wallet = %user.wallet_address, "signed in");
    println!("{} Signed in", style("✓").green().bold());
    print_user(&user);
    Ok(())
}

pub async fn status(app: &App) -> Result<()> {
    let phase = app.start().await;
    let connection = app.session.wallet().connection();
    if let (Some(name), Some(key)) = (&connection.wallet, &connection.public_key) {
        println!("Wallet: {} ({})", name, truncate_address(key));
    }

    match signed_in_user(&app.session) {
        Some(user) => print_user(&user),
        None => println!("Signed out ({:?})", phase),
    }
    Ok(())
}

pub async fn refresh(app: &App) -> Result<()> {
    app.start().await;
    if signed_in_user(&app.session).is_none() {
        bail!("not signed in");
    }

    match app.session.refresh_user().await.context("refresh profile")? {
        Some(user) => print_user(&user),
        None => println!("Session changed during refresh; nothing applied"),
    }
    Ok(())
}

pub async fn accept_fees(app: &App, accepted: bool) -> Result<()> {
    app.start().await;
    let user = app
        .session
        .accept_fees(accepted)
        .await
        .context("record fee answer")?;
    let verdict = if user.fee_accepted { "accepted" } else { "declined" };
    println!("Fees {}", style(verdict).bold());
    Ok(())
}

pub async fn logout(app: &App) {
    app.session.logout();
    // let the background wallet disconnect run before the runtime stops
    tokio::task::yield_now().await;
    println!("Signed out");
}

fn signed_in_user(session: &SessionHandle) -> Option<User> {
    let snapshot = session.snapshot();
    if snapshot.is_authenticated() { snapshot.user } else { None }
}

fn print_error(message: &str) {
    println!("{} {}", style("✗").red().bold(), message);
}

fn print_user(user: &User) {
    println!(
        "Account: {} ({})",
        style(truncate_address(&user.wallet_address)).bold(),
        user.wallet_address
    );
    if let Some(created) = user.created_at_utc() {
        println!("Member since: {}", created.format("%Y-%m-%d"));
    }
    println!("Fees accepted: {}", user.fee_accepted);
    if let Some(balance) = &user.balance {
        println!("Balance: simulation {} | real {}", balance.simulation, balance.real);
    }
    if let Some(stats) = &user.stats {
        println!(
            "Trades: {} | win rate {}% | profit {}",
            stats.total_trades, stats.win_rate, stats.total_profit
        );
    }
}
