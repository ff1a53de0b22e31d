/*
[INPUT]:  Wallet options and user input via terminal
[OUTPUT]: Chosen provider, install hints
[POS]:    CLI interactive prompts - terminal rendering of the wallet modal
[UPDATE]: When the modal rows or prompt wording change
*/

use anyhow::{Context, Result};
use clairvoyance_auth::{InstallPrompt, WalletOption};
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};
use tracing::info;

/// Prints the install page instead of opening a browser
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalInstallPrompt;

impl InstallPrompt for TerminalInstallPrompt {
    fn open_install_page(&self, wallet: &str, url: &str) {
        info!(%wallet, %url, "wallet not installed");
        println!(
            "{} {} is not installed. Get it at {}",
            style("!").yellow().bold(),
            wallet,
            style(url).underlined()
        );
    }
}

/// Terminal label of one modal row
pub fn option_label(option: &WalletOption) -> String {
    let marker = if option.installed {
        style("installed").green().to_string()
    } else {
        style("not installed").dim().to_string()
    };
    format!("{} ({})", option.name, marker)
}

/// Run a blocking terminal prompt on the blocking pool
pub async fn blocking_prompt<T, F>(prompt: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(prompt)
        .await
        .context("prompt task failed")?
}

/// Ask which provider to use. `None` when the user backs out.
pub async fn choose_wallet(options: Vec<WalletOption>) -> Result<Option<&'static str>> {
    blocking_prompt(move || pick_wallet(&options)).await
}

fn pick_wallet(options: &[WalletOption]) -> Result<Option<&'static str>> {
    let theme = ColorfulTheme::default();
    println!("{}", style("Connect Wallet").bold().cyan());
    println!("Choose a wallet to connect to Clairvoyance");

    let items: Vec<String> = options.iter().map(option_label).collect();
    let selection = Select::with_theme(&theme)
        .with_prompt("Select wallet")
        .items(&items)
        .default(0)
        .interact_opt()?;

    Ok(selection.map(|idx| options[idx].name))
}
