/*
[INPUT]:  Optional YAML/TOML file, CLAIRVOYANCE_* environment variables
[OUTPUT]: Parsed CLI configuration
[POS]:    Configuration layer - endpoint, session file, wallet key files
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clairvoyance_auth::ClientConfig;
use clairvoyance_auth::http::client::DEFAULT_BASE_URL;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "clairvoyance";

/// Top-level configuration for the `clairvoyance` binary
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Base URL of the auth API
    pub api_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Where the bearer token is kept between runs
    pub session_path: Option<PathBuf>,
    /// Keypair file standing in for the Phantom extension
    pub phantom_keypair: Option<PathBuf>,
    /// Keypair file standing in for the Solflare extension
    pub solflare_keypair: Option<PathBuf>,
    /// Provider reconnected automatically for returning sessions
    pub default_wallet: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            session_path: None,
            phantom_keypair: None,
            solflare_keypair: None,
            default_wallet: None,
        }
    }
}

impl CliConfig {
    /// Load from an optional file, then `CLAIRVOYANCE_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(Environment::with_prefix("CLAIRVOYANCE").try_parsing(true))
            .build()
            .context("read configuration")?
            .try_deserialize()
            .context("parse configuration")
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| app_dir().join("session.json"))
    }

    /// Key file backing `wallet`; defaults to `<config dir>/clairvoyance/<wallet>.json`
    pub fn keypair_path(&self, wallet: &str) -> PathBuf {
        let configured = match wallet {
            "Phantom" => self.phantom_keypair.clone(),
            "Solflare" => self.solflare_keypair.clone(),
            _ => None,
        };
        configured.unwrap_or_else(|| app_dir().join(format!("{}.json", wallet.to_ascii_lowercase())))
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
