/*
[INPUT]:  Solana key pair file (JSON byte array or base58 string)
[OUTPUT]: Base58 public key and ed25519 message signatures
[POS]:    Auth layer - local-key wallet provider for native clients
[UPDATE]: When key file formats or Solana SDK version change
*/

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use solana_keypair::Keypair;
use solana_signer::Signer;
use tracing::debug;

use crate::auth::wallet::WalletAdapter;
use crate::http::{ClairvoyanceError, Result};

/// Wallet backed by a Solana key pair file on disk
///
/// The file is the "installed" marker: the provider counts as installed when
/// the file exists, and the key is only read on `connect`.
pub struct KeypairWallet {
    name: String,
    url: String,
    path: PathBuf,
    keypair: Mutex<Option<Keypair>>,
}

impl KeypairWallet {
    pub fn new(name: &str, url: &str, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            path: path.as_ref().to_path_buf(),
            keypair: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse a key pair from the Solana CLI JSON format or a base58 string.
///
/// Only full 64-byte key pairs are accepted.
pub fn parse_keypair(content: &str) -> Result<Keypair> {
    let content = content.trim();
    let bytes = if content.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(content)
            .map_err(|e| ClairvoyanceError::Config(format!("Invalid key pair JSON: {e}")))?
    } else {
        bs58::decode(content)
            .into_vec()
            .map_err(|e| ClairvoyanceError::Config(format!("Invalid base58 key pair: {e}")))?
    };

    if bytes.len() != 64 {
        return Err(ClairvoyanceError::Config(format!(
            "Invalid key pair length: expected 64 bytes, got {}",
            bytes.len()
        )));
    }

    Keypair::try_from(bytes.as_slice())
        .map_err(|e| ClairvoyanceError::Config(format!("Invalid key pair bytes: {e}")))
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn is_installed(&self) -> bool {
        self.path.is_file()
    }

    async fn connect(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let keypair = parse_keypair(&content)?;
        let address = keypair.pubkey().to_string();
        debug!(wallet = %self.name, %address, "key pair loaded");

        *self.keypair.lock().unwrap_or_else(PoisonError::into_inner) = Some(keypair);
        Ok(address)
    }

    async fn disconnect(&self) -> Result<()> {
        self.keypair
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        let guard = self.keypair.lock().unwrap_or_else(PoisonError::into_inner);
        let keypair = guard
            .as_ref()
            .ok_or_else(|| ClairvoyanceError::WalletUnavailable("Wallet not connected".to_string()))?;
        Ok(keypair.sign_message(message).as_ref().to_vec())
    }
}
