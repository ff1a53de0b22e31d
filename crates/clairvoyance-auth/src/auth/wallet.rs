/*
[INPUT]:  Message bytes to sign, connect/disconnect requests
[OUTPUT]: Wallet public key and raw signature bytes
[POS]:    Auth layer - wallet provider abstraction
[UPDATE]: When adding new wallet providers or changing signature format
*/

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use crate::http::{ClairvoyanceError, Result};

/// A wallet provider (browser extension, hardware wallet, local key file)
///
/// Connection state is tracked by
/// [`WalletCapability`](crate::auth::WalletCapability); adapters only carry
/// out the requests.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Provider name as shown in the catalog
    fn name(&self) -> &str;

    /// Install page of the provider
    fn url(&self) -> &str;

    /// Whether the provider is present on this machine
    fn is_installed(&self) -> bool;

    /// Whether the provider can sign arbitrary messages
    fn supports_signing(&self) -> bool {
        true
    }

    /// Ask the provider for access; returns the base58 public key
    async fn connect(&self) -> Result<String>;

    async fn disconnect(&self) -> Result<()>;

    /// Sign raw message bytes and return the raw signature bytes
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Scriptable wallet for tests and demos
///
/// Produces real ed25519 signatures; rejection of prompts can be toggled at
/// runtime.
#[derive(Debug)]
pub struct MockWallet {
    name: String,
    url: String,
    address: String,
    signing_key: SigningKey,
    installed: bool,
    can_sign: bool,
    reject_connect: AtomicBool,
    reject_signature: AtomicBool,
    connect_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

impl MockWallet {
    /// Create an installed mock wallet with a random key
    pub fn new(name: &str) -> Self {
        Self::from_signing_key(name, SigningKey::generate(&mut OsRng))
    }

    /// Create an installed mock wallet with a deterministic key
    pub fn from_seed(name: &str, seed: [u8; 32]) -> Self {
        Self::from_signing_key(name, SigningKey::from_bytes(&seed))
    }

    fn from_signing_key(name: &str, signing_key: SigningKey) -> Self {
        let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        Self {
            name: name.to_string(),
            url: format!("https://{}.example", name.to_ascii_lowercase()),
            address,
            signing_key,
            installed: true,
            can_sign: true,
            reject_connect: AtomicBool::new(false),
            reject_signature: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Report a fixed address instead of the key's own
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn not_installed(mut self) -> Self {
        self.installed = false;
        self
    }

    pub fn without_signing(mut self) -> Self {
        self.can_sign = false;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn set_reject_connect(&self, reject: bool) {
        self.reject_connect.store(reject, Ordering::SeqCst);
    }

    pub fn set_reject_signature(&self, reject: bool) {
        self.reject_signature.store(reject, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn supports_signing(&self) -> bool {
        self.can_sign
    }

    async fn connect(&self) -> Result<String> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(ClairvoyanceError::UserRejected(
                "User rejected the request.".to_string(),
            ));
        }
        Ok(self.address.clone())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if !self.can_sign {
            return Err(ClairvoyanceError::WalletUnavailable(
                "Wallet does not support message signing".to_string(),
            ));
        }
        if self.reject_signature.load(Ordering::SeqCst) {
            return Err(ClairvoyanceError::UserRejected(
                "User rejected the request.".to_string(),
            ));
        }
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }
}
