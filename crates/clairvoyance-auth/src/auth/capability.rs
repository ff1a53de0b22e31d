/*
[INPUT]:  Catalog of wallet adapters, select/connect/disconnect requests
[OUTPUT]: Observable wallet connection state and message signatures
[POS]:    Auth layer - single owner of the wallet connection
[UPDATE]: When wallet selection or connection semantics change
*/

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::auth::wallet::WalletAdapter;
use crate::http::{ClairvoyanceError, Result};

/// Snapshot of the wallet connection as seen by observers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletConnection {
    /// Name of the selected provider
    pub wallet: Option<String>,
    pub connected: bool,
    /// Base58 public key while connected
    pub public_key: Option<String>,
    /// Whether the selected provider can sign messages
    pub can_sign: bool,
}

impl WalletConnection {
    /// Address usable for signing, if any
    pub fn signing_address(&self) -> Option<&str> {
        if self.connected && self.can_sign {
            self.public_key.as_deref()
        } else {
            None
        }
    }
}

/// Shared handle to the wallet providers and the active connection.
///
/// Only this type mutates [`WalletConnection`]; everyone else subscribes.
#[derive(Clone)]
pub struct WalletCapability {
    inner: Arc<CapabilityInner>,
}

struct CapabilityInner {
    wallets: Vec<Arc<dyn WalletAdapter>>,
    state: watch::Sender<WalletConnection>,
}

impl fmt::Debug for WalletCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.inner.wallets.iter().map(|w| w.name()).collect();
        f.debug_struct("WalletCapability")
            .field("wallets", &names)
            .field("connection", &*self.inner.state.borrow())
            .finish()
    }
}

impl WalletCapability {
    pub fn new(wallets: Vec<Arc<dyn WalletAdapter>>) -> Self {
        let (state, _rx) = watch::channel(WalletConnection::default());
        Self {
            inner: Arc::new(CapabilityInner { wallets, state }),
        }
    }

    /// All known providers
    pub fn wallets(&self) -> &[Arc<dyn WalletAdapter>] {
        &self.inner.wallets
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn WalletAdapter>> {
        self.inner
            .wallets
            .iter()
            .find(|wallet| wallet.name() == name)
            .cloned()
    }

    /// Currently selected provider
    pub fn selected(&self) -> Option<Arc<dyn WalletAdapter>> {
        let name = self.inner.state.borrow().wallet.clone()?;
        self.find(&name)
    }

    pub fn connection(&self) -> WalletConnection {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to connection changes
    pub fn subscribe(&self) -> watch::Receiver<WalletConnection> {
        self.inner.state.subscribe()
    }

    /// Make `name` the active provider.
    ///
    /// Selecting a different provider drops the current connection.
    pub fn select(&self, name: &str) -> Result<()> {
        let wallet = self
            .find(name)
            .ok_or_else(|| ClairvoyanceError::WalletNotFound(name.to_string()))?;

        let current = self.connection();
        if current.wallet.as_deref() == Some(name) {
            return Ok(());
        }

        if current.connected {
            let pending = self.disconnect();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(err) = pending.await {
                        debug!(error = %err, "previous wallet failed to disconnect");
                    }
                });
            }
        }

        info!(wallet = %name, "wallet selected");
        self.inner.state.send_replace(WalletConnection {
            wallet: Some(name.to_string()),
            connected: false,
            public_key: None,
            can_sign: wallet.supports_signing(),
        });
        Ok(())
    }

    /// Connect the selected provider
    pub async fn connect(&self) -> Result<()> {
        let wallet = self
            .selected()
            .ok_or_else(|| ClairvoyanceError::WalletUnavailable("No wallet selected".to_string()))?;
        if self.inner.state.borrow().connected {
            return Ok(());
        }

        let public_key = wallet.connect().await?;
        let name = wallet.name().to_string();

        let applied = self.inner.state.send_if_modified(|state| {
            if state.wallet.as_deref() != Some(name.as_str()) || state.connected {
                return false;
            }
            state.connected = true;
            state.public_key = Some(public_key.clone());
            true
        });
        if applied {
            info!(wallet = %name, address = %public_key, "wallet connected");
        } else {
            debug!(wallet = %name, "selection changed while connecting; result dropped");
        }
        Ok(())
    }

    /// Drop the connection and the selection.
    ///
    /// Observers see the disconnected state before the returned future is
    /// first polled; the future only tells the provider.
    pub fn disconnect(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        let wallet = self.selected();
        let was_connected = self.inner.state.send_if_modified(|state| {
            if state.wallet.is_none() && !state.connected {
                return false;
            }
            *state = WalletConnection::default();
            true
        });
        if was_connected {
            info!("wallet disconnected");
        }

        async move {
            match wallet {
                Some(wallet) => wallet.disconnect().await,
                None => Ok(()),
            }
        }
    }

    /// Sign with the connected provider
    pub async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        let connection = self.connection();
        if connection.signing_address().is_none() {
            return Err(ClairvoyanceError::WalletUnavailable(
                "Wallet not connected".to_string(),
            ));
        }
        let wallet = self
            .selected()
            .ok_or_else(|| ClairvoyanceError::WalletUnavailable("Wallet not connected".to_string()))?;
        wallet.sign_message(message).await
    }

    /// Select and connect `name` if it is installed; used to restore a
    /// returning session's wallet without user interaction.
    pub async fn auto_connect(&self, name: &str) -> Result<bool> {
        let installed = self
            .find(name)
            .map(|wallet| wallet.is_installed())
            .unwrap_or(false);
        if !installed {
            return Ok(false);
        }
        self.select(name)?;
        self.connect().await?;
        Ok(self.connection().connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockWallet;

    fn capability() -> (WalletCapability, Arc<MockWallet>, Arc<MockWallet>) {
        let phantom = Arc::new(MockWallet::from_seed("Phantom", [1u8; 32]));
        let solflare = Arc::new(MockWallet::from_seed("Solflare", [2u8; 32]));
        let capability = WalletCapability::new(vec![
            phantom.clone() as Arc<dyn WalletAdapter>,
            solflare.clone() as Arc<dyn WalletAdapter>,
        ]);
        (capability, phantom, solflare)
    }

    #[tokio::test]
    async fn test_select_and_connect() {
        let (capability, phantom, _) = capability();
        let mut rx = capability.subscribe();

        capability.select("Phantom").unwrap();
        assert_eq!(capability.connection().wallet.as_deref(), Some("Phantom"));
        assert!(!capability.connection().connected);

        capability.connect().await.unwrap();
        let connection = rx.borrow_and_update().clone();
        assert!(connection.connected);
        assert_eq!(connection.public_key.as_deref(), Some(phantom.address()));
        assert_eq!(connection.signing_address(), Some(phantom.address()));
    }

    #[tokio::test]
    async fn test_unknown_wallet() {
        let (capability, _, _) = capability();
        let err = capability.select("Backpack").unwrap_err();
        assert!(matches!(err, ClairvoyanceError::WalletNotFound(_)));
    }

    #[tokio::test]
    async fn test_connect_rejected_leaves_state() {
        let (capability, phantom, _) = capability();
        phantom.set_reject_connect(true);

        capability.select("Phantom").unwrap();
        assert!(capability.connect().await.is_err());
        assert!(!capability.connection().connected);
        assert_eq!(capability.connection().wallet.as_deref(), Some("Phantom"));
    }

    #[tokio::test]
    async fn test_disconnect_is_visible_before_poll() {
        let (capability, _, _) = capability();
        capability.select("Phantom").unwrap();
        capability.connect().await.unwrap();

        let pending = capability.disconnect();
        assert_eq!(capability.connection(), WalletConnection::default());
        pending.await.unwrap();
    }

    #[tokio::test]
    async fn test_switching_wallet_drops_connection() {
        let (capability, _, _) = capability();
        capability.select("Phantom").unwrap();
        capability.connect().await.unwrap();

        capability.select("Solflare").unwrap();
        let connection = capability.connection();
        assert_eq!(connection.wallet.as_deref(), Some("Solflare"));
        assert!(!connection.connected);
        assert!(connection.public_key.is_none());
    }

    #[tokio::test]
    async fn test_sign_requires_connection() {
        let (capability, _, _) = capability();
        let err = capability.sign_message(b"hello").await.unwrap_err();
        assert!(matches!(err, ClairvoyanceError::WalletUnavailable(_)));

        capability.select("Phantom").unwrap();
        capability.connect().await.unwrap();
        assert_eq!(capability.sign_message(b"hello").await.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_auto_connect_skips_missing_wallet() {
        let phantom: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom").not_installed());
        let capability = WalletCapability::new(vec![phantom]);
        assert!(!capability.auto_connect("Phantom").await.unwrap());
        assert!(capability.connection().wallet.is_none());
    }
}
