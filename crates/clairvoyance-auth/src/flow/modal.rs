/*
[INPUT]:  User wallet choice, wallet connection changes, session changes
[OUTPUT]: Modal state (open, connecting, error) and connect/login requests
[POS]:    Flow layer - wallet selection controller in front of the session
[UPDATE]: When the selection steps or close rules change
*/

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{SessionHandle, SessionPhase, SessionSnapshot, WalletConnection};
use crate::flow::catalog::{CATALOG, find_provider};
use crate::http::{ClairvoyanceError, Result};

const CONNECT_FAILED: &str = "Failed to connect wallet";
const SIGNING_UNSUPPORTED: &str = "Wallet does not support message signing";

/// Opens a provider's install page (browser tab, terminal hint, ...)
pub trait InstallPrompt: Send + Sync {
    fn open_install_page(&self, wallet: &str, url: &str);
}

/// Install prompt that only logs the URL
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInstallPrompt;

impl InstallPrompt for LogInstallPrompt {
    fn open_install_page(&self, wallet: &str, url: &str) {
        info!(%wallet, %url, "wallet not installed; opening install page");
    }
}

/// Published state of the selection modal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowState {
    pub open: bool,
    /// Provider whose connection/authentication is in flight
    pub connecting: Option<String>,
    pub error: Option<String>,
    attempt_base: u64,
}

/// One row of the modal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletOption {
    pub name: &'static str,
    pub icon: &'static str,
    pub url: &'static str,
    pub installed: bool,
    /// Spinner shown on the row being connected
    pub busy: bool,
}

struct FlowInner {
    session: SessionHandle,
    prompt: Arc<dyn InstallPrompt>,
    state: watch::Sender<FlowState>,
}

/// Wallet selection controller.
///
/// Waits for two things in order: the wallet connecting, then the session
/// authenticating. Only the second closes the modal, so a rejected signature
/// leaves it open with the login error.
#[derive(Clone)]
pub struct WalletSelectionFlow {
    inner: Arc<FlowInner>,
}

impl WalletSelectionFlow {
    pub fn new(session: SessionHandle, prompt: Arc<dyn InstallPrompt>) -> Self {
        let (state, _rx) = watch::channel(FlowState::default());
        Self {
            inner: Arc::new(FlowInner {
                session,
                prompt,
                state,
            }),
        }
    }

    pub fn state(&self) -> FlowState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.inner.state.subscribe()
    }

    pub fn open(&self) {
        self.inner.state.send_modify(|state| {
            state.open = true;
            state.error = None;
        });
    }

    /// A connection or authentication attempt is in flight
    pub fn is_busy(&self) -> bool {
        self.inner.state.borrow().connecting.is_some() || self.inner.session.snapshot().is_loading
    }

    /// Rows of the modal in catalog order
    pub fn options(&self) -> Vec<WalletOption> {
        let connecting = self.inner.state.borrow().connecting.clone();
        let wallet = self.inner.session.wallet();

        CATALOG
            .iter()
            .map(|provider| WalletOption {
                name: provider.name,
                icon: provider.icon,
                url: provider.url,
                installed: wallet
                    .find(provider.name)
                    .map(|adapter| adapter.is_installed())
                    .unwrap_or(false),
                busy: connecting.as_deref() == Some(provider.name),
            })
            .collect()
    }

    /// Handle a click on a provider row.
    ///
    /// Missing providers get their install page and an error. Installed ones
    /// are selected; the watchers in [`run`](Self::run) connect them. When the
    /// wallet is already connected but signed out, login is retried directly.
    /// A click during an automatic login follows that login instead.
    pub async fn select(&self, name: &str) -> Result<()> {
        if self.inner.state.borrow().connecting.is_some() {
            debug!(wallet = %name, "selection ignored while connecting");
            return Ok(());
        }
        let snapshot = self.inner.session.snapshot();
        if snapshot.is_loading {
            if snapshot.phase == SessionPhase::Authenticating {
                self.follow_login(name, &snapshot);
            } else {
                debug!(wallet = %name, "selection ignored while the session loads");
            }
            return Ok(());
        }

        let provider =
            find_provider(name).ok_or_else(|| ClairvoyanceError::WalletNotFound(name.to_string()))?;
        let session = &self.inner.session;

        let installed = session
            .wallet()
            .find(provider.name)
            .map(|adapter| adapter.is_installed())
            .unwrap_or(false);
        if !installed {
            self.inner.prompt.open_install_page(provider.name, provider.url);
            let err = ClairvoyanceError::WalletNotInstalled {
                name: provider.name.to_string(),
            };
            self.fail(&err);
            return Err(err);
        }

        if let Err(err) = session.wallet().select(provider.name) {
            self.fail(&err);
            return Err(err);
        }

        let base = session.snapshot().generation;
        self.inner.state.send_modify(|state| {
            state.error = None;
            state.connecting = Some(provider.name.to_string());
            state.attempt_base = base;
        });
        info!(wallet = %provider.name, "wallet chosen");

        let connection = session.wallet().connection();
        if !connection.connected || connection.wallet.as_deref() != Some(provider.name) {
            return Ok(());
        }
        if connection.signing_address().is_none() {
            let err = signing_unsupported();
            self.fail(&err);
            return Err(err);
        }
        if session.snapshot().phase == SessionPhase::Anonymous {
            debug!(wallet = %provider.name, "wallet already connected; retrying login");
            if let Err(err) = session.login().await {
                debug!(error = %err, "login retry failed");
                self.fail(&err);
                return Err(err);
            }
        }

        Ok(())
    }

    /// Track a login the auto-login watcher already started
    fn follow_login(&self, name: &str, snapshot: &SessionSnapshot) {
        let wallet = self
            .inner
            .session
            .wallet()
            .connection()
            .wallet
            .unwrap_or_else(|| name.to_string());
        debug!(%wallet, generation = snapshot.generation, "following login in flight");
        self.inner.state.send_modify(|state| {
            state.error = None;
            state.connecting = Some(wallet);
            state.attempt_base = snapshot.generation.saturating_sub(1);
        });
    }

    /// Close the modal unless an attempt is in flight
    pub fn close(&self) -> bool {
        if self.is_busy() {
            debug!("close refused while connecting");
            return false;
        }
        self.inner.state.send_modify(|state| state.open = false);
        true
    }

    /// Wallet watcher: connect the chosen provider once it is active
    pub async fn on_wallet_change(&self, connection: &WalletConnection) {
        let Some(name) = self.inner.state.borrow().connecting.clone() else {
            return;
        };
        if connection.wallet.as_deref() != Some(name.as_str()) {
            return;
        }
        if connection.connected {
            if connection.signing_address().is_none() {
                warn!(wallet = %name, "connected wallet cannot sign messages");
                self.fail(&signing_unsupported());
            }
            return;
        }

        if let Err(err) = self.inner.session.wallet().connect().await {
            warn!(wallet = %name, error = %err, "wallet connection failed");
            self.fail(&err);
        }
    }

    /// Session watcher: close on authentication, surface login errors
    pub fn on_session_change(&self, snapshot: &SessionSnapshot) {
        self.inner.state.send_if_modified(|state| {
            if state.connecting.is_none() || snapshot.is_loading {
                return false;
            }

            if snapshot.is_authenticated() {
                info!("authenticated; closing wallet selection");
                state.connecting = None;
                state.error = None;
                state.open = false;
                return true;
            }

            let attempt_finished =
                snapshot.generation > state.attempt_base && snapshot.phase == SessionPhase::Anonymous;
            match (&snapshot.error, attempt_finished) {
                (Some(error), true) => {
                    state.connecting = None;
                    state.error = Some(error.clone());
                    true
                }
                _ => false,
            }
        });
    }

    /// Drive both watchers until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut wallet_rx = self.inner.session.wallet().subscribe();
        let mut session_rx = self.inner.session.subscribe();
        let mut flow_rx = self.subscribe();

        loop {
            let connection = wallet_rx.borrow_and_update().clone();
            let snapshot = session_rx.borrow_and_update().clone();
            let _ = flow_rx.borrow_and_update();

            self.on_wallet_change(&connection).await;
            self.on_session_change(&snapshot);

            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = wallet_rx.changed() => if changed.is_err() { break },
                changed = session_rx.changed() => if changed.is_err() { break },
                changed = flow_rx.changed() => if changed.is_err() { break },
            }
        }
        debug!("wallet selection watchers stopped");
    }

    fn fail(&self, err: &ClairvoyanceError) {
        let message = err.to_string();
        let message = if message.is_empty() {
            CONNECT_FAILED.to_string()
        } else {
            message
        };
        self.inner.state.send_modify(|state| {
            state.connecting = None;
            state.error = Some(message);
        });
    }
}

fn signing_unsupported() -> ClairvoyanceError {
    ClairvoyanceError::WalletUnavailable(SIGNING_UNSUPPORTED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::auth::{MemorySessionStore, MockWallet, WalletAdapter, WalletCapability};
    use crate::http::{ApiClient, ClientConfig};

    #[derive(Default)]
    struct RecordingPrompt {
        opened: Mutex<Vec<String>>,
    }

    impl InstallPrompt for RecordingPrompt {
        fn open_install_page(&self, _wallet: &str, url: &str) {
            self.opened.lock().unwrap().push(url.to_string());
        }
    }

    async fn flow_with(
        wallets: Vec<Arc<dyn WalletAdapter>>,
    ) -> (WalletSelectionFlow, SessionHandle, Arc<RecordingPrompt>) {
        let client = ApiClient::with_config(ClientConfig::with_base_url("http://127.0.0.1:9"))
            .expect("client init");
        let session = SessionHandle::new(
            client,
            WalletCapability::new(wallets),
            Arc::new(MemorySessionStore::new()),
        );
        session.bootstrap().await;

        let prompt = Arc::new(RecordingPrompt::default());
        let flow = WalletSelectionFlow::new(session.clone(), prompt.clone());
        flow.open();
        (flow, session, prompt)
    }

    #[tokio::test]
    async fn test_missing_wallet_opens_install_page() {
        let phantom = Arc::new(MockWallet::new("Phantom").not_installed());
        let (flow, session, prompt) = flow_with(vec![phantom.clone() as Arc<dyn WalletAdapter>]).await;

        let err = flow.select("Phantom").await.unwrap_err();
        assert!(matches!(err, ClairvoyanceError::WalletNotInstalled { .. }));

        let state = flow.state();
        assert!(state.open);
        assert!(state.connecting.is_none());
        assert_eq!(state.error.as_deref(), Some("Please install Phantom wallet"));
        assert_eq!(*prompt.opened.lock().unwrap(), vec!["https://phantom.app/".to_string()]);
        assert!(session.wallet().connection().wallet.is_none());
        assert_eq!(phantom.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_options_reflect_install_state() {
        let phantom: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom"));
        let (flow, _, _) = flow_with(vec![phantom]).await;

        let options = flow.options();
        assert_eq!(options.len(), 2);
        assert!(options[0].installed);
        assert!(!options[1].installed);
        assert!(options.iter().all(|option| !option.busy));
    }

    #[tokio::test]
    async fn test_close_blocked_while_connecting() {
        let phantom: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom"));
        let (flow, session, _) = flow_with(vec![phantom]).await;

        flow.select("Phantom").await.unwrap();
        assert_eq!(flow.state().connecting.as_deref(), Some("Phantom"));
        assert_eq!(session.wallet().connection().wallet.as_deref(), Some("Phantom"));
        assert!(flow.options()[0].busy);

        assert!(!flow.close());
        assert!(flow.state().open);

        // a second click while busy is ignored
        flow.select("Solflare").await.unwrap();
        assert_eq!(flow.state().connecting.as_deref(), Some("Phantom"));
    }

    #[tokio::test]
    async fn test_connect_rejection_keeps_modal_open() {
        let phantom = Arc::new(MockWallet::new("Phantom"));
        phantom.set_reject_connect(true);
        let (flow, session, _) = flow_with(vec![phantom.clone() as Arc<dyn WalletAdapter>]).await;

        let shutdown = CancellationToken::new();
        let watcher = {
            let flow = flow.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { flow.run(shutdown).await })
        };

        let mut rx = flow.subscribe();
        flow.select("Phantom").await.unwrap();
        rx.wait_for(|state| state.error.is_some()).await.unwrap();

        let state = flow.state();
        assert!(state.open);
        assert!(state.connecting.is_none());
        assert_eq!(state.error.as_deref(), Some("User rejected the request."));
        assert!(!session.wallet().connection().connected);
        assert_eq!(phantom.connect_calls(), 1);
        assert!(flow.close());

        shutdown.cancel();
        watcher.await.unwrap();
    }

    #[tokio::test]
    async fn test_closes_on_authenticated_snapshot() {
        let phantom: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom"));
        let (flow, _, _) = flow_with(vec![phantom]).await;
        flow.select("Phantom").await.unwrap();

        let mut snapshot = SessionSnapshot {
            phase: SessionPhase::Authenticating,
            token: None,
            user: None,
            is_loading: true,
            error: None,
            generation: 1,
        };
        flow.on_session_change(&snapshot);
        assert!(flow.state().open);

        snapshot.phase = SessionPhase::Authenticated;
        snapshot.is_loading = false;
        snapshot.token = Some("tok1".to_string());
        snapshot.user = Some(crate::types::User {
            wallet_address: "Addr1".to_string(),
            created_at: None,
            fee_accepted: false,
            balance: None,
            stats: None,
        });
        flow.on_session_change(&snapshot);

        let state = flow.state();
        assert!(!state.open);
        assert!(state.connecting.is_none());
    }

    #[tokio::test]
    async fn test_stale_session_error_is_not_adopted() {
        let phantom: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom"));
        let (flow, session, _) = flow_with(vec![phantom]).await;
        flow.select("Phantom").await.unwrap();

        let snapshot = SessionSnapshot {
            error: Some("old failure".to_string()),
            ..session.snapshot()
        };
        flow.on_session_change(&snapshot);
        assert_eq!(flow.state().connecting.as_deref(), Some("Phantom"));
        assert!(flow.state().error.is_none());
    }

    #[tokio::test]
    async fn test_connected_wallet_without_signing_fails_fast() {
        let phantom: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom").without_signing());
        let (flow, session, _) = flow_with(vec![phantom]).await;
        session.wallet().select("Phantom").unwrap();
        session.wallet().connect().await.unwrap();

        let err = flow.select("Phantom").await.unwrap_err();
        assert!(matches!(err, ClairvoyanceError::WalletUnavailable(_)));

        let state = flow.state();
        assert!(state.connecting.is_none());
        assert_eq!(state.error.as_deref(), Some("Wallet does not support message signing"));
        assert_eq!(session.snapshot().generation, 0);
        assert!(flow.close());
    }

    #[tokio::test]
    async fn test_wallet_watcher_rejects_non_signing_connection() {
        let phantom: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom").without_signing());
        let (flow, session, _) = flow_with(vec![phantom]).await;
        flow.select("Phantom").await.unwrap();
        assert!(flow.is_busy());

        // first pass connects, second sees a connection that cannot sign
        flow.on_wallet_change(&session.wallet().connection()).await;
        assert!(session.wallet().connection().connected);
        flow.on_wallet_change(&session.wallet().connection()).await;

        assert!(flow.state().connecting.is_none());
        assert_eq!(
            flow.state().error.as_deref(),
            Some("Wallet does not support message signing")
        );
        assert!(flow.close());
    }
}
