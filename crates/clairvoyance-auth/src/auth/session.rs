/*
[INPUT]:  Wallet capability, API client, session store
[OUTPUT]: Shared session state (token, user, loading, error) and its transitions
[POS]:    Auth layer - session state machine driving challenge/response login
[UPDATE]: When login steps, bootstrap, or auto-login policy change
*/

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::capability::{WalletCapability, WalletConnection};
use crate::auth::store::SessionStore;
use crate::http::{ApiClient, ClairvoyanceError, Result};
use crate::types::{User, VerifyResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Stored token not yet checked
    Bootstrapping,
    Anonymous,
    /// A challenge/response exchange is in flight
    Authenticating,
    Authenticated,
}

/// What gating code may conclude about the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Still loading; neither signed in nor signed out
    Unknown,
    Anonymous,
    Authenticated,
}

/// Published view of the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Bumped by every login attempt and every logout; results carrying an
    /// older generation are discarded.
    pub generation: u64,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            phase: SessionPhase::Bootstrapping,
            token: None,
            user: None,
            is_loading: true,
            error: None,
            generation: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn status(&self) -> AuthStatus {
        if self.is_loading {
            AuthStatus::Unknown
        } else if self.is_authenticated() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Anonymous
        }
    }
}

/// Result of a `login()` call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Token persisted and user adopted
    Authenticated,
    /// Already signed in; nothing was sent
    AlreadyAuthenticated,
    /// Bootstrap or another login is running; nothing was sent
    Busy,
    /// A logout happened while the exchange was in flight; result dropped
    Superseded,
}

struct Machine {
    snapshot: SessionSnapshot,
    login_attempted: bool,
    bootstrap_started: bool,
}

struct SessionInner {
    client: ApiClient,
    wallet: WalletCapability,
    store: Arc<dyn SessionStore>,
    machine: Mutex<Machine>,
    state: watch::Sender<SessionSnapshot>,
}

/// Shared handle to the session state machine.
///
/// Construct one per process and clone it into every consumer.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("SessionHandle")
            .field("phase", &snapshot.phase)
            .field("is_loading", &snapshot.is_loading)
            .field("generation", &snapshot.generation)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn new(client: ApiClient, wallet: WalletCapability, store: Arc<dyn SessionStore>) -> Self {
        let (state, _rx) = watch::channel(SessionSnapshot::initial());
        Self {
            inner: Arc::new(SessionInner {
                client,
                wallet,
                store,
                machine: Mutex::new(Machine {
                    snapshot: SessionSnapshot::initial(),
                    login_attempted: false,
                    bootstrap_started: false,
                }),
                state,
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn wallet(&self) -> &WalletCapability {
        &self.inner.wallet
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Whether auto-login has already fired for the current wallet connection
    pub fn login_attempted(&self) -> bool {
        self.lock().login_attempted
    }

    /// Returning sessions reconnect their wallet without a prompt
    pub fn should_auto_connect(&self) -> bool {
        matches!(self.inner.store.load(), Ok(Some(_)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Machine> {
        self.inner.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the machine and publish the new snapshot atomically.
    ///
    /// Store writes run inside `f` so a logout cannot land between the
    /// generation check and the save. The store is a single small token file.
    fn update<R>(&self, f: impl FnOnce(&mut Machine) -> R) -> R {
        let mut machine = self.lock();
        let result = f(&mut machine);
        let snapshot = &machine.snapshot;
        self.inner.state.send_if_modified(|current| {
            if current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });
        result
    }

    /// Resolve the stored token, if any, into a session.
    ///
    /// Runs once; later calls return the current phase. A token the server
    /// does not accept is cleared silently.
    pub async fn bootstrap(&self) -> SessionPhase {
        let stored = match self.inner.store.load() {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "failed to read session store");
                None
            }
        };

        let pending = self.update(|m| {
            if m.bootstrap_started || m.snapshot.phase != SessionPhase::Bootstrapping {
                return None;
            }
            m.bootstrap_started = true;
            match stored {
                Some(token) => {
                    m.snapshot.token = Some(token.clone());
                    Some((token, m.snapshot.generation))
                }
                None => {
                    m.snapshot.phase = SessionPhase::Anonymous;
                    m.snapshot.is_loading = false;
                    None
                }
            }
        });

        let Some((token, generation)) = pending else {
            return self.snapshot().phase;
        };

        let result = self.inner.client.get_user(&token).await;
        self.update(|m| {
            if m.snapshot.generation != generation {
                debug!(generation, "bootstrap result dropped; session moved on");
                return;
            }
            match result {
                Ok(user) => {
                    info!(wallet = %user.wallet_address, "session restored");
                    m.snapshot.user = Some(user);
                    m.snapshot.phase = SessionPhase::Authenticated;
                }
                Err(err) => {
                    info!(error = %err, "stored session rejected; continuing signed out");
                    if let Err(err) = self.inner.store.clear() {
                        warn!(error = %err, "failed to clear session store");
                    }
                    m.snapshot.token = None;
                    m.snapshot.user = None;
                    m.snapshot.phase = SessionPhase::Anonymous;
                }
            }
            m.snapshot.is_loading = false;
        });

        self.snapshot().phase
    }

    /// Prove control of the connected wallet and open a session.
    ///
    /// Fails without touching state when no signing wallet is connected.
    /// Exchange failures are recorded in `error` and returned.
    pub async fn login(&self) -> Result<LoginOutcome> {
        let connection = self.inner.wallet.connection();
        let Some(address) = connection.signing_address().map(str::to_string) else {
            return Err(ClairvoyanceError::WalletUnavailable(
                "Wallet not connected".to_string(),
            ));
        };

        let started = self.update(|m| match m.snapshot.phase {
            SessionPhase::Bootstrapping | SessionPhase::Authenticating => Err(LoginOutcome::Busy),
            SessionPhase::Authenticated => Err(LoginOutcome::AlreadyAuthenticated),
            SessionPhase::Anonymous => {
                m.snapshot.generation += 1;
                m.snapshot.phase = SessionPhase::Authenticating;
                m.snapshot.is_loading = true;
                m.snapshot.error = None;
                Ok(m.snapshot.generation)
            }
        });
        let generation = match started {
            Ok(generation) => generation,
            Err(outcome) => {
                debug!(?outcome, "login skipped");
                return Ok(outcome);
            }
        };

        info!(wallet = %address, generation, "login started");
        let exchange = self.exchange(&address).await;

        self.update(|m| {
            if m.snapshot.generation != generation
                || m.snapshot.phase != SessionPhase::Authenticating
            {
                debug!(generation, "login result dropped; session moved on");
                return Ok(LoginOutcome::Superseded);
            }

            let persisted = exchange.and_then(|response| {
                self.inner.store.save(&response.access_token)?;
                Ok(response)
            });
            m.snapshot.is_loading = false;

            match persisted {
                Ok(response) => {
                    info!(wallet = %response.user.wallet_address, "login succeeded");
                    m.snapshot.token = Some(response.access_token);
                    m.snapshot.user = Some(response.user);
                    m.snapshot.phase = SessionPhase::Authenticated;
                    Ok(LoginOutcome::Authenticated)
                }
                Err(err) => {
                    warn!(error = %err, kind = ?err.kind(), "login failed");
                    m.snapshot.phase = SessionPhase::Anonymous;
                    m.snapshot.error = Some(err.to_string());
                    Err(err)
                }
            }
        })
    }

    /// connect -> sign -> verify; nothing is persisted here
    async fn exchange(&self, address: &str) -> Result<VerifyResponse> {
        let challenge = self.inner.client.connect(address).await?;
        debug!(nonce = %challenge.nonce, "challenge received");

        let signature = self
            .inner
            .wallet
            .sign_message(challenge.message.as_bytes())
            .await?;
        let signature = bs58::encode(signature).into_string();

        self.inner
            .client
            .verify(address, &signature, &challenge.message)
            .await
    }

    /// End the session. Never fails.
    ///
    /// The store and in-memory state are cleared before this returns; the
    /// wallet is asked to disconnect in the background.
    pub fn logout(&self) {
        self.update(|m| {
            if let Err(err) = self.inner.store.clear() {
                warn!(error = %err, "failed to clear session store");
            }
            m.snapshot.generation += 1;
            m.snapshot.phase = SessionPhase::Anonymous;
            m.snapshot.token = None;
            m.snapshot.user = None;
            m.snapshot.is_loading = false;
            m.snapshot.error = None;
            m.login_attempted = false;
        });
        info!("logged out");

        let pending = self.inner.wallet.disconnect();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = pending.await {
                        debug!(error = %err, "wallet disconnect failed");
                    }
                });
            }
            Err(_) => debug!("no async runtime; wallet disconnect not delivered"),
        }
    }

    /// Re-fetch the profile for the stored token.
    ///
    /// Failures leave the session untouched. Returns the new user when it
    /// was applied.
    pub async fn refresh_user(&self) -> Result<Option<User>> {
        let Some(token) = self.inner.store.load()? else {
            return Ok(None);
        };
        let generation = self.snapshot().generation;

        let user = match self.inner.client.get_user(&token).await {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "failed to refresh user");
                return Err(err);
            }
        };

        let applied = self.update(|m| {
            let current = m.snapshot.generation == generation
                && m.snapshot.token.as_deref() == Some(token.as_str());
            if current {
                m.snapshot.user = Some(user.clone());
            }
            current
        });
        Ok(applied.then_some(user))
    }

    /// Record the user's answer to the fee terms and return the updated profile
    pub async fn accept_fees(&self, accepted: bool) -> Result<User> {
        let snapshot = self.snapshot();
        let token = match (snapshot.is_authenticated(), snapshot.token) {
            (true, Some(token)) => token,
            _ => return Err(ClairvoyanceError::InvalidSession("Not signed in".to_string())),
        };
        let generation = snapshot.generation;

        self.inner.client.accept_fees(&token, accepted).await?;

        match self.refresh_user().await {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => {}
            Err(err) => debug!(error = %err, "profile refresh after fee answer failed"),
        }

        self.update(|m| {
            if m.snapshot.generation != generation {
                return Err(ClairvoyanceError::InvalidSession("Session ended".to_string()));
            }
            let user = m
                .snapshot
                .user
                .as_mut()
                .ok_or_else(|| ClairvoyanceError::InvalidSession("Session ended".to_string()))?;
            user.fee_accepted = accepted;
            Ok(user.clone())
        })
    }

    /// Feed a wallet connection change through the auto-login guards.
    ///
    /// Returns true when the caller should start `login()`.
    pub fn observe_wallet(&self, connection: &WalletConnection) -> bool {
        self.update(|m| {
            rearm_on_disconnect(m, connection);
            claim_auto_login(m, connection)
        })
    }

    /// Watch the wallet and run `login()` once per connection
    pub fn spawn_auto_login(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let session = self.clone();
        let mut wallet_rx = self.inner.wallet.subscribe();
        let mut session_rx = self.subscribe();

        tokio::spawn(async move {
            loop {
                let connection = wallet_rx.borrow_and_update().clone();
                let _ = session_rx.borrow_and_update();

                if session.observe_wallet(&connection) {
                    info!("wallet connected; starting automatic login");
                    if let Err(err) = session.login().await {
                        info!(error = %err, "automatic login failed");
                    }
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = wallet_rx.changed() => if changed.is_err() { break },
                    changed = session_rx.changed() => if changed.is_err() { break },
                }
            }
            debug!("auto-login watcher stopped");
        })
    }
}

/// A dropped wallet re-arms auto-login; the session itself is left alone.
fn rearm_on_disconnect(machine: &mut Machine, connection: &WalletConnection) {
    if !connection.connected {
        machine.login_attempted = false;
    }
}

/// Claims the single auto-login attempt of the current connection.
fn claim_auto_login(machine: &mut Machine, connection: &WalletConnection) -> bool {
    let eligible = connection.signing_address().is_some()
        && machine.snapshot.phase == SessionPhase::Anonymous
        && !machine.snapshot.is_loading
        && !machine.login_attempted;
    if eligible {
        machine.login_attempted = true;
    }
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemorySessionStore, MockWallet, WalletAdapter};
    use crate::http::ClientConfig;

    fn connected(address: &str) -> WalletConnection {
        WalletConnection {
            wallet: Some("Phantom".to_string()),
            connected: true,
            public_key: Some(address.to_string()),
            can_sign: true,
        }
    }

    fn session_with(store: MemorySessionStore) -> SessionHandle {
        let wallet: Arc<dyn WalletAdapter> = Arc::new(MockWallet::new("Phantom"));
        let client = ApiClient::with_config(ClientConfig::with_base_url("http://127.0.0.1:9"))
            .expect("client init");
        SessionHandle::new(client, WalletCapability::new(vec![wallet]), Arc::new(store))
    }

    async fn anonymous_session() -> SessionHandle {
        let session = session_with(MemorySessionStore::new());
        assert_eq!(session.bootstrap().await, SessionPhase::Anonymous);
        session
    }

    #[tokio::test]
    async fn test_initial_status_is_unknown() {
        let session = session_with(MemorySessionStore::new());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Bootstrapping);
        assert_eq!(snapshot.status(), AuthStatus::Unknown);
        assert!(!session.observe_wallet(&connected("Addr1")));
    }

    #[tokio::test]
    async fn test_auto_login_once_per_connection() {
        let session = anonymous_session().await;

        assert!(session.observe_wallet(&connected("Addr1")));
        assert!(!session.observe_wallet(&connected("Addr1")));
        assert!(!session.observe_wallet(&connected("Addr1")));

        assert!(!session.observe_wallet(&WalletConnection::default()));
        assert!(!session.login_attempted());

        assert!(session.observe_wallet(&connected("Addr1")));
    }

    #[tokio::test]
    async fn test_auto_login_needs_signing_support() {
        let session = anonymous_session().await;
        let mut connection = connected("Addr1");
        connection.can_sign = false;
        assert!(!session.observe_wallet(&connection));
        assert!(!session.login_attempted());
    }

    #[tokio::test]
    async fn test_disconnect_never_logs_out() {
        let session = anonymous_session().await;
        session.update(|m| {
            m.snapshot.phase = SessionPhase::Authenticated;
            m.snapshot.token = Some("tok1".to_string());
            m.snapshot.user = Some(User {
                wallet_address: "Addr1".to_string(),
                created_at: None,
                fee_accepted: false,
                balance: None,
                stats: None,
            });
            m.login_attempted = true;
        });

        assert!(!session.observe_wallet(&WalletConnection::default()));
        assert!(session.is_authenticated());
        assert!(!session.login_attempted());

        assert!(!session.observe_wallet(&connected("Addr1")));
        assert_eq!(session.snapshot().token.as_deref(), Some("tok1"));
    }

    #[tokio::test]
    async fn test_login_without_wallet_has_no_side_effects() {
        let session = anonymous_session().await;
        let before = session.snapshot();

        let err = session.login().await.unwrap_err();
        assert!(matches!(err, ClairvoyanceError::WalletUnavailable(_)));
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_login_during_bootstrap_is_busy() {
        let session = session_with(MemorySessionStore::new());
        session.wallet().select("Phantom").unwrap();
        session.wallet().connect().await.unwrap();

        assert_eq!(session.login().await.unwrap(), LoginOutcome::Busy);
        assert_eq!(session.snapshot().generation, 0);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let store = MemorySessionStore::with_token("tok1");
        let session = session_with(store.clone());
        session.update(|m| {
            m.snapshot.phase = SessionPhase::Anonymous;
            m.snapshot.is_loading = false;
            m.snapshot.error = Some("stale".to_string());
            m.login_attempted = true;
        });

        session.logout();

        let snapshot = session.snapshot();
        assert!(store.token().is_none());
        assert_eq!(snapshot.phase, SessionPhase::Anonymous);
        assert!(snapshot.token.is_none());
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.generation, 1);
        assert!(!session.login_attempted());
    }

    #[test]
    fn test_logout_outside_runtime() {
        let store = MemorySessionStore::with_token("tok1");
        let session = session_with(store.clone());
        session.logout();
        assert!(store.token().is_none());
    }

    #[tokio::test]
    async fn test_accept_fees_requires_session() {
        let session = anonymous_session().await;
        let err = session.accept_fees(true).await.unwrap_err();
        assert!(matches!(err, ClairvoyanceError::InvalidSession(_)));
    }
}
