/*
[INPUT]:  Callback-style wallet extension port
[OUTPUT]: WalletAdapter whose operations are plain futures
[POS]:    Auth layer - bridge from callback APIs to async/await
[UPDATE]: When the extension port surface changes
*/

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::auth::wallet::WalletAdapter;
use crate::http::{ClairvoyanceError, Result};

/// Failure reported by an extension through its callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The human declined the prompt
    Rejected(String),
    /// The extension failed on its own
    Failed(String),
}

/// One-shot completion callback handed to the extension
pub type Reply<T> = Box<dyn FnOnce(std::result::Result<T, PortError>) + Send + 'static>;

/// Raw extension surface: every request completes by invoking its reply
/// callback exactly once, possibly from another thread.
pub trait ExtensionPort: Send + Sync {
    fn name(&self) -> &str;

    fn url(&self) -> &str;

    /// Whether the extension has injected itself into the host
    fn is_injected(&self) -> bool;

    fn request_connect(&self, reply: Reply<String>);

    fn request_disconnect(&self, reply: Reply<()>);

    fn request_signature(&self, message: Vec<u8>, reply: Reply<Vec<u8>>);
}

/// Adapts an [`ExtensionPort`] to [`WalletAdapter`]
pub struct CallbackWallet<P> {
    port: P,
}

impl<P: ExtensionPort> CallbackWallet<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &P {
        &self.port
    }
}

async fn await_reply<T: Send + 'static>(
    start: impl FnOnce(Reply<T>),
    on_failure: fn(String) -> ClairvoyanceError,
) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    start(Box::new(move |outcome| {
        let _ = tx.send(outcome);
    }));

    match rx.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(PortError::Rejected(message))) => Err(ClairvoyanceError::UserRejected(message)),
        Ok(Err(PortError::Failed(message))) => Err(on_failure(message)),
        Err(_) => Err(ClairvoyanceError::WalletUnavailable(
            "Wallet closed the request without answering".to_string(),
        )),
    }
}

#[async_trait]
impl<P: ExtensionPort> WalletAdapter for CallbackWallet<P> {
    fn name(&self) -> &str {
        self.port.name()
    }

    fn url(&self) -> &str {
        self.port.url()
    }

    fn is_installed(&self) -> bool {
        self.port.is_injected()
    }

    async fn connect(&self) -> Result<String> {
        await_reply(
            |reply| self.port.request_connect(reply),
            ClairvoyanceError::WalletUnavailable,
        )
        .await
    }

    async fn disconnect(&self) -> Result<()> {
        await_reply(
            |reply| self.port.request_disconnect(reply),
            ClairvoyanceError::WalletUnavailable,
        )
        .await
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        let message = message.to_vec();
        await_reply(
            |reply| self.port.request_signature(message, reply),
            ClairvoyanceError::Signing,
        )
        .await
    }
}
