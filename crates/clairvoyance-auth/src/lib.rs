/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Clairvoyance auth crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod flow;
pub mod http;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    AuthStatus,
    CallbackWallet,
    ExtensionPort,
    FileSessionStore,
    KeypairWallet,
    LoginOutcome,
    MemorySessionStore,
    MockWallet,
    SessionHandle,
    SessionPhase,
    SessionSnapshot,
    SessionStore,
    WalletAdapter,
    WalletCapability,
    WalletConnection,
};

// Re-export commonly used types from flow
pub use flow::{FlowState, InstallPrompt, LogInstallPrompt, WalletOption, WalletSelectionFlow};

// Re-export commonly used types from http
pub use http::{
    ApiClient,
    ClairvoyanceError,
    ClientConfig,
    ErrorKind,
    Result,
};

// Re-export all types
pub use types::*;
