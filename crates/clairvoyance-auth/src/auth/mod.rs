/*
[INPUT]:  Wallet providers, API client, and a session store
[OUTPUT]: Wallet connection state, bearer sessions, and auth errors
[POS]:    Auth layer - wallet challenge/response login and session lifecycle
[UPDATE]: When auth flow, wallet surface, or persistence change
*/

pub mod callback;
pub mod capability;
pub mod keypair_wallet;
pub mod session;
pub mod store;
pub mod wallet;

pub use callback::{CallbackWallet, ExtensionPort, PortError, Reply};
pub use capability::{WalletCapability, WalletConnection};
pub use keypair_wallet::KeypairWallet;
pub use session::{AuthStatus, LoginOutcome, SessionHandle, SessionPhase, SessionSnapshot};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, TOKEN_KEY};
pub use wallet::{MockWallet, WalletAdapter};
