/*
[INPUT]:  Session handle and wallet capability
[OUTPUT]: Wallet catalog and the wallet selection controller
[POS]:    Flow layer - user-facing sign-in steps
[UPDATE]: When adding providers or selection steps
*/

pub mod catalog;
pub mod modal;

pub use catalog::{CATALOG, PHANTOM, SOLFLARE, WalletProvider, find_provider, truncate_address};
pub use modal::{FlowState, InstallPrompt, LogInstallPrompt, WalletOption, WalletSelectionFlow};
