/*
[INPUT]:  CLI configuration (key file locations)
[OUTPUT]: Wallet adapters for every catalog provider
[POS]:    Wallet wiring - maps providers onto local keypair files
[UPDATE]: When providers are added or key file lookup changes
*/

use std::sync::Arc;

use clairvoyance_auth::flow::CATALOG;
use clairvoyance_auth::{KeypairWallet, WalletAdapter};

use crate::config::CliConfig;

/// One keypair-backed adapter per catalog entry, in catalog order.
///
/// A provider counts as installed when its key file exists.
pub fn build_wallets(config: &CliConfig) -> Vec<Arc<dyn WalletAdapter>> {
    CATALOG
        .iter()
        .map(|provider| {
            let path = config.keypair_path(provider.name);
            Arc::new(KeypairWallet::new(provider.name, provider.url, path)) as Arc<dyn WalletAdapter>
        })
        .collect()
}
