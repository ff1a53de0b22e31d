/*
[INPUT]:  Nothing (static data)
[OUTPUT]: Supported wallet providers and address display helpers
[POS]:    Flow layer - fixed provider catalog shown by the selection flow
[UPDATE]: When adding or removing supported wallets
*/

/// A wallet provider the client knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletProvider {
    pub name: &'static str,
    /// Install page opened when the provider is missing
    pub url: &'static str,
    pub icon: &'static str,
}

pub const PHANTOM: WalletProvider = WalletProvider {
    name: "Phantom",
    url: "https://phantom.app/",
    icon: "/logo-phantom.png",
};

pub const SOLFLARE: WalletProvider = WalletProvider {
    name: "Solflare",
    url: "https://solflare.com/",
    icon: "/logo-solflare.png",
};

/// Providers offered by the selection flow, in display order
pub static CATALOG: [WalletProvider; 2] = [PHANTOM, SOLFLARE];

pub fn find_provider(name: &str) -> Option<&'static WalletProvider> {
    CATALOG.iter().find(|provider| provider.name == name)
}

/// Short display form of an address: first and last four characters
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 8 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
