/*
[INPUT]:  Path to a Solana keypair file (CLAIRVOYANCE_KEYPAIR)
[OUTPUT]: Console output of the authenticated profile
[POS]:    Examples - headless challenge/response login
[UPDATE]: When SessionHandle or KeypairWallet API changes
*/

//! Example: sign in with a local keypair file instead of a browser wallet

use std::sync::Arc;

use clairvoyance_auth::{
    ApiClient, KeypairWallet, MemorySessionStore, SessionHandle, WalletAdapter, WalletCapability,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let keypair_path = std::env::var("CLAIRVOYANCE_KEYPAIR")
        .unwrap_or_else(|_| "./.clairvoyance/id.json".to_string());

    // Step 1: one wallet backed by the keypair file
    let wallet: Arc<dyn WalletAdapter> =
        Arc::new(KeypairWallet::new("Keypair", "https://docs.solana.com/cli", keypair_path));
    let session = SessionHandle::new(
        ApiClient::new()?,
        WalletCapability::new(vec![wallet]),
        Arc::new(MemorySessionStore::new()),
    );

    println!("=== Clairvoyance Keypair Login Example ===");

    // Step 2: nothing stored, so bootstrap settles on anonymous
    session.bootstrap().await;

    // Step 3: connect, then run the challenge/response exchange
    session.wallet().select("Keypair")?;
    session.wallet().connect().await?;
    let outcome = session.login().await?;
    println!("Login outcome: {:?}", outcome);

    if let Some(user) = session.snapshot().user {
        println!("Signed in as {}", user.wallet_address);
        println!("Fees accepted: {}", user.fee_accepted);
    }

    session.logout();
    Ok(())
}
