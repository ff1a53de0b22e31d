/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for clairvoyance-auth tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use clairvoyance_auth::{
    ApiClient, ClientConfig, MemorySessionStore, MockWallet, SessionHandle, SessionSnapshot,
    WalletAdapter, WalletCapability,
};
use ed25519_dalek::{Signer, SigningKey};
use tokio::sync::watch;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ADDRESS: &str = "Addr1";
pub const NONCE: &str = "n1";
pub const MESSAGE: &str = "Sign in to Clairvoyance: n1";
pub const TOKEN: &str = "tok1";
pub const SEED: [u8; 32] = [7u8; 32];

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Phantom mock that reports `Addr1` and signs with [`SEED`]
pub fn phantom() -> Arc<MockWallet> {
    Arc::new(MockWallet::from_seed("Phantom", SEED).with_address(ADDRESS))
}

pub fn session_for(
    server: &MockServer,
    wallet: Arc<MockWallet>,
    store: MemorySessionStore,
) -> SessionHandle {
    let client = ApiClient::with_config(ClientConfig::with_base_url(server.uri()))
        .expect("client init");
    let wallets = vec![wallet as Arc<dyn WalletAdapter>];
    SessionHandle::new(client, WalletCapability::new(wallets), Arc::new(store))
}

/// Base58 signature the [`SEED`] key produces over `message`
pub fn expected_signature(message: &str) -> String {
    let key = SigningKey::from_bytes(&SEED);
    bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string()
}

pub fn user_json(fee_accepted: bool) -> serde_json::Value {
    serde_json::json!({
        "wallet_address": ADDRESS,
        "created_at": "2024-05-01T12:00:00",
        "fee_accepted": fee_accepted,
        "balance": {"simulation": 10000, "real": 0},
        "stats": {
            "total_trades": 3,
            "win_rate": 66.7,
            "total_profit": 12.5,
            "simulation_profit": 12.5,
            "real_profit": 0
        }
    })
}

pub async fn mount_challenge(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/connect"))
        .and(body_json(serde_json::json!({"wallet_address": ADDRESS})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nonce": NONCE,
            "message": MESSAGE,
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Verify endpoint accepting exactly the [`SEED`] signature
pub async fn mount_verify(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .and(body_json(serde_json::json!({
            "wallet_address": ADDRESS,
            "signature": expected_signature(MESSAGE),
            "message": MESSAGE,
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(serde_json::json!({
                    "access_token": TOKEN,
                    "user": user_json(false),
                })),
        )
        .mount(server)
        .await;
}

pub async fn mount_user(server: &MockServer, template: ResponseTemplate, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/auth/user"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(template);
    let mock = match times {
        Some(times) => mock.up_to_n_times(times),
        None => mock,
    };
    mock.mount(server).await;
}

/// Select and connect the Phantom mock
pub async fn connect_phantom(session: &SessionHandle) {
    session.wallet().select("Phantom").expect("select phantom");
    session.wallet().connect().await.expect("connect phantom");
}

/// Wait until the session satisfies `predicate`, failing after five seconds
pub async fn wait_for_session(
    rx: &mut watch::Receiver<SessionSnapshot>,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("session state timed out")
        .expect("session dropped");
}
