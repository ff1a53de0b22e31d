/*
[INPUT]:  Wallet address, signature, and challenge message
[OUTPUT]: Typed request bodies for the auth endpoints
[POS]:    Data layer - request payloads
[UPDATE]: When auth request schema changes
*/

use serde::{Deserialize, Serialize};

/// Body of `POST /auth/connect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub wallet_address: String,
}

/// Body of `POST /auth/verify`
///
/// `signature` is the base58 encoding of the raw wallet signature over the
/// UTF-8 bytes of `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub wallet_address: String,
    pub signature: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptFeesRequest {
    pub accepted: bool,
}
