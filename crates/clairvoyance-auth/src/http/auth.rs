/*
[INPUT]:  Wallet address, signed challenge, bearer token
[OUTPUT]: Challenges, access tokens, and user profiles
[POS]:    HTTP layer - auth endpoints of the remote authority
[UPDATE]: When auth endpoints or payloads change
*/

use reqwest::Method;

use crate::http::{ApiClient, Result};
use crate::types::{AcceptFeesRequest, Challenge, ConnectRequest, User, VerifyRequest, VerifyResponse};

impl ApiClient {
    /// Request a single-use challenge for a wallet address
    ///
    /// POST /auth/connect
    pub async fn connect(&self, wallet_address: &str) -> Result<Challenge> {
        let body = ConnectRequest {
            wallet_address: wallet_address.to_string(),
        };
        let builder = self.request(Method::POST, "/auth/connect")?.json(&body);
        self.send_json(builder).await
    }

    /// Exchange a signed challenge for an access token
    ///
    /// POST /auth/verify
    pub async fn verify(
        &self,
        wallet_address: &str,
        signature: &str,
        message: &str,
    ) -> Result<VerifyResponse> {
        let body = VerifyRequest {
            wallet_address: wallet_address.to_string(),
            signature: signature.to_string(),
            message: message.to_string(),
        };
        let builder = self.request(Method::POST, "/auth/verify")?.json(&body);
        self.send_json(builder).await
    }

    /// Fetch the profile of the token holder
    ///
    /// GET /auth/user
    pub async fn get_user(&self, token: &str) -> Result<User> {
        let builder = self.authorized_request(Method::GET, "/auth/user", token)?;
        self.send_json(builder).await
    }

    /// Record whether the user accepted the platform fees
    ///
    /// POST /auth/accept-fees
    pub async fn accept_fees(&self, token: &str, accepted: bool) -> Result<()> {
        let builder = self
            .authorized_request(Method::POST, "/auth/accept-fees", token)?
            .json(&AcceptFeesRequest { accepted });
        let _: serde_json::Value = self.send_json(builder).await?;
        Ok(())
    }
}
