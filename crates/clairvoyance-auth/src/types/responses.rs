/*
[INPUT]:  Clairvoyance auth API responses
[OUTPUT]: Typed response structs with deserialization support
[POS]:    Data layer - response payloads
[UPDATE]: When auth response schema changes
*/

use serde::{Deserialize, Serialize};

use super::models::User;

/// Single-use challenge issued by `POST /auth/connect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub nonce: String,
    pub message: String,
}

/// Response of `POST /auth/verify`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub access_token: String,
    pub user: User,
}

/// Error body returned by the API on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Human readable detail, if the server sent one
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_string_detail() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"detail": "Invalid signature"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Invalid signature"));
    }

    #[test]
    fn test_error_body_structured_detail() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"detail": [{"msg": "field required"}]}"#).unwrap();
        assert!(body.message().unwrap().contains("field required"));
    }

    #[test]
    fn test_error_body_missing_detail() {
        let body: ApiErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message().is_none());
    }
}
