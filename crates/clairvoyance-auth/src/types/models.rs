/*
[INPUT]:  User profile JSON returned by the auth endpoints
[OUTPUT]: Typed user profile with balances and trading stats
[POS]:    Data layer - cached copy of the server-owned profile
[UPDATE]: When the profile schema changes
*/

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Profile of the wallet holder, owned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub fee_accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<UserBalance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<UserStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBalance {
    pub simulation: Decimal,
    pub real: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub win_rate: Decimal,
    #[serde(default)]
    pub total_profit: Decimal,
    #[serde(default)]
    pub simulation_profit: Decimal,
    #[serde(default)]
    pub real_profit: Decimal,
}

impl User {
    /// Parse `created_at` as UTC.
    ///
    /// Accepts RFC 3339 and naive ISO 8601 timestamps (treated as UTC).
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
