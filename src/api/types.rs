//! Request and response bodies.
//!
//! Field names are camelCase on the wire to match the web frontend.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::interest::YieldStats;
use crate::vault::types::VaultInfo;

/// `POST /deposit` body. Fields stay untyped JSON here; presence and type
/// are checked by the handler so a bad field is a 400, not a parse failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositBody {
    pub vault_address: Option<Value>,
    pub amount: Option<Value>,
    pub user_address: Option<Value>,
    pub invest: Option<Value>,
    pub slippage_bps: Option<Value>,
}

/// `POST /withdraw` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawBody {
    pub vault_address: Option<Value>,
    pub amount: Option<Value>,
    pub user_address: Option<Value>,
}

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Unsigned transaction handed back for the wallet to sign.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub transaction: String,
    pub vault_address: String,
    /// The received JSON number, echoed verbatim.
    pub amount: Number,
    pub message: &'static str,
}

/// `GET /stats/{vault}/{user}` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub vault_address: String,
    pub user_address: String,
    #[serde(flatten)]
    pub stats: YieldStats,
}

/// `GET /vault/{address}` payload.
pub type VaultData = VaultInfo;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub healthy: bool,
    pub message: &'static str,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
