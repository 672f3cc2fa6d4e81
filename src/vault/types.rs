//! Vault data types: wire shapes returned by the DeFindex API and the
//! normalized records handed to callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stellar network a vault lives on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    /// Query-string value understood by the DeFindex API.
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    /// Accepts `testnet`/`mainnet` plus the Stellar passphrase aliases
    /// `TESTNET`/`PUBLIC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" | "public" => Ok(Network::Mainnet),
            other => Err(format!(
                "unknown network \"{other}\", expected \"testnet\" or \"mainnet\""
            )),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Vault metadata as returned by the API. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawVaultInfo {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub total_assets: Option<f64>,
    pub apy: Option<f64>,
}

/// Normalized vault metadata with fallbacks applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub total_assets: f64,
    pub apy: f64,
}

impl VaultInfo {
    pub const UNKNOWN_NAME: &'static str = "Unknown Vault";
    pub const DEFAULT_SYMBOL: &'static str = "VAULT";

    /// Fills missing fields with `"Unknown Vault"`, `"VAULT"`, and zeros.
    pub fn from_raw(address: &str, raw: RawVaultInfo) -> Self {
        Self {
            address: address.to_string(),
            name: raw
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| Self::UNKNOWN_NAME.to_string()),
            symbol: raw
                .symbol
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_SYMBOL.to_string()),
            total_assets: raw.total_assets.unwrap_or(0.0),
            apy: raw.apy.unwrap_or(0.0),
        }
    }
}

/// `GET /vault/{address}/apy` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApyResponse {
    pub apy: f64,
}

/// `GET /factory/address` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryResponse {
    pub address: String,
}

/// A user's position in a vault.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultBalance {
    pub shares: f64,
    pub assets: f64,
}

/// Position plus the vault's current APY.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserVaultBalance {
    pub shares: f64,
    pub assets: f64,
    pub apy: f64,
}

/// Unsigned transaction returned by deposit/withdraw endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub xdr: String,
}

/// Deposit as submitted by a caller. Unset options are defaulted by the
/// service layer before anything reaches the client.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositParams {
    pub vault_address: String,
    pub amount: f64,
    pub user_address: String,
    pub invest: Option<bool>,
    pub slippage_bps: Option<u32>,
}

/// Withdrawal as submitted by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawParams {
    pub vault_address: String,
    pub amount: f64,
    pub user_address: String,
}

/// Deposit body sent to the vault API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub amounts: Vec<f64>,
    pub caller: String,
    pub invest: bool,
    pub slippage_bps: u32,
}

/// Withdraw body sent to the vault API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: f64,
    pub caller: String,
}
