//! Request handlers for the proxy endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde_json::{Number, Value};

use super::AppState;
use super::error::ApiError;
use super::types::{
    ApiResponse, DepositBody, HealthResponse, StatsData, TransactionData, VaultData,
    WithdrawBody,
};
use crate::vault::VaultClient;
use crate::vault::types::{DepositParams, WithdrawParams};

const REQUIRED_FIELDS: &str = "vaultAddress, amount, and userAddress are required";
const NON_POSITIVE_AMOUNT: &str = "Amount must be greater than 0";
const AMOUNT_NOT_A_NUMBER: &str = "Amount must be a number";
const INVEST_NOT_A_BOOL: &str = "invest must be a boolean";
const SLIPPAGE_NOT_BPS: &str = "slippageBps must be a whole number of basis points";

const DEPOSIT_FAILED: &str = "Failed to generate deposit transaction";
const WITHDRAW_FAILED: &str = "Failed to generate withdraw transaction";
const VAULT_FAILED: &str = "Failed to fetch vault information";
const STATS_FAILED: &str = "Failed to fetch user statistics";

const DEPOSIT_MESSAGE: &str =
    "Deposit transaction generated successfully. Please sign with your wallet.";
const WITHDRAW_MESSAGE: &str =
    "Withdraw transaction generated successfully. Please sign with your wallet.";

/// Fields every transfer needs, checked and unpacked.
#[derive(Debug)]
struct Transfer {
    vault_address: String,
    user_address: String,
    amount: Number,
    amount_value: f64,
}

/// `null`, `false`, `0`, and `""` count as absent.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn address(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Missing or blank fields are one error; a negative amount is another.
/// A non-string address counts as missing. A numeric string amount that is
/// not positive gets the negative-amount message; any other non-number
/// amount is rejected as such.
fn validate_transfer(
    vault_address: Option<Value>,
    amount: Option<Value>,
    user_address: Option<Value>,
) -> Result<Transfer, ApiError> {
    let amount = amount.filter(|a| !is_blank(a));
    let (Some(vault_address), Some(amount), Some(user_address)) =
        (address(vault_address), amount, address(user_address))
    else {
        return Err(ApiError::Validation(REQUIRED_FIELDS));
    };

    let amount = match amount {
        Value::Number(n) => n,
        Value::String(s) => {
            return Err(match s.trim().parse::<f64>() {
                Ok(v) if v <= 0.0 => ApiError::Validation(NON_POSITIVE_AMOUNT),
                _ => ApiError::Validation(AMOUNT_NOT_A_NUMBER),
            });
        }
        _ => return Err(ApiError::Validation(AMOUNT_NOT_A_NUMBER)),
    };
    let Some(amount_value) = amount.as_f64() else {
        return Err(ApiError::Validation(AMOUNT_NOT_A_NUMBER));
    };
    if amount_value < 0.0 {
        return Err(ApiError::Validation(NON_POSITIVE_AMOUNT));
    }

    Ok(Transfer {
        vault_address,
        user_address,
        amount,
        amount_value,
    })
}

fn optional_bool(value: Option<Value>, message: &'static str) -> Result<Option<bool>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(_) => Err(ApiError::Validation(message)),
    }
}

fn optional_u32(value: Option<Value>, message: &'static str) -> Result<Option<u32>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or(ApiError::Validation(message)),
        Some(_) => Err(ApiError::Validation(message)),
    }
}

/// Builds an unsigned deposit transaction.
///
/// `POST /deposit` → 200 + `{success, data: TransactionData}`
pub async fn deposit<C: VaultClient>(
    State(state): State<Arc<AppState<C>>>,
    body: Bytes,
) -> Result<Json<ApiResponse<TransactionData>>, ApiError> {
    let body: DepositBody = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "invalid deposit body");
        ApiError::upstream(DEPOSIT_FAILED, e)
    })?;
    let transfer = validate_transfer(body.vault_address, body.amount, body.user_address)?;
    let invest = optional_bool(body.invest, INVEST_NOT_A_BOOL)?;
    let slippage_bps = optional_u32(body.slippage_bps, SLIPPAGE_NOT_BPS)?;

    let params = DepositParams {
        vault_address: transfer.vault_address,
        amount: transfer.amount_value,
        user_address: transfer.user_address,
        invest,
        slippage_bps,
    };
    let transaction = state
        .vault
        .generate_deposit(&params)
        .await
        .map_err(|e| ApiError::upstream(DEPOSIT_FAILED, e))?;

    Ok(Json(ApiResponse::ok(TransactionData {
        transaction,
        vault_address: params.vault_address,
        amount: transfer.amount,
        message: DEPOSIT_MESSAGE,
    })))
}

/// Builds an unsigned withdraw transaction.
///
/// `POST /withdraw` → 200 + `{success, data: TransactionData}`
pub async fn withdraw<C: VaultClient>(
    State(state): State<Arc<AppState<C>>>,
    body: Bytes,
) -> Result<Json<ApiResponse<TransactionData>>, ApiError> {
    let body: WithdrawBody = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "invalid withdraw body");
        ApiError::upstream(WITHDRAW_FAILED, e)
    })?;
    let transfer = validate_transfer(body.vault_address, body.amount, body.user_address)?;

    let params = WithdrawParams {
        vault_address: transfer.vault_address,
        amount: transfer.amount_value,
        user_address: transfer.user_address,
    };
    let transaction = state
        .vault
        .generate_withdraw(&params)
        .await
        .map_err(|e| ApiError::upstream(WITHDRAW_FAILED, e))?;

    Ok(Json(ApiResponse::ok(TransactionData {
        transaction,
        vault_address: params.vault_address,
        amount: transfer.amount,
        message: WITHDRAW_MESSAGE,
    })))
}

/// Vault metadata with its current APY. Both are fetched concurrently.
///
/// `GET /vault/{address}` → 200 + `{success, data: VaultInfo}`. An empty
/// segment never matches the route, so the address is always present.
pub async fn vault_info<C: VaultClient>(
    State(state): State<Arc<AppState<C>>>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<VaultData>>, ApiError> {
    let (mut info, apy) = tokio::try_join!(
        state.vault.vault_info(&address),
        state.vault.vault_apy(&address)
    )
    .map_err(|e| ApiError::upstream(VAULT_FAILED, e))?;
    info.apy = apy;

    Ok(Json(ApiResponse::ok(info)))
}

/// Balance, APY, and interest projections for one user.
///
/// `GET /stats/{vaultAddress}/{userAddress}` → 200 + `{success, data: StatsData}`
pub async fn user_stats<C: VaultClient>(
    State(state): State<Arc<AppState<C>>>,
    Path((vault_address, user_address)): Path<(String, String)>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let stats = state
        .vault
        .user_yield_stats(&vault_address, &user_address)
        .await
        .map_err(|e| ApiError::upstream(STATS_FAILED, e))?;

    Ok(Json(ApiResponse::ok(StatsData {
        vault_address,
        user_address,
        stats,
    })))
}

/// `GET /health` → 200 + `{success, healthy, message}`
pub async fn health<C: VaultClient>(State(state): State<Arc<AppState<C>>>) -> Json<HealthResponse> {
    let healthy = state.vault.check_health().await;
    Json(HealthResponse {
        success: true,
        healthy,
        message: if healthy {
            "DeFindex API is operational"
        } else {
            "DeFindex API is down"
        },
    })
}
