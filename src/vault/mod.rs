//! DeFindex yield-vault access.
//!
//! [`VaultClient`] is the raw API surface; [`DefindexHttp`] talks to the
//! real service and [`MockVaultClient`] answers from memory. [`VaultService`]
//! sits on top and applies defaults, fallbacks, and yield math.

mod error;
mod http;
mod mock;
mod service;
pub mod types;

use std::future::Future;

pub use error::VaultError;
pub use http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DefindexHttp};
pub use mock::{MockVaultClient, VaultCall};
pub use service::{DEFAULT_INVEST, DEFAULT_SLIPPAGE_BPS, VaultService};
pub use types::Network;

use types::{DepositRequest, HealthStatus, RawVaultInfo, VaultBalance, WithdrawRequest};

/// Operations exposed by the yield-vault API.
///
/// Deposit and withdraw only build an unsigned transaction; the user signs
/// it with their wallet.
pub trait VaultClient: Send + Sync + 'static {
    fn health_check(&self) -> impl Future<Output = Result<HealthStatus, VaultError>> + Send;

    fn factory_address(
        &self,
        network: Network,
    ) -> impl Future<Output = Result<String, VaultError>> + Send;

    fn vault_info(
        &self,
        vault: &str,
        network: Network,
    ) -> impl Future<Output = Result<RawVaultInfo, VaultError>> + Send;

    fn vault_apy(
        &self,
        vault: &str,
        network: Network,
    ) -> impl Future<Output = Result<f64, VaultError>> + Send;

    fn vault_balance(
        &self,
        vault: &str,
        user: &str,
        network: Network,
    ) -> impl Future<Output = Result<VaultBalance, VaultError>> + Send;

    /// Returns the unsigned deposit transaction (XDR).
    fn deposit(
        &self,
        vault: &str,
        request: &DepositRequest,
        network: Network,
    ) -> impl Future<Output = Result<String, VaultError>> + Send;

    /// Returns the unsigned withdraw transaction (XDR).
    fn withdraw(
        &self,
        vault: &str,
        request: &WithdrawRequest,
        network: Network,
    ) -> impl Future<Output = Result<String, VaultError>> + Send;
}
