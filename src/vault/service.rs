//! Vault operations as the rest of the crate sees them.

use super::types::{
    DepositParams, DepositRequest, UserVaultBalance, VaultInfo, WithdrawParams, WithdrawRequest,
};
use super::{Network, VaultClient, VaultError};
use crate::interest::YieldStats;

/// `invest` applied when a deposit leaves it unset.
pub const DEFAULT_INVEST: bool = true;

/// Slippage tolerance (basis points) applied when a deposit leaves it unset.
pub const DEFAULT_SLIPPAGE_BPS: u32 = 100;

/// Wraps a [`VaultClient`] with the network it targets.
///
/// Failures are logged here, once, and then propagated unchanged.
pub struct VaultService<C> {
    client: C,
    network: Network,
}

impl<C: VaultClient> VaultService<C> {
    pub fn new(client: C, network: Network) -> Self {
        Self { client, network }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// `true` when the API reports `status: "ok"`. Never fails: any error is
    /// logged and reported as unhealthy.
    pub async fn check_health(&self) -> bool {
        match self.client.health_check().await {
            Ok(health) => health.is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "DeFindex health check failed");
                false
            }
        }
    }

    pub async fn factory_address(&self) -> Result<String, VaultError> {
        self.client
            .factory_address(self.network)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to fetch factory address"))
    }

    /// Vault metadata with fallbacks for missing fields.
    pub async fn vault_info(&self, vault: &str) -> Result<VaultInfo, VaultError> {
        let raw = self
            .client
            .vault_info(vault, self.network)
            .await
            .inspect_err(|e| tracing::error!(vault, error = %e, "failed to fetch vault info"))?;
        Ok(VaultInfo::from_raw(vault, raw))
    }

    pub async fn vault_apy(&self, vault: &str) -> Result<f64, VaultError> {
        self.client
            .vault_apy(vault, self.network)
            .await
            .inspect_err(|e| tracing::error!(vault, error = %e, "failed to fetch vault APY"))
    }

    pub async fn user_balance(
        &self,
        vault: &str,
        user: &str,
    ) -> Result<UserVaultBalance, VaultError> {
        let balance = self
            .client
            .vault_balance(vault, user, self.network)
            .await
            .inspect_err(|e| tracing::error!(vault, user, error = %e, "failed to fetch balance"))?;
        let apy = self.vault_apy(vault).await?;
        Ok(UserVaultBalance {
            shares: balance.shares,
            assets: balance.assets,
            apy,
        })
    }

    /// Builds an unsigned deposit transaction.
    ///
    /// Unset `invest` and `slippage_bps` become [`DEFAULT_INVEST`] and
    /// [`DEFAULT_SLIPPAGE_BPS`], whoever the caller is.
    pub async fn generate_deposit(&self, params: &DepositParams) -> Result<String, VaultError> {
        let request = DepositRequest {
            amounts: vec![params.amount],
            caller: params.user_address.clone(),
            invest: params.invest.unwrap_or(DEFAULT_INVEST),
            slippage_bps: params.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS),
        };
        self.client
            .deposit(&params.vault_address, &request, self.network)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    vault = %params.vault_address,
                    error = %e,
                    "failed to generate deposit transaction"
                )
            })
    }

    /// Builds an unsigned withdraw transaction.
    pub async fn generate_withdraw(&self, params: &WithdrawParams) -> Result<String, VaultError> {
        let request = WithdrawRequest {
            amount: params.amount,
            caller: params.user_address.clone(),
        };
        self.client
            .withdraw(&params.vault_address, &request, self.network)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    vault = %params.vault_address,
                    error = %e,
                    "failed to generate withdraw transaction"
                )
            })
    }

    /// Balance, APY, and simple-interest projections for one user.
    pub async fn user_yield_stats(&self, vault: &str, user: &str) -> Result<YieldStats, VaultError> {
        let balance = self.user_balance(vault, user).await?;
        Ok(YieldStats::from_balance(balance.assets, balance.apy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{MockVaultClient, VaultCall};

    fn service(client: MockVaultClient) -> VaultService<MockVaultClient> {
        VaultService::new(client, Network::Testnet)
    }

    #[tokio::test]
    async fn deposit_defaults_invest_and_slippage() {
        let svc = service(MockVaultClient::new());
        let params = DepositParams {
            vault_address: "V1".into(),
            amount: 10.0,
            user_address: "U1".into(),
            invest: None,
            slippage_bps: None,
        };
        let tx = svc.generate_deposit(&params).await.unwrap();
        assert!(tx.starts_with("MOCK-DEPOSIT-V1-"));

        let calls = svc.client().calls();
        assert_eq!(
            calls,
            vec![VaultCall::Deposit {
                vault: "V1".into(),
                request: DepositRequest {
                    amounts: vec![10.0],
                    caller: "U1".into(),
                    invest: true,
                    slippage_bps: 100,
                },
                network: Network::Testnet,
            }]
        );
    }

    #[tokio::test]
    async fn deposit_keeps_explicit_options() {
        let svc = service(MockVaultClient::new());
        let params = DepositParams {
            vault_address: "V1".into(),
            amount: 2.5,
            user_address: "U1".into(),
            invest: Some(false),
            slippage_bps: Some(25),
        };
        svc.generate_deposit(&params).await.unwrap();
        match &svc.client().calls()[0] {
            VaultCall::Deposit { request, .. } => {
                assert!(!request.invest);
                assert_eq!(request.slippage_bps, 25);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_errors_become_unhealthy() {
        assert!(service(MockVaultClient::new()).check_health().await);
        assert!(!service(MockVaultClient::new().unhealthy()).check_health().await);
        assert!(!service(MockVaultClient::failing("boom")).check_health().await);
    }

    #[tokio::test]
    async fn yield_stats_use_assets_and_apy() {
        let svc = service(MockVaultClient::new().with_balance(900.0, 1000.0).with_apy(8.5));
        let stats = svc.user_yield_stats("V1", "U1").await.unwrap();
        assert_eq!(stats.balance, 1000.0);
        assert_eq!(stats.apy, 8.5);
        assert!((stats.interest_this_month - 6.986).abs() < 1e-3);
    }

    #[tokio::test]
    async fn client_failures_propagate() {
        let svc = service(MockVaultClient::failing("upstream exploded"));
        let err = svc.vault_info("V1").await.unwrap_err();
        assert_eq!(err.to_string(), "upstream exploded");
    }
}
