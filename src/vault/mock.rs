//! In-memory vault client for offline demo mode and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::types::{DepositRequest, HealthStatus, RawVaultInfo, VaultBalance, WithdrawRequest};
use super::{Network, VaultClient, VaultError};

/// One recorded call, with the exact arguments the client received.
#[derive(Debug, Clone, PartialEq)]
pub enum VaultCall {
    HealthCheck,
    FactoryAddress {
        network: Network,
    },
    VaultInfo {
        vault: String,
        network: Network,
    },
    VaultApy {
        vault: String,
        network: Network,
    },
    VaultBalance {
        vault: String,
        user: String,
        network: Network,
    },
    Deposit {
        vault: String,
        request: DepositRequest,
        network: Network,
    },
    Withdraw {
        vault: String,
        request: WithdrawRequest,
        network: Network,
    },
}

/// Vault client answering from fixed values and logging every call.
///
/// Transactions are deterministic strings of the form
/// `MOCK-DEPOSIT-{vault}-{n}`.
#[derive(Debug)]
pub struct MockVaultClient {
    pub healthy: bool,
    pub factory: String,
    pub info: RawVaultInfo,
    pub apy: f64,
    pub balance: VaultBalance,
    failure: Option<String>,
    next_tx: AtomicU64,
    calls: Mutex<Vec<VaultCall>>,
}

impl Default for MockVaultClient {
    fn default() -> Self {
        Self {
            healthy: true,
            factory: "CFACTORYMOCK".to_string(),
            info: RawVaultInfo {
                name: Some("BeEnergy Solar Vault".to_string()),
                symbol: Some("BEV".to_string()),
                total_assets: Some(250_000.0),
                apy: Some(8.5),
            },
            apy: 8.5,
            balance: VaultBalance {
                shares: 1234.0,
                assets: 1234.0,
            },
            failure: None,
            next_tx: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockVaultClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails with `VaultError::Other(message)`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_apy(mut self, apy: f64) -> Self {
        self.apy = apy;
        self
    }

    pub fn with_balance(mut self, shares: f64, assets: f64) -> Self {
        self.balance = VaultBalance { shares, assets };
        self
    }

    pub fn with_info(mut self, info: RawVaultInfo) -> Self {
        self.info = info;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Snapshot of the calls received so far.
    pub fn calls(&self) -> Vec<VaultCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: VaultCall) -> Result<(), VaultError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        match &self.failure {
            Some(message) => Err(VaultError::Other(message.clone())),
            None => Ok(()),
        }
    }

    fn transaction(&self, kind: &str, vault: &str) -> String {
        let n = self.next_tx.fetch_add(1, Ordering::Relaxed);
        format!("MOCK-{kind}-{vault}-{n}")
    }
}

impl VaultClient for MockVaultClient {
    async fn health_check(&self) -> Result<HealthStatus, VaultError> {
        self.record(VaultCall::HealthCheck)?;
        let status = if self.healthy { "ok" } else { "degraded" };
        Ok(HealthStatus {
            status: status.to_string(),
        })
    }

    async fn factory_address(&self, network: Network) -> Result<String, VaultError> {
        self.record(VaultCall::FactoryAddress { network })?;
        Ok(self.factory.clone())
    }

    async fn vault_info(&self, vault: &str, network: Network) -> Result<RawVaultInfo, VaultError> {
        self.record(VaultCall::VaultInfo {
            vault: vault.to_string(),
            network,
        })?;
        Ok(self.info.clone())
    }

    async fn vault_apy(&self, vault: &str, network: Network) -> Result<f64, VaultError> {
        self.record(VaultCall::VaultApy {
            vault: vault.to_string(),
            network,
        })?;
        Ok(self.apy)
    }

    async fn vault_balance(
        &self,
        vault: &str,
        user: &str,
        network: Network,
    ) -> Result<VaultBalance, VaultError> {
        self.record(VaultCall::VaultBalance {
            vault: vault.to_string(),
            user: user.to_string(),
            network,
        })?;
        Ok(self.balance.clone())
    }

    async fn deposit(
        &self,
        vault: &str,
        request: &DepositRequest,
        network: Network,
    ) -> Result<String, VaultError> {
        self.record(VaultCall::Deposit {
            vault: vault.to_string(),
            request: request.clone(),
            network,
        })?;
        Ok(self.transaction("DEPOSIT", vault))
    }

    async fn withdraw(
        &self,
        vault: &str,
        request: &WithdrawRequest,
        network: Network,
    ) -> Result<String, VaultError> {
        self.record(VaultCall::Withdraw {
            vault: vault.to_string(),
            request: request.clone(),
            network,
        })?;
        Ok(self.transaction("WITHDRAW", vault))
    }
}
