//! Wallet-extension handshake.

use std::future::Future;
use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

/// Address handed out by the demo wallet.
pub const DEMO_ADDRESS: &str = "G4K2VXNJ5WQRTHGFDSAPLMNBVCXZAQWERTYUIOP9X9B1";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("could not connect to the wallet extension; make sure it is installed")]
    Unavailable,

    #[error("wallet rejected the connection: {0}")]
    Rejected(String),
}

/// Something that can hand back a wallet address after a handshake.
pub trait WalletConnector: Send {
    /// Performs the handshake and returns the connected address.
    fn connect(&mut self) -> impl Future<Output = Result<String, WalletError>> + Send;
}

/// Demo wallet: waits `delay`, then fails with probability `failure_rate`
/// or returns a fixed address. The RNG is seeded so runs are repeatable.
#[derive(Debug, Clone)]
pub struct SimulatedWallet {
    address: String,
    delay: Duration,
    failure_rate: f64,
    rng: StdRng,
}

impl SimulatedWallet {
    /// `failure_rate` is clamped to `[0.0, 1.0]`.
    pub fn new(address: &str, delay: Duration, failure_rate: f64, seed: u64) -> Self {
        Self {
            address: address.to_string(),
            delay,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A wallet that connects immediately and never fails.
    pub fn instant(address: &str) -> Self {
        Self::new(address, Duration::ZERO, 0.0, 0)
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl WalletConnector for SimulatedWallet {
    async fn connect(&mut self) -> Result<String, WalletError> {
        if self.rng.random_bool(self.failure_rate) {
            return Err(WalletError::Unavailable);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.address.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn instant_wallet_connects() {
        let mut wallet = SimulatedWallet::instant(DEMO_ADDRESS);
        assert_eq!(wallet.connect().await.unwrap(), DEMO_ADDRESS);
    }

    #[tokio::test]
    async fn certain_failure_always_fails() {
        let mut wallet = SimulatedWallet::new(DEMO_ADDRESS, Duration::ZERO, 1.0, 7);
        for _ in 0..5 {
            assert_eq!(wallet.connect().await, Err(WalletError::Unavailable));
        }
    }

    #[test]
    fn failure_rate_is_clamped() {
        assert_eq!(
            SimulatedWallet::new("G", Duration::ZERO, 3.0, 0).failure_rate(),
            1.0
        );
        assert_eq!(
            SimulatedWallet::new("G", Duration::ZERO, -1.0, 0).failure_rate(),
            0.0
        );
    }

    #[tokio::test]
    async fn same_seed_same_outcomes() {
        let mut a = SimulatedWallet::new(DEMO_ADDRESS, Duration::ZERO, 0.5, 42);
        let mut b = SimulatedWallet::new(DEMO_ADDRESS, Duration::ZERO, 0.5, 42);
        for _ in 0..20 {
            assert_eq!(a.connect().await, b.connect().await);
        }
    }

    #[tokio::test]
    async fn connect_waits_for_delay() {
        let mut wallet = SimulatedWallet::new(DEMO_ADDRESS, Duration::from_millis(30), 0.0, 0);
        let start = std::time::Instant::now();
        wallet.connect().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
