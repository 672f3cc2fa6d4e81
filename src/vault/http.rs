//! reqwest-backed client for the DeFindex REST API.
//!
//! Routes (all take `?network=testnet|mainnet` except `/health`):
//! - `GET  /health` → `{status}`
//! - `GET  /factory/address` → `{address}`
//! - `GET  /vault/{vault}` → vault metadata
//! - `GET  /vault/{vault}/apy` → `{apy}`
//! - `GET  /vault/{vault}/balance?from={user}` → `{shares, assets}`
//! - `POST /vault/{vault}/deposit` → `{xdr}`
//! - `POST /vault/{vault}/withdraw` → `{xdr}`

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    ApyResponse, DepositRequest, FactoryResponse, HealthStatus, RawVaultInfo, TransactionResponse,
    VaultBalance, WithdrawRequest,
};
use super::{Network, VaultClient, VaultError};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.defindex.io";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the DeFindex API, authenticated with a bearer API key.
///
/// Vault and user addresses are always sent as single percent-encoded path
/// segments or query values, never spliced into the URL text.
#[derive(Clone)]
pub struct DefindexHttp {
    base_url: Url,
    api_key: String,
    client: Client,
}

impl DefindexHttp {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MissingApiKey`] when `api_key` is blank,
    /// [`VaultError::InvalidBaseUrl`] when `base_url` is not an absolute
    /// http(s) URL, or a reqwest error if the client cannot be built.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, VaultError> {
        if api_key.trim().is_empty() {
            return Err(VaultError::MissingApiKey);
        }

        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| VaultError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(VaultError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            base_url: base,
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base can always take path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `/vault/{vault}` followed by `suffix`. Dot segments would be dropped
    /// or resolved by the URL parser, so they are refused.
    fn vault_url(&self, vault: &str, suffix: &[&str]) -> Result<Url, VaultError> {
        if vault.is_empty() || vault == "." || vault == ".." {
            return Err(VaultError::InvalidAddress(vault.to_string()));
        }
        let mut segments = vec!["vault", vault];
        segments.extend_from_slice(suffix);
        Ok(self.endpoint(&segments))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, VaultError> {
        self.send(self.client.get(url).query(query)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, VaultError> {
        self.send(self.client.post(url).query(query).json(body))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, VaultError> {
        let resp = req.bearer_auth(&self.api_key).send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }

        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), %body, "DeFindex request rejected");
        Err(VaultError::from_status(status.as_u16(), body))
    }
}

impl VaultClient for DefindexHttp {
    async fn health_check(&self) -> Result<HealthStatus, VaultError> {
        self.get(self.endpoint(&["health"]), &[]).await
    }

    async fn factory_address(&self, network: Network) -> Result<String, VaultError> {
        let url = self.endpoint(&["factory", "address"]);
        let resp: FactoryResponse = self.get(url, &[("network", network.as_str())]).await?;
        Ok(resp.address)
    }

    async fn vault_info(&self, vault: &str, network: Network) -> Result<RawVaultInfo, VaultError> {
        let url = self.vault_url(vault, &[])?;
        self.get(url, &[("network", network.as_str())]).await
    }

    async fn vault_apy(&self, vault: &str, network: Network) -> Result<f64, VaultError> {
        let url = self.vault_url(vault, &["apy"])?;
        let resp: ApyResponse = self.get(url, &[("network", network.as_str())]).await?;
        Ok(resp.apy)
    }

    async fn vault_balance(
        &self,
        vault: &str,
        user: &str,
        network: Network,
    ) -> Result<VaultBalance, VaultError> {
        let url = self.vault_url(vault, &["balance"])?;
        self.get(url, &[("from", user), ("network", network.as_str())])
            .await
    }

    async fn deposit(
        &self,
        vault: &str,
        request: &DepositRequest,
        network: Network,
    ) -> Result<String, VaultError> {
        let url = self.vault_url(vault, &["deposit"])?;
        let resp: TransactionResponse = self
            .post(url, &[("network", network.as_str())], request)
            .await?;
        Ok(resp.xdr)
    }

    async fn withdraw(
        &self,
        vault: &str,
        request: &WithdrawRequest,
        network: Network,
    ) -> Result<String, VaultError> {
        let url = self.vault_url(vault, &["withdraw"])?;
        let resp: TransactionResponse = self
            .post(url, &[("network", network.as_str())], request)
            .await?;
        Ok(resp.xdr)
    }
}
