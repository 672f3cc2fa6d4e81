//! Wallet session state machine.

use std::fmt;

use super::profile::UserProfile;
use super::store::{KeyValueStore, RetrievalMode, TypedStoreExt, keys};
use super::wallet::WalletConnector;
use super::SessionError;

/// Where a session is in its lifecycle.
///
/// `Disconnected → Connecting → ConnectedNoProfile → Ready`, and back to
/// `Disconnected` on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    ConnectedNoProfile,
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::ConnectedNoProfile => "connected (no profile)",
            SessionState::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Screens of the dashboard application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Dashboard,
    Marketplace,
    Activity,
    Consumption,
    Profile,
}

impl View {
    /// Everything but the landing page needs a connected wallet.
    pub fn is_protected(self) -> bool {
        !matches!(self, View::Landing)
    }
}

/// `GABCDE...WXYZ` form of an address. Addresses of ten characters or
/// fewer are returned whole.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// One user's wallet session.
///
/// Owns its store and wallet connector. Build with [`SessionManager::restore`];
/// tear down with [`SessionManager::disconnect`].
#[derive(Debug)]
pub struct SessionManager<S, W> {
    store: S,
    wallet: W,
    state: SessionState,
    address: Option<String>,
    profile: Option<UserProfile>,
}

impl<S: KeyValueStore, W: WalletConnector> SessionManager<S, W> {
    /// Rebuilds the session from persisted keys.
    ///
    /// A stored address restores a connected session; a stored profile next
    /// to it makes it `Ready`. If the profile cannot be decoded, both keys
    /// are removed and the session starts disconnected.
    pub fn restore(mut store: S, wallet: W) -> Result<Self, SessionError> {
        let address = store
            .get_json::<String>(keys::WALLET_ADDRESS, RetrievalMode::Raw)?
            .filter(|a| !a.is_empty());

        let session = match address {
            None => Self::disconnected(store, wallet),
            Some(address) => {
                match store.get_json::<UserProfile>(keys::USER_PROFILE, RetrievalMode::Fail) {
                    Ok(profile) => Self {
                        state: if profile.is_some() {
                            SessionState::Ready
                        } else {
                            SessionState::ConnectedNoProfile
                        },
                        address: Some(address),
                        profile,
                        store,
                        wallet,
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding unreadable saved session");
                        store.remove(keys::USER_PROFILE)?;
                        store.remove(keys::WALLET_ADDRESS)?;
                        Self::disconnected(store, wallet)
                    }
                }
            }
        };

        if let Some(address) = &session.address {
            tracing::debug!(address = %short_address(address), state = %session.state, "session restored");
        }
        Ok(session)
    }

    fn disconnected(store: S, wallet: W) -> Self {
        Self {
            store,
            wallet,
            state: SessionState::Disconnected,
            address: None,
            profile: None,
        }
    }

    fn derive_state(&self) -> SessionState {
        match (&self.address, &self.profile) {
            (None, _) => SessionState::Disconnected,
            (Some(_), None) => SessionState::ConnectedNoProfile,
            (Some(_), Some(_)) => SessionState::Ready,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            SessionState::ConnectedNoProfile | SessionState::Ready
        )
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn short_address(&self) -> Option<String> {
        self.address.as_deref().map(short_address)
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Whether `view` may be shown in the current state.
    pub fn can_view(&self, view: View) -> bool {
        !view.is_protected() || self.is_connected()
    }

    /// Connects the wallet and persists its address.
    ///
    /// Already-connected sessions return their address without a new
    /// handshake. A failed handshake is reported once, the session goes back
    /// to `Disconnected`, and nothing is retried.
    pub async fn connect(&mut self) -> Result<&str, SessionError> {
        if self.is_connected() {
            return self.address.as_deref().ok_or(SessionError::NotConnected);
        }

        self.state = SessionState::Connecting;
        let address = match self.wallet.connect().await {
            Ok(address) => address,
            Err(e) => {
                tracing::error!(error = %e, "wallet connection failed");
                self.state = SessionState::Disconnected;
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.set(keys::WALLET_ADDRESS, &address) {
            self.state = SessionState::Disconnected;
            return Err(e.into());
        }

        tracing::info!(address = %short_address(&address), "wallet connected");
        self.address = Some(address);
        self.state = self.derive_state();
        self.address.as_deref().ok_or(SessionError::NotConnected)
    }

    /// Clears the session and both persisted keys, whatever the state.
    ///
    /// Both removals are attempted even if the first fails; the first error
    /// is returned.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        self.address = None;
        self.profile = None;
        self.state = SessionState::Disconnected;
        let profile = self.store.remove(keys::USER_PROFILE);
        let address = self.store.remove(keys::WALLET_ADDRESS);
        profile.and(address)?;
        tracing::info!("wallet disconnected");
        Ok(())
    }

    /// Saves the profile and moves the session to `Ready`.
    pub fn set_profile(&mut self, profile: UserProfile) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.store.set_json(keys::USER_PROFILE, &profile)?;
        self.profile = Some(profile);
        self.state = SessionState::Ready;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::{MemoryStore, StorageError};
    use crate::session::wallet::{DEMO_ADDRESS, SimulatedWallet, WalletError};
    use std::time::Duration;

    fn fresh() -> SessionManager<MemoryStore, SimulatedWallet> {
        SessionManager::restore(MemoryStore::new(), SimulatedWallet::instant(DEMO_ADDRESS)).unwrap()
    }

    /// Memory store whose removals of one key always fail.
    struct StuckKey {
        inner: MemoryStore,
        stuck: &'static str,
    }

    impl KeyValueStore for StuckKey {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            if key == self.stuck {
                return Err(StorageError::Io {
                    path: "stuck".into(),
                    source: std::io::Error::other("read-only"),
                });
            }
            self.inner.remove(key)
        }
        fn keys(&self) -> Result<Vec<String>, StorageError> {
            self.inner.keys()
        }
        fn clear(&mut self) -> Result<(), StorageError> {
            self.inner.clear()
        }
    }

    #[tokio::test]
    async fn disconnect_clears_address_even_when_profile_removal_fails() {
        let store = StuckKey {
            inner: MemoryStore::new(),
            stuck: keys::USER_PROFILE,
        };
        let mut s = SessionManager::restore(store, SimulatedWallet::instant(DEMO_ADDRESS)).unwrap();
        s.connect().await.unwrap();
        s.set_profile(UserProfile::new("Ana", None).unwrap()).unwrap();

        assert!(s.disconnect().is_err());
        assert_eq!(s.state(), SessionState::Disconnected);
        assert_eq!(s.store().get(keys::WALLET_ADDRESS).unwrap(), None);
    }

    #[test]
    fn short_address_format() {
        assert_eq!(short_address(DEMO_ADDRESS), "G4K2VX...X9B1");
        assert_eq!(short_address("GSHORT"), "GSHORT");
    }

    #[test]
    fn empty_store_restores_disconnected() {
        let s = fresh();
        assert_eq!(s.state(), SessionState::Disconnected);
        assert!(!s.can_view(View::Dashboard));
        assert!(s.can_view(View::Landing));
    }

    #[tokio::test]
    async fn connect_then_profile_reaches_ready() {
        let mut s = fresh();
        assert_eq!(s.connect().await.unwrap(), DEMO_ADDRESS);
        assert_eq!(s.state(), SessionState::ConnectedNoProfile);
        assert_eq!(
            s.store().get(keys::WALLET_ADDRESS).unwrap().as_deref(),
            Some(DEMO_ADDRESS)
        );

        s.set_profile(UserProfile::new("Ana", None).unwrap()).unwrap();
        assert_eq!(s.state(), SessionState::Ready);
        assert!(s.can_view(View::Marketplace));
    }

    #[tokio::test]
    async fn failed_connect_returns_to_disconnected() {
        let wallet = SimulatedWallet::new(DEMO_ADDRESS, Duration::ZERO, 1.0, 1);
        let mut s = SessionManager::restore(MemoryStore::new(), wallet).unwrap();
        let err = s.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::Wallet(WalletError::Unavailable)));
        assert_eq!(s.state(), SessionState::Disconnected);
        assert_eq!(s.store().get(keys::WALLET_ADDRESS).unwrap(), None);
    }

    #[tokio::test]
    async fn disconnect_clears_both_keys() {
        let mut s = fresh();
        s.connect().await.unwrap();
        s.set_profile(UserProfile::new("Ana", None).unwrap()).unwrap();
        s.disconnect().unwrap();

        assert_eq!(s.state(), SessionState::Disconnected);
        assert_eq!(s.address(), None);
        assert_eq!(s.profile(), None);
        assert_eq!(s.store().get(keys::WALLET_ADDRESS).unwrap(), None);
        assert_eq!(s.store().get(keys::USER_PROFILE).unwrap(), None);
    }

    #[test]
    fn disconnect_when_never_connected_clears_stale_profile() {
        let mut store = MemoryStore::new();
        store.set(keys::USER_PROFILE, r#"{"name":"Old","avatar":null}"#).unwrap();
        let mut s = SessionManager::restore(store, SimulatedWallet::instant(DEMO_ADDRESS)).unwrap();
        assert_eq!(s.state(), SessionState::Disconnected);

        s.disconnect().unwrap();
        assert_eq!(s.store().get(keys::USER_PROFILE).unwrap(), None);
        assert_eq!(s.store().get(keys::WALLET_ADDRESS).unwrap(), None);
    }

    #[test]
    fn set_profile_requires_connection() {
        let mut s = fresh();
        let err = s.set_profile(UserProfile::new("Ana", None).unwrap());
        assert!(matches!(err, Err(SessionError::NotConnected)));
    }

    #[test]
    fn restore_ready_session() {
        let mut store = MemoryStore::new();
        store.set(keys::WALLET_ADDRESS, DEMO_ADDRESS).unwrap();
        store
            .set(keys::USER_PROFILE, r#"{"name":"Ana","avatar":null}"#)
            .unwrap();
        let s = SessionManager::restore(store, SimulatedWallet::instant(DEMO_ADDRESS)).unwrap();
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(s.profile().map(|p| p.name.as_str()), Some("Ana"));
        assert_eq!(s.short_address().as_deref(), Some("G4K2VX...X9B1"));
    }

    #[test]
    fn restore_address_only_is_connected_without_profile() {
        let mut store = MemoryStore::new();
        store.set(keys::WALLET_ADDRESS, DEMO_ADDRESS).unwrap();
        let s = SessionManager::restore(store, SimulatedWallet::instant(DEMO_ADDRESS)).unwrap();
        assert_eq!(s.state(), SessionState::ConnectedNoProfile);
    }

    #[test]
    fn restore_with_corrupt_profile_clears_everything() {
        let mut store = MemoryStore::new();
        store.set(keys::WALLET_ADDRESS, DEMO_ADDRESS).unwrap();
        store.set(keys::USER_PROFILE, "{not json").unwrap();
        let s = SessionManager::restore(store, SimulatedWallet::instant(DEMO_ADDRESS)).unwrap();
        assert_eq!(s.state(), SessionState::Disconnected);
        let store = s.into_store();
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_when_connected_skips_handshake() {
        let mut store = MemoryStore::new();
        store.set(keys::WALLET_ADDRESS, "GALREADYCONNECTED000").unwrap();
        // A wallet that would always fail proves no second handshake happens.
        let wallet = SimulatedWallet::new(DEMO_ADDRESS, Duration::ZERO, 1.0, 1);
        let mut s = SessionManager::restore(store, wallet).unwrap();
        assert_eq!(s.connect().await.unwrap(), "GALREADYCONNECTED000");
    }
}
