//! Wallet session: persistent store, wallet handshake, profile, and the
//! session state machine tying them together.

pub mod manager;
pub mod profile;
pub mod store;
pub mod wallet;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use manager::{SessionManager, SessionState, View, short_address};
pub use profile::{UserProfile, avatar_data_uri, load_avatar};
pub use store::{FileStore, KeyValueStore, MemoryStore, RetrievalMode, StorageError, TypedStoreExt};
pub use wallet::{DEMO_ADDRESS, SimulatedWallet, WalletConnector, WalletError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("no wallet connected")]
    NotConnected,

    #[error("profile name must not be empty")]
    EmptyProfileName,

    #[error("cannot read avatar \"{}\": {source}", path.display())]
    Avatar {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("avatar \"{0}\" is not a supported image (png, jpg, gif, webp, svg)")]
    UnsupportedAvatar(String),
}
