//! BeEnergy: tokenized solar energy marketplace backend.
//!
//! A proxy in front of the DeFindex yield-vault API plus the wallet session,
//! activity ledger, and marketplace state the dashboard works with.

pub mod activity;
pub mod api;
pub mod cli;
pub mod community;
pub mod config;
/// Simple-interest yield projections.
pub mod interest;
pub mod io;
pub mod market;
pub mod session;
pub mod vault;
