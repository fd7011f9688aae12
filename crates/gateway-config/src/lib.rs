//! Configuration for the wallet gateway.
//!
//! The top-level `[gateway]` section is strongly typed; the vault, price
//! feed, storage, accounts, and per-chain sections stay as raw TOML tables
//! handed to the matching factory, which validates them against its own
//! schema.

pub mod loader;
pub mod types;

pub use loader::{load_config, ConfigLoader};
pub use types::{ChainSections, GatewayConfig, GatewaySettings};
