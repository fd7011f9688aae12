//! In-memory account store.
//!
//! Holds the registered accounts in a concurrent map keyed by name. The
//! production deployment seeds it from a JSON file at startup; tests
//! construct it directly. A SQL-backed store would implement the same
//! interface.

use crate::AccountStoreInterface;
use async_trait::async_trait;
use dashmap::DashMap;
use gateway_types::{Account, Chain, GatewayError, Result};

#[derive(Default)]
pub struct MemoryAccountStore {
	by_name: DashMap<String, Account>,
}

impl MemoryAccountStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_accounts(accounts: Vec<Account>) -> Self {
		let store = Self::new();
		for account in accounts {
			store.by_name.insert(account.name.clone(), account);
		}
		store
	}

	/// Loads accounts from a JSON file: an array of account objects as
	/// written by the registration flow.
	pub fn from_json_file(path: &str) -> Result<Self> {
		let contents = std::fs::read_to_string(path)
			.map_err(|e| GatewayError::Storage(format!("cannot read accounts file: {}", e)))?;
		let accounts: Vec<Account> = serde_json::from_str(&contents)
			.map_err(|e| GatewayError::Storage(format!("invalid accounts file: {}", e)))?;
		Ok(Self::with_accounts(accounts))
	}
}

#[async_trait]
impl AccountStoreInterface for MemoryAccountStore {
	async fn find_by_name(&self, name: &str) -> Result<Option<Account>> {
		Ok(self.by_name.get(name).map(|entry| entry.value().clone()))
	}

	async fn find_by_address(&self, chain: Chain, address: &str) -> Result<Option<Account>> {
		Ok(self
			.by_name
			.iter()
			.find(|entry| entry.value().cached_address(chain) == Some(address))
			.map(|entry| entry.value().clone()))
	}
}

/// Factory function to create an account store from configuration.
///
/// Configuration parameters:
/// - `accounts_file` (optional): JSON file of registered accounts; when
///   absent the store starts empty.
pub fn create_account_store(config: &toml::Value) -> Result<Box<dyn AccountStoreInterface>> {
	match config.get("accounts_file").and_then(|v| v.as_str()) {
		Some(path) => {
			let store = MemoryAccountStore::from_json_file(path)?;
			tracing::info!(path, "Loaded account store from file");
			Ok(Box::new(store))
		}
		None => Ok(Box::new(MemoryAccountStore::new())),
	}
}
