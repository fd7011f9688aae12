//! Account resolution for the wallet gateway.
//!
//! Maps logical account names to the custody identifiers the vault
//! authorizes operations against. Pure lookups; the account store is
//! written only by the out-of-scope registration flow.

use async_trait::async_trait;
use gateway_types::{Account, Chain, CustodyId, GatewayError, Result};

pub mod implementations {
	pub mod memory;
}

/// Interface to the persistent account store.
///
/// `Ok(None)` means "no such account"; infrastructure failures surface as
/// `GatewayError::Storage`.
#[async_trait]
pub trait AccountStoreInterface: Send + Sync {
	/// Looks up an account by its unique logical name.
	async fn find_by_name(&self, name: &str) -> Result<Option<Account>>;

	/// Looks up the account owning a cached on-chain address.
	async fn find_by_address(&self, chain: Chain, address: &str) -> Result<Option<Account>>;
}

/// Account resolution service.
///
/// Every component that needs an address or a signature resolves through
/// this service first; the vault only honors requests carrying a custody
/// id it issued.
pub struct AccountService {
	store: Box<dyn AccountStoreInterface>,
}

impl AccountService {
	pub fn new(store: Box<dyn AccountStoreInterface>) -> Self {
		Self { store }
	}

	/// Resolves an account name to its custody identifier.
	pub async fn resolve(&self, name: &str) -> Result<CustodyId> {
		if name.is_empty() {
			return Err(GatewayError::BadRequest(
				"account name must not be empty".to_string(),
			));
		}
		let account = self
			.store
			.find_by_name(name)
			.await?
			.ok_or_else(|| GatewayError::AccountNotFound(name.to_string()))?;
		Ok(account.custody_id)
	}

	/// Looks up the full account row by name.
	pub async fn find_by_name(&self, name: &str) -> Result<Option<Account>> {
		self.store.find_by_name(name).await
	}

	/// Finds the account name owning the given on-chain address, for the
	/// convert-address operation.
	pub async fn find_by_address(&self, chain: Chain, address: &str) -> Result<Account> {
		self.store
			.find_by_address(chain, address)
			.await?
			.ok_or_else(|| {
				GatewayError::AccountNotFound(format!("{} address {}", chain.symbol(), address))
			})
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryAccountStore;
	use super::*;

	fn service_with(accounts: Vec<Account>) -> AccountService {
		AccountService::new(Box::new(MemoryAccountStore::with_accounts(accounts)))
	}

	#[tokio::test]
	async fn resolves_registered_account() {
		let custody_id = CustodyId::new();
		let service = service_with(vec![Account::new("alice", custody_id)]);

		assert_eq!(service.resolve("alice").await.unwrap(), custody_id);
	}

	#[tokio::test]
	async fn unknown_account_fails_not_found() {
		let service = service_with(vec![]);

		let err = service.resolve("ghost").await.unwrap_err();
		assert!(matches!(err, GatewayError::AccountNotFound(name) if name == "ghost"));
	}

	#[tokio::test]
	async fn empty_name_is_a_bad_request() {
		let service = service_with(vec![]);

		let err = service.resolve("").await.unwrap_err();
		assert!(matches!(err, GatewayError::BadRequest(_)));
	}

	#[tokio::test]
	async fn finds_account_by_cached_address() {
		let mut account = Account::new("bob", CustodyId::new());
		account.eth_address = Some("0x52908400098527886E0F7030069857D2E4169EE7".to_string());
		let service = service_with(vec![account]);

		let found = service
			.find_by_address(Chain::Ethereum, "0x52908400098527886E0F7030069857D2E4169EE7")
			.await
			.unwrap();
		assert_eq!(found.name, "bob");

		let err = service
			.find_by_address(Chain::Bitcoin, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT")
			.await
			.unwrap_err();
		assert!(matches!(err, GatewayError::AccountNotFound(_)));
	}
}
