//! Remote signing for the wallet gateway.
//!
//! All key material lives in the vault service; the gateway only ever
//! sends a custody identifier, a coin type, and a derivation path, and
//! receives back a derived address or a signature. The vault refuses
//! requests whose custody id it did not issue.

use async_trait::async_trait;
use gateway_types::{Chain, CustodyId, Result};

pub mod implementations {
	pub mod vault;
}

/// Interface to the custody signer.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Derives the chain-specific address for a custody identifier using
	/// the chain's fixed derivation path.
	async fn derive_address(&self, chain: Chain, custody_id: CustodyId) -> Result<String>;

	/// Signs a serialized transaction payload. Returns the signed payload
	/// ready for broadcast.
	async fn sign(&self, chain: Chain, payload: &str, custody_id: CustodyId) -> Result<String>;

	/// Registers a new custody entry with the vault. Part of the vault's
	/// API surface; the gateway's own operations never call it, since
	/// registration belongs to the onboarding flow.
	async fn register(&self) -> Result<CustodyId>;
}

/// Signing service wrapping a signer implementation.
pub struct SignerService {
	provider: Box<dyn SignerInterface>,
}

impl SignerService {
	pub fn new(provider: Box<dyn SignerInterface>) -> Self {
		Self { provider }
	}

	pub async fn derive_address(&self, chain: Chain, custody_id: CustodyId) -> Result<String> {
		self.provider.derive_address(chain, custody_id).await
	}

	pub async fn sign(
		&self,
		chain: Chain,
		payload: &str,
		custody_id: CustodyId,
	) -> Result<String> {
		self.provider.sign(chain, payload, custody_id).await
	}

	pub async fn register(&self) -> Result<CustodyId> {
		self.provider.register().await
	}
}
