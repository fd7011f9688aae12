//! Storage module for the wallet gateway.
//!
//! Provides the key-value abstraction behind persisted transfer records,
//! with file-based and in-memory backends, plus the typed `TransferStore`
//! the chain adapters write through.

use async_trait::async_trait;
use gateway_types::{Chain, TransferRecord};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// A requested item is not present.
	#[error("Not found")]
	NotFound,
	/// Serialization or deserialization failed.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The storage backend failed.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Low-level interface for storage backends: raw bytes under string keys.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key, replacing any existing value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// High-level storage service providing typed JSON operations over a
/// backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value. The namespace and id are combined to
	/// form a unique key; the data is serialized to JSON.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = format!("{}:{}", namespace, id);
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let key = format!("{}:{}", namespace, id);
		let bytes = self.backend.get_bytes(&key).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		let key = format!("{}:{}", namespace, id);
		self.backend.delete(&key).await
	}

	/// Checks whether a value exists without deserializing it.
	pub async fn contains(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		let key = format!("{}:{}", namespace, id);
		self.backend.exists(&key).await
	}
}

const TRANSFER_NAMESPACE: &str = "transfers";

/// Typed store for transfer records, keyed by chain and transaction id.
///
/// The gateway writes each record exactly once, immediately after a
/// successful broadcast, and never mutates or deletes it.
pub struct TransferStore {
	storage: StorageService,
}

impl TransferStore {
	pub fn new(storage: StorageService) -> Self {
		Self { storage }
	}

	fn record_id(chain: Chain, txn_id: &str) -> String {
		format!("{}:{}", chain.symbol(), txn_id)
	}

	/// Persists a freshly-broadcast transfer record.
	pub async fn insert(&self, record: &TransferRecord) -> Result<(), StorageError> {
		let id = Self::record_id(record.chain, &record.txn_id);
		self.storage.store(TRANSFER_NAMESPACE, &id, record).await
	}

	/// Looks up a transfer record; `Ok(None)` when no record exists.
	pub async fn find(
		&self,
		chain: Chain,
		txn_id: &str,
	) -> Result<Option<TransferRecord>, StorageError> {
		let id = Self::record_id(chain, txn_id);
		match self.storage.retrieve(TRANSFER_NAMESPACE, &id).await {
			Ok(record) => Ok(Some(record)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;
	use gateway_types::TransferStatus;

	fn record(chain: Chain, txn_id: &str) -> TransferRecord {
		TransferRecord {
			chain,
			txn_id: txn_id.to_string(),
			from_account: "alice".to_string(),
			to_account: "bob".to_string(),
			amount: 1_500_000_000_000_000_000,
			value_fiat: "4200.50".parse().unwrap(),
			fiat_currency: "USD".to_string(),
			status: TransferStatus::Pending,
			initiated_at: chrono::Utc::now(),
		}
	}

	fn store() -> TransferStore {
		TransferStore::new(StorageService::new(Box::new(MemoryStorage::new())))
	}

	#[tokio::test]
	async fn round_trips_a_transfer_record() {
		let store = store();
		let rec = record(Chain::Ethereum, "0xabc");
		store.insert(&rec).await.unwrap();

		let found = store.find(Chain::Ethereum, "0xabc").await.unwrap().unwrap();
		assert_eq!(found.txn_id, "0xabc");
		assert_eq!(found.amount, rec.amount);
		assert_eq!(found.status, TransferStatus::Pending);
	}

	#[tokio::test]
	async fn lookup_is_scoped_by_chain() {
		let store = store();
		store.insert(&record(Chain::Ethereum, "tx1")).await.unwrap();

		assert!(store.find(Chain::Bitcoin, "tx1").await.unwrap().is_none());
		assert!(store.find(Chain::Ethereum, "tx1").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn missing_record_is_none_not_error() {
		let store = store();
		assert!(store.find(Chain::Bitshares, "nope").await.unwrap().is_none());
	}
}
