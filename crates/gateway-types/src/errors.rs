//! Error taxonomy for the wallet gateway.
//!
//! Every component returns a specific failure kind rather than a generic
//! one; the response layer maps kinds to HTTP statuses. Dependency errors
//! (`SignerUnavailable`, `NodeUnavailable`, `PriceFeedUnavailable`) carry
//! the dependency's message through unmodified — no retries, no masking.

use crate::Chain;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
	/// Missing or invalid caller input.
	#[error("{0}")]
	BadRequest(String),

	/// No account with the given name exists in the account store.
	#[error("Account '{0}' does not exist")]
	AccountNotFound(String),

	/// The vault signer could not be reached or rejected the request.
	#[error("Signer unavailable: {0}")]
	SignerUnavailable(String),

	/// The chain node or explorer could not be reached or errored.
	#[error("Node unavailable: {0}")]
	NodeUnavailable(String),

	/// The price feed could not be reached or errored.
	#[error("Price feed unavailable: {0}")]
	PriceFeedUnavailable(String),

	/// The price feed has no data for the requested fiat currency.
	#[error("Invalid currency '{0}'")]
	InvalidCurrency(String),

	/// A price was requested from an adapter that does not own the symbol.
	#[error("Coin and blockchain mismatched: {symbol} is not served by the {chain} adapter")]
	SymbolMismatch { symbol: String, chain: Chain },

	/// No transfer record exists for the chain and transaction id.
	#[error("Transaction '{txn_id}' does not exist on {chain}")]
	TransferNotFound { chain: Chain, txn_id: String },

	/// The transfer was broadcast on-chain but the local record could not
	/// be written. Funds moved; bookkeeping did not. Must never be folded
	/// into a generic failure.
	#[error("Transfer {txn_id} was broadcast on {chain} but recording failed: {reason}")]
	RecordingFailedAfterBroadcast {
		chain: Chain,
		txn_id: String,
		reason: String,
	},

	#[error("Storage error: {0}")]
	Storage(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl GatewayError {
	/// True for failures caused by the caller's input rather than a
	/// dependency.
	pub fn is_client_error(&self) -> bool {
		matches!(
			self,
			GatewayError::BadRequest(_)
				| GatewayError::AccountNotFound(_)
				| GatewayError::InvalidCurrency(_)
				| GatewayError::SymbolMismatch { .. }
				| GatewayError::TransferNotFound { .. }
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dependency_message_passes_through() {
		let err = GatewayError::NodeUnavailable("connection refused".into());
		assert_eq!(err.to_string(), "Node unavailable: connection refused");
	}

	#[test]
	fn client_errors_are_classified() {
		assert!(GatewayError::AccountNotFound("alice".into()).is_client_error());
		assert!(!GatewayError::SignerUnavailable("down".into()).is_client_error());
		assert!(!GatewayError::RecordingFailedAfterBroadcast {
			chain: Chain::Ethereum,
			txn_id: "0xabc".into(),
			reason: "disk full".into(),
		}
		.is_client_error());
	}
}
