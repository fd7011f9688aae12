//! Transfer types: the caller request, the unsigned payload sent to the
//! vault, and the persisted record.

use crate::Chain;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Caller-supplied transfer request. All three fields are mandatory; the
/// workflow validates before making any network call, so missing fields
/// are modeled as `Option` rather than rejected at deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferRequest {
	#[serde(default)]
	pub from_account: Option<String>,
	#[serde(default)]
	pub to_account: Option<String>,
	#[serde(default)]
	pub send_amount: Option<Decimal>,
}

/// Fee estimate from a chain node: a unit price and an execution limit
/// (gas price / gas limit on account-model chains, fee rate and size
/// budget elsewhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
	pub fee_price: u128,
	pub fee_limit: u64,
}

/// Unsigned transaction payload serialized and sent to the vault for
/// signing. Field names are part of the vault's wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedPayload {
	pub sequence: u64,
	pub value: u128,
	pub fee_limit: u64,
	pub fee_price: u128,
	pub to: String,
	/// Always empty for a plain value transfer.
	pub data: String,
	pub network_id: u64,
}

/// Lifecycle status of a transfer record. The gateway only ever writes
/// `Pending`; advancement to `Confirmed` or `Failed` is an external
/// collaborator's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
	#[serde(rename = "PENDING")]
	Pending,
	#[serde(rename = "CONFIRMED")]
	Confirmed,
	#[serde(rename = "FAILED")]
	Failed,
}

/// Persisted record of one initiated transfer. Exactly one record exists
/// per successful broadcast; none for a broadcast that never happened.
/// Never mutated or deleted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
	pub chain: Chain,
	pub txn_id: String,
	pub from_account: String,
	pub to_account: String,
	/// Amount in the chain's smallest unit.
	pub amount: u128,
	/// Fiat-equivalent value captured once at recording time.
	pub value_fiat: Decimal,
	pub fiat_currency: String,
	pub status: TransferStatus,
	pub initiated_at: DateTime<Utc>,
}

/// Returned to the caller after a successful broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransferReceipt {
	pub transaction_id: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn payload_serializes_with_vault_field_names() {
		let payload = UnsignedPayload {
			sequence: 7,
			value: 1_000_000_000_000_000_000,
			fee_limit: 21_000,
			fee_price: 30_000_000_000,
			to: "0x52908400098527886E0F7030069857D2E4169EE7".into(),
			data: String::new(),
			network_id: 1,
		};
		let json = serde_json::to_value(&payload).unwrap();
		assert_eq!(json["sequence"], 7);
		assert_eq!(json["feeLimit"], 21_000);
		assert_eq!(json["feePrice"], 30_000_000_000u64);
		assert_eq!(json["networkId"], 1);
		assert_eq!(json["data"], "");
	}

	#[test]
	fn status_uses_wire_names() {
		assert_eq!(
			serde_json::to_string(&TransferStatus::Pending).unwrap(),
			"\"PENDING\""
		);
		let status: TransferStatus = serde_json::from_str("\"CONFIRMED\"").unwrap();
		assert_eq!(status, TransferStatus::Confirmed);
	}
}
