//! BitShares chain adapter.
//!
//! The gateway trades the UDOO token on the BitShares chain, so this
//! adapter answers price queries for both BTS and UDOO. Node access goes
//! through the database API of a BitShares witness node, wrapped in the
//! chain's `call`-style JSON-RPC envelope. BitShares charges a flat fee
//! per operation, so the fee estimate is the required fee with a limit of
//! one operation; the head block number stands in as the payload sequence
//! for transaction expiry.

use crate::{
	derive_account_address, find_transfer, price_for_owned_symbol, transfer, AdapterContext,
	ChainAdapter, NodeInterface,
};
use async_trait::async_trait;
use gateway_types::{
	to_display_units, BalanceInfo, Chain, FeeEstimate, Field, FieldType, GatewayError,
	HistoryInfo, PriceInfo, Result, Schema, TransferReceipt, TransferRecord, TransferRequest,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const OWNED_SYMBOLS: &[&str] = &["BTS", "UDOO"];

/// Database API id in the witness node's `call` envelope.
const DATABASE_API: u64 = 0;

pub struct BitsharesAdapter {
	ctx: AdapterContext,
	node: Box<dyn NodeInterface>,
	network_id: u64,
	explorer_base_url: String,
}

impl BitsharesAdapter {
	pub fn new(
		ctx: AdapterContext,
		node: Box<dyn NodeInterface>,
		network_id: u64,
		explorer_base_url: &str,
	) -> Self {
		Self {
			ctx,
			node,
			network_id,
			explorer_base_url: explorer_base_url.trim_end_matches('/').to_string(),
		}
	}
}

/// Syntactic check for a BitShares public key: the `BTS` prefix followed
/// by base58 key material.
pub fn is_valid_address(value: &str) -> bool {
	match value.strip_prefix("BTS") {
		Some(body) => {
			(30..=60).contains(&body.len()) && body.chars().all(is_base58_char)
		}
		None => false,
	}
}

fn is_base58_char(c: char) -> bool {
	c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

#[async_trait]
impl ChainAdapter for BitsharesAdapter {
	fn chain(&self) -> Chain {
		Chain::Bitshares
	}

	async fn get_address(&self, account_name: &str) -> Result<String> {
		derive_account_address(&self.ctx, Chain::Bitshares, account_name).await
	}

	async fn get_balance(&self, account_name: &str) -> Result<BalanceInfo> {
		let address = self.get_address(account_name).await?;
		let raw = self.node.balance(&address).await?;
		Ok(BalanceInfo {
			account_name: account_name.to_string(),
			balance: to_display_units(raw, Chain::Bitshares.decimals())?,
			unit: Chain::Bitshares.unit().to_string(),
		})
	}

	async fn get_price(&self, symbol: &str, currency: &str) -> Result<PriceInfo> {
		price_for_owned_symbol(&self.ctx, Chain::Bitshares, OWNED_SYMBOLS, symbol, currency).await
	}

	async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
		transfer::execute(
			transfer::TransferParams {
				chain: Chain::Bitshares,
				network_id: self.network_id,
				is_valid_address,
				node: self.node.as_ref(),
				ctx: &self.ctx,
			},
			request,
		)
		.await
	}

	async fn get_status(&self, txn_id: &str) -> Result<TransferRecord> {
		find_transfer(&self.ctx, Chain::Bitshares, txn_id).await
	}

	async fn get_history(&self, account_name: &str) -> Result<HistoryInfo> {
		let address = self.get_address(account_name).await?;
		Ok(HistoryInfo {
			url: format!("{}/account/{}", self.explorer_base_url, address),
		})
	}
}

/// JSON-RPC client for a BitShares witness node's database API.
pub struct RpcBitsharesNode {
	client: reqwest::Client,
	rpc_url: String,
	/// Asset id of the token the gateway holds on this chain.
	asset_id: String,
}

impl RpcBitsharesNode {
	pub fn new(rpc_url: &str, asset_id: &str, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Config(format!("cannot build node client: {}", e)))?;
		Ok(Self {
			client,
			rpc_url: rpc_url.to_string(),
			asset_id: asset_id.to_string(),
		})
	}

	async fn api_call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
		let body = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "call",
			"params": [DATABASE_API, method, params],
		});
		let response = self
			.client
			.post(&self.rpc_url)
			.json(&body)
			.send()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(e.to_string()))?;

		let body: serde_json::Value = response
			.json()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(format!("invalid node response: {}", e)))?;

		if let Some(error) = body.get("error") {
			let message = error
				.get("message")
				.and_then(|m| m.as_str())
				.unwrap_or("unknown RPC error");
			return Err(GatewayError::NodeUnavailable(format!(
				"{} failed: {}",
				method, message
			)));
		}
		body.get("result")
			.cloned()
			.ok_or_else(|| GatewayError::NodeUnavailable(format!("{}: empty result", method)))
	}
}

/// Pulls a raw integer amount out of a BitShares asset object, which the
/// node serializes as a number for small values and a string for large
/// ones.
fn parse_amount(value: &serde_json::Value) -> Option<u128> {
	match value {
		serde_json::Value::Number(n) => n.as_u64().map(u128::from),
		serde_json::Value::String(s) => s.parse().ok(),
		_ => None,
	}
}

#[async_trait]
impl NodeInterface for RpcBitsharesNode {
	async fn balance(&self, address: &str) -> Result<u128> {
		let result = self
			.api_call("get_account_balances", json!([address, [self.asset_id]]))
			.await?;
		let balances = result.as_array().ok_or_else(|| {
			GatewayError::NodeUnavailable("get_account_balances: not an array".to_string())
		})?;
		// An account that never held the asset gets an empty list.
		match balances.first() {
			Some(entry) => entry
				.get("amount")
				.and_then(parse_amount)
				.ok_or_else(|| {
					GatewayError::NodeUnavailable("get_account_balances: bad amount".to_string())
				}),
			None => Ok(0),
		}
	}

	async fn estimate_fee(&self, _from: &str, _to: &str) -> Result<FeeEstimate> {
		let result = self
			.api_call(
				"get_required_fees",
				json!([[[0, {"fee": {"amount": 0, "asset_id": self.asset_id}}]], self.asset_id]),
			)
			.await?;
		let fee_price = result
			.as_array()
			.and_then(|fees| fees.first())
			.and_then(|fee| fee.get("amount"))
			.and_then(parse_amount)
			.ok_or_else(|| {
				GatewayError::NodeUnavailable("get_required_fees: bad fee".to_string())
			})?;

		// Flat fee per operation; a single-operation transfer.
		Ok(FeeEstimate {
			fee_price,
			fee_limit: 1,
		})
	}

	async fn sequence(&self, _address: &str) -> Result<u64> {
		let result = self
			.api_call("get_dynamic_global_properties", json!([]))
			.await?;
		result
			.get("head_block_number")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| {
				GatewayError::NodeUnavailable(
					"get_dynamic_global_properties: no head block".to_string(),
				)
			})
	}

	async fn broadcast(&self, signed_payload: &str) -> Result<String> {
		let payload: serde_json::Value = serde_json::from_str(signed_payload)
			.map_err(|e| GatewayError::NodeUnavailable(format!("unparseable payload: {}", e)))?;
		let result = self
			.api_call("broadcast_transaction_synchronous", json!([payload]))
			.await?;
		result
			.get("id")
			.and_then(|v| v.as_str())
			.map(|s| s.to_string())
			.ok_or_else(|| {
				GatewayError::NodeUnavailable("broadcast_transaction: no id".to_string())
			})
	}
}

/// Configuration schema for the `[chains.bts]` section.
pub fn config_schema() -> Schema {
	Schema::new(
		vec![
			Field::new("node_url", FieldType::String),
			Field::new("explorer_base_url", FieldType::String),
			Field::new("asset_id", FieldType::String),
			Field::new(
				"network_id",
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			),
		],
		vec![Field::new(
			"timeout_secs",
			FieldType::Integer {
				min: Some(1),
				max: None,
			},
		)],
	)
}

/// Factory function to create the BitShares adapter from its config
/// section.
pub fn create_adapter(config: &toml::Value, ctx: AdapterContext) -> Result<Arc<dyn ChainAdapter>> {
	config_schema()
		.validate(config)
		.map_err(|e| GatewayError::Config(format!("chains.bts: {}", e)))?;

	let node_url = config.get("node_url").and_then(|v| v.as_str()).unwrap();
	let explorer = config
		.get("explorer_base_url")
		.and_then(|v| v.as_str())
		.unwrap();
	let asset_id = config.get("asset_id").and_then(|v| v.as_str()).unwrap();
	let network_id = config
		.get("network_id")
		.and_then(|v| v.as_integer())
		.unwrap() as u64;
	let timeout_secs = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	let node = RpcBitsharesNode::new(node_url, asset_id, Duration::from_secs(timeout_secs))?;
	Ok(Arc::new(BitsharesAdapter::new(
		ctx,
		Box::new(node),
		network_id,
		explorer,
	)))
}
