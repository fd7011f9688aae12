//! Ethereum chain adapter.
//!
//! Talks JSON-RPC to an Ethereum node for balances, fees, nonces, and
//! broadcast; address derivation and signing go through the shared vault
//! signer with coin type 60 and the fixed gateway derivation path.

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

/// Symbols this adapter answers price queries for.
const OWNED_SYMBOLS: &[&str] = &["ETH"];

/// Headroom applied to the node's gas price quote (estimate * 3 / 2) so
/// a price that moves between estimation and broadcast still clears.
const GAS_PRICE_HEADROOM_NUM: u128 = 3;
const GAS_PRICE_HEADROOM_DEN: u128 = 2;

pub struct EthereumAdapter {
	ctx: AdapterContext,
	node: Box<dyn NodeInterface>,
	network_id: u64,
	explorer_base_url: String,
}

impl EthereumAdapter {
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

/// Syntactic check for an Ethereum address: 0x followed by 40 hex chars.
pub fn is_valid_address(value: &str) -> bool {
	match value.strip_prefix("0x") {
		Some(body) => body.len() == 40 && hex::decode(body).is_ok(),
		None => false,
	}
}

#[async_trait]
impl ChainAdapter for EthereumAdapter {
	fn chain(&self) -> Chain {
		Chain::Ethereum
	}

	async fn get_address(&self, account_name: &str) -> Result<String> {
		derive_account_address(&self.ctx, Chain::Ethereum, account_name).await
	}

	async fn get_balance(&self, account_name: &str) -> Result<BalanceInfo> {
		let address = self.get_address(account_name).await?;
		let wei = self.node.balance(&address).await?;
		Ok(BalanceInfo {
			account_name: account_name.to_string(),
			balance: to_display_units(wei, Chain::Ethereum.decimals())?,
			unit: Chain::Ethereum.unit().to_string(),
		})
	}

	async fn get_price(&self, symbol: &str, currency: &str) -> Result<PriceInfo> {
		price_for_owned_symbol(&self.ctx, Chain::Ethereum, OWNED_SYMBOLS, symbol, currency).await
	}

	async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
		transfer::execute(
			transfer::TransferParams {
				chain: Chain::Ethereum,
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
		find_transfer(&self.ctx, Chain::Ethereum, txn_id).await
	}

	async fn get_history(&self, account_name: &str) -> Result<HistoryInfo> {
		let address = self.get_address(account_name).await?;
		Ok(HistoryInfo {
			url: format!("{}/address/{}", self.explorer_base_url, address),
		})
	}
}

/// JSON-RPC client for an Ethereum node.
pub struct JsonRpcEthereumNode {
	client: reqwest::Client,
	rpc_url: String,
}

impl JsonRpcEthereumNode {
	pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Config(format!("cannot build node client: {}", e)))?;
		Ok(Self {
			client,
			rpc_url: rpc_url.to_string(),
		})
	}

	async fn rpc_call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
		let body = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params,
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

	async fn rpc_quantity(&self, method: &str, params: serde_json::Value) -> Result<u128> {
		let result = self.rpc_call(method, params).await?;
		let quantity = result.as_str().ok_or_else(|| {
			GatewayError::NodeUnavailable(format!("{}: non-string quantity", method))
		})?;
		parse_hex_quantity(quantity)
			.ok_or_else(|| GatewayError::NodeUnavailable(format!("{}: bad quantity", method)))
	}
}

/// Parses an 0x-prefixed hex quantity as returned by Ethereum JSON-RPC.
fn parse_hex_quantity(value: &str) -> Option<u128> {
	let body = value.strip_prefix("0x")?;
	u128::from_str_radix(body, 16).ok()
}

/// Applies the headroom factor to a node-supplied gas price. The quote is
/// untrusted input, so the multiplication is checked.
fn apply_gas_headroom(gas_price: u128) -> Result<u128> {
	gas_price
		.checked_mul(GAS_PRICE_HEADROOM_NUM)
		.map(|scaled| scaled / GAS_PRICE_HEADROOM_DEN)
		.ok_or_else(|| {
			GatewayError::NodeUnavailable("eth_gasPrice: quote out of range".to_string())
		})
}

#[async_trait]
impl NodeInterface for JsonRpcEthereumNode {
	async fn balance(&self, address: &str) -> Result<u128> {
		self.rpc_quantity("eth_getBalance", json!([address, "latest"]))
			.await
	}

	async fn estimate_fee(&self, from: &str, to: &str) -> Result<FeeEstimate> {
		let gas_price = self.rpc_quantity("eth_gasPrice", json!([])).await?;
		let fee_price = apply_gas_headroom(gas_price)?;

		let gas_limit = self
			.rpc_quantity(
				"eth_estimateGas",
				json!([{"from": from, "to": to, "data": ""}]),
			)
			.await?;
		let fee_limit = u64::try_from(gas_limit).map_err(|_| {
			GatewayError::NodeUnavailable("eth_estimateGas: gas limit out of range".to_string())
		})?;

		Ok(FeeEstimate {
			fee_price,
			fee_limit,
		})
	}

	async fn sequence(&self, address: &str) -> Result<u64> {
		let nonce = self
			.rpc_quantity("eth_getTransactionCount", json!([address, "latest"]))
			.await?;
		u64::try_from(nonce).map_err(|_| {
			GatewayError::NodeUnavailable("eth_getTransactionCount: nonce out of range".to_string())
		})
	}

	async fn broadcast(&self, signed_payload: &str) -> Result<String> {
		let result = self
			.rpc_call("eth_sendRawTransaction", json!([signed_payload]))
			.await?;
		result
			.as_str()
			.map(|s| s.to_string())
			.ok_or_else(|| {
				GatewayError::NodeUnavailable("eth_sendRawTransaction: no hash".to_string())
			})
	}
}

/// Configuration schema for the `[chains.eth]` section.
pub fn config_schema() -> Schema {
	Schema::new(
		vec![
			Field::new("node_url", FieldType::String),
			Field::new("explorer_base_url", FieldType::String),
			Field::new(
				"network_id",
				FieldType::Integer {
					min: Some(1),
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

/// Factory function to create the Ethereum adapter from its config
/// section.
pub fn create_adapter(config: &toml::Value, ctx: AdapterContext) -> Result<Arc<dyn ChainAdapter>> {
	config_schema()
		.validate(config)
		.map_err(|e| GatewayError::Config(format!("chains.eth: {}", e)))?;

	let node_url = config.get("node_url").and_then(|v| v.as_str()).unwrap();
	let explorer = config
		.get("explorer_base_url")
		.and_then(|v| v.as_str())
		.unwrap();
	let network_id = config
		.get("network_id")
		.and_then(|v| v.as_integer())
		.unwrap() as u64;
	let timeout_secs = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	let node = JsonRpcEthereumNode::new(node_url, Duration::from_secs(timeout_secs))?;
	Ok(Arc::new(EthereumAdapter::new(
		ctx,
		Box::new(node),
		network_id,
		explorer,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_checksummed_and_lowercase_addresses() {
		assert!(is_valid_address(
			"0x52908400098527886E0F7030069857D2E4169EE7"
		));
		assert!(is_valid_address(
			"0xde709f2102306220921060314715629080e2fb77"
		));
	}

	#[test]
	fn rejects_non_addresses() {
		assert!(!is_valid_address("alice"));
		assert!(!is_valid_address("0x123")); // too short
		assert!(!is_valid_address("52908400098527886E0F7030069857D2E4169EE7")); // no prefix
		assert!(!is_valid_address(
			"0xZZ908400098527886E0F7030069857D2E4169EE7"
		)); // not hex
	}

	#[test]
	fn parses_rpc_hex_quantities() {
		assert_eq!(parse_hex_quantity("0x0"), Some(0));
		assert_eq!(parse_hex_quantity("0xde0b6b3a7640000"), Some(10u128.pow(18)));
		assert_eq!(parse_hex_quantity("nope"), None);
	}

	#[test]
	fn gas_headroom_scales_and_guards_against_overflow() {
		assert_eq!(apply_gas_headroom(30_000_000_000).unwrap(), 45_000_000_000);
		assert_eq!(apply_gas_headroom(0).unwrap(), 0);
		// An absurd quote from a broken node fails instead of wrapping.
		let err = apply_gas_headroom(u128::MAX).unwrap_err();
		assert!(matches!(err, GatewayError::NodeUnavailable(_)));
	}
}
