//! Bitcoin chain adapter.
//!
//! Uses an Esplora-compatible REST explorer for balances, fee rates, and
//! broadcast. Bitcoin has no account nonce; the address's confirmed
//! transaction count stands in as the payload sequence so the vault signs
//! a payload that is unique per spend.

use crate::{
	derive_account_address, find_transfer, price_for_owned_symbol, transfer, AdapterContext,
	ChainAdapter, NodeInterface,
};
use async_trait::async_trait;
use gateway_types::{
	to_display_units, BalanceInfo, Chain, FeeEstimate, Field, FieldType, GatewayError,
	HistoryInfo, PriceInfo, Result, Schema, TransferReceipt, TransferRecord, TransferRequest,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const OWNED_SYMBOLS: &[&str] = &["BTC"];

/// Confirmation target requested from the fee-estimates endpoint.
const FEE_TARGET_BLOCKS: &str = "6";

/// Weight budget for a simple two-output payment, in virtual bytes.
/// 1 input + 2 outputs at P2WPKH sizes, with slack for signature length.
const SIMPLE_PAYMENT_VSIZE: u64 = 141;

pub struct BitcoinAdapter {
	ctx: AdapterContext,
	node: Box<dyn NodeInterface>,
	network_id: u64,
	explorer_base_url: String,
}

impl BitcoinAdapter {
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

/// Syntactic check for a Bitcoin address: legacy base58 (1... or 3...,
/// 26 to 35 chars) or bech32 (bc1/tb1).
pub fn is_valid_address(value: &str) -> bool {
	if let Some(body) = value
		.strip_prefix("bc1")
		.or_else(|| value.strip_prefix("tb1"))
	{
		return body.len() >= 6
			&& body
				.chars()
				.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
	}
	if !(value.starts_with('1') || value.starts_with('3')) {
		return false;
	}
	(26..=35).contains(&value.len()) && value.chars().all(is_base58_char)
}

fn is_base58_char(c: char) -> bool {
	c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

#[async_trait]
impl ChainAdapter for BitcoinAdapter {
	fn chain(&self) -> Chain {
		Chain::Bitcoin
	}

	async fn get_address(&self, account_name: &str) -> Result<String> {
		derive_account_address(&self.ctx, Chain::Bitcoin, account_name).await
	}

	async fn get_balance(&self, account_name: &str) -> Result<BalanceInfo> {
		let address = self.get_address(account_name).await?;
		let sats = self.node.balance(&address).await?;
		Ok(BalanceInfo {
			account_name: account_name.to_string(),
			balance: to_display_units(sats, Chain::Bitcoin.decimals())?,
			unit: Chain::Bitcoin.unit().to_string(),
		})
	}

	async fn get_price(&self, symbol: &str, currency: &str) -> Result<PriceInfo> {
		price_for_owned_symbol(&self.ctx, Chain::Bitcoin, OWNED_SYMBOLS, symbol, currency).await
	}

	async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
		transfer::execute(
			transfer::TransferParams {
				chain: Chain::Bitcoin,
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
		find_transfer(&self.ctx, Chain::Bitcoin, txn_id).await
	}

	async fn get_history(&self, account_name: &str) -> Result<HistoryInfo> {
		let address = self.get_address(account_name).await?;
		Ok(HistoryInfo {
			url: format!("{}/address/{}", self.explorer_base_url, address),
		})
	}
}

#[derive(Debug, Deserialize)]
struct AddressStats {
	chain_stats: ChainStats,
}

#[derive(Debug, Deserialize)]
struct ChainStats {
	funded_txo_sum: u128,
	spent_txo_sum: u128,
	tx_count: u64,
}

/// REST client for an Esplora-compatible Bitcoin explorer.
pub struct EsploraBitcoinNode {
	client: reqwest::Client,
	base_url: String,
}

impl EsploraBitcoinNode {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Config(format!("cannot build node client: {}", e)))?;
		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	async fn address_stats(&self, address: &str) -> Result<AddressStats> {
		let url = format!("{}/address/{}", self.base_url, address);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(e.to_string()))?;
		if !response.status().is_success() {
			return Err(GatewayError::NodeUnavailable(format!(
				"explorer returned {} for address lookup",
				response.status()
			)));
		}
		response
			.json()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(format!("invalid explorer response: {}", e)))
	}
}

#[async_trait]
impl NodeInterface for EsploraBitcoinNode {
	async fn balance(&self, address: &str) -> Result<u128> {
		let stats = self.address_stats(address).await?;
		stats
			.chain_stats
			.funded_txo_sum
			.checked_sub(stats.chain_stats.spent_txo_sum)
			.ok_or_else(|| {
				GatewayError::NodeUnavailable("explorer reported spent > funded".to_string())
			})
	}

	async fn estimate_fee(&self, _from: &str, _to: &str) -> Result<FeeEstimate> {
		let url = format!("{}/fee-estimates", self.base_url);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(e.to_string()))?;
		let estimates: serde_json::Value = response
			.json()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(format!("invalid fee estimates: {}", e)))?;

		let rate = estimates
			.get(FEE_TARGET_BLOCKS)
			.and_then(|v| v.as_number())
			.ok_or_else(|| {
				GatewayError::NodeUnavailable(format!(
					"no fee estimate for {}-block target",
					FEE_TARGET_BLOCKS
				))
			})?;
		let fee_price = sat_per_vbyte(&rate.to_string())?;

		Ok(FeeEstimate {
			fee_price,
			fee_limit: SIMPLE_PAYMENT_VSIZE,
		})
	}

	async fn sequence(&self, address: &str) -> Result<u64> {
		let stats = self.address_stats(address).await?;
		Ok(stats.chain_stats.tx_count)
	}

	async fn broadcast(&self, signed_payload: &str) -> Result<String> {
		let url = format!("{}/tx", self.base_url);
		let response = self
			.client
			.post(&url)
			.body(signed_payload.to_string())
			.send()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(e.to_string()))?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| GatewayError::NodeUnavailable(e.to_string()))?;
		if !status.is_success() {
			return Err(GatewayError::NodeUnavailable(format!(
				"broadcast rejected ({}): {}",
				status, body
			)));
		}
		Ok(body.trim().to_string())
	}
}

/// Parses an explorer fee rate and rounds it up to whole sat/vB. Esplora
/// reports fractional rates; rounding down could underpay the floor rate.
fn sat_per_vbyte(rate: &str) -> Result<u128> {
	let rate: Decimal = rate
		.parse()
		.map_err(|_| GatewayError::NodeUnavailable(format!("bad fee rate '{}'", rate)))?;
	if rate.is_sign_negative() {
		return Err(GatewayError::NodeUnavailable(format!(
			"negative fee rate '{}'",
			rate
		)));
	}
	rate.ceil()
		.to_u128()
		.ok_or_else(|| GatewayError::NodeUnavailable(format!("fee rate out of range '{}'", rate)))
}

/// Configuration schema for the `[chains.btc]` section.
pub fn config_schema() -> Schema {
	Schema::new(
		vec![
			Field::new("node_url", FieldType::String),
			Field::new("explorer_base_url", FieldType::String),
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

/// Factory function to create the Bitcoin adapter from its config section.
pub fn create_adapter(config: &toml::Value, ctx: AdapterContext) -> Result<Arc<dyn ChainAdapter>> {
	config_schema()
		.validate(config)
		.map_err(|e| GatewayError::Config(format!("chains.btc: {}", e)))?;

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

	let node = EsploraBitcoinNode::new(node_url, Duration::from_secs(timeout_secs))?;
	Ok(Arc::new(BitcoinAdapter::new(
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
	fn accepts_legacy_and_bech32_addresses() {
		assert!(is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"));
		assert!(is_valid_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"));
		assert!(is_valid_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
	}

	#[test]
	fn rejects_non_addresses() {
		assert!(!is_valid_address("alice"));
		assert!(!is_valid_address("0x52908400098527886E0F7030069857D2E4169EE7"));
		assert!(!is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2lllllllll")); // too long
		assert!(!is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNV0")); // '0' not base58
	}

	#[test]
	fn fee_rates_round_up_to_whole_sats() {
		assert_eq!(sat_per_vbyte("1").unwrap(), 1);
		assert_eq!(sat_per_vbyte("12.094").unwrap(), 13);
		assert_eq!(sat_per_vbyte("0.5").unwrap(), 1);
		assert!(sat_per_vbyte("-3").is_err());
		assert!(sat_per_vbyte("junk").is_err());
	}
}
