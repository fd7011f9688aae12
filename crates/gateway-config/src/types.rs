//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Complete gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
	#[serde(default)]
	pub gateway: GatewaySettings,
	/// Custody vault connection; consumed by the signer factory.
	pub vault: toml::Value,
	/// Spot price feed connection; consumed by the price feed factory.
	pub price_feed: toml::Value,
	/// Transfer record storage backend.
	#[serde(default = "empty_table")]
	pub storage: toml::Value,
	/// Account store backend.
	#[serde(default = "empty_table")]
	pub accounts: toml::Value,
	pub chains: ChainSections,
}

/// Top-level gateway behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
	/// Fiat currency for balance valuations and transfer records.
	#[serde(default = "default_fiat_currency")]
	pub fiat_currency: String,
	/// Concurrency cap for the per-chain fan-out on aggregate requests.
	#[serde(default = "default_max_concurrent_lookups")]
	pub max_concurrent_lookups: usize,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

impl Default for GatewaySettings {
	fn default() -> Self {
		Self {
			fiat_currency: default_fiat_currency(),
			max_concurrent_lookups: default_max_concurrent_lookups(),
			http_port: default_http_port(),
			log_level: default_log_level(),
		}
	}
}

/// One raw TOML table per supported chain, consumed by the adapter
/// factories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSections {
	pub btc: toml::Value,
	pub eth: toml::Value,
	pub bts: toml::Value,
}

fn default_fiat_currency() -> String {
	"USD".to_string()
}

fn default_max_concurrent_lookups() -> usize {
	3
}

fn default_http_port() -> u16 {
	3000
}

fn default_log_level() -> String {
	"info".to_string()
}

fn empty_table() -> toml::Value {
	toml::Value::Table(Default::default())
}
