//! Ephemeral per-request views: prices, balances, addresses, history.
//!
//! These are assembled from adapter outputs on every request and never
//! persisted. Aggregates are keyed by chain symbol in the fixed chain
//! order, so callers see a stable shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spot price with 24h change for one symbol in one fiat currency.
/// Ephemeral; recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
	pub price: Decimal,
	pub change_pct_24h: Decimal,
}

/// Result of a single-symbol price lookup on one adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
	pub symbol: String,
	pub currency: String,
	pub price: Decimal,
}

/// A single chain's balance as reported by its adapter, in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
	pub account_name: String,
	pub balance: Decimal,
	pub unit: String,
}

/// One chain's entry in the aggregated balance view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
	pub account_name: String,
	/// Balance in display units.
	pub balance: Decimal,
	pub unit: String,
	pub address: String,
	pub price: Decimal,
	pub change_pct_24h: Decimal,
}

/// Aggregated balances keyed by chain symbol.
pub type BalanceView = BTreeMap<String, BalanceEntry>;

/// Aggregated addresses keyed by chain symbol.
pub type AddressView = BTreeMap<String, String>;

/// Explorer reference for an account's transaction history. The gateway
/// does not aggregate history entries itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryInfo {
	pub url: String,
}
