//! Price feed integration for the wallet gateway.
//!
//! One multi-symbol call serves the whole balance fan-out, so the feed is
//! hit once per aggregate request rather than once per chain. Quotes are
//! ephemeral; nothing here is cached or persisted.

use async_trait::async_trait;
use gateway_types::{Chain, PriceQuote, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub mod implementations {
	pub mod http;
}

/// Interface to the spot price feed, mirroring its two endpoints.
#[async_trait]
pub trait PriceFeedInterface: Send + Sync {
	/// Single-symbol spot price in the given fiat currency.
	async fn price(&self, symbol: &str, currency: &str) -> Result<Decimal>;

	/// Multi-symbol spot price with 24h change, keyed by symbol.
	async fn price_multi_full(
		&self,
		symbols: &[&str],
		currency: &str,
	) -> Result<BTreeMap<String, PriceQuote>>;
}

/// Price aggregation service.
pub struct PriceService {
	feed: Box<dyn PriceFeedInterface>,
}

impl PriceService {
	pub fn new(feed: Box<dyn PriceFeedInterface>) -> Self {
		Self { feed }
	}

	/// Spot price for one symbol.
	pub async fn quote_single(&self, symbol: &str, currency: &str) -> Result<Decimal> {
		self.feed.price(symbol, currency).await
	}

	/// Quotes for every supported chain's traded ticker, reshaped to be
	/// keyed by chain. One feed call regardless of chain count.
	pub async fn quotes_for_chains(&self, currency: &str) -> Result<BTreeMap<Chain, PriceQuote>> {
		let tickers: Vec<&str> = Chain::ALL.iter().map(|c| c.ticker()).collect();
		let by_symbol = self.feed.price_multi_full(&tickers, currency).await?;

		let mut by_chain = BTreeMap::new();
		for chain in Chain::ALL {
			if let Some(quote) = by_symbol.get(chain.ticker()) {
				by_chain.insert(chain, quote.clone());
			}
		}
		Ok(by_chain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gateway_types::GatewayError;

	struct FixedFeed;

	#[async_trait]
	impl PriceFeedInterface for FixedFeed {
		async fn price(&self, _symbol: &str, currency: &str) -> Result<Decimal> {
			if currency == "XYZ" {
				return Err(GatewayError::InvalidCurrency(currency.to_string()));
			}
			Ok("100".parse().unwrap())
		}

		async fn price_multi_full(
			&self,
			symbols: &[&str],
			_currency: &str,
		) -> Result<BTreeMap<String, PriceQuote>> {
			Ok(symbols
				.iter()
				.map(|s| {
					(
						s.to_string(),
						PriceQuote {
							price: "100".parse().unwrap(),
							change_pct_24h: "-1.5".parse().unwrap(),
						},
					)
				})
				.collect())
		}
	}

	#[tokio::test]
	async fn reshapes_quotes_by_chain() {
		let service = PriceService::new(Box::new(FixedFeed));
		let quotes = service.quotes_for_chains("USD").await.unwrap();

		assert_eq!(quotes.len(), Chain::ALL.len());
		// The Bitshares chain is quoted under its traded ticker.
		assert!(quotes.contains_key(&Chain::Bitshares));
	}

	#[tokio::test]
	async fn invalid_currency_propagates() {
		let service = PriceService::new(Box::new(FixedFeed));
		let err = service.quote_single("ETH", "XYZ").await.unwrap_err();
		assert!(matches!(err, GatewayError::InvalidCurrency(c) if c == "XYZ"));
	}
}
