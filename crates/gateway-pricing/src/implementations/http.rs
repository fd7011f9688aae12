//! HTTP price feed client.
//!
//! Wire contract (CryptoCompare-shaped):
//! - `GET /data/price?fsym=ETH&tsyms=USD -> {"USD": 3200.1}`
//! - `GET /data/pricemultifull?fsyms=BTC,ETH&tsyms=USD ->
//!   {"RAW": {"BTC": {"USD": {"PRICE": .., "CHANGEPCT24HOUR": ..}}}}`
//!
//! Auth is an API key in the `Apikey` header. The feed reports an
//! unsupported currency as a 200 with the body
//! `{"Response": "Error", "Message": "There is no data for any of the
//! toSymbols XYZ ."}`, which maps to `InvalidCurrency`; every other error
//! shape maps to `PriceFeedUnavailable` with the message passed through.
//!
//! Prices are extracted from the JSON number's text, not an f64, so feed
//! values reach the caller without floating-point drift.

use crate::{PriceFeedInterface, PriceQuote};
use async_trait::async_trait;
use gateway_types::{Field, FieldType, GatewayError, Result, Schema};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::time::Duration;

const API_KEY_HEADER: &str = "Apikey";

pub struct HttpPriceFeed {
	client: reqwest::Client,
	base_url: String,
	api_key: String,
}

impl HttpPriceFeed {
	pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Config(format!("cannot build price client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			api_key: api_key.to_string(),
		})
	}

	async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
		let url = format!("{}{}", self.base_url, path);
		let response = self
			.client
			.get(&url)
			.header(API_KEY_HEADER, &self.api_key)
			.query(query)
			.send()
			.await
			.map_err(|e| GatewayError::PriceFeedUnavailable(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(GatewayError::PriceFeedUnavailable(format!(
				"price feed returned {}: {}",
				status, message
			)));
		}

		response
			.json()
			.await
			.map_err(|e| GatewayError::PriceFeedUnavailable(format!("invalid response: {}", e)))
	}
}

/// Checks the feed's in-band error shape. An unsupported target currency
/// is the caller's mistake; anything else is a dependency failure.
fn check_error_shape(body: &serde_json::Value, currency: &str) -> Result<()> {
	if body.get("Response").and_then(|v| v.as_str()) == Some("Error") {
		let message = body
			.get("Message")
			.and_then(|v| v.as_str())
			.unwrap_or_default();
		if message.contains("no data for any of the toSymbols") {
			return Err(GatewayError::InvalidCurrency(currency.to_string()));
		}
		return Err(GatewayError::PriceFeedUnavailable(message.to_string()));
	}
	Ok(())
}

/// Extracts a decimal from a JSON number via its textual form.
fn decimal_at(value: &serde_json::Value, context: &str) -> Result<Decimal> {
	let number = value.as_number().ok_or_else(|| {
		GatewayError::PriceFeedUnavailable(format!("missing number at {}", context))
	})?;
	number.to_string().parse().map_err(|e| {
		GatewayError::PriceFeedUnavailable(format!("unparseable number at {}: {}", context, e))
	})
}

pub(crate) fn parse_single_response(
	body: &serde_json::Value,
	currency: &str,
) -> Result<Decimal> {
	check_error_shape(body, currency)?;
	let value = body.get(currency).ok_or_else(|| {
		GatewayError::PriceFeedUnavailable(format!("no {} price in response", currency))
	})?;
	decimal_at(value, currency)
}

pub(crate) fn parse_multi_response(
	body: &serde_json::Value,
	symbols: &[&str],
	currency: &str,
) -> Result<BTreeMap<String, PriceQuote>> {
	check_error_shape(body, currency)?;
	let raw = body.get("RAW").ok_or_else(|| {
		GatewayError::PriceFeedUnavailable("no RAW section in response".to_string())
	})?;

	let mut quotes = BTreeMap::new();
	for symbol in symbols {
		let per_currency = raw.get(*symbol).and_then(|v| v.get(currency)).ok_or_else(|| {
			GatewayError::PriceFeedUnavailable(format!("no {}/{} quote", symbol, currency))
		})?;
		quotes.insert(
			symbol.to_string(),
			PriceQuote {
				price: decimal_at(
					per_currency.get("PRICE").unwrap_or(&serde_json::Value::Null),
					&format!("{}.PRICE", symbol),
				)?,
				change_pct_24h: decimal_at(
					per_currency
						.get("CHANGEPCT24HOUR")
						.unwrap_or(&serde_json::Value::Null),
					&format!("{}.CHANGEPCT24HOUR", symbol),
				)?,
			},
		);
	}
	Ok(quotes)
}

#[async_trait]
impl PriceFeedInterface for HttpPriceFeed {
	async fn price(&self, symbol: &str, currency: &str) -> Result<Decimal> {
		let body = self
			.get_json("/data/price", &[("fsym", symbol), ("tsyms", currency)])
			.await?;
		parse_single_response(&body, currency)
	}

	async fn price_multi_full(
		&self,
		symbols: &[&str],
		currency: &str,
	) -> Result<BTreeMap<String, PriceQuote>> {
		let fsyms = symbols.join(",");
		let body = self
			.get_json(
				"/data/pricemultifull",
				&[("fsyms", fsyms.as_str()), ("tsyms", currency)],
			)
			.await?;
		parse_multi_response(&body, symbols, currency)
	}
}

/// Configuration schema for the `[price_feed]` section.
pub fn config_schema() -> Schema {
	Schema::new(
		vec![
			Field::new("base_url", FieldType::String).with_validator(|value| {
				let url = value.as_str().unwrap();
				if url.starts_with("http://") || url.starts_with("https://") {
					Ok(())
				} else {
					Err("base_url must start with http:// or https://".to_string())
				}
			}),
			Field::new("api_key", FieldType::String),
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

/// Factory function to create the HTTP price feed from the `[price_feed]`
/// config section.
pub fn create_price_feed(config: &toml::Value) -> Result<Box<dyn PriceFeedInterface>> {
	config_schema()
		.validate(config)
		.map_err(|e| GatewayError::Config(format!("price_feed: {}", e)))?;

	let base_url = config.get("base_url").and_then(|v| v.as_str()).unwrap();
	let api_key = config.get("api_key").and_then(|v| v.as_str()).unwrap();
	let timeout_secs = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	let feed = HttpPriceFeed::new(base_url, api_key, Duration::from_secs(timeout_secs))?;
	Ok(Box::new(feed))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn parses_single_price() {
		let body = json!({"USD": 3200.25});
		let price = parse_single_response(&body, "USD").unwrap();
		assert_eq!(price, "3200.25".parse::<Decimal>().unwrap());
	}

	#[test]
	fn unsupported_currency_maps_to_invalid_currency() {
		let body = json!({
			"Response": "Error",
			"Message": "There is no data for any of the toSymbols XYZ ."
		});
		let err = parse_single_response(&body, "XYZ").unwrap_err();
		assert!(matches!(err, GatewayError::InvalidCurrency(c) if c == "XYZ"));
	}

	#[test]
	fn other_feed_errors_map_to_unavailable() {
		let body = json!({
			"Response": "Error",
			"Message": "You are over your rate limit please upgrade your account!"
		});
		let err = parse_single_response(&body, "USD").unwrap_err();
		assert!(matches!(err, GatewayError::PriceFeedUnavailable(m) if m.contains("rate limit")));
	}

	#[test]
	fn parses_multi_full_response() {
		let body = json!({
			"RAW": {
				"BTC": {"USD": {"PRICE": 64000.5, "CHANGEPCT24HOUR": 2.1}},
				"ETH": {"USD": {"PRICE": 3200.25, "CHANGEPCT24HOUR": -0.8}},
				"UDOO": {"USD": {"PRICE": 0.0421, "CHANGEPCT24HOUR": 0.0}}
			}
		});
		let quotes = parse_multi_response(&body, &["BTC", "ETH", "UDOO"], "USD").unwrap();

		assert_eq!(quotes.len(), 3);
		assert_eq!(
			quotes["ETH"].change_pct_24h,
			"-0.8".parse::<Decimal>().unwrap()
		);
		assert_eq!(quotes["UDOO"].price, "0.0421".parse::<Decimal>().unwrap());
	}

	#[test]
	fn missing_symbol_in_multi_response_is_a_feed_error() {
		let body = json!({"RAW": {"BTC": {"USD": {"PRICE": 1, "CHANGEPCT24HOUR": 0}}}});
		let err = parse_multi_response(&body, &["BTC", "ETH"], "USD").unwrap_err();
		assert!(matches!(err, GatewayError::PriceFeedUnavailable(_)));
	}
}
