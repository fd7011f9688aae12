//! Configuration loading from files and environment.

use crate::types::GatewayConfig;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
	/// Load configuration from a TOML file, with `${VAR}` placeholders
	/// substituted from the environment before parsing.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
		let path = path.as_ref();
		info!("Loading configuration from {:?}", path);

		let contents = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {:?}", path))?;

		let config = Self::from_toml(&contents)?;
		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Load from a TOML string.
	pub fn from_toml(contents: &str) -> Result<GatewayConfig> {
		let contents = Self::substitute_env_vars(contents)?;
		let mut config: GatewayConfig =
			toml::from_str(&contents).map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
		Self::apply_env_overrides(&mut config);
		Ok(config)
	}

	/// Replaces `${VAR}` placeholders with environment variable values.
	/// An unset variable is an error rather than an empty string, so a
	/// missing secret fails at startup instead of at the first request.
	fn substitute_env_vars(contents: &str) -> Result<String> {
		let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern");
		let mut missing = Vec::new();
		let substituted = pattern.replace_all(contents, |caps: &regex::Captures| {
			let name = &caps[1];
			match std::env::var(name) {
				Ok(value) => value,
				Err(_) => {
					missing.push(name.to_string());
					String::new()
				}
			}
		});
		if !missing.is_empty() {
			anyhow::bail!(
				"Environment variable(s) not set: {}",
				missing.join(", ")
			);
		}
		Ok(substituted.into_owned())
	}

	/// Apply environment variable overrides on top of the parsed file.
	fn apply_env_overrides(config: &mut GatewayConfig) {
		if let Ok(currency) = std::env::var("GATEWAY_FIAT_CURRENCY") {
			debug!("Overriding fiat currency from environment");
			config.gateway.fiat_currency = currency;
		}
		if let Ok(port) = std::env::var("GATEWAY_HTTP_PORT") {
			if let Ok(port) = port.parse() {
				debug!("Overriding HTTP port from environment");
				config.gateway.http_port = port;
			}
		}
		if let Ok(level) = std::env::var("GATEWAY_LOG_LEVEL") {
			config.gateway.log_level = level;
		}
		if let Ok(token) = std::env::var("VAULT_TOKEN") {
			debug!("Overriding vault token from environment");
			if let Some(table) = config.vault.as_table_mut() {
				table.insert("token".to_string(), toml::Value::String(token));
			}
		}
		if let Ok(key) = std::env::var("PRICE_FEED_API_KEY") {
			debug!("Overriding price feed API key from environment");
			if let Some(table) = config.price_feed.as_table_mut() {
				table.insert("api_key".to_string(), toml::Value::String(key));
			}
		}
	}

	/// Validate the typed top-level settings. The raw vault, price feed,
	/// storage, and chain sections are validated by their factories.
	pub fn validate_config(config: &GatewayConfig) -> Result<()> {
		if config.gateway.max_concurrent_lookups == 0 {
			anyhow::bail!("max_concurrent_lookups must be at least 1");
		}
		let currency = &config.gateway.fiat_currency;
		if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
			anyhow::bail!(
				"fiat_currency must be a three-letter uppercase code, got '{}'",
				currency
			);
		}
		Ok(())
	}
}

/// Load configuration from standard locations.
///
/// Checked in order: the `CONFIG_FILE` environment variable, then
/// `./config.toml`, then `./config/gateway.toml`.
pub fn load_config() -> Result<GatewayConfig> {
	if let Ok(path) = std::env::var("CONFIG_FILE") {
		return ConfigLoader::from_file(Path::new(&path));
	}

	let paths = ["./config.toml", "./config/gateway.toml"];
	for path in &paths {
		if Path::new(path).exists() {
			return ConfigLoader::from_file(Path::new(path));
		}
	}

	anyhow::bail!("No configuration file found; set CONFIG_FILE or create ./config.toml")
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_TOML: &str = r#"
[gateway]
fiat_currency = "USD"
max_concurrent_lookups = 3
http_port = 3000
log_level = "info"

[vault]
base_url = "https://vault.internal:8200"
token = "test-token"

[price_feed]
base_url = "https://min-api.cryptocompare.com"
api_key = "test-key"

[storage]
backend = "memory"

[accounts]

[chains.btc]
node_url = "https://blockstream.info/api"
explorer_base_url = "https://blockstream.info"
network_id = 0

[chains.eth]
node_url = "https://eth.example.com"
explorer_base_url = "https://etherscan.io"
network_id = 1

[chains.bts]
node_url = "https://bts.example.com/rpc"
explorer_base_url = "https://bts.ai"
asset_id = "1.3.5588"
network_id = 1
"#;

	#[test]
	fn parses_full_config() {
		let config = ConfigLoader::from_toml(BASE_TOML).unwrap();
		assert_eq!(config.gateway.fiat_currency, "USD");
		assert_eq!(config.gateway.max_concurrent_lookups, 3);
		assert_eq!(
			config.vault.get("base_url").and_then(|v| v.as_str()),
			Some("https://vault.internal:8200")
		);
		assert_eq!(
			config.chains.eth.get("network_id").and_then(|v| v.as_integer()),
			Some(1)
		);
	}

	#[test]
	fn gateway_section_defaults_apply() {
		let toml = BASE_TOML.replace(
			"[gateway]\nfiat_currency = \"USD\"\nmax_concurrent_lookups = 3\nhttp_port = 3000\nlog_level = \"info\"\n",
			"",
		);
		let config = ConfigLoader::from_toml(&toml).unwrap();
		assert_eq!(config.gateway.fiat_currency, "USD");
		assert_eq!(config.gateway.max_concurrent_lookups, 3);
		assert_eq!(config.gateway.http_port, 3000);
	}

	#[test]
	fn substitutes_environment_placeholders() {
		std::env::set_var("TEST_GATEWAY_VAULT_TOKEN", "secret-from-env");
		let toml = BASE_TOML.replace("\"test-token\"", "\"${TEST_GATEWAY_VAULT_TOKEN}\"");
		let config = ConfigLoader::from_toml(&toml).unwrap();
		assert_eq!(
			config.vault.get("token").and_then(|v| v.as_str()),
			Some("secret-from-env")
		);
	}

	#[test]
	fn unset_placeholder_fails_at_load() {
		let toml = BASE_TOML.replace("\"test-token\"", "\"${TEST_GATEWAY_UNSET_VAR}\"");
		let err = ConfigLoader::from_toml(&toml).unwrap_err();
		assert!(err.to_string().contains("TEST_GATEWAY_UNSET_VAR"));
	}

	#[test]
	fn load_config_honors_the_config_file_variable() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("gateway.toml");
		std::fs::write(&path, BASE_TOML).unwrap();

		std::env::set_var("CONFIG_FILE", &path);
		let config = load_config().unwrap();
		std::env::remove_var("CONFIG_FILE");

		assert_eq!(config.gateway.http_port, 3000);
		assert_eq!(config.gateway.fiat_currency, "USD");
	}

	#[test]
	fn zero_concurrency_is_rejected() {
		let toml = BASE_TOML.replace("max_concurrent_lookups = 3", "max_concurrent_lookups = 0");
		let config = ConfigLoader::from_toml(&toml).unwrap();
		let err = ConfigLoader::validate_config(&config).unwrap_err();
		assert!(err.to_string().contains("max_concurrent_lookups"));
	}

	#[test]
	fn lowercase_currency_is_rejected() {
		let toml = BASE_TOML.replace("fiat_currency = \"USD\"", "fiat_currency = \"usd\"");
		let config = ConfigLoader::from_toml(&toml).unwrap();
		assert!(ConfigLoader::validate_config(&config).is_err());
	}

	#[test]
	fn missing_chain_section_fails_to_parse() {
		let toml = BASE_TOML.replace("[chains.bts]", "[chains.bogus]");
		assert!(ConfigLoader::from_toml(&toml).is_err());
	}
}
