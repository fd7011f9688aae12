//! HTTP client for the vault custody service.
//!
//! Wire contract:
//! - `POST /api/address {coinType, path, uuid} -> {address}`
//! - `POST /api/signature {coinType, path, payload, uuid} -> {signature}`
//! - `POST /api/register -> {uuid}`
//!
//! Auth is a static token in the `x-vault-token` header. Any transport or
//! non-success response maps to `SignerUnavailable` with the vault's
//! message passed through.

use crate::SignerInterface;
use async_trait::async_trait;
use gateway_types::{Chain, CustodyId, Field, FieldType, GatewayError, Result, Schema};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VAULT_TOKEN_HEADER: &str = "x-vault-token";

pub struct HttpVaultSigner {
	client: reqwest::Client,
	base_url: String,
	token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressRequest<'a> {
	coin_type: u32,
	path: &'a str,
	uuid: CustodyId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureRequest<'a> {
	coin_type: u32,
	path: &'a str,
	payload: &'a str,
	uuid: CustodyId,
}

#[derive(Deserialize)]
struct AddressResponse {
	address: String,
}

#[derive(Deserialize)]
struct SignatureResponse {
	signature: String,
}

#[derive(Deserialize)]
struct RegisterResponse {
	uuid: CustodyId,
}

impl HttpVaultSigner {
	pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Config(format!("cannot build vault client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			token: token.to_string(),
		})
	}

	async fn post<B: Serialize, R: serde::de::DeserializeOwned>(
		&self,
		endpoint: &str,
		body: &B,
	) -> Result<R> {
		let url = format!("{}{}", self.base_url, endpoint);
		let response = self
			.client
			.post(&url)
			.header(VAULT_TOKEN_HEADER, &self.token)
			.json(body)
			.send()
			.await
			.map_err(|e| GatewayError::SignerUnavailable(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(GatewayError::SignerUnavailable(format!(
				"vault returned {}: {}",
				status, message
			)));
		}

		response
			.json()
			.await
			.map_err(|e| GatewayError::SignerUnavailable(format!("invalid vault response: {}", e)))
	}
}

#[async_trait]
impl SignerInterface for HttpVaultSigner {
	async fn derive_address(&self, chain: Chain, custody_id: CustodyId) -> Result<String> {
		let body = AddressRequest {
			coin_type: chain.coin_type(),
			path: chain.derivation_path(),
			uuid: custody_id,
		};
		tracing::debug!(chain = %chain, custody_id = %custody_id, "Requesting address derivation");
		let response: AddressResponse = self.post("/api/address", &body).await?;
		Ok(response.address)
	}

	async fn sign(&self, chain: Chain, payload: &str, custody_id: CustodyId) -> Result<String> {
		let body = SignatureRequest {
			coin_type: chain.coin_type(),
			path: chain.derivation_path(),
			payload,
			uuid: custody_id,
		};
		tracing::debug!(chain = %chain, custody_id = %custody_id, "Requesting signature");
		let response: SignatureResponse = self.post("/api/signature", &body).await?;
		Ok(response.signature)
	}

	async fn register(&self) -> Result<CustodyId> {
		let response: RegisterResponse =
			self.post("/api/register", &serde_json::json!({})).await?;
		Ok(response.uuid)
	}
}

/// Configuration schema for the `[vault]` section.
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
			Field::new("token", FieldType::String),
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

/// Factory function to create a vault signer from the `[vault]` config
/// section.
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn SignerInterface>> {
	config_schema()
		.validate(config)
		.map_err(|e| GatewayError::Config(format!("vault: {}", e)))?;

	let base_url = config.get("base_url").and_then(|v| v.as_str()).unwrap();
	let token = config.get("token").and_then(|v| v.as_str()).unwrap();
	let timeout_secs = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	let signer = HttpVaultSigner::new(base_url, token, Duration::from_secs(timeout_secs))?;
	Ok(Box::new(signer))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn address_request_uses_vault_field_names() {
		let custody_id = CustodyId::new();
		let body = AddressRequest {
			coin_type: Chain::Ethereum.coin_type(),
			path: Chain::Ethereum.derivation_path(),
			uuid: custody_id,
		};
		let json = serde_json::to_value(&body).unwrap();
		assert_eq!(json["coinType"], 60);
		assert_eq!(json["path"], "m/44'/60'/0'/0/0");
		assert_eq!(json["uuid"], serde_json::to_value(custody_id).unwrap());
	}

	#[test]
	fn register_response_carries_the_issued_custody_id() {
		let custody_id = CustodyId::new();
		let body = format!("{{\"uuid\": \"{}\"}}", custody_id);
		let response: RegisterResponse = serde_json::from_str(&body).unwrap();
		assert_eq!(response.uuid, custody_id);
	}

	#[test]
	fn schema_rejects_non_http_url() {
		let config: toml::Value =
			toml::from_str("base_url = \"vault.internal\"\ntoken = \"t\"").unwrap();
		assert!(config_schema().validate(&config).is_err());
	}

	#[test]
	fn schema_accepts_minimal_section() {
		let config: toml::Value =
			toml::from_str("base_url = \"https://vault.internal\"\ntoken = \"t\"").unwrap();
		assert!(config_schema().validate(&config).is_ok());
	}
}
