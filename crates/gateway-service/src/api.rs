//! HTTP API for the wallet gateway.
//!
//! Thin layer over the engine: path and query parsing, JSON bodies, and
//! the mapping from the error taxonomy to HTTP statuses. Dependency
//! failure messages pass through to the caller unmodified.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use gateway_core::GatewayEngine;
use gateway_types::{Chain, GatewayError, TransferRequest};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

type AppState = Arc<GatewayEngine>;

pub fn router(engine: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/addresses/{account}", get(get_addresses))
		.route("/api/balances/{account}", get(get_balances))
		.route("/api/price/{coin}", get(get_price))
		.route("/api/transfer/{chain}", post(transfer))
		.route("/api/transfer/{chain}/{txn_id}", get(get_status))
		.route("/api/history/{chain}/{account}", get(get_history))
		.route("/api/address/convert", get(convert_address))
		.with_state(engine)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Error wrapper implementing the taxonomy-to-status mapping.
struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
	fn from(err: GatewayError) -> Self {
		Self(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let err = self.0;
		let status = match &err {
			GatewayError::BadRequest(_)
			| GatewayError::InvalidCurrency(_)
			| GatewayError::SymbolMismatch { .. } => StatusCode::BAD_REQUEST,
			GatewayError::AccountNotFound(_) | GatewayError::TransferNotFound { .. } => {
				StatusCode::NOT_FOUND
			}
			GatewayError::SignerUnavailable(_)
			| GatewayError::NodeUnavailable(_)
			| GatewayError::PriceFeedUnavailable(_) => StatusCode::BAD_GATEWAY,
			GatewayError::RecordingFailedAfterBroadcast { .. }
			| GatewayError::Storage(_)
			| GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		};

		if !err.is_client_error() {
			warn!(error = %err, "Request failed");
		}

		// The recording failure carries the transaction id so the caller
		// knows funds moved even though bookkeeping did not.
		let body = match &err {
			GatewayError::RecordingFailedAfterBroadcast { txn_id, .. } => serde_json::json!({
				"reason": err.to_string(),
				"TransactionId": txn_id,
			}),
			_ => serde_json::json!({ "reason": err.to_string() }),
		};

		(status, Json(body)).into_response()
	}
}

fn parse_chain(value: &str) -> Result<Chain, ApiError> {
	value.parse::<Chain>().map_err(ApiError)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn get_addresses(
	State(engine): State<AppState>,
	Path(account): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
	Ok(Json(engine.get_addresses(&account).await?))
}

async fn get_balances(
	State(engine): State<AppState>,
	Path(account): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
	Ok(Json(engine.get_balances(&account).await?))
}

#[derive(Deserialize)]
struct PriceQuery {
	#[serde(default = "default_currency")]
	currency: String,
}

fn default_currency() -> String {
	"USD".to_string()
}

async fn get_price(
	State(engine): State<AppState>,
	Path(coin): Path<String>,
	Query(query): Query<PriceQuery>,
) -> Result<impl IntoResponse, ApiError> {
	Ok(Json(engine.get_price(&coin, &query.currency).await?))
}

async fn transfer(
	State(engine): State<AppState>,
	Path(chain): Path<String>,
	Json(request): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
	let chain = parse_chain(&chain)?;
	Ok(Json(engine.transfer(chain, &request).await?))
}

async fn get_status(
	State(engine): State<AppState>,
	Path((chain, txn_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
	let chain = parse_chain(&chain)?;
	Ok(Json(engine.get_status(chain, &txn_id).await?))
}

async fn get_history(
	State(engine): State<AppState>,
	Path((chain, account)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
	let chain = parse_chain(&chain)?;
	Ok(Json(engine.get_history(chain, &account).await?))
}

#[derive(Deserialize)]
struct ConvertQuery {
	coin: String,
	address: String,
}

async fn convert_address(
	State(engine): State<AppState>,
	Query(query): Query<ConvertQuery>,
) -> Result<impl IntoResponse, ApiError> {
	let account = engine.convert_address(&query.coin, &query.address).await?;
	Ok(Json(serde_json::json!({ "account": account })))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn status_for(err: GatewayError) -> StatusCode {
		ApiError(err).into_response().status()
	}

	#[test]
	fn client_errors_map_to_4xx() {
		assert_eq!(
			status_for(GatewayError::BadRequest("fromAccount is mandatory".into())),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			status_for(GatewayError::AccountNotFound("ghost".into())),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			status_for(GatewayError::TransferNotFound {
				chain: Chain::Ethereum,
				txn_id: "0xabc".into(),
			}),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			status_for(GatewayError::SymbolMismatch {
				symbol: "BTC".into(),
				chain: Chain::Ethereum,
			}),
			StatusCode::BAD_REQUEST
		);
	}

	#[test]
	fn dependency_failures_map_to_bad_gateway() {
		assert_eq!(
			status_for(GatewayError::NodeUnavailable("connection refused".into())),
			StatusCode::BAD_GATEWAY
		);
		assert_eq!(
			status_for(GatewayError::SignerUnavailable("vault sealed".into())),
			StatusCode::BAD_GATEWAY
		);
	}

	#[test]
	fn recording_failure_is_5xx_and_carries_the_txn_id() {
		let response = ApiError(GatewayError::RecordingFailedAfterBroadcast {
			chain: Chain::Ethereum,
			txn_id: "0xabc".into(),
			reason: "disk full".into(),
		})
		.into_response();
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}
}
