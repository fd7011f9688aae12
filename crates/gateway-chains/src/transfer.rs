//! The transfer workflow shared by all chain adapters.
//!
//! One pass through a fixed pipeline, no automatic retries at any step:
//! validating → resolving addresses → estimating fees → building payload
//! → signing → broadcasting → recording → done. A failure anywhere before
//! the broadcast completes leaves no trace; a failure while recording a
//! broadcast transfer is surfaced as `RecordingFailedAfterBroadcast`,
//! because at that point funds have already moved on-chain.

use crate::{AdapterContext, NodeInterface};
use gateway_types::{
	to_smallest_units, Chain, CustodyId, GatewayError, Result, TransferReceipt, TransferRecord,
	TransferRequest, TransferStatus, UnsignedPayload,
};
use rust_decimal::Decimal;

/// Pipeline stage names, used for step-level tracing.
#[derive(Debug, Clone, Copy)]
enum Step {
	Validating,
	ResolvingAddresses,
	EstimatingFees,
	BuildingPayload,
	Signing,
	Broadcasting,
	Recording,
}

/// Per-chain inputs to the shared pipeline.
pub struct TransferParams<'a> {
	pub chain: Chain,
	/// Network/chain id stamped into the unsigned payload.
	pub network_id: u64,
	/// Syntactic address check for this chain. A side that already looks
	/// like a valid address is used as-is instead of being derived.
	pub is_valid_address: fn(&str) -> bool,
	pub node: &'a dyn NodeInterface,
	pub ctx: &'a AdapterContext,
}

/// Runs the transfer workflow. Returns the broadcast transaction id.
pub async fn execute(
	params: TransferParams<'_>,
	request: &TransferRequest,
) -> Result<TransferReceipt> {
	let chain = params.chain;

	// Validating: all three fields are mandatory, checked before any
	// network call is made.
	trace_step(chain, Step::Validating);
	let from_account = require_field(&request.from_account, "fromAccount")?;
	let to_account = require_field(&request.to_account, "toAccount")?;
	let send_amount = request
		.send_amount
		.ok_or_else(|| GatewayError::BadRequest("sendAmount is mandatory".to_string()))?;

	// Resolving addresses: both sides must be registered accounts (the
	// vault signs only against a custody id). Each side is then resolved
	// to an on-chain address independently; a value that is already a
	// syntactically valid address for this chain is used directly.
	trace_step(chain, Step::ResolvingAddresses);
	let from_custody = params.ctx.accounts.resolve(from_account).await?;
	let to_custody = params.ctx.accounts.resolve(to_account).await?;
	let from_address = resolve_side(&params, from_account, from_custody).await?;
	let to_address = resolve_side(&params, to_account, to_custody).await?;

	// Estimating fees
	trace_step(chain, Step::EstimatingFees);
	let fee = params.node.estimate_fee(&from_address, &to_address).await?;

	// Building payload: display units to smallest units, then the
	// sender's next sequence number.
	trace_step(chain, Step::BuildingPayload);
	let amount = to_smallest_units(send_amount, chain.decimals())?;
	let sequence = params.node.sequence(&from_address).await?;
	let payload = UnsignedPayload {
		sequence,
		value: amount,
		fee_limit: fee.fee_limit,
		fee_price: fee.fee_price,
		to: to_address,
		data: String::new(),
		network_id: params.network_id,
	};

	// Signing: the serialized payload goes to the vault with the sender's
	// custody id; key material never enters this process.
	trace_step(chain, Step::Signing);
	let serialized = serde_json::to_string(&payload)
		.map_err(|e| GatewayError::SignerUnavailable(format!("cannot serialize payload: {}", e)))?;
	let signed = params
		.ctx
		.signer
		.sign(chain, &serialized, from_custody)
		.await?;

	// Broadcasting
	trace_step(chain, Step::Broadcasting);
	let txn_id = params.node.broadcast(&signed).await?;

	// Recording: snapshot the current price once and persist the record.
	// From here on the transfer exists on-chain, so a failure must be
	// reported as the distinguished recording error, never masked.
	trace_step(chain, Step::Recording);
	if let Err(e) =
		record(&params, from_account, to_account, amount, send_amount, &txn_id).await
	{
		tracing::error!(
			chain = %chain,
			txn_id = %txn_id,
			error = %e,
			"Transfer broadcast but recording failed"
		);
		return Err(GatewayError::RecordingFailedAfterBroadcast {
			chain,
			txn_id,
			reason: e.to_string(),
		});
	}

	tracing::info!(chain = %chain, txn_id = %txn_id, "Transfer broadcast and recorded");
	Ok(TransferReceipt {
		transaction_id: txn_id,
	})
}

fn require_field<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
	value
		.as_deref()
		.filter(|v| !v.is_empty())
		.ok_or_else(|| GatewayError::BadRequest(format!("{} is mandatory", name)))
}

/// Resolves one side of the transfer to an on-chain address. The custody
/// id has already been resolved; derivation is skipped when the caller
/// supplied a raw address for this chain.
async fn resolve_side(
	params: &TransferParams<'_>,
	supplied: &str,
	custody_id: CustodyId,
) -> Result<String> {
	if (params.is_valid_address)(supplied) {
		return Ok(supplied.to_string());
	}
	params.ctx.signer.derive_address(params.chain, custody_id).await
}

async fn record(
	params: &TransferParams<'_>,
	from_account: &str,
	to_account: &str,
	amount: u128,
	send_amount: Decimal,
	txn_id: &str,
) -> Result<()> {
	let chain = params.chain;
	let currency = &params.ctx.fiat_currency;
	let price = params
		.ctx
		.pricing
		.quote_single(chain.ticker(), currency)
		.await?;
	let value_fiat = send_amount.checked_mul(price).ok_or_else(|| {
		GatewayError::Storage(format!(
			"fiat value overflow for {} x {}",
			send_amount, price
		))
	})?;

	let record = TransferRecord {
		chain,
		txn_id: txn_id.to_string(),
		from_account: from_account.to_string(),
		to_account: to_account.to_string(),
		amount,
		value_fiat,
		fiat_currency: currency.clone(),
		status: TransferStatus::Pending,
		initiated_at: chrono::Utc::now(),
	};

	params
		.ctx
		.transfers
		.insert(&record)
		.await
		.map_err(|e| GatewayError::Storage(e.to_string()))
}

fn trace_step(chain: Chain, step: Step) {
	tracing::debug!(chain = %chain, step = ?step, "Transfer pipeline step");
}
