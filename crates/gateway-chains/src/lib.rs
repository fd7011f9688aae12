//! Chain adapters for the wallet gateway.
//!
//! One adapter per supported chain, all implementing the same capability
//! set so the orchestration engine can treat them uniformly. Each adapter
//! owns a node client for its chain and shares the account, signer,
//! pricing, and transfer-record services with the rest of the gateway.

use async_trait::async_trait;
use gateway_accounts::AccountService;
use gateway_pricing::PriceService;
use gateway_signer::SignerService;
use gateway_storage::TransferStore;
use gateway_types::{
	BalanceInfo, Chain, FeeEstimate, GatewayError, HistoryInfo, PriceInfo, Result,
	TransferReceipt, TransferRecord, TransferRequest,
};
use std::sync::Arc;

pub mod transfer;

pub mod implementations {
	pub mod bitcoin;
	pub mod bitshares;
	pub mod ethereum;
}

/// Interface to one chain's node or explorer. Implementations translate
/// these four capabilities onto whatever RPC surface the chain exposes.
#[async_trait]
pub trait NodeInterface: Send + Sync {
	/// Balance of an address in the chain's smallest unit.
	async fn balance(&self, address: &str) -> Result<u128>;

	/// Fee price and fee limit for a transfer between two addresses.
	async fn estimate_fee(&self, from: &str, to: &str) -> Result<FeeEstimate>;

	/// Next sequence number (nonce) for the given address.
	async fn sequence(&self, address: &str) -> Result<u64>;

	/// Broadcasts a signed payload and returns the transaction id.
	async fn broadcast(&self, signed_payload: &str) -> Result<String>;
}

/// Shared collaborators handed to every adapter at construction. Built
/// once at startup from configuration; adapters never construct their own
/// clients for these.
#[derive(Clone)]
pub struct AdapterContext {
	pub accounts: Arc<AccountService>,
	pub signer: Arc<SignerService>,
	pub pricing: Arc<PriceService>,
	pub transfers: Arc<TransferStore>,
	/// Fiat currency used for the value snapshot on transfer records.
	pub fiat_currency: String,
}

/// Uniform capability set implemented by every chain adapter.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
	/// The chain this adapter serves.
	fn chain(&self) -> Chain;

	/// Resolves an account name and derives its address on this chain.
	async fn get_address(&self, account_name: &str) -> Result<String>;

	/// Current balance in display units.
	async fn get_balance(&self, account_name: &str) -> Result<BalanceInfo>;

	/// Spot price for a symbol this adapter owns.
	async fn get_price(&self, symbol: &str, currency: &str) -> Result<PriceInfo>;

	/// Runs the transfer workflow; returns the broadcast transaction id.
	async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt>;

	/// Looks up a previously recorded transfer.
	async fn get_status(&self, txn_id: &str) -> Result<TransferRecord>;

	/// Explorer reference for the account's transaction history.
	async fn get_history(&self, account_name: &str) -> Result<HistoryInfo>;
}

/// Resolves an account name to its derived address on the given chain.
/// The custody id is resolved first; the vault refuses derivation for
/// custody ids it did not issue.
pub(crate) async fn derive_account_address(
	ctx: &AdapterContext,
	chain: Chain,
	account_name: &str,
) -> Result<String> {
	let custody_id = ctx.accounts.resolve(account_name).await?;
	ctx.signer.derive_address(chain, custody_id).await
}

/// Single-symbol price lookup shared by all adapters: the adapter owns a
/// fixed set of symbols and refuses the rest.
pub(crate) async fn price_for_owned_symbol(
	ctx: &AdapterContext,
	chain: Chain,
	owned_symbols: &[&str],
	symbol: &str,
	currency: &str,
) -> Result<PriceInfo> {
	let symbol = symbol.to_ascii_uppercase();
	if !owned_symbols.contains(&symbol.as_str()) {
		return Err(GatewayError::SymbolMismatch { symbol, chain });
	}
	let price = ctx.pricing.quote_single(&symbol, currency).await?;
	Ok(PriceInfo {
		symbol,
		currency: currency.to_string(),
		price,
	})
}

/// Status lookup shared by all adapters.
pub(crate) async fn find_transfer(
	ctx: &AdapterContext,
	chain: Chain,
	txn_id: &str,
) -> Result<TransferRecord> {
	ctx.transfers
		.find(chain, txn_id)
		.await
		.map_err(|e| GatewayError::Storage(e.to_string()))?
		.ok_or_else(|| GatewayError::TransferNotFound {
			chain,
			txn_id: txn_id.to_string(),
		})
}
