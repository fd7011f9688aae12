//! Orchestration engine for the wallet gateway.
//!
//! Owns the chain adapter registry and runs the aggregate operations that
//! span every chain. Aggregates resolve the account exactly once before
//! touching any chain, fan out with a bounded concurrency cap, and abort
//! on the first per-chain failure rather than returning a partial view.

use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use gateway_accounts::AccountService;
use gateway_chains::ChainAdapter;
use gateway_pricing::PriceService;
use gateway_types::{
	AddressView, BalanceEntry, BalanceView, Chain, GatewayError, HistoryInfo, PriceInfo, Result,
	TransferReceipt, TransferRecord, TransferRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Default concurrency cap for the per-chain fan-out.
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 3;

/// The gateway's orchestration engine.
///
/// Single-chain operations dispatch straight to the owning adapter;
/// aggregate operations fan out over the fixed chain set.
pub struct GatewayEngine {
	adapters: HashMap<Chain, Arc<dyn ChainAdapter>>,
	accounts: Arc<AccountService>,
	pricing: Arc<PriceService>,
	fiat_currency: String,
	max_concurrent_lookups: usize,
}

impl GatewayEngine {
	fn adapter(&self, chain: Chain) -> &Arc<dyn ChainAdapter> {
		// The builder refuses to construct an engine with a missing chain.
		&self.adapters[&chain]
	}

	/// Adapters for the full chain set, in the fixed fan-out order.
	fn all_adapters(&self) -> Vec<(Chain, Arc<dyn ChainAdapter>)> {
		Chain::ALL
			.iter()
			.map(|chain| (*chain, Arc::clone(self.adapter(*chain))))
			.collect()
	}

	/// Derived addresses for one account on every chain, keyed by chain
	/// symbol.
	pub async fn get_addresses(&self, account_name: &str) -> Result<AddressView> {
		// Resolve once up front; an unknown account never reaches a chain.
		self.accounts.resolve(account_name).await?;

		// Futures are built eagerly and boxed to work around
		// rust-lang/rust#89976 ("implementation of `FnOnce` is not general
		// enough") in Send handler contexts; `buffered` still caps how many
		// run at once.
		let lookups: Vec<_> = self
			.all_adapters()
			.into_iter()
			.map(|(chain, adapter)| {
				async move {
					let address = adapter.get_address(account_name).await?;
					Ok::<_, GatewayError>((chain, address))
				}
				.boxed()
			})
			.collect();
		let entries: Vec<(Chain, String)> = stream::iter(lookups)
			.buffered(self.max_concurrent_lookups)
			.try_collect()
			.await?;

		Ok(entries
			.into_iter()
			.map(|(chain, address)| (chain.symbol().to_string(), address))
			.collect())
	}

	/// Balances with valuations for one account on every chain, keyed by
	/// chain symbol. The price feed is hit once for the whole view.
	pub async fn get_balances(&self, account_name: &str) -> Result<BalanceView> {
		self.accounts.resolve(account_name).await?;

		let quotes = self.pricing.quotes_for_chains(&self.fiat_currency).await?;

		// Eagerly-built boxed futures, for the same rust-lang/rust#89976
		// workaround as in `get_addresses`.
		let lookups: Vec<_> = self
			.all_adapters()
			.into_iter()
			.map(|(chain, adapter)| {
				let quote = quotes.get(&chain).cloned();
				async move {
					let quote = quote.ok_or_else(|| {
						GatewayError::PriceFeedUnavailable(format!(
							"no quote returned for {}",
							chain.ticker()
						))
					})?;
					let address = adapter.get_address(account_name).await?;
					let balance = adapter.get_balance(account_name).await?;
					Ok::<_, GatewayError>((
						chain,
						BalanceEntry {
							account_name: balance.account_name,
							balance: balance.balance,
							unit: balance.unit,
							address,
							price: quote.price,
							change_pct_24h: quote.change_pct_24h,
						},
					))
				}
				.boxed()
			})
			.collect();
		let entries: Vec<(Chain, BalanceEntry)> = stream::iter(lookups)
			.buffered(self.max_concurrent_lookups)
			.try_collect()
			.await?;

		debug!(account = %account_name, chains = entries.len(), "Assembled balance view");
		Ok(entries
			.into_iter()
			.map(|(chain, entry)| (chain.symbol().to_string(), entry))
			.collect())
	}

	/// Spot price for one coin symbol, dispatched to the owning adapter.
	pub async fn get_price(&self, coin: &str, currency: &str) -> Result<PriceInfo> {
		let chain: Chain = coin.parse()?;
		self.adapter(chain).get_price(coin, currency).await
	}

	/// Runs the transfer workflow on the named chain.
	pub async fn transfer(&self, chain: Chain, request: &TransferRequest) -> Result<TransferReceipt> {
		info!(chain = %chain, "Initiating transfer");
		self.adapter(chain).transfer(request).await
	}

	/// Looks up a recorded transfer on the named chain.
	pub async fn get_status(&self, chain: Chain, txn_id: &str) -> Result<TransferRecord> {
		self.adapter(chain).get_status(txn_id).await
	}

	/// Explorer reference for an account's history on the named chain.
	pub async fn get_history(&self, chain: Chain, account_name: &str) -> Result<HistoryInfo> {
		self.adapter(chain).get_history(account_name).await
	}

	/// Maps a cached on-chain address back to the owning account name.
	pub async fn convert_address(&self, coin: &str, address: &str) -> Result<String> {
		let chain: Chain = coin.parse()?;
		let account = self.accounts.find_by_address(chain, address).await?;
		Ok(account.name)
	}
}

/// Builder for [`GatewayEngine`]. Construction fails unless every
/// supported chain has a registered adapter.
pub struct GatewayBuilder {
	adapters: HashMap<Chain, Arc<dyn ChainAdapter>>,
	accounts: Arc<AccountService>,
	pricing: Arc<PriceService>,
	fiat_currency: String,
	max_concurrent_lookups: usize,
}

impl GatewayBuilder {
	pub fn new(accounts: Arc<AccountService>, pricing: Arc<PriceService>) -> Self {
		Self {
			adapters: HashMap::new(),
			accounts,
			pricing,
			fiat_currency: "USD".to_string(),
			max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
		}
	}

	pub fn with_adapter(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
		self.adapters.insert(adapter.chain(), adapter);
		self
	}

	pub fn with_fiat_currency(mut self, currency: &str) -> Self {
		self.fiat_currency = currency.to_string();
		self
	}

	pub fn with_max_concurrent_lookups(mut self, cap: usize) -> Self {
		self.max_concurrent_lookups = cap.max(1);
		self
	}

	pub fn build(self) -> Result<GatewayEngine> {
		for chain in Chain::ALL {
			if !self.adapters.contains_key(&chain) {
				return Err(GatewayError::Config(format!(
					"no adapter registered for {}",
					chain
				)));
			}
		}
		Ok(GatewayEngine {
			adapters: self.adapters,
			accounts: self.accounts,
			pricing: self.pricing,
			fiat_currency: self.fiat_currency,
			max_concurrent_lookups: self.max_concurrent_lookups,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use gateway_accounts::implementations::memory::MemoryAccountStore;
	use gateway_pricing::PriceFeedInterface;
	use gateway_types::{Account, BalanceInfo, CustodyId, PriceQuote};
	use rust_decimal::Decimal;
	use std::collections::BTreeMap;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct StubAdapter {
		chain: Chain,
		calls: Arc<AtomicUsize>,
		fail: bool,
	}

	#[async_trait]
	impl ChainAdapter for StubAdapter {
		fn chain(&self) -> Chain {
			self.chain
		}

		async fn get_address(&self, _account_name: &str) -> Result<String> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail {
				return Err(GatewayError::NodeUnavailable(format!(
					"{} node is down",
					self.chain
				)));
			}
			Ok(format!("{}-address", self.chain.symbol().to_lowercase()))
		}

		async fn get_balance(&self, account_name: &str) -> Result<BalanceInfo> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail {
				return Err(GatewayError::NodeUnavailable(format!(
					"{} node is down",
					self.chain
				)));
			}
			Ok(BalanceInfo {
				account_name: account_name.to_string(),
				balance: "2.5".parse().unwrap(),
				unit: self.chain.unit().to_string(),
			})
		}

		async fn get_price(&self, symbol: &str, currency: &str) -> Result<PriceInfo> {
			Ok(PriceInfo {
				symbol: symbol.to_string(),
				currency: currency.to_string(),
				price: "100".parse().unwrap(),
			})
		}

		async fn transfer(&self, _request: &TransferRequest) -> Result<TransferReceipt> {
			Ok(TransferReceipt {
				transaction_id: "tx".to_string(),
			})
		}

		async fn get_status(&self, txn_id: &str) -> Result<TransferRecord> {
			Err(GatewayError::TransferNotFound {
				chain: self.chain,
				txn_id: txn_id.to_string(),
			})
		}

		async fn get_history(&self, _account_name: &str) -> Result<HistoryInfo> {
			Ok(HistoryInfo {
				url: "https://example.com".to_string(),
			})
		}
	}

	struct CountingFeed {
		multi_calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl PriceFeedInterface for CountingFeed {
		async fn price(&self, _symbol: &str, _currency: &str) -> Result<Decimal> {
			Ok("100".parse().unwrap())
		}

		async fn price_multi_full(
			&self,
			symbols: &[&str],
			_currency: &str,
		) -> Result<BTreeMap<String, PriceQuote>> {
			self.multi_calls.fetch_add(1, Ordering::SeqCst);
			Ok(symbols
				.iter()
				.map(|s| {
					(
						s.to_string(),
						PriceQuote {
							price: "100".parse().unwrap(),
							change_pct_24h: "2.5".parse().unwrap(),
						},
					)
				})
				.collect())
		}
	}

	struct Fixture {
		engine: GatewayEngine,
		adapter_calls: Arc<AtomicUsize>,
		feed_calls: Arc<AtomicUsize>,
	}

	fn fixture(failing_chain: Option<Chain>) -> Fixture {
		let adapter_calls = Arc::new(AtomicUsize::new(0));
		let feed_calls = Arc::new(AtomicUsize::new(0));

		let accounts = Arc::new(AccountService::new(Box::new(
			MemoryAccountStore::with_accounts(vec![Account::new("alice", CustodyId::new())]),
		)));
		let pricing = Arc::new(PriceService::new(Box::new(CountingFeed {
			multi_calls: feed_calls.clone(),
		})));

		let mut builder = GatewayBuilder::new(accounts, pricing);
		for chain in Chain::ALL {
			builder = builder.with_adapter(Arc::new(StubAdapter {
				chain,
				calls: adapter_calls.clone(),
				fail: failing_chain == Some(chain),
			}));
		}

		Fixture {
			engine: builder.build().unwrap(),
			adapter_calls,
			feed_calls,
		}
	}

	#[tokio::test]
	async fn balance_view_covers_every_chain_with_one_feed_call() {
		let fx = fixture(None);

		let view = fx.engine.get_balances("alice").await.unwrap();
		let chains: Vec<_> = view.keys().cloned().collect();
		assert_eq!(chains, vec!["BTC", "BTS", "ETH"]); // BTreeMap order
		assert_eq!(fx.feed_calls.load(Ordering::SeqCst), 1);

		let eth = &view["ETH"];
		assert_eq!(eth.address, "eth-address");
		assert_eq!(eth.price, "100".parse::<Decimal>().unwrap());
	}

	#[tokio::test]
	async fn one_chain_failure_fails_the_whole_view() {
		let fx = fixture(Some(Chain::Bitshares));

		let err = fx.engine.get_balances("alice").await.unwrap_err();
		assert!(matches!(err, GatewayError::NodeUnavailable(_)));

		let err = fx.engine.get_addresses("alice").await.unwrap_err();
		assert!(matches!(err, GatewayError::NodeUnavailable(_)));
	}

	#[tokio::test]
	async fn unknown_account_never_reaches_an_adapter() {
		let fx = fixture(None);

		let err = fx.engine.get_balances("ghost").await.unwrap_err();
		assert!(matches!(err, GatewayError::AccountNotFound(_)));
		assert_eq!(fx.adapter_calls.load(Ordering::SeqCst), 0);
		// No point pricing a view that will never be assembled, but the
		// account check comes first either way.
		let err = fx.engine.get_addresses("ghost").await.unwrap_err();
		assert!(matches!(err, GatewayError::AccountNotFound(_)));
		assert_eq!(fx.adapter_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn address_view_is_keyed_by_chain_symbol() {
		let fx = fixture(None);

		let view = fx.engine.get_addresses("alice").await.unwrap();
		assert_eq!(view.len(), Chain::ALL.len());
		assert_eq!(view["BTC"], "btc-address");
		assert_eq!(view["ETH"], "eth-address");
		assert_eq!(view["BTS"], "bts-address");
	}

	#[tokio::test]
	async fn price_dispatches_on_coin_symbol() {
		let fx = fixture(None);

		let info = fx.engine.get_price("UDOO", "EUR").await.unwrap();
		assert_eq!(info.symbol, "UDOO");
		assert_eq!(info.currency, "EUR");

		let err = fx.engine.get_price("DOGE", "USD").await.unwrap_err();
		assert!(matches!(err, GatewayError::BadRequest(_)));
	}

	#[tokio::test]
	async fn builder_requires_every_chain() {
		let accounts = Arc::new(AccountService::new(Box::new(
			MemoryAccountStore::with_accounts(vec![]),
		)));
		let pricing = Arc::new(PriceService::new(Box::new(CountingFeed {
			multi_calls: Arc::new(AtomicUsize::new(0)),
		})));

		let result = GatewayBuilder::new(accounts, pricing)
			.with_adapter(Arc::new(StubAdapter {
				chain: Chain::Ethereum,
				calls: Arc::new(AtomicUsize::new(0)),
				fail: false,
			}))
			.build();
		assert!(matches!(result, Err(GatewayError::Config(_))));
	}
}
