//! Wires configuration into a running gateway engine.
//!
//! Each backend is constructed by its crate's factory from the matching
//! raw TOML section; the factory validates the section against its own
//! schema. Everything is built once at startup and shared behind `Arc`s.

use anyhow::{Context, Result};
use gateway_accounts::{implementations::memory::create_account_store, AccountService};
use gateway_chains::{
	implementations::{bitcoin, bitshares, ethereum},
	AdapterContext,
};
use gateway_config::GatewayConfig;
use gateway_core::{GatewayBuilder, GatewayEngine};
use gateway_pricing::{implementations::http::create_price_feed, PriceService};
use gateway_signer::{implementations::vault::create_signer, SignerService};
use gateway_storage::{StorageInterface, StorageService, TransferStore};
use std::sync::Arc;

pub fn build_engine(config: &GatewayConfig) -> Result<GatewayEngine> {
	let accounts = Arc::new(AccountService::new(
		create_account_store(&config.accounts).context("Failed to build account store")?,
	));
	let signer = Arc::new(SignerService::new(
		create_signer(&config.vault).context("Failed to build vault signer")?,
	));
	let pricing = Arc::new(PriceService::new(
		create_price_feed(&config.price_feed).context("Failed to build price feed")?,
	));
	let transfers = Arc::new(TransferStore::new(StorageService::new(create_storage(
		&config.storage,
	)?)));

	let ctx = AdapterContext {
		accounts: accounts.clone(),
		signer,
		pricing: pricing.clone(),
		transfers,
		fiat_currency: config.gateway.fiat_currency.clone(),
	};

	let engine = GatewayBuilder::new(accounts, pricing)
		.with_fiat_currency(&config.gateway.fiat_currency)
		.with_max_concurrent_lookups(config.gateway.max_concurrent_lookups)
		.with_adapter(
			bitcoin::create_adapter(&config.chains.btc, ctx.clone())
				.context("Failed to build Bitcoin adapter")?,
		)
		.with_adapter(
			ethereum::create_adapter(&config.chains.eth, ctx.clone())
				.context("Failed to build Ethereum adapter")?,
		)
		.with_adapter(
			bitshares::create_adapter(&config.chains.bts, ctx)
				.context("Failed to build BitShares adapter")?,
		)
		.build()?;

	Ok(engine)
}

fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>> {
	match config.get("backend").and_then(|v| v.as_str()) {
		Some("file") => Ok(gateway_storage::implementations::file::create_storage(
			config,
		)),
		Some("memory") | None => Ok(gateway_storage::implementations::memory::create_storage(
			config,
		)),
		Some(other) => anyhow::bail!("Unknown storage backend '{}'", other),
	}
}
