//! The set of blockchains the gateway serves.
//!
//! `Chain` is the registry key for adapter dispatch and carries the fixed
//! per-chain constants: derivation path, SLIP-44 coin type, display symbol,
//! traded ticker, and smallest-unit precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Chain {
	Bitcoin,
	Ethereum,
	Bitshares,
}

impl Chain {
	/// Fixed, ordered set of supported chains. Fan-out iterates this.
	pub const ALL: [Chain; 3] = [Chain::Bitcoin, Chain::Ethereum, Chain::Bitshares];

	/// Chain symbol used as the key in aggregated views.
	pub fn symbol(&self) -> &'static str {
		match self {
			Chain::Bitcoin => "BTC",
			Chain::Ethereum => "ETH",
			Chain::Bitshares => "BTS",
		}
	}

	/// Symbol the price feed quotes for this chain's currency. The
	/// Bitshares chain trades the UDOO token, so its quote symbol differs
	/// from its chain symbol.
	pub fn ticker(&self) -> &'static str {
		match self {
			Chain::Bitcoin => "BTC",
			Chain::Ethereum => "ETH",
			Chain::Bitshares => "UDOO",
		}
	}

	/// Number of decimal places between the smallest unit and the display
	/// unit (e.g. 18 for wei per ether).
	pub fn decimals(&self) -> u32 {
		match self {
			Chain::Bitcoin => 8,
			Chain::Ethereum => 18,
			Chain::Bitshares => 5,
		}
	}

	/// SLIP-44 coin type sent to the vault for key derivation.
	pub fn coin_type(&self) -> u32 {
		match self {
			Chain::Bitcoin => 0,
			Chain::Ethereum => 60,
			Chain::Bitshares => 69,
		}
	}

	/// Fixed derivation path for this chain's gateway addresses.
	pub fn derivation_path(&self) -> &'static str {
		match self {
			Chain::Bitcoin => "m/44'/0'/0'/0/0",
			Chain::Ethereum => "m/44'/60'/0'/0/0",
			Chain::Bitshares => "m/44'/69'/0'/0/0",
		}
	}

	/// Display unit name, e.g. the balance unit reported to callers.
	pub fn unit(&self) -> &'static str {
		self.symbol()
	}
}

impl fmt::Display for Chain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.symbol())
	}
}

impl FromStr for Chain {
	type Err = crate::GatewayError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"BTC" => Ok(Chain::Bitcoin),
			"ETH" => Ok(Chain::Ethereum),
			"BTS" | "UDOO" => Ok(Chain::Bitshares),
			other => Err(crate::GatewayError::BadRequest(format!(
				"Unknown blockchain '{}'",
				other
			))),
		}
	}
}

impl TryFrom<String> for Chain {
	type Error = crate::GatewayError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		s.parse()
	}
}

impl From<Chain> for String {
	fn from(chain: Chain) -> Self {
		chain.symbol().to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_symbols_and_tickers() {
		assert_eq!("btc".parse::<Chain>().unwrap(), Chain::Bitcoin);
		assert_eq!("ETH".parse::<Chain>().unwrap(), Chain::Ethereum);
		assert_eq!("BTS".parse::<Chain>().unwrap(), Chain::Bitshares);
		assert_eq!("UDOO".parse::<Chain>().unwrap(), Chain::Bitshares);
		assert!("DOGE".parse::<Chain>().is_err());
	}

	#[test]
	fn ordered_chain_set_is_stable() {
		let symbols: Vec<_> = Chain::ALL.iter().map(|c| c.symbol()).collect();
		assert_eq!(symbols, vec!["BTC", "ETH", "BTS"]);
	}
}
