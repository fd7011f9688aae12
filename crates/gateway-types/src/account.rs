//! Account types.
//!
//! An account maps a caller-supplied logical name to an opaque custody
//! identifier issued by the vault at registration. The vault authorizes
//! derivation and signing only against a valid custody id, so every
//! operation that touches a key goes through this mapping first.

use crate::Chain;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle to a key the vault controls on behalf of an account.
/// Never contains key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustodyId(pub Uuid);

impl CustodyId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for CustodyId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for CustodyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A registered account. Created at registration (out of scope here) and
/// read-only to the gateway. The per-chain address fields are caches; an
/// absent address is derived lazily from the custody id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
	pub name: String,
	pub custody_id: CustodyId,
	#[serde(default)]
	pub btc_address: Option<String>,
	#[serde(default)]
	pub eth_address: Option<String>,
	#[serde(default)]
	pub bts_address: Option<String>,
}

impl Account {
	pub fn new(name: impl Into<String>, custody_id: CustodyId) -> Self {
		Self {
			name: name.into(),
			custody_id,
			btc_address: None,
			eth_address: None,
			bts_address: None,
		}
	}

	/// Cached on-chain address for the given chain, if known.
	pub fn cached_address(&self, chain: Chain) -> Option<&str> {
		match chain {
			Chain::Bitcoin => self.btc_address.as_deref(),
			Chain::Ethereum => self.eth_address.as_deref(),
			Chain::Bitshares => self.bts_address.as_deref(),
		}
	}
}
