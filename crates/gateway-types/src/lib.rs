//! Shared types for the wallet gateway.
//!
//! Every other crate in the workspace depends on this one: the chain
//! registry key, the error taxonomy, account and transfer records, and the
//! decimal amount conversions all live here.

pub mod account;
pub mod amount;
pub mod chains;
pub mod errors;
pub mod transfer;
pub mod validation;
pub mod views;

pub use account::{Account, CustodyId};
pub use amount::{to_display_units, to_smallest_units};
pub use chains::Chain;
pub use errors::{GatewayError, Result};
pub use transfer::{
	FeeEstimate, TransferReceipt, TransferRecord, TransferRequest, TransferStatus, UnsignedPayload,
};
pub use validation::{Field, FieldType, Schema, ValidationError};
pub use views::{
	AddressView, BalanceEntry, BalanceInfo, BalanceView, HistoryInfo, PriceInfo, PriceQuote,
};
