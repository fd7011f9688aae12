//! Conversions between a chain's smallest unit and its display unit.
//!
//! Financial quantities never touch floating point: both directions use
//! `rust_decimal` and fail rather than round. The round-trip law
//! `to_smallest_units(to_display_units(n)) == n` holds for every integer
//! smallest-unit input within the decimal's 96-bit mantissa.

use crate::{GatewayError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Converts an integer amount in the smallest unit into display units,
/// e.g. wei to ether with `decimals = 18`.
pub fn to_display_units(amount: u128, decimals: u32) -> Result<Decimal> {
	let raw = i128::try_from(amount).map_err(|_| precision_error(amount, decimals))?;
	Decimal::try_from_i128_with_scale(raw, decimals)
		.map(|d| d.normalize())
		.map_err(|_| precision_error(amount, decimals))
}

/// Converts a display-unit amount into the smallest unit. Fails with
/// `BadRequest` when the amount carries more precision than the chain
/// supports (it would be silently truncated otherwise) or is negative.
pub fn to_smallest_units(amount: Decimal, decimals: u32) -> Result<u128> {
	if amount.is_sign_negative() {
		return Err(GatewayError::BadRequest(
			"sendAmount must not be negative".to_string(),
		));
	}
	let factor = Decimal::from(10u64.pow(decimals));
	let scaled = amount.checked_mul(factor).ok_or_else(|| {
		GatewayError::BadRequest(format!("sendAmount {} is out of range", amount))
	})?;
	if !scaled.fract().is_zero() {
		return Err(GatewayError::BadRequest(format!(
			"sendAmount {} has more than {} decimal places",
			amount, decimals
		)));
	}
	scaled.trunc().to_u128().ok_or_else(|| {
		GatewayError::BadRequest(format!("sendAmount {} is out of range", amount))
	})
}

fn precision_error(amount: u128, decimals: u32) -> GatewayError {
	GatewayError::BadRequest(format!(
		"amount {} exceeds supported precision for {} decimals",
		amount, decimals
	))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn dec(s: &str) -> Decimal {
		s.parse().unwrap()
	}

	#[test]
	fn wei_to_ether() {
		let display = to_display_units(1_500_000_000_000_000_000, 18).unwrap();
		assert_eq!(display, dec("1.5"));
	}

	#[test]
	fn satoshi_to_btc() {
		let display = to_display_units(123_456_789, 8).unwrap();
		assert_eq!(display, dec("1.23456789"));
	}

	#[test]
	fn round_trip_is_lossless_for_integer_inputs() {
		for (amount, decimals) in [
			(0u128, 18u32),
			(1, 18),
			(999, 8),
			(21_000_000 * 100_000_000, 8),
			(1_000_000_000_000_000_001, 18),
			(42, 5),
		] {
			let display = to_display_units(amount, decimals).unwrap();
			let back = to_smallest_units(display, decimals).unwrap();
			assert_eq!(back, amount, "round trip failed for {}", amount);
		}
	}

	#[test]
	fn excess_precision_is_rejected_not_truncated() {
		// 9 decimal places on an 8-decimal chain
		let err = to_smallest_units(dec("0.123456789"), 8).unwrap_err();
		assert!(matches!(err, GatewayError::BadRequest(_)));
	}

	#[test]
	fn negative_amounts_are_rejected() {
		let err = to_smallest_units(dec("-1"), 18).unwrap_err();
		assert!(matches!(err, GatewayError::BadRequest(_)));
	}
}
