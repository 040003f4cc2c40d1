//! Error types for amount parsing

use thiserror::Error;

/// Errors raised while turning a user-entered amount into raw token units
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountError {
	#[error("Amount is empty")]
	Empty,

	#[error("Amount is negative: {input}")]
	Negative { input: String },

	#[error("Invalid amount '{input}': {reason}")]
	Invalid { input: String, reason: String },

	#[error("Unsupported token decimals: {decimals}")]
	UnsupportedDecimals { decimals: u8 },
}

impl AmountError {
	/// Amounts that resolve to "nothing entered" rather than a malformed value
	pub fn is_non_positive(&self) -> bool {
		matches!(self, AmountError::Empty | AmountError::Negative { .. })
	}
}
