//! Token metadata and decimal amount handling

use alloy_primitives::utils::{ParseUnits, Unit};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::AmountError;

/// ERC-20 token metadata as reported by the protocol SDK
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
}

impl Token {
	pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
		Self {
			address,
			symbol: symbol.into(),
			decimals,
		}
	}

	/// Parse a user-entered decimal string (e.g. "100.5") into raw units
	pub fn parse_amount(&self, input: &str) -> Result<TokenAmount, AmountError> {
		TokenAmount::parse(input, self)
	}

	/// Wrap a raw amount already expressed in base units
	pub fn amount(&self, raw: U256) -> TokenAmount {
		TokenAmount {
			raw,
			token: self.clone(),
		}
	}

	fn unit(&self) -> Result<Unit, AmountError> {
		Unit::new(self.decimals).ok_or(AmountError::UnsupportedDecimals {
			decimals: self.decimals,
		})
	}
}

/// A raw token amount bound to its token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
	pub raw: U256,
	pub token: Token,
}

impl TokenAmount {
	/// Parse a decimal string using the token's decimals
	///
	/// Negative and empty inputs are reported as errors so callers can treat them
	/// as a no-op instead of a malformed value (see [`AmountError::is_non_positive`]).
	pub fn parse(input: &str, token: &Token) -> Result<Self, AmountError> {
		let trimmed = input.trim();
		if trimmed.is_empty() {
			return Err(AmountError::Empty);
		}

		let unit = token.unit()?;
		let decimals = fraction_digits(trimmed);
		if !trimmed.starts_with('-') && decimals > usize::from(token.decimals) {
			return Err(AmountError::Invalid {
				input: trimmed.to_string(),
				reason: format!("more than {} decimal places", token.decimals),
			});
		}
		let parsed =
			ParseUnits::parse_units(trimmed, unit).map_err(|e| AmountError::Invalid {
				input: trimmed.to_string(),
				reason: e.to_string(),
			})?;

		if parsed.is_negative() {
			return Err(AmountError::Negative {
				input: trimmed.to_string(),
			});
		}

		Ok(Self {
			raw: parsed.get_absolute(),
			token: token.clone(),
		})
	}

	pub fn is_zero(&self) -> bool {
		self.raw.is_zero()
	}

	/// Human-readable amount without trailing zeros ("100", "12.5")
	pub fn format(&self) -> String {
		let Ok(unit) = self.token.unit() else {
			return self.raw.to_string();
		};
		let formatted = ParseUnits::U256(self.raw).format_units(unit);
		match formatted.split_once('.') {
			Some((whole, fraction)) => {
				let fraction = fraction.trim_end_matches('0');
				if fraction.is_empty() {
					whole.to_string()
				} else {
					format!("{}.{}", whole, fraction)
				}
			},
			None => formatted,
		}
	}
}

/// Number of significant fraction digits in a decimal string
///
/// Trailing zeros do not count, so "1.500" has one.
pub fn fraction_digits(input: &str) -> usize {
	input
		.split_once('.')
		.map_or(0, |(_, fraction)| fraction.trim_end_matches('0').len())
}

impl fmt::Display for TokenAmount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.format(), self.token.symbol)
	}
}
