//! Shared domain models

pub mod errors;
pub mod secret_string;
pub mod token;

pub use errors::AmountError;
pub use secret_string::SecretString;
pub use token::{fraction_digits, Token, TokenAmount};
