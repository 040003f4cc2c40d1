//! Error types for plan composition

use thiserror::Error;

use crate::actions::ActionKind;
use crate::status::ReadinessStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
	/// Status blocks execution; `message` is the fixed explanation, if any
	#[error("{kind} is not ready: {status}")]
	NotReady {
		kind: ActionKind,
		status: ReadinessStatus,
		message: Option<String>,
	},

	#[error("{kind} requires an amount")]
	MissingAmount { kind: ActionKind },

	#[error("Plan for {kind} has no steps")]
	EmptyPlan { kind: ActionKind },

	#[error("Invalid plan: {reason}")]
	Invalid { reason: String },
}

pub type ComposeResult<T> = Result<T, ComposeError>;
