//! Lifecycle notices for user actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeStage {
	Pending,
	Success,
	Failure,
	/// Transaction confirmed but the index has not caught up
	SyncTimeout,
	/// Transaction broadcast but its receipt did not arrive in time
	ConfirmationTimeout,
}

/// One user-visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
	pub action: ActionKind,
	pub stage: NoticeStage,
	pub message: String,
	pub created_at: DateTime<Utc>,
}

impl Notice {
	pub fn new(action: ActionKind, stage: NoticeStage, message: impl Into<String>) -> Self {
		Self {
			action,
			stage,
			message: message.into(),
			created_at: Utc::now(),
		}
	}
}

/// Sink for notices (toasts in a UI, logs in the CLI)
pub trait Notifier: Send + Sync {
	fn notify(&self, notice: Notice);
}
