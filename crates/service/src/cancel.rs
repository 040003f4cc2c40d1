//! Cancellation of local waiting
//!
//! Cancelling never recalls a broadcast transaction; it only stops the
//! executor from waiting on confirmations or the index.

use tokio::sync::watch;

/// Owner side, kept by whoever may abandon the wait
#[derive(Debug)]
pub struct CancelHandle {
	tx: watch::Sender<bool>,
}

impl CancelHandle {
	pub fn cancel(&self) {
		self.tx.send_replace(true);
	}
}

/// Observer side, passed to the executor
#[derive(Debug, Clone)]
pub struct CancelSignal {
	rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
	/// A signal that never fires
	pub fn never() -> Self {
		Self { rx: None }
	}

	pub fn is_cancelled(&self) -> bool {
		self.rx.as_ref().is_some_and(|rx| *rx.borrow())
	}

	/// Resolves once cancelled; pends forever if the handle was dropped first
	pub async fn cancelled(&self) {
		if let Some(rx) = &self.rx {
			let mut rx = rx.clone();
			if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
				return;
			}
		}
		std::future::pending::<()>().await
	}
}

impl Default for CancelSignal {
	fn default() -> Self {
		Self::never()
	}
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
	let (tx, rx) = watch::channel(false);
	(CancelHandle { tx }, CancelSignal { rx: Some(rx) })
}
