//! In-process connected port pair.

use tokio::sync::mpsc;

use crate::error::{ChannelError, Result};
use crate::resource::Transferable;
use crate::scan;
use crate::value::Value;

/// One side of a connected channel.
///
/// Delivery is lossless and ordered per direction. Each port has a single
/// consumer: whoever owns the port receives its inbound values.
pub struct Port {
	tx: mpsc::UnboundedSender<Value>,
	rx: mpsc::UnboundedReceiver<Value>,
}

/// Creates a connected port pair.
#[must_use]
pub fn channel() -> (Port, Port) {
	let (a_tx, a_rx) = mpsc::unbounded_channel();
	let (b_tx, b_rx) = mpsc::unbounded_channel();
	let a = Port { tx: a_tx, rx: b_rx };
	let b = Port { tx: b_tx, rx: a_rx };
	(a, b)
}

impl Port {
	/// Sends a structured value, moving the listed resources to the receiver.
	///
	/// After the send completes, every listed resource is detached on the
	/// sending side; the receiver observes fresh attached handles.
	///
	/// # Errors
	///
	/// - [`ChannelError::LiveFunction`] if the value still contains a live
	///   function (marshaling must replace functions with tokens first).
	/// - [`ChannelError::Closed`] if the peer port has been dropped.
	pub fn send(&self, value: Value, transfers: &[Transferable]) -> Result<()> {
		if scan::contains_function(&value) {
			return Err(ChannelError::LiveFunction);
		}
		let value = scan::detach_for_send(value, transfers);
		self.tx.send(value).map_err(|_| ChannelError::Closed)
	}

	/// Receives the next inbound value, or `None` once the peer is dropped.
	pub async fn recv(&mut self) -> Option<Value> {
		self.rx.recv().await
	}
}
