//! Cloneable handle for issuing calls through an endpoint main loop.

use std::fmt;

use tether_channel::{Transferable, Value};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

pub(crate) enum LoopEvent {
	OutgoingRequest {
		name: String,
		args: Vec<Value>,
		transfers: Vec<Transferable>,
		resp_tx: oneshot::Sender<Result<Value>>,
	},
	GcSweep,
	Handlers(oneshot::Sender<Vec<String>>),
}

/// Handle to a running [`Endpoint`](crate::Endpoint).
///
/// Sockets are cheap to clone; all clones feed the same main loop. Once the
/// endpoint has stopped, every operation fails with [`Error::ServiceStopped`].
#[derive(Clone)]
pub struct EndpointSocket {
	tx: mpsc::UnboundedSender<LoopEvent>,
}

impl EndpointSocket {
	pub(crate) fn new(tx: mpsc::UnboundedSender<LoopEvent>) -> Self {
		Self { tx }
	}

	/// Calls a named handler on the remote side.
	///
	/// Function-valued arguments are marshaled into tokens the remote side
	/// can invoke back; transferable resources found among the arguments are
	/// moved rather than copied.
	///
	/// No timeout exists: if the remote side never answers, the returned
	/// future stays pending for as long as the endpoint runs. This mirrors
	/// the wire contract and is a documented limitation, not a defect.
	///
	/// # Errors
	///
	/// - [`Error::Remote`] when the remote handler rejects.
	/// - [`Error::ServiceStopped`] when the endpoint has stopped.
	pub async fn call(&self, name: impl Into<String>, args: Vec<Value>) -> Result<Value> {
		self.call_with_transfer(name, args, Vec::new()).await
	}

	/// Like [`call`](Self::call), with resources to force onto the transfer
	/// list even if scanning the arguments would not have found them.
	///
	/// # Errors
	///
	/// See [`call`](Self::call).
	pub async fn call_with_transfer(
		&self,
		name: impl Into<String>,
		args: Vec<Value>,
		transfers: Vec<Transferable>,
	) -> Result<Value> {
		let (resp_tx, resp_rx) = oneshot::channel();
		self.tx
			.send(LoopEvent::OutgoingRequest {
				name: name.into(),
				args,
				transfers,
				resp_tx,
			})
			.map_err(|_| Error::ServiceStopped)?;
		resp_rx.await.map_err(|_| Error::ServiceStopped)?
	}

	/// Sorted snapshot of this endpoint's handler-table names, durable and
	/// ephemeral alike. Useful for status displays and for observing GC.
	///
	/// # Errors
	///
	/// [`Error::ServiceStopped`] when the endpoint has stopped.
	pub async fn handler_names(&self) -> Result<Vec<String>> {
		let (resp_tx, resp_rx) = oneshot::channel();
		self.tx
			.send(LoopEvent::Handlers(resp_tx))
			.map_err(|_| Error::ServiceStopped)?;
		resp_rx.await.map_err(|_| Error::ServiceStopped)
	}

	pub(crate) fn request_sweep(&self) {
		let _ = self.tx.send(LoopEvent::GcSweep);
	}
}

impl fmt::Debug for EndpointSocket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EndpointSocket").finish_non_exhaustive()
	}
}
