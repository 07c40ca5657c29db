//! Endpoint main loop: message routing, pending calls, and callback GC.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures::FutureExt;
use futures::future::CatchUnwind;
use pin_project_lite::pin_project;
use tether_channel::{CallError, CallFuture, Port, Value, scan};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::handlers::{Exports, HandlerTable};
use crate::marshal;
use crate::socket::{EndpointSocket, LoopEvent};
use crate::wire::{CallId, Envelope, Outcome};

/// Delay before a scheduled GC sweep fires; sweeps requested while one is
/// already pending coalesce into it.
const GC_DEBOUNCE: Duration = Duration::from_millis(50);
/// Idle threshold beyond which an ephemeral handler entry is reclaimed.
const GC_IDLE_THRESHOLD: Duration = Duration::from_secs(30);

/// One side's protocol engine.
///
/// The endpoint owns the port, the handler table, and the pending-call
/// table; it is stateless between messages apart from those. Requests from
/// the peer are dispatched to handlers running concurrently in a
/// [`JoinSet`]; responses settle the matching pending entry. Neither table
/// is ever shared across endpoints.
pub struct Endpoint {
	/// Channel to the peer endpoint.
	port: Port,
	/// Receiver for internal events from sockets.
	rx: mpsc::UnboundedReceiver<LoopEvent>,
	/// Socket clone handed to callback stubs and the GC timer.
	socket: EndpointSocket,
	/// Durable exports plus ephemeral callback registrations.
	handlers: HandlerTable,
	/// Pending outbound requests awaiting responses.
	pending: HashMap<CallId, oneshot::Sender<Result<Value>>>,
	/// Concurrent request handlers in flight.
	tasks: JoinSet<(CallId, std::result::Result<Value, CallError>)>,
	/// True while a debounced GC sweep is scheduled.
	gc_scheduled: bool,
}

impl Endpoint {
	/// Creates an endpoint over `port` with the given durable exports.
	#[must_use]
	pub fn new(port: Port, exports: Exports) -> (Self, EndpointSocket) {
		let (tx, rx) = mpsc::unbounded_channel();
		let socket = EndpointSocket::new(tx);
		let mut handlers = HandlerTable::new();
		for (name, callable) in exports.into_entries() {
			handlers.insert_durable(name, callable);
		}
		let this = Self {
			port,
			rx,
			socket: socket.clone(),
			handlers,
			pending: HashMap::new(),
			tasks: JoinSet::new(),
			gc_scheduled: false,
		};
		(this, socket)
	}

	/// Spawns the endpoint onto the current tokio runtime.
	pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
		tokio::spawn(async move {
			let result = self.run().await;
			if let Err(e) = &result {
				error!(error = %e, "endpoint main loop failed");
			}
			result
		})
	}

	/// Drives the endpoint until its port closes.
	///
	/// Handler failures never end the loop; they are converted into
	/// rejection responses. Pending calls are dropped on exit, surfacing
	/// [`Error::ServiceStopped`] to their callers.
	///
	/// # Errors
	///
	/// [`Error::Channel`] when a send to the peer fails mid-protocol.
	pub async fn run(mut self) -> Result<()> {
		loop {
			tokio::select! {
				biased;

				joined = self.tasks.join_next(), if !self.tasks.is_empty() => {
					match joined {
						Some(Ok((id, result))) => self.respond(id, result)?,
						Some(Err(e)) => error!(error = %e, "request task cancelled"),
						None => {}
					}
				}

				event = self.rx.recv() => match event {
					Some(event) => self.dispatch_event(event)?,
					None => break,
				},

				message = self.port.recv() => match message {
					Some(value) => {
						self.dispatch_message(value)?;
						self.schedule_gc();
					}
					None => break,
				},
			}
		}
		Ok(())
	}

	/// Routes one inbound wire message.
	fn dispatch_message(&mut self, value: Value) -> Result<()> {
		let envelope = match Envelope::decode(value) {
			Ok(envelope) => envelope,
			Err(e) => {
				// Never fatal: a malformed message is dropped, not returned.
				error!(error = %e, "dropping undecodable message");
				return Ok(());
			}
		};
		match envelope {
			Envelope::Request { id, name, args } => {
				let Some(callable) = self.handlers.checkout(&name) else {
					return self.send_response(id, Outcome::Reject(Error::NoSuchHandler(name).to_string()));
				};
				let args = args
					.into_iter()
					.map(|arg| marshal::hydrate_tokens(arg, &self.socket))
					.collect();
				let fut = AssertUnwindSafe(callable(args)).catch_unwind();
				self.tasks.spawn(RequestFuture { fut, id: Some(id) });
			}
			Envelope::Response { id, outcome } => {
				let Some(resp_tx) = self.pending.remove(&id) else {
					// Already settled or foreign correlation id.
					debug!(call_id = %id, "response for unknown call id ignored");
					return Ok(());
				};
				let settled = match outcome {
					Outcome::Resolve(value) => Ok(marshal::hydrate_tokens(value, &self.socket)),
					Outcome::Reject(message) => Err(Error::Remote(message)),
				};
				// The caller may have gone away; the result may be ignored.
				let _ = resp_tx.send(settled);
			}
		}
		Ok(())
	}

	/// Routes an internal event from a socket clone.
	fn dispatch_event(&mut self, event: LoopEvent) -> Result<()> {
		match event {
			LoopEvent::OutgoingRequest {
				name,
				args,
				mut transfers,
				resp_tx,
			} => {
				let mut registrations = Vec::new();
				let args: Vec<Value> = args
					.into_iter()
					.map(|arg| marshal::strip_functions(arg, &mut registrations))
					.collect();
				for (name, callable) in registrations {
					self.handlers.insert_ephemeral(name, callable);
				}
				for arg in &args {
					for resource in scan::transferables(arg) {
						if !transfers.iter().any(|t| t.same_resource(&resource)) {
							transfers.push(resource);
						}
					}
				}
				let id = CallId::random();
				let envelope = Envelope::Request { id, name, args };
				if let Err(e) = self.port.send(envelope.encode(), &transfers) {
					let _ = resp_tx.send(Err(e.into()));
					return Err(e.into());
				}
				self.pending.insert(id, resp_tx);
			}
			LoopEvent::GcSweep => {
				self.gc_scheduled = false;
				let removed = self.handlers.sweep(GC_IDLE_THRESHOLD);
				if removed > 0 {
					debug!(removed, "reclaimed idle callback handlers");
				}
			}
			LoopEvent::Handlers(resp_tx) => {
				let _ = resp_tx.send(self.handlers.names());
			}
		}
		Ok(())
	}

	/// Answers a completed handler: functions in the result are marshaled,
	/// transferables scanned, and exactly one response sent.
	fn respond(&mut self, id: CallId, result: std::result::Result<Value, CallError>) -> Result<()> {
		let outcome = match result {
			Ok(value) => {
				let mut registrations = Vec::new();
				let value = marshal::strip_functions(value, &mut registrations);
				for (name, callable) in registrations {
					self.handlers.insert_ephemeral(name, callable);
				}
				Outcome::Resolve(value)
			}
			Err(e) => Outcome::Reject(e.to_string()),
		};
		self.send_response(id, outcome)
	}

	fn send_response(&mut self, id: CallId, outcome: Outcome) -> Result<()> {
		let transfers = match &outcome {
			Outcome::Resolve(value) => scan::transferables(value),
			Outcome::Reject(_) => Vec::new(),
		};
		let envelope = Envelope::Response { id, outcome };
		self.port.send(envelope.encode(), &transfers).map_err(Error::from)
	}

	/// Schedules the debounced GC sweep unless one is already pending.
	fn schedule_gc(&mut self) {
		if self.gc_scheduled {
			return;
		}
		self.gc_scheduled = true;
		let socket = self.socket.clone();
		tokio::spawn(async move {
			tokio::time::sleep(GC_DEBOUNCE).await;
			socket.request_sweep();
		});
	}
}

pin_project! {
	/// Pairs a running handler future with its correlation id, containing
	/// panics so one handler cannot take the routing loop down.
	struct RequestFuture {
		#[pin]
		fut: CatchUnwind<AssertUnwindSafe<CallFuture>>,
		id: Option<CallId>,
	}
}

impl Future for RequestFuture {
	type Output = (CallId, std::result::Result<Value, CallError>);

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.project();
		let result = match ready!(this.fut.poll(cx)) {
			Ok(result) => result,
			Err(_panic) => Err(CallError::new("handler panicked")),
		};
		Poll::Ready((this.id.take().expect("future is consumed"), result))
	}
}
