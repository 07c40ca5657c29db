//! Caller-facing proxy surface and channel entry points.

use tether_channel::{Port, Transferable, Value};

use crate::error::Result;
use crate::handlers::Exports;
use crate::mainloop::Endpoint;
use crate::socket::EndpointSocket;

/// An argument value tagged with resources that must be transferred even if
/// scanning the value alone would not have classified them.
///
/// Automatic scanning covers resources embedded in the argument tree; this
/// marker is the legacy fallback kept alongside it.
#[derive(Debug, Clone)]
pub struct Transfer {
	/// The argument value itself.
	pub value: Value,
	/// Resources to force onto the transfer list.
	pub resources: Vec<Transferable>,
}

/// Tags a value with an explicit transfer list.
#[must_use]
pub fn transfer(value: Value, resources: Vec<Transferable>) -> Transfer {
	Transfer { value, resources }
}

/// Proxy over the functions the remote side exported.
///
/// Any name yields a method wrapper; whether the remote side actually
/// exports that name is only known when the call settles.
#[derive(Debug, Clone)]
pub struct Remote {
	socket: EndpointSocket,
}

impl Remote {
	/// Wraps an endpoint socket in a proxy.
	#[must_use]
	pub fn new(socket: EndpointSocket) -> Self {
		Self { socket }
	}

	/// Asynchronous wrapper for one remote function name.
	#[must_use]
	pub fn method(&self, name: impl Into<String>) -> RemoteMethod {
		RemoteMethod {
			socket: self.socket.clone(),
			name: name.into(),
		}
	}

	/// Shorthand for `self.method(name).call(args)`.
	///
	/// # Errors
	///
	/// See [`EndpointSocket::call`].
	pub async fn call(&self, name: impl Into<String>, args: Vec<Value>) -> Result<Value> {
		self.socket.call(name, args).await
	}

	/// The underlying endpoint socket.
	#[must_use]
	pub fn socket(&self) -> &EndpointSocket {
		&self.socket
	}
}

/// Asynchronous wrapper for a single remote function.
#[derive(Debug, Clone)]
pub struct RemoteMethod {
	socket: EndpointSocket,
	name: String,
}

impl RemoteMethod {
	/// Invokes the remote function; resolves or rejects exactly when the
	/// remote side settles the call.
	///
	/// # Errors
	///
	/// See [`EndpointSocket::call`].
	pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
		self.socket.call(self.name.clone(), args).await
	}

	/// Invokes the remote function with explicitly transferred arguments.
	///
	/// # Errors
	///
	/// See [`EndpointSocket::call`].
	pub async fn call_transfer(&self, args: Vec<Transfer>) -> Result<Value> {
		let mut transfers = Vec::new();
		let mut values = Vec::with_capacity(args.len());
		for Transfer { value, resources } in args {
			transfers.extend(resources);
			values.push(value);
		}
		self.socket
			.call_with_transfer(self.name.clone(), values, transfers)
			.await
	}
}

/// Export entry point: registers durable handlers and attaches an endpoint
/// to `port` as its inbound consumer.
///
/// The returned socket is this side's handle to the running endpoint. The
/// callable surface for these exports exists only on the peer side; since
/// the protocol is symmetric, the socket can still issue calls against
/// whatever the peer exports.
#[must_use]
pub fn expose(port: Port, exports: Exports) -> EndpointSocket {
	let (endpoint, socket) = Endpoint::new(port, exports);
	let _ = endpoint.spawn();
	socket
}

/// Import entry point: builds a proxy over a port whose peer exports
/// handlers. Every method's result is asynchronous regardless of whether
/// the remote implementation is.
#[must_use]
pub fn connect(port: Port) -> Remote {
	Remote::new(expose(port, Exports::new()))
}
