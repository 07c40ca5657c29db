//! Error types for RPC endpoints.

use thiserror::Error;

use tether_channel::{CallError, ChannelError};

/// Errors surfaced by endpoint calls and the routing loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	/// An inbound request named a handler absent from the handler table.
	#[error("no such handler: {0}")]
	NoSuchHandler(String),

	/// The remote side rejected the call; only its message string survives
	/// the boundary.
	#[error("{0}")]
	Remote(String),

	/// An inbound message did not decode as a request or response envelope.
	#[error("protocol violation: {0}")]
	Protocol(String),

	/// Underlying channel failure.
	#[error(transparent)]
	Channel(#[from] ChannelError),

	/// The endpoint main loop is no longer running.
	#[error("endpoint stopped")]
	ServiceStopped,
}

impl From<Error> for CallError {
	fn from(err: Error) -> Self {
		CallError(err.to_string())
	}
}

/// Result type for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;
