//! Error types for channel operations.

use thiserror::Error;

/// Errors raised by ports and transferable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
	/// The peer side of the channel has been dropped.
	#[error("channel closed")]
	Closed,

	/// The resource's payload was already transferred away.
	#[error("resource already transferred")]
	Detached,

	/// A live function value reached the channel without being marshaled
	/// into a token first.
	#[error("live function values cannot cross the channel")]
	LiveFunction,
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
