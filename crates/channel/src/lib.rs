//! In-process message channel with structured values and transferable resources.
//!
//! This crate provides the transport substrate for channel RPC:
//! * [`Value`]: the structured value model that crosses the channel
//! * [`Transferable`]: resources whose ownership moves (never copies) on send
//! * [`scan`]: deep discovery of transferables inside arbitrary value trees
//! * [`Port`]: one side of a connected, ordered, lossless in-process channel
//!
//! The channel delivers structured values plus an optional transfer list to a
//! single consumer per side, in send order per direction. Serialization of
//! values across a real process boundary is out of scope here; the [`Value`]
//! tree moves as-is, with transfer-list resources detached from the sender.

#![warn(missing_docs)]

pub mod error;
pub mod port;
pub mod resource;
pub mod scan;
pub mod value;

pub use error::{ChannelError, Result};
pub use port::{Port, channel};
pub use resource::{Payload, Transferable};
pub use value::{CallError, CallFuture, Callable, FUNCTION_MARKER, FunctionToken, Value};
