//! Bidirectional RPC over an in-process message channel.
//!
//! Two symmetric endpoints run the same protocol engine; either side exposes
//! named functions that the other side calls as if local:
//! * [`Endpoint`]: per-channel message router owning the handler table and
//!   the pending-call table
//! * [`EndpointSocket`]: cloneable handle issuing correlated requests
//! * [`Remote`]: caller-facing proxy, one async wrapper per exported name
//! * [`marshal`]: live functions cross the boundary as capability tokens and
//!   come back as callable stubs
//! * ephemeral handler entries created for marshaled callbacks are reclaimed
//!   by a debounced, idle-threshold GC sweep
//!
//! Known limitations, by design: no timeout or cancellation exists for
//! in-flight calls (a request whose response is lost leaves its caller
//! pending for as long as the endpoint runs), and correlation ids come from
//! a random source with a negligible but nonzero collision probability.

#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod mainloop;
pub mod marshal;
pub mod remote;
pub mod socket;
pub mod wire;

pub use error::{Error, Result};
pub use handlers::Exports;
pub use mainloop::Endpoint;
pub use remote::{Remote, RemoteMethod, Transfer, connect, expose, transfer};
pub use socket::EndpointSocket;
pub use wire::{CallId, Envelope, Outcome};

pub use tether_channel::{CallError, Callable, Port, Transferable, Value, channel};
