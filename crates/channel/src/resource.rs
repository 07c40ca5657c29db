//! Transferable resources whose ownership moves across the channel.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ChannelError, Result};

/// Payload held by a transferable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
	/// Raw binary buffer.
	Bytes(Vec<u8>),
	/// Pixel/media frame buffer.
	Frame {
		/// Frame width in pixels.
		width: u32,
		/// Frame height in pixels.
		height: u32,
		/// Packed pixel data.
		data: Vec<u8>,
	},
}

impl Payload {
	/// Short name of the payload kind.
	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Payload::Bytes(_) => "bytes",
			Payload::Frame { .. } => "frame",
		}
	}

	/// Byte length of the underlying buffer.
	#[must_use]
	pub fn len(&self) -> usize {
		match self {
			Payload::Bytes(data) | Payload::Frame { data, .. } => data.len(),
		}
	}

	/// True if the underlying buffer is empty.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

struct Cell {
	payload: Mutex<Option<Payload>>,
}

/// Handle to a resource that moves ownership when transferred.
///
/// Handles are cheap to clone and compare by identity: every clone refers to
/// the same payload cell. When a send names the resource in its transfer
/// list, the payload is taken out of the sender-visible cell and the
/// delivered tree references a fresh attached handle. Every handle the
/// sender retains is detached from that point on; using one is a contract
/// violation surfaced as [`ChannelError::Detached`].
#[derive(Clone)]
pub struct Transferable {
	cell: Arc<Cell>,
}

impl Transferable {
	/// Creates a resource holding the given payload.
	#[must_use]
	pub fn new(payload: Payload) -> Self {
		Self {
			cell: Arc::new(Cell {
				payload: Mutex::new(Some(payload)),
			}),
		}
	}

	/// Creates a binary buffer resource.
	#[must_use]
	pub fn bytes(data: Vec<u8>) -> Self {
		Self::new(Payload::Bytes(data))
	}

	/// Creates a pixel frame resource.
	#[must_use]
	pub fn frame(width: u32, height: u32, data: Vec<u8>) -> Self {
		Self::new(Payload::Frame { width, height, data })
	}

	/// Reads the payload without taking ownership.
	///
	/// # Errors
	///
	/// [`ChannelError::Detached`] once the payload has been transferred away.
	pub fn peek<R>(&self, f: impl FnOnce(&Payload) -> R) -> Result<R> {
		let guard = self.cell.payload.lock();
		match guard.as_ref() {
			Some(payload) => Ok(f(payload)),
			None => Err(ChannelError::Detached),
		}
	}

	/// Takes the payload out, leaving every handle to this cell detached.
	pub fn detach(&self) -> Option<Payload> {
		self.cell.payload.lock().take()
	}

	/// True once the payload has been transferred away.
	#[must_use]
	pub fn is_detached(&self) -> bool {
		self.cell.payload.lock().is_none()
	}

	/// Payload kind, or `None` once detached.
	#[must_use]
	pub fn kind(&self) -> Option<&'static str> {
		self.cell.payload.lock().as_ref().map(Payload::kind)
	}

	/// Identity of the underlying cell, stable across clones.
	#[must_use]
	pub fn id(&self) -> usize {
		Arc::as_ptr(&self.cell) as usize
	}

	/// True if both handles refer to the same payload cell.
	#[must_use]
	pub fn same_resource(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.cell, &other.cell)
	}
}

impl fmt::Debug for Transferable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transferable")
			.field("id", &self.id())
			.field("kind", &self.kind())
			.finish()
	}
}

impl PartialEq for Transferable {
	fn eq(&self, other: &Self) -> bool {
		self.same_resource(other)
	}
}

impl Eq for Transferable {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detach_empties_every_handle() {
		let original = Transferable::bytes(vec![1, 2, 3]);
		let alias = original.clone();
		assert!(original.same_resource(&alias));

		let payload = alias.detach().expect("payload present");
		assert_eq!(payload.len(), 3);

		assert!(original.is_detached());
		assert!(matches!(original.peek(Payload::len), Err(ChannelError::Detached)));
		assert!(alias.detach().is_none());
	}

	#[test]
	fn peek_reads_without_detaching() {
		let frame = Transferable::frame(2, 2, vec![0; 16]);
		let len = frame.peek(Payload::len).expect("attached");
		assert_eq!(len, 16);
		assert_eq!(frame.kind(), Some("frame"));
		assert!(!frame.is_detached());
	}

	#[test]
	fn identity_distinguishes_equal_payloads() {
		let a = Transferable::bytes(vec![9]);
		let b = Transferable::bytes(vec![9]);
		assert_ne!(a, b);
		assert_eq!(a, a.clone());
	}
}
