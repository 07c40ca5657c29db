//! Wire envelopes and correlation ids.
//!
//! Envelopes encode to and decode from plain [`Value`] records so any channel
//! able to carry structured values can carry the protocol. Field names are
//! part of the wire contract: `isRequest`, `reqid`, `name`, `args`,
//! `resolve`, `reject`.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use tether_channel::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

const FIELD_IS_REQUEST: &str = "isRequest";
const FIELD_REQID: &str = "reqid";
const FIELD_NAME: &str = "name";
const FIELD_ARGS: &str = "args";
const FIELD_RESOLVE: &str = "resolve";
const FIELD_REJECT: &str = "reject";

/// Per-request correlation id matching a response to its request.
///
/// Ids are drawn from a continuous random source rather than a counter, and
/// cross the wire as the numeric `reqid` field. The collision probability
/// under outstanding requests is negligible but nonzero; no duplicate check
/// is performed.
#[derive(Debug, Clone, Copy)]
pub struct CallId(f64);

impl CallId {
	/// Generates a fresh random id in `[0, 1)`.
	#[must_use]
	pub fn random() -> Self {
		let (hi, _) = Uuid::new_v4().as_u64_pair();
		// 53 mantissa bits, so the value survives the number encoding exactly.
		Self((hi >> 11) as f64 / (1u64 << 53) as f64)
	}

	fn from_wire(value: &Value) -> Option<Self> {
		match value {
			Value::Float(n) => Some(Self(*n)),
			Value::Int(n) => Some(Self(*n as f64)),
			_ => None,
		}
	}
}

impl PartialEq for CallId {
	fn eq(&self, other: &Self) -> bool {
		self.0.to_bits() == other.0.to_bits()
	}
}

impl Eq for CallId {}

impl Hash for CallId {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.to_bits().hash(state);
	}
}

impl fmt::Display for CallId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Outcome half of a response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	/// The handler resolved with a value.
	Resolve(Value),
	/// The handler rejected; only a human-readable message is carried.
	Reject(String),
}

/// Message envelope exchanged between endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
	/// A call addressed at a named handler on the receiving side.
	Request {
		/// Correlation id, unique per in-flight request per direction.
		id: CallId,
		/// Handler-table name being invoked.
		name: String,
		/// Arguments; may contain function tokens.
		args: Vec<Value>,
	},
	/// Settlement of a previously received request. Exactly one response is
	/// ever sent per request.
	Response {
		/// Correlation id of the request being settled.
		id: CallId,
		/// Resolution or rejection.
		outcome: Outcome,
	},
}

impl Envelope {
	/// Encodes the envelope into its wire record.
	#[must_use]
	pub fn encode(self) -> Value {
		match self {
			Envelope::Request { id, name, args } => Value::record([
				(FIELD_IS_REQUEST, Value::Bool(true)),
				(FIELD_REQID, Value::Float(id.0)),
				(FIELD_NAME, Value::Text(name)),
				(FIELD_ARGS, Value::List(args)),
			]),
			Envelope::Response { id, outcome } => {
				let mut map = BTreeMap::new();
				map.insert(FIELD_IS_REQUEST.to_owned(), Value::Bool(false));
				map.insert(FIELD_REQID.to_owned(), Value::Float(id.0));
				match outcome {
					Outcome::Resolve(value) => {
						map.insert(FIELD_RESOLVE.to_owned(), value);
					}
					Outcome::Reject(message) => {
						map.insert(FIELD_REJECT.to_owned(), Value::Text(message));
					}
				}
				Value::Record(map)
			}
		}
	}

	/// Decodes a wire record back into an envelope.
	///
	/// # Errors
	///
	/// [`Error::Protocol`] when the record is missing or mistypes a field.
	pub fn decode(value: Value) -> Result<Self> {
		let Value::Record(mut map) = value else {
			return Err(Error::Protocol("message is not a record".to_owned()));
		};
		let is_request = map
			.get(FIELD_IS_REQUEST)
			.and_then(Value::as_bool)
			.ok_or_else(|| Error::Protocol(format!("missing field: {FIELD_IS_REQUEST}")))?;
		let id = map
			.get(FIELD_REQID)
			.and_then(CallId::from_wire)
			.ok_or_else(|| Error::Protocol(format!("missing or invalid field: {FIELD_REQID}")))?;

		if is_request {
			let name = match map.remove(FIELD_NAME) {
				Some(Value::Text(name)) => name,
				_ => return Err(Error::Protocol(format!("missing field: {FIELD_NAME}"))),
			};
			let args = match map.remove(FIELD_ARGS) {
				Some(Value::List(args)) => args,
				_ => return Err(Error::Protocol(format!("missing field: {FIELD_ARGS}"))),
			};
			Ok(Envelope::Request { id, name, args })
		} else if let Some(message) = map.remove(FIELD_REJECT) {
			let Value::Text(message) = message else {
				return Err(Error::Protocol(format!("{FIELD_REJECT} must be text")));
			};
			Ok(Envelope::Response {
				id,
				outcome: Outcome::Reject(message),
			})
		} else {
			let value = map.remove(FIELD_RESOLVE).unwrap_or(Value::Null);
			Ok(Envelope::Response {
				id,
				outcome: Outcome::Resolve(value),
			})
		}
	}
}
