//! Structured values that cross the channel.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::resource::Transferable;

/// Marker key identifying a serialized function token, distinguishing
/// marshaled-function placeholders from ordinary record values.
pub const FUNCTION_MARKER: &str = "__fn";

/// Failure reported by a call; only the message string survives the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallError(pub String);

impl CallError {
	/// Creates a call failure from a message.
	#[must_use]
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// Future produced by invoking a [`Callable`].
pub type CallFuture = BoxFuture<'static, Result<Value, CallError>>;

/// A live asynchronous function value.
pub type Callable = Arc<dyn Fn(Vec<Value>) -> CallFuture + Send + Sync>;

/// Serializable placeholder standing in for a live function value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionToken {
	/// Handler-table name the token refers to on its origin side.
	pub name: String,
}

/// A structured value.
///
/// `List` and `Record` form plain trees; aliasing is only possible through
/// [`Transferable`] handles, which share their payload cell across clones.
/// `Function` values exist only on the side that owns them — marshaling
/// replaces them with `Token` placeholders before a value reaches a port.
#[derive(Clone)]
pub enum Value {
	/// Absent value.
	Null,
	/// Boolean.
	Bool(bool),
	/// Signed integer.
	Int(i64),
	/// Floating point number.
	Float(f64),
	/// UTF-8 text.
	Text(String),
	/// Ordered sequence of values.
	List(Vec<Value>),
	/// String-keyed mapping of values.
	Record(BTreeMap<String, Value>),
	/// Transferable resource handle.
	Resource(Transferable),
	/// Live function value (local side only).
	Function(Callable),
	/// Marshaled-function placeholder.
	Token(FunctionToken),
}

impl Value {
	/// Builds a record value from key/value pairs.
	#[must_use]
	pub fn record<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
		Value::Record(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}

	/// Wraps an async closure as a live function value.
	#[must_use]
	pub fn callable<F, Fut>(f: F) -> Self
	where
		F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value, CallError>> + Send + 'static,
	{
		Value::Function(Arc::new(move |args| Box::pin(f(args))))
	}

	/// Integer payload, if this is an `Int`.
	#[must_use]
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	/// Boolean payload, if this is a `Bool`.
	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Text payload, if this is a `Text`.
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(t) => Some(t),
			_ => None,
		}
	}

	/// List payload, if this is a `List`.
	#[must_use]
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	/// Record payload, if this is a `Record`.
	#[must_use]
	pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
		match self {
			Value::Record(map) => Some(map),
			_ => None,
		}
	}

	/// Resource handle, if this is a `Resource`.
	#[must_use]
	pub fn as_resource(&self) -> Option<&Transferable> {
		match self {
			Value::Resource(r) => Some(r),
			_ => None,
		}
	}

	/// Live function, if this is a `Function`.
	#[must_use]
	pub fn as_function(&self) -> Option<&Callable> {
		match self {
			Value::Function(f) => Some(f),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Text(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Text(v)
	}
}

impl From<Vec<Value>> for Value {
	fn from(v: Vec<Value>) -> Self {
		Value::List(v)
	}
}

impl From<Transferable> for Value {
	fn from(v: Transferable) -> Self {
		Value::Resource(v)
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("Null"),
			Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
			Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
			Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
			Value::Text(v) => f.debug_tuple("Text").field(v).finish(),
			Value::List(v) => f.debug_tuple("List").field(v).finish(),
			Value::Record(v) => f.debug_tuple("Record").field(v).finish(),
			Value::Resource(v) => f.debug_tuple("Resource").field(v).finish(),
			Value::Function(_) => f.write_str("Function(..)"),
			Value::Token(v) => f.debug_tuple("Token").field(v).finish(),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Float(a), Value::Float(b)) => a == b,
			(Value::Text(a), Value::Text(b)) => a == b,
			(Value::List(a), Value::List(b)) => a == b,
			(Value::Record(a), Value::Record(b)) => a == b,
			(Value::Resource(a), Value::Resource(b)) => a.same_resource(b),
			(Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
			(Value::Token(a), Value::Token(b)) => a == b,
			_ => false,
		}
	}
}

impl Serialize for Value {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Value::Null => serializer.serialize_unit(),
			Value::Bool(v) => serializer.serialize_bool(*v),
			Value::Int(v) => serializer.serialize_i64(*v),
			Value::Float(v) => serializer.serialize_f64(*v),
			Value::Text(v) => serializer.serialize_str(v),
			Value::List(items) => serializer.collect_seq(items),
			Value::Record(map) => serializer.collect_map(map),
			Value::Resource(r) => {
				let mut map = serializer.serialize_map(Some(3))?;
				map.serialize_entry("__transfer", &true)?;
				map.serialize_entry("kind", &r.kind())?;
				map.serialize_entry("detached", &r.is_detached())?;
				map.end()
			}
			Value::Function(_) => Err(S::Error::custom("live function values cannot be serialized")),
			Value::Token(token) => {
				let mut map = serializer.serialize_map(Some(2))?;
				map.serialize_entry(FUNCTION_MARKER, &true)?;
				map.serialize_entry("name", &token.name)?;
				map.end()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_serializes_with_marker_key() {
		let token = Value::Token(FunctionToken {
			name: "__cb$abc".to_owned(),
		});
		let json = serde_json::to_value(&token).expect("serializable");
		assert_eq!(json[FUNCTION_MARKER], serde_json::json!(true));
		assert_eq!(json["name"], serde_json::json!("__cb$abc"));
	}

	#[test]
	fn live_function_refuses_to_serialize() {
		let func = Value::callable(|_args| async { Ok(Value::Null) });
		assert!(serde_json::to_value(&func).is_err());
	}

	#[test]
	fn record_and_list_serialize_structurally() {
		let value = Value::record([
			("n", Value::Int(42)),
			("items", Value::List(vec![Value::Bool(true), Value::Null])),
		]);
		let json = serde_json::to_value(&value).expect("serializable");
		assert_eq!(json, serde_json::json!({ "n": 42, "items": [true, null] }));
	}

	#[test]
	fn functions_compare_by_identity() {
		let f = Value::callable(|_args| async { Ok(Value::Null) });
		let g = Value::callable(|_args| async { Ok(Value::Null) });
		assert_eq!(f, f.clone());
		assert_ne!(f, g);
	}
}
