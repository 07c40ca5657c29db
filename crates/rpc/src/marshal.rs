//! Converting live functions into wire tokens and back into callable stubs.
//!
//! A function is never serialized; a token referencing a registry slot on the
//! origin side crosses the boundary instead, and invoking the token issues a
//! fresh remote call.

use std::sync::Arc;

use tether_channel::{CallError, Callable, FunctionToken, Value};
use uuid::Uuid;

use crate::socket::EndpointSocket;

/// Name prefix for ephemeral handler entries created by marshaling, letting
/// the GC sweep and diagnostics recognize them among exported names.
pub const CALLBACK_PREFIX: &str = "__cb$";

/// Generates a fresh ephemeral handler name.
#[must_use]
pub fn ephemeral_name() -> String {
	format!("{CALLBACK_PREFIX}{}", Uuid::new_v4().simple())
}

/// Replaces every live function in `value` with a token, collecting the
/// handler-table registrations the local side must perform before sending.
///
/// The function stays callable any number of times until garbage-collected.
#[must_use]
pub fn strip_functions(value: Value, registrations: &mut Vec<(String, Callable)>) -> Value {
	match value {
		Value::Function(callable) => {
			let name = ephemeral_name();
			registrations.push((name.clone(), callable));
			Value::Token(FunctionToken { name })
		}
		Value::List(items) => Value::List(
			items
				.into_iter()
				.map(|item| strip_functions(item, registrations))
				.collect(),
		),
		Value::Record(map) => Value::Record(
			map.into_iter()
				.map(|(key, item)| (key, strip_functions(item, registrations)))
				.collect(),
		),
		other => other,
	}
}

/// Replaces every function token in `value` with a stub that issues a new
/// outbound request through `socket`, addressed by the token's name.
///
/// Stub arguments re-enter the outbound path, so functions handed to a stub
/// are marshaled again; multi-hop callback chains fall out of this.
#[must_use]
pub fn hydrate_tokens(value: Value, socket: &EndpointSocket) -> Value {
	match value {
		Value::Token(token) => Value::Function(stub(token, socket.clone())),
		Value::List(items) => Value::List(
			items
				.into_iter()
				.map(|item| hydrate_tokens(item, socket))
				.collect(),
		),
		Value::Record(map) => Value::Record(
			map.into_iter()
				.map(|(key, item)| (key, hydrate_tokens(item, socket)))
				.collect(),
		),
		other => other,
	}
}

fn stub(token: FunctionToken, socket: EndpointSocket) -> Callable {
	Arc::new(move |args| {
		let socket = socket.clone();
		let name = token.name.clone();
		Box::pin(async move { socket.call(name, args).await.map_err(CallError::from) })
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nested_functions_become_prefixed_tokens() {
		let tree = Value::record([
			("n", Value::Int(1)),
			(
				"callbacks",
				Value::List(vec![Value::callable(|_args| async { Ok(Value::Null) })]),
			),
		]);
		let mut registrations = Vec::new();
		let stripped = strip_functions(tree, &mut registrations);

		assert_eq!(registrations.len(), 1);
		let (name, _callable) = &registrations[0];
		assert!(name.starts_with(CALLBACK_PREFIX));

		let record = stripped.as_record().expect("record");
		let list = record["callbacks"].as_list().expect("list");
		assert_eq!(
			list[0],
			Value::Token(FunctionToken { name: name.clone() })
		);
	}

	#[test]
	fn plain_values_pass_through_unchanged() {
		let mut registrations = Vec::new();
		let value = Value::record([("x", Value::Text("y".to_owned()))]);
		assert_eq!(strip_functions(value.clone(), &mut registrations), value);
		assert!(registrations.is_empty());
	}

	#[test]
	fn ephemeral_names_are_unique() {
		let a = ephemeral_name();
		let b = ephemeral_name();
		assert_ne!(a, b);
	}
}
