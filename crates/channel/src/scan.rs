//! Deep discovery of transferable resources inside value trees.

use std::collections::{HashMap, HashSet};

use crate::resource::Transferable;
use crate::value::Value;

/// Returns every distinct transferable resource contained anywhere in `value`.
///
/// Depth-first: primitives contribute nothing, lists and records recurse,
/// resources are leaves. Handles are deduplicated by payload-cell identity,
/// so a resource referenced from multiple places appears exactly once.
/// Traversal order is not significant to callers.
#[must_use]
pub fn transferables(value: &Value) -> Vec<Transferable> {
	let mut seen = HashSet::new();
	let mut found = Vec::new();
	collect(value, &mut seen, &mut found);
	found
}

fn collect(value: &Value, seen: &mut HashSet<usize>, found: &mut Vec<Transferable>) {
	match value {
		Value::Resource(resource) => {
			if seen.insert(resource.id()) {
				found.push(resource.clone());
			}
		}
		Value::List(items) => {
			for item in items {
				collect(item, seen, found);
			}
		}
		Value::Record(map) => {
			for item in map.values() {
				collect(item, seen, found);
			}
		}
		_ => {}
	}
}

/// True if a live function value appears anywhere in `value`.
#[must_use]
pub fn contains_function(value: &Value) -> bool {
	match value {
		Value::Function(_) => true,
		Value::List(items) => items.iter().any(contains_function),
		Value::Record(map) => map.values().any(contains_function),
		_ => false,
	}
}

/// Applies a transfer list to an outgoing value.
///
/// Every listed resource has its payload taken out of the sender-visible
/// cell; occurrences inside the returned tree are rewritten to fresh attached
/// handles. Handles the sender retains are detached from this point on.
/// Listed resources that were already detached are delivered as-is.
#[must_use]
pub fn detach_for_send(value: Value, transfers: &[Transferable]) -> Value {
	let mut moved: HashMap<usize, Transferable> = HashMap::new();
	for resource in transfers {
		moved.entry(resource.id()).or_insert_with(|| match resource.detach() {
			Some(payload) => Transferable::new(payload),
			None => resource.clone(),
		});
	}
	if moved.is_empty() {
		return value;
	}
	reroot(value, &moved)
}

fn reroot(value: Value, moved: &HashMap<usize, Transferable>) -> Value {
	match value {
		Value::Resource(resource) => match moved.get(&resource.id()) {
			Some(fresh) => Value::Resource(fresh.clone()),
			None => Value::Resource(resource),
		},
		Value::List(items) => Value::List(items.into_iter().map(|v| reroot(v, moved)).collect()),
		Value::Record(map) => Value::Record(map.into_iter().map(|(k, v)| (k, reroot(v, moved))).collect()),
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resource::Payload;

	#[test]
	fn shared_resource_is_reported_once() {
		let shared = Transferable::bytes(vec![1, 2, 3]);
		let tree = Value::record([
			("a", Value::Resource(shared.clone())),
			("b", Value::List(vec![Value::Resource(shared.clone()), Value::Int(7)])),
		]);
		let found = transferables(&tree);
		assert_eq!(found.len(), 1);
		assert!(found[0].same_resource(&shared));
	}

	#[test]
	fn plain_trees_yield_nothing() {
		let tree = Value::record([
			("n", Value::Int(1)),
			("t", Value::Text("x".to_owned())),
			("xs", Value::List(vec![Value::Null, Value::Bool(false)])),
		]);
		assert!(transferables(&tree).is_empty());
	}

	#[test]
	fn distinct_resources_are_all_found() {
		let a = Transferable::bytes(vec![0]);
		let b = Transferable::frame(1, 1, vec![0; 4]);
		let tree = Value::List(vec![
			Value::Resource(a.clone()),
			Value::record([("inner", Value::Resource(b.clone()))]),
		]);
		let found = transferables(&tree);
		assert_eq!(found.len(), 2);
	}

	#[test]
	fn detach_moves_listed_resources_only() {
		let moved = Transferable::bytes(vec![1, 2]);
		let kept = Transferable::bytes(vec![3]);
		let tree = Value::List(vec![Value::Resource(moved.clone()), Value::Resource(kept.clone())]);

		let delivered = detach_for_send(tree, &[moved.clone()]);

		assert!(moved.is_detached());
		assert!(!kept.is_detached());

		let items = delivered.as_list().expect("list");
		let fresh = items[0].as_resource().expect("resource");
		assert!(!fresh.same_resource(&moved));
		assert_eq!(fresh.peek(Payload::len).expect("attached"), 2);
		assert!(items[1].as_resource().expect("resource").same_resource(&kept));
	}

	#[test]
	fn function_detection_recurses() {
		let tree = Value::record([(
			"cb",
			Value::List(vec![Value::callable(|_args| async { Ok(Value::Null) })]),
		)]);
		assert!(contains_function(&tree));
		assert!(!contains_function(&Value::Int(0)));
	}
}
