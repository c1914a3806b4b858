//! Property tests for update application.

use parking_lot::Mutex;
use proptest::prelude::*;
use scene_mirror::{values_equal, Path, StatusStore, StatusSynchronizer, SubscriberResult};
use serde_json::{Map, Value};
use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-5i64..5).prop_map(Value::from),
        "[a-c]{0,2}".prop_map(Value::String),
        prop::collection::vec((-3i64..3).prop_map(Value::from), 0..3).prop_map(Value::Array),
    ]
}

/// Small key alphabet so successive updates overlap.
fn arb_key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_owned)
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map(arb_key(), inner, 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    })
}

fn arb_update() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(arb_key(), arb_value(), 0..4)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

// ============================================================================
// Reference Model
// ============================================================================

fn merge(base: &mut Map<String, Value>, update: &Map<String, Value>) {
    for (key, new) in update {
        match new {
            Value::Object(children) => {
                let slot = base
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(inner) = slot {
                    merge(inner, children);
                }
            }
            leaf => {
                base.insert(key.clone(), leaf.clone());
            }
        }
    }
}

/// Every path the update names, containers included.
fn update_paths(update: &Map<String, Value>, prefix: &Path, out: &mut Vec<Path>) {
    for (key, value) in update {
        let path = prefix.child(key.as_str());
        if let Value::Object(children) = value {
            update_paths(children, &path, out);
        }
        out.push(path);
    }
}

/// Every path present in a tree, containers included.
fn tree_paths(tree: &Map<String, Value>, prefix: &Path, out: &mut Vec<Path>) {
    for (key, value) in tree {
        let path = prefix.child(key.as_str());
        if let Value::Object(children) = value {
            tree_paths(children, &path, out);
        }
        out.push(path);
    }
}

/// True if the update writes a non-mapping at a strict prefix of `path`.
fn shadowed_by_leaf(update: &Map<String, Value>, path: &Path) -> bool {
    let segments = path.segments();
    let mut node = update;
    for segment in &segments[..segments.len().saturating_sub(1)] {
        match node.get(segment) {
            None => return false,
            Some(Value::Object(children)) => node = children,
            Some(_) => return true,
        }
    }
    false
}

fn mirror() -> (Arc<StatusStore>, StatusSynchronizer) {
    let store = Arc::new(StatusStore::empty());
    let sync = StatusSynchronizer::new(Arc::clone(&store));
    (store, sync)
}

fn as_map(value: &Value) -> &Map<String, Value> {
    value.as_object().expect("updates are mappings")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Applying the same update twice notifies and writes nothing the second time.
    #[test]
    fn prop_second_application_is_silent(first in arb_update(), second in arb_update()) {
        let (_, sync) = mirror();
        sync.update(&first).unwrap();
        sync.update(&second).unwrap();

        let again = sync.update(&second).unwrap();
        prop_assert_eq!(again.notified, 0);
        prop_assert_eq!(again.written, 0);
    }

    /// The store ends up as the deep merge of everything applied.
    #[test]
    fn prop_store_is_deep_merge(updates in prop::collection::vec(arb_update(), 1..5)) {
        let (store, sync) = mirror();
        let mut model = Map::new();

        for update in &updates {
            sync.update(update).unwrap();
            merge(&mut model, as_map(update));
        }

        prop_assert!(values_equal(&store.snapshot(), &Value::Object(model)));
    }

    /// Keys survive updates unless the update put a leaf above them.
    #[test]
    fn prop_no_deletion(first in arb_update(), second in arb_update()) {
        let (store, sync) = mirror();
        sync.update(&first).unwrap();

        let mut before = Vec::new();
        tree_paths(as_map(&store.snapshot()), &Path::root(), &mut before);

        sync.update(&second).unwrap();

        for path in before {
            if !shadowed_by_leaf(as_map(&second), &path) {
                prop_assert!(store.contains(&path), "lost {}", path);
            }
        }
    }

    /// A path the update names is announced exactly when its value changes,
    /// and the announced value is what the store then holds.
    #[test]
    fn prop_notified_iff_changed(first in arb_update(), second in arb_update()) {
        let (store, sync) = mirror();
        sync.update(&first).unwrap();

        let mut touched = Vec::new();
        update_paths(as_map(&second), &Path::root(), &mut touched);
        touched.sort();
        touched.dedup();

        let seen: Vec<(Path, Arc<Mutex<Vec<Value>>>)> = touched
            .iter()
            .map(|path| {
                let log = Arc::new(Mutex::new(Vec::new()));
                let sink = Arc::clone(&log);
                store.subscribe(path.clone(), Arc::new(move |v: &Value| -> SubscriberResult {
                    sink.lock().push(v.clone());
                    Ok(())
                }));
                (path.clone(), log)
            })
            .collect();

        let before: Vec<Option<Value>> = touched.iter().map(|p| store.get_path(p)).collect();
        sync.update(&second).unwrap();

        for ((path, log), old) in seen.iter().zip(before) {
            let new = store.get_path(path);
            let changed = match (&old, &new) {
                (Some(o), Some(n)) => !values_equal(o, n),
                (None, None) => false,
                _ => true,
            };
            let log = log.lock();
            prop_assert_eq!(log.len(), usize::from(changed), "path {}", path);
            if let (Some(announced), Some(stored)) = (log.first(), new.as_ref()) {
                prop_assert!(values_equal(announced, stored));
            }
        }
    }
}
