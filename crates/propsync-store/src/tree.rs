//! JSON tree edits shared by the in-memory store and the event-stream mirror
//!
//! The tree follows the backend's rules: `null` means absent, writing `null`
//! removes a key, an empty object is stored as `null`, and objects left empty
//! by a removal disappear with it.

use serde_json::{Map, Value};

/// Value stored at `segments`, `None` when absent
pub(crate) fn read(root: &Value, segments: &[String]) -> Option<Value> {
    let mut node = root;
    for seg in segments {
        node = node.get(seg.as_str())?;
    }
    if node.is_null() {
        None
    } else {
        Some(node.clone())
    }
}

/// Replace the value at `segments`
pub(crate) fn put(root: &mut Value, segments: &[String], value: Value) {
    let value = prune(value);
    if value.is_null() {
        if remove(root, segments) {
            *root = Value::Null;
        }
        return;
    }
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };
    let mut node = root;
    for seg in parents {
        node = as_object(node)
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    as_object(node).insert(last.clone(), value);
}

/// Replace each top-level key of `partial` below `segments`, siblings untouched
pub(crate) fn merge(root: &mut Value, segments: &[String], partial: Map<String, Value>) {
    let mut target = segments.to_vec();
    for (key, value) in partial {
        target.push(key);
        put(root, &target, value);
        target.pop();
    }
}

/// Remove the node at `segments`; returns true when `node` itself is now empty
fn remove(node: &mut Value, segments: &[String]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return true;
    };
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    let drop_child = match map.get_mut(head) {
        Some(child) => remove(child, rest),
        None => false,
    };
    if drop_child {
        map.remove(head);
    }
    map.is_empty()
}

/// Drop `null` and empty-object members recursively; an object left empty becomes `null`
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, prune(child)))
                .filter(|(_, child)| !child.is_null())
                .collect();
            if kept.is_empty() {
                Value::Null
            } else {
                Value::Object(kept)
            }
        }
        other => other,
    }
}

fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was replaced by an object above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &[&str]) -> Vec<String> {
        path.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn put_creates_intermediate_objects() {
        let mut root = Value::Null;
        put(&mut root, &segs(&["properties", "Delaware", "Westover"]), json!({"unit": "1"}));
        assert_eq!(
            root,
            json!({"properties": {"Delaware": {"Westover": {"unit": "1"}}}})
        );
    }

    #[test]
    fn merge_keeps_siblings() {
        let mut root = json!({"p": {"accountant": {"name": "A"}, "manager": {"name": "M"}}});
        let mut partial = Map::new();
        partial.insert("accountant".into(), json!({"name": "B", "email": "b@x.com"}));
        merge(&mut root, &segs(&["p"]), partial);

        assert_eq!(
            root,
            json!({"p": {"accountant": {"name": "B", "email": "b@x.com"}, "manager": {"name": "M"}}})
        );
    }

    #[test]
    fn null_removes_and_prunes_empty_parents() {
        let mut root = json!({"a": {"b": {"c": 1}}, "d": 2});
        put(&mut root, &segs(&["a", "b", "c"]), Value::Null);
        assert_eq!(root, json!({"d": 2}));

        put(&mut root, &segs(&["d"]), Value::Null);
        assert_eq!(root, Value::Null);
        assert_eq!(read(&root, &[]), None);
    }

    #[test]
    fn empty_objects_are_stored_as_null() {
        let mut root = json!({"p": {"a": 1, "b": {"c": 2}}});
        put(&mut root, &segs(&["p", "b"]), json!({}));
        assert_eq!(root, json!({"p": {"a": 1}}));

        put(&mut root, &segs(&["p", "d"]), json!({"e": {}, "f": null, "g": "x"}));
        assert_eq!(root, json!({"p": {"a": 1, "d": {"g": "x"}}}));

        put(&mut root, &segs(&["p"]), json!({"only": {"empty": {}}}));
        assert_eq!(root, Value::Null);
    }

    #[test]
    fn read_missing_is_none() {
        let root = json!({"a": {"b": 1}});
        assert_eq!(read(&root, &segs(&["a", "x"])), None);
        assert_eq!(read(&root, &segs(&["a", "b", "c"])), None);
        assert_eq!(read(&root, &segs(&["a", "b"])), Some(json!(1)));
    }
}
