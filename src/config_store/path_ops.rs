use serde_json::{Map, Value};

const SINGLE_WILDCARD: &str = "*";
const MULTI_WILDCARD: &str = "**";

/// Largest run of `null` padding a write may add past the end of a sequence.
const MAX_SEQUENCE_GAP: usize = 1024;

/// Checks if a configuration key matches a subscription pattern
///
/// Both are split on `.`. A `*` segment matches exactly one key segment, a
/// `**` segment matches zero or more, anything else must match literally.
///
/// # Examples
/// * `"server.port"` matches `"server.port"`
/// * `"server.port"` matches `"server.*"`
/// * `"server.tls.cert"` matches `"server.**"`
/// * `"server.tls.cert"` does not match `"server.*"`
pub(crate) fn path_matches(key: &str, pattern: &str) -> bool {
    let key_parts: Vec<&str> = key.split('.').collect();
    let pattern_parts: Vec<&str> = pattern.split('.').collect();

    segments_match(&key_parts, &pattern_parts)
}

fn segments_match(key: &[&str], pattern: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&MULTI_WILDCARD, rest)) => {
            (0..=key.len()).any(|skip| segments_match(&key[skip..], rest))
        }
        Some((head, rest)) => match key.split_first() {
            Some((segment, key_rest)) => {
                (*head == SINGLE_WILDCARD || head == segment) && segments_match(key_rest, rest)
            }
            None => false,
        },
    }
}

/// Navigates through a value tree following a dot-separated path
///
/// Mappings are indexed by key, sequences by numeric segment. Returns `None`
/// as soon as a segment is missing or the walk reaches a scalar.
///
/// # Arguments
/// * `value` - The root value to navigate from
/// * `path` - Dot-separated path (e.g., "server.port" or "array.0.field")
pub(crate) fn navigate_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(array) => part.parse::<usize>().ok().and_then(|i| array.get(i)),
        _ => None,
    })
}

/// Sets a value at the specified path, creating intermediate mappings
///
/// Missing intermediates become empty mappings; so does any intermediate
/// scalar that stands in the way. Sequences are indexed by numeric segments
/// close to their end and become mappings otherwise.
///
/// # Arguments
/// * `value` - The root value to modify
/// * `path` - Dot-separated path to the target location
/// * `new_value` - The value to store at the path
pub(crate) fn set_value_at_path(value: &mut Value, path: &str, new_value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    let (last_key, parents) = match parts.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = value;
    for part in parents {
        current = navigate_step_mut(current, part);
    }

    *slot_mut(current, last_key) = new_value;
}

/// Performs a single navigation step, creating the next container if needed
fn navigate_step_mut<'a>(current: &'a mut Value, key: &str) -> &'a mut Value {
    let next = slot_mut(current, key);
    if !matches!(*next, Value::Object(_) | Value::Array(_)) {
        *next = Value::Object(Map::new());
    }
    next
}

/// Returns the slot addressed by `key` inside `container`
///
/// Sequences are extended with `null` up to a numeric index that lies at
/// most [`MAX_SEQUENCE_GAP`] past the end. Any other key turns the sequence
/// into a mapping that keeps its items under their index keys. A scalar is
/// replaced by an empty mapping.
fn slot_mut<'a>(container: &'a mut Value, key: &str) -> &'a mut Value {
    let index = sequence_index(container, key);

    match (container, index) {
        (Value::Array(array), Some(index)) => {
            if array.len() <= index {
                array.resize(index + 1, Value::Null);
            }
            &mut array[index]
        }
        (other, _) => {
            if !other.is_object() {
                let map = match other.take() {
                    Value::Array(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| (i.to_string(), item))
                        .collect(),
                    _ => Map::new(),
                };
                *other = Value::Object(map);
            }
            // Inserts `null` for a missing key; `other` is a mapping here.
            &mut other[key]
        }
    }
}

/// Numeric segment usable as a sequence index, if `container` is a sequence
fn sequence_index(container: &Value, key: &str) -> Option<usize> {
    let Value::Array(array) = container else {
        return None;
    };
    let index = key.parse::<usize>().ok()?;

    index
        .checked_sub(array.len())
        .is_none_or(|gap| gap <= MAX_SEQUENCE_GAP)
        .then_some(index)
}

/// Compares two values the way idempotent writes are detected
///
/// Numbers compare numerically, so `1` and `1.0` are equal. Mappings and
/// sequences compare element by element.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                x.as_f64() == y.as_f64()
            } else {
                x == y
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
