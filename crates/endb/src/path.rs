//! Nested-path access into decoded values.
//!
//! A path addresses a field inside a [`Value`] using dotted and bracketed
//! segments:
//!
//! ```text
//! a.b[0].c        -> ["a", "b", "0", "c"]
//! a["b.c"].d      -> ["a", "b.c", "d"]
//! users['x y']    -> ["users", "x y"]
//! ```
//!
//! A segment addresses an array element only when it is a canonical index
//! (`0` or digits without a leading zero). When [`set`] has to create an
//! intermediate container it creates an array if the following segment is an
//! index and an object otherwise.

use serde_json::{Map, Value};

use crate::error::{EndbError, EndbResult};

/// Largest array index [`set`] will grow an array to.
pub const MAX_INDEX: usize = 1 << 20;

/// Split a path expression into segments.
///
/// # Errors
///
/// Returns [`EndbError::InvalidPath`] for an unterminated bracket or quote.
pub fn parse(path: &str) -> EndbResult<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    // Directly after `]` a `.` or end of input does not close an empty segment.
    let mut after_bracket = false;
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !after_bracket {
                    segments.push(std::mem::take(&mut current));
                }
                after_bracket = false;
            },
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                segments.push(parse_bracket(&mut chars, path)?);
                after_bracket = true;
            },
            _ => {
                current.push(c);
                after_bracket = false;
            },
        }
    }
    if !after_bracket || !current.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}

/// Read a bracketed segment; the opening `[` is already consumed.
fn parse_bracket(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    path: &str,
) -> EndbResult<String> {
    let mut segment = String::new();
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => segment.push(escaped),
                        None => break,
                    },
                    Some(c) if c == quote => {
                        return match chars.next() {
                            Some(']') => Ok(segment),
                            _ => Err(EndbError::InvalidPath(format!(
                                "expected `]` after quoted segment in {path:?}"
                            ))),
                        };
                    },
                    Some(c) => segment.push(c),
                    None => break,
                }
            }
            Err(EndbError::InvalidPath(format!(
                "unterminated quote in {path:?}"
            )))
        },
        _ => {
            for c in chars.by_ref() {
                if c == ']' {
                    return Ok(segment);
                }
                segment.push(c);
            }
            Err(EndbError::InvalidPath(format!(
                "unterminated bracket in {path:?}"
            )))
        },
    }
}

/// Interpret a segment as an array index.
fn as_index(segment: &str) -> Option<usize> {
    let canonical = segment == "0"
        || (!segment.is_empty()
            && !segment.starts_with('0')
            && segment.bytes().all(|b| b.is_ascii_digit()));
    if canonical { segment.parse().ok() } else { None }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => as_index(segment).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => as_index(segment).and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Whether a stored value counts as "nothing" for path writes.
///
/// `null`, `false`, `0` and `""` are replaced by an empty object before a
/// path is read or written.
#[must_use]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Use `value` as a path root, substituting an empty object when absent or falsy.
#[must_use]
pub fn or_empty(value: Option<Value>) -> Value {
    match value {
        Some(v) if !is_falsy(&v) => v,
        _ => Value::Object(Map::new()),
    }
}

/// Look up the value at `path`.
///
/// # Errors
///
/// Returns [`EndbError::InvalidPath`] if the path cannot be parsed.
pub fn get<'a>(root: &'a Value, path: &str) -> EndbResult<Option<&'a Value>> {
    let segments = parse(path)?;
    Ok(segments
        .iter()
        .try_fold(root, |node, segment| child(node, segment)))
}

/// Whether a value exists at `path`.
///
/// # Errors
///
/// Returns [`EndbError::InvalidPath`] if the path cannot be parsed.
pub fn has(root: &Value, path: &str) -> EndbResult<bool> {
    get(root, path).map(|found| found.is_some())
}

/// Write `value` at `path`, creating intermediate containers.
///
/// A root that is not an object or array is left untouched. Non-container
/// values in the middle of the path are replaced.
///
/// # Errors
///
/// Returns [`EndbError::InvalidPath`] if the path cannot be parsed or an
/// index exceeds [`MAX_INDEX`].
pub fn set(root: &mut Value, path: &str, value: Value) -> EndbResult<()> {
    if !is_container(root) {
        return Ok(());
    }
    let segments = parse(path)?;
    set_segments(root, &segments, value)
}

fn set_segments(node: &mut Value, segments: &[String], value: Value) -> EndbResult<()> {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };
    let Some(slot) = slot_mut(node, head)? else {
        return Ok(());
    };
    match rest.first() {
        None => {
            *slot = value;
            Ok(())
        },
        Some(next) => {
            if !is_container(slot) {
                *slot = if as_index(next).is_some() {
                    Value::Array(Vec::new())
                } else {
                    Value::Object(Map::new())
                };
            }
            set_segments(slot, rest, value)
        },
    }
}

/// Get or create the slot for `segment` inside a container.
///
/// Arrays only accept index segments; other segments yield `None`.
fn slot_mut<'a>(node: &'a mut Value, segment: &str) -> EndbResult<Option<&'a mut Value>> {
    match node {
        Value::Object(map) => Ok(Some(map.entry(segment.to_owned()).or_insert(Value::Null))),
        Value::Array(items) => {
            let Some(index) = as_index(segment) else {
                return Ok(None);
            };
            if index > MAX_INDEX {
                return Err(EndbError::InvalidPath(format!(
                    "index {index} exceeds the maximum of {MAX_INDEX}"
                )));
            }
            if index >= items.len() {
                items.resize(index.saturating_add(1), Value::Null);
            }
            Ok(items.get_mut(index))
        },
        _ => Ok(None),
    }
}

/// Remove the value at `path`.
///
/// Object fields are removed; array elements are replaced by `null` so the
/// positions of later elements do not shift. Returns whether anything was
/// there.
///
/// # Errors
///
/// Returns [`EndbError::InvalidPath`] if the path cannot be parsed.
pub fn unset(root: &mut Value, path: &str) -> EndbResult<bool> {
    let segments = parse(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Ok(false);
    };
    let mut node = root;
    for segment in parents {
        match child_mut(node, segment) {
            Some(next) => node = next,
            None => return Ok(false),
        }
    }
    Ok(match node {
        Value::Object(map) => map.remove(last).is_some(),
        Value::Array(items) => match as_index(last).and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = Value::Null;
                true
            },
            None => false,
        },
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        parse(path).unwrap()
    }

    #[test]
    fn test_parse_dotted_and_bracketed() {
        assert_eq!(segs("a"), vec!["a"]);
        assert_eq!(segs("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(segs("a.b[0].c"), vec!["a", "b", "0", "c"]);
        assert_eq!(segs("[1][2]"), vec!["1", "2"]);
        assert_eq!(segs("a[0]b"), vec!["a", "0", "b"]);
    }

    #[test]
    fn test_parse_quoted_segments() {
        assert_eq!(segs(r#"a["b.c"].d"#), vec!["a", "b.c", "d"]);
        assert_eq!(segs("users['x y']"), vec!["users", "x y"]);
        assert_eq!(segs(r#"a["q\"uote"]"#), vec!["a", "q\"uote"]);
    }

    #[test]
    fn test_parse_empty_segments() {
        assert_eq!(segs(""), vec![""]);
        assert_eq!(segs(".a"), vec!["", "a"]);
        assert_eq!(segs("a."), vec!["a", ""]);
    }

    #[test]
    fn test_parse_rejects_unterminated() {
        assert!(matches!(parse("a[0"), Err(EndbError::InvalidPath(_))));
        assert!(matches!(parse("a['b"), Err(EndbError::InvalidPath(_))));
        assert!(matches!(parse("a['b'x]"), Err(EndbError::InvalidPath(_))));
    }

    #[test]
    fn test_as_index() {
        assert_eq!(as_index("0"), Some(0));
        assert_eq!(as_index("12"), Some(12));
        assert_eq!(as_index("01"), None);
        assert_eq!(as_index("-1"), None);
        assert_eq!(as_index(""), None);
        assert_eq!(as_index("x"), None);
    }

    #[test]
    fn test_get_nested() {
        let value = json!({"a": {"b": [{"c": 7}]}});
        assert_eq!(get(&value, "a.b[0].c").unwrap(), Some(&json!(7)));
        assert_eq!(get(&value, "a.b.0.c").unwrap(), Some(&json!(7)));
        assert_eq!(get(&value, "a.b[1].c").unwrap(), None);
        assert_eq!(get(&value, "a.x").unwrap(), None);
        assert_eq!(get(&json!(5), "a").unwrap(), None);
    }

    #[test]
    fn test_get_null_is_present() {
        let value = json!({"a": null});
        assert_eq!(get(&value, "a").unwrap(), Some(&Value::Null));
        assert!(has(&value, "a").unwrap());
        assert!(!has(&value, "b").unwrap());
    }

    #[test]
    fn test_set_overwrites_and_keeps_siblings() {
        let mut value = json!({"x": 1, "y": 2});
        set(&mut value, "x", json!(3)).unwrap();
        assert_eq!(value, json!({"x": 3, "y": 2}));
    }

    #[test]
    fn test_set_creates_intermediate_objects_and_arrays() {
        let mut value = json!({});
        set(&mut value, "a.b[1].c", json!("deep")).unwrap();
        assert_eq!(value, json!({"a": {"b": [null, {"c": "deep"}]}}));
    }

    #[test]
    fn test_set_replaces_scalar_intermediate() {
        let mut value = json!({"a": 1});
        set(&mut value, "a.b", json!(true)).unwrap();
        assert_eq!(value, json!({"a": {"b": true}}));
    }

    #[test]
    fn test_set_on_scalar_root_is_noop() {
        let mut value = json!(5);
        set(&mut value, "a", json!(1)).unwrap();
        assert_eq!(value, json!(5));
    }

    #[test]
    fn test_set_rejects_huge_index() {
        let mut value = json!([]);
        let path = format!("[{}]", MAX_INDEX.saturating_add(1));
        assert!(matches!(
            set(&mut value, &path, json!(1)),
            Err(EndbError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_unset_object_field() {
        let mut value = json!({"a": {"b": 1, "c": 2}});
        assert!(unset(&mut value, "a.b").unwrap());
        assert_eq!(value, json!({"a": {"c": 2}}));
        assert!(!unset(&mut value, "a.b").unwrap());
        assert!(!unset(&mut value, "missing.deep").unwrap());
    }

    #[test]
    fn test_unset_array_element_leaves_hole() {
        let mut value = json!({"list": [1, 2, 3]});
        assert!(unset(&mut value, "list[1]").unwrap());
        assert_eq!(value, json!({"list": [1, null, 3]}));
    }

    #[test]
    fn test_falsy_values() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(is_falsy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!("0"), json!([]), json!({})] {
            assert!(!is_falsy(&truthy), "{truthy} should be truthy");
        }
        assert_eq!(or_empty(None), json!({}));
        assert_eq!(or_empty(Some(json!(0))), json!({}));
        assert_eq!(or_empty(Some(json!([1]))), json!([1]));
    }
}
