//! RFC 6902 (JSON Patch) and RFC 7396 (JSON Merge Patch) application.
//!
//! A patch whose top level is an array is a JSON Patch; anything else is a
//! merge patch. JSON Patch operations apply to a copy so a failing
//! operation leaves the target untouched.

use serde_json::{Map, Value};

use super::PatchError;

/// Apply `patch` to `target` in place.
pub fn apply(target: &mut Value, patch: &Value) -> Result<(), PatchError> {
    match patch {
        Value::Array(ops) => {
            let mut work = target.clone();
            for op in ops {
                apply_op(&mut work, op)?;
            }
            *target = work;
            Ok(())
        }
        _ => {
            merge(target, patch);
            Ok(())
        }
    }
}

/// RFC 7396 merge.
pub fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in patch {
            if value.is_null() {
                map.remove(key);
            } else {
                merge(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn apply_op(doc: &mut Value, op: &Value) -> Result<(), PatchError> {
    let op = op
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("operation must be an object".into()))?;
    let name = op
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp("missing \"op\" member".into()))?;
    let path_text = member_str(op, "path")?;
    let path = parse_pointer(path_text)?;

    match name {
        "add" => add(doc, &path, required_value(op, path_text)?),
        "remove" => remove(doc, &path).map(drop),
        "replace" => {
            let value = required_value(op, path_text)?;
            *get_mut(doc, &path)? = value;
            Ok(())
        }
        "move" => {
            let from = parse_pointer(member_str(op, "from")?)?;
            if path.len() > from.len() && path[..from.len()] == from[..] {
                return Err(PatchError::InvalidOp("cannot move a value into its own child".into()));
            }
            let value = remove(doc, &from)?;
            add(doc, &path, value)
        }
        "copy" => {
            let from = parse_pointer(member_str(op, "from")?)?;
            let value = get_mut(doc, &from)?.clone();
            add(doc, &path, value)
        }
        "test" => {
            let expected = required_value(op, path_text)?;
            if *get_mut(doc, &path)? == expected {
                Ok(())
            } else {
                Err(PatchError::TestFailed(path_text.to_string()))
            }
        }
        other => Err(PatchError::InvalidOp(other.to_string())),
    }
}

fn member_str<'a>(op: &'a Map<String, Value>, name: &str) -> Result<&'a str, PatchError> {
    op.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp(format!("missing \"{name}\" member")))
}

fn required_value(op: &Map<String, Value>, path: &str) -> Result<Value, PatchError> {
    op.get("value")
        .cloned()
        .ok_or_else(|| PatchError::NoValue(path.to_string()))
}

/// Split an RFC 6901 pointer into unescaped reference tokens.
pub fn parse_pointer(pointer: &str) -> Result<Vec<String>, PatchError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(PatchError::JsonPointer(pointer.to_string()));
    };
    rest.split('/')
        .map(|token| unescape(token).ok_or_else(|| PatchError::JsonPointer(pointer.to_string())))
        .collect()
}

fn unescape(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn array_index(token: &str, len: usize, allow_end: bool) -> Result<usize, PatchError> {
    let valid_digits = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    let index = if valid_digits { token.parse::<usize>().ok() } else { None };
    match index {
        Some(i) if i < len || (allow_end && i == len) => Ok(i),
        _ => Err(PatchError::InvalidArrayIndex(token.to_string())),
    }
}

fn get_mut<'a>(doc: &'a mut Value, path: &[String]) -> Result<&'a mut Value, PatchError> {
    let mut current = doc;
    for token in path {
        current = match current {
            Value::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| PatchError::TargetInvalid(token.clone()))?,
            Value::Array(items) => {
                let index = array_index(token, items.len(), false)?;
                &mut items[index]
            }
            _ => return Err(PatchError::TargetInvalid(token.clone())),
        };
    }
    Ok(current)
}

fn add(doc: &mut Value, path: &[String], value: Value) -> Result<(), PatchError> {
    let Some((last, parent_path)) = path.split_last() else {
        *doc = value;
        return Ok(());
    };
    match get_mut(doc, parent_path)? {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
            } else {
                let index = array_index(last, items.len(), true)?;
                items.insert(index, value);
            }
            Ok(())
        }
        _ => Err(PatchError::TargetInvalid(last.clone())),
    }
}

fn remove(doc: &mut Value, path: &[String]) -> Result<Value, PatchError> {
    let Some((last, parent_path)) = path.split_last() else {
        return Err(PatchError::TargetInvalid("cannot remove the document root".into()));
    };
    match get_mut(doc, parent_path)? {
        Value::Object(map) => map
            .remove(last)
            .ok_or_else(|| PatchError::TargetInvalid(last.clone())),
        Value::Array(items) => {
            let index = array_index(last, items.len(), false)?;
            Ok(items.remove(index))
        }
        _ => Err(PatchError::TargetInvalid(last.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_patch_operations() {
        let mut doc = json!({"a": 1, "list": [1, 2, 3], "obj": {"x": "y"}});
        let patch = json!([
            {"op": "add", "path": "/b", "value": 2},
            {"op": "remove", "path": "/list/0"},
            {"op": "replace", "path": "/a", "value": 10},
            {"op": "move", "from": "/obj/x", "path": "/moved"},
            {"op": "copy", "from": "/b", "path": "/list/-"},
            {"op": "test", "path": "/a", "value": 10}
        ]);
        apply(&mut doc, &patch).unwrap();
        assert_eq!(doc, json!({"a": 10, "b": 2, "list": [2, 3, 2], "obj": {}, "moved": "y"}));
    }

    #[test]
    fn failed_patch_leaves_target_untouched() {
        let mut doc = json!({"a": 1});
        let patch = json!([
            {"op": "add", "path": "/b", "value": 2},
            {"op": "test", "path": "/a", "value": 2}
        ]);
        assert_eq!(apply(&mut doc, &patch), Err(PatchError::TestFailed("/a".into())));
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn error_classification() {
        let mut doc = json!({"list": [1]});
        let cases = [
            (json!([{"op": "frobnicate", "path": "/a"}]), "op"),
            (json!([{"op": "add", "path": "/a"}]), "value"),
            (json!([{"op": "remove", "path": "/missing"}]), "target"),
            (json!([{"op": "add", "path": "/list/7", "value": 1}]), "index"),
            (json!([{"op": "add", "path": "no-slash", "value": 1}]), "pointer"),
            (json!([{"op": "add", "path": "/a~2", "value": 1}]), "pointer"),
        ];
        for (patch, expected) in cases {
            let err = apply(&mut doc, &patch).unwrap_err();
            let matched = matches!(
                (&err, expected),
                (PatchError::InvalidOp(_), "op")
                    | (PatchError::NoValue(_), "value")
                    | (PatchError::TargetInvalid(_), "target")
                    | (PatchError::InvalidArrayIndex(_), "index")
                    | (PatchError::JsonPointer(_), "pointer")
            );
            assert!(matched, "{patch} produced {err:?}");
        }
    }

    #[test]
    fn merge_patch() {
        let mut doc = json!({"a": "b", "c": {"d": "e", "f": "g"}});
        apply(&mut doc, &json!({"a": "z", "c": {"f": null}})).unwrap();
        assert_eq!(doc, json!({"a": "z", "c": {"d": "e"}}));
    }

    #[test]
    fn pointer_escapes() {
        assert_eq!(parse_pointer("/a~1b/c~0d").unwrap(), vec!["a/b", "c~d"]);
        assert!(parse_pointer("").unwrap().is_empty());
    }
}
