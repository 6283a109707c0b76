//! Partial updates expressed as a list of JSON-pointer operations.
//!
//! Supports the `replace`, `add` and `remove` subset of RFC 6902. Paths are
//! JSON pointers (`/name`, `/tags/0`, `/tags/-` to append). Operations are
//! applied in order; the first failing operation aborts the whole patch and
//! leaves the target untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Replace,
    Add,
    Remove,
}

/// A single patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// An ordered list of patch operations.
pub type Patch = Vec<PatchOperation>;

/// Errors from applying a patch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("invalid patch path: {0:?}")]
    InvalidPath(String),
    #[error("patch path does not exist: {0}")]
    PathNotFound(String),
    #[error("patch operation on {0} requires a value")]
    MissingValue(String),
    #[error("invalid array index in patch path: {0}")]
    InvalidIndex(String),
    #[error("patch path parent is not an object or array: {0}")]
    NotAContainer(String),
}

/// Applies `patch` to `target`.
///
/// On error `target` is left unchanged.
///
/// # Errors
///
/// Returns a [`PatchError`] describing the first operation that could not
/// be applied.
pub fn apply_patch(target: &mut Value, patch: &[PatchOperation]) -> Result<(), PatchError> {
    let mut working = target.clone();
    for operation in patch {
        apply_one(&mut working, operation)?;
    }
    *target = working;
    Ok(())
}

fn apply_one(target: &mut Value, operation: &PatchOperation) -> Result<(), PatchError> {
    let path = operation.path.as_str();
    let (parent_path, token) = split_pointer(path)?;
    let parent = target
        .pointer_mut(parent_path)
        .ok_or_else(|| PatchError::PathNotFound(path.to_string()))?;

    let value = || {
        operation
            .value
            .clone()
            .ok_or_else(|| PatchError::MissingValue(path.to_string()))
    };

    match (operation.op, parent) {
        (PatchOp::Replace, Value::Object(map)) => {
            let slot = map
                .get_mut(&token)
                .ok_or_else(|| PatchError::PathNotFound(path.to_string()))?;
            *slot = value()?;
        }
        (PatchOp::Replace, Value::Array(items)) => {
            let index = array_index(&token, items.len(), path)?;
            items[index] = value()?;
        }
        (PatchOp::Add, Value::Object(map)) => {
            map.insert(token, value()?);
        }
        (PatchOp::Add, Value::Array(items)) => {
            if token == "-" {
                items.push(value()?);
            } else {
                let index = array_index(&token, items.len() + 1, path)?;
                items.insert(index, value()?);
            }
        }
        (PatchOp::Remove, Value::Object(map)) => {
            map.remove(&token)
                .ok_or_else(|| PatchError::PathNotFound(path.to_string()))?;
        }
        (PatchOp::Remove, Value::Array(items)) => {
            let index = array_index(&token, items.len(), path)?;
            items.remove(index);
        }
        _ => return Err(PatchError::NotAContainer(path.to_string())),
    }
    Ok(())
}

/// Splits a pointer into its parent pointer and unescaped last token.
fn split_pointer(path: &str) -> Result<(&str, String), PatchError> {
    if !path.starts_with('/') {
        return Err(PatchError::InvalidPath(path.to_string()));
    }
    let (parent, last) = path
        .rsplit_once('/')
        .ok_or_else(|| PatchError::InvalidPath(path.to_string()))?;
    Ok((parent, last.replace("~1", "/").replace("~0", "~")))
}

/// Parses `token` as an index strictly below `bound`.
fn array_index(token: &str, bound: usize, path: &str) -> Result<usize, PatchError> {
    let leading_zero = token.len() > 1 && token.starts_with('0');
    match token.parse::<usize>() {
        Ok(index) if index < bound && !leading_zero => Ok(index),
        _ => Err(PatchError::InvalidIndex(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn op(op: PatchOp, path: &str, value: Option<Value>) -> PatchOperation {
        PatchOperation {
            op,
            path: path.to_string(),
            value,
        }
    }

    #[test]
    fn replace_object_member() {
        let mut doc = json!({ "name": "old", "tags": [] });
        apply_patch(&mut doc, &[op(PatchOp::Replace, "/name", Some(json!("new")))]).unwrap();
        assert_eq!(doc["name"], "new");
    }

    #[test]
    fn replace_missing_member_fails() {
        let mut doc = json!({ "name": "old" });
        let err = apply_patch(
            &mut doc,
            &[op(PatchOp::Replace, "/description", Some(json!("x")))],
        )
        .unwrap_err();
        assert_eq!(err, PatchError::PathNotFound("/description".to_string()));
    }

    #[test]
    fn add_appends_and_inserts_into_arrays() {
        let mut doc = json!({ "tags": ["b"] });
        apply_patch(
            &mut doc,
            &[
                op(PatchOp::Add, "/tags/-", Some(json!("c"))),
                op(PatchOp::Add, "/tags/0", Some(json!("a"))),
            ],
        )
        .unwrap();
        assert_eq!(doc["tags"], json!(["a", "b", "c"]));
    }

    #[test]
    fn add_creates_object_member() {
        let mut doc = json!({});
        apply_patch(&mut doc, &[op(PatchOp::Add, "/description", Some(json!("d")))]).unwrap();
        assert_eq!(doc["description"], "d");
    }

    #[test]
    fn remove_member_and_element() {
        let mut doc = json!({ "description": "d", "tags": ["a", "b"] });
        apply_patch(
            &mut doc,
            &[
                op(PatchOp::Remove, "/description", None),
                op(PatchOp::Remove, "/tags/0", None),
            ],
        )
        .unwrap();
        assert!(doc.get("description").is_none());
        assert_eq!(doc["tags"], json!(["b"]));
    }

    #[test]
    fn failed_patch_leaves_target_untouched() {
        let mut doc = json!({ "name": "old", "tags": ["a"] });
        let before = doc.clone();
        let err = apply_patch(
            &mut doc,
            &[
                op(PatchOp::Replace, "/name", Some(json!("new"))),
                op(PatchOp::Remove, "/tags/5", None),
            ],
        )
        .unwrap_err();
        assert_eq!(err, PatchError::InvalidIndex("/tags/5".to_string()));
        assert_eq!(doc, before);
    }

    #[test]
    fn missing_value_is_rejected() {
        let mut doc = json!({ "name": "old" });
        let err = apply_patch(&mut doc, &[op(PatchOp::Replace, "/name", None)]).unwrap_err();
        assert_eq!(err, PatchError::MissingValue("/name".to_string()));
    }

    #[test]
    fn relative_path_is_invalid() {
        let mut doc = json!({ "name": "old" });
        let err = apply_patch(&mut doc, &[op(PatchOp::Remove, "name", None)]).unwrap_err();
        assert_eq!(err, PatchError::InvalidPath("name".to_string()));
    }

    #[test]
    fn escaped_tokens_are_unescaped() {
        let mut doc = json!({ "config": {} });
        apply_patch(
            &mut doc,
            &[op(PatchOp::Add, "/config/a~1b~0c", Some(json!(1)))],
        )
        .unwrap();
        assert_eq!(doc["config"]["a/b~c"], 1);
    }

    #[test]
    fn scalar_parent_is_not_a_container() {
        let mut doc = json!({ "name": "old" });
        let err = apply_patch(&mut doc, &[op(PatchOp::Add, "/name/x", Some(json!(1)))])
            .unwrap_err();
        assert_eq!(err, PatchError::NotAContainer("/name/x".to_string()));
    }

    #[test]
    fn patch_deserializes_from_wire_format() {
        let patch: Patch = serde_json::from_value(json!([
            { "op": "replace", "path": "/name", "value": "x" },
            { "op": "remove", "path": "/tags/0" }
        ]))
        .unwrap();
        assert_eq!(patch.len(), 2);
        assert_eq!(patch[1].op, PatchOp::Remove);
        assert!(patch[1].value.is_none());
    }
}
