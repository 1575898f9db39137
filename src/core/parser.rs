//! Schema Normalizer
//!
//! Turns the raw completion text into a `SchemaDraft`. The model is asked for
//! JSON only, but replies often carry prose or code fences around the payload,
//! so the object is located by brace span before decoding. Every field then
//! gets a default so a sparse reply still produces a drawable document.

use crate::error::NormalizeError;
use crate::schema::{DraftDefaults, Edge, Node, NodeData, Position, SchemaDraft};
use serde_json::{Map, Value};
use tracing::warn;

const UNKNOWN_LABEL: &str = "Unknown";
const DEFAULT_CATEGORY: &str = "EntityType";

type Object = Map<String, Value>;

pub fn normalize(raw: &str) -> Result<SchemaDraft, NormalizeError> {
    normalize_with(raw, &DraftDefaults::default())
}

pub fn normalize_with(raw: &str, defaults: &DraftDefaults) -> Result<SchemaDraft, NormalizeError> {
    let span = brace_span(raw).ok_or(NormalizeError::NoJsonFound)?;

    let decoded: Value = serde_json::from_str(span).map_err(|e| {
        warn!(error = %e, raw_response = %raw, "LLM response is not valid JSON");
        NormalizeError::MalformedJson {
            message: e.to_string(),
            raw: raw.to_string(),
        }
    })?;

    // A span starting with '{' only ever decodes to an object.
    let root = decoded
        .as_object()
        .ok_or_else(|| NormalizeError::ExtractionFailed("top-level value is not an object".into()))?;

    let nodes = records(root, "nodes")?
        .iter()
        .enumerate()
        .map(|(i, v)| map_node(i, v, defaults))
        .collect::<Result<Vec<_>, _>>()?;

    let edges = records(root, "edges")?
        .iter()
        .enumerate()
        .map(|(i, v)| map_edge(i, v, defaults))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SchemaDraft { nodes, edges })
}

/// Substring from the first `{` through the last `}`.
///
/// `None` when either brace is missing. A closing brace that only appears
/// before the first opening one yields an empty span, which then fails to
/// decode.
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return Some("");
    }
    Some(&raw[start..=end])
}

fn records<'a>(root: &'a Object, key: &str) -> Result<&'a [Value], NormalizeError> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(NormalizeError::ExtractionFailed(format!(
            "`{}` must be an array, got {}",
            key,
            kind_of(other)
        ))),
    }
}

fn map_node(index: usize, value: &Value, defaults: &DraftDefaults) -> Result<Node, NormalizeError> {
    let obj = as_record(value, "node", index)?;

    let empty = Object::new();
    let data = match obj.get("data") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(data)) => data,
        Some(other) => {
            return Err(NormalizeError::ExtractionFailed(format!(
                "node {}: `data` must be an object, got {}",
                index,
                kind_of(other)
            )))
        }
    };

    let fallback = Position::diagonal(index);
    let position = match obj.get("position").and_then(Value::as_object) {
        Some(pos) => Position {
            x: int_or(pos, "x", fallback.x),
            y: int_or(pos, "y", fallback.y),
        },
        None => fallback,
    };

    Ok(Node {
        id: str_or(obj, "id", || format!("node_{}", index)),
        kind: str_or(obj, "type", || defaults.node_kind.clone()),
        data: NodeData {
            label: str_or(data, "label", || UNKNOWN_LABEL.to_string()),
            category: str_or(data, "category", || DEFAULT_CATEGORY.to_string()),
            props: props(data, index)?,
        },
        position,
    })
}

fn map_edge(index: usize, value: &Value, defaults: &DraftDefaults) -> Result<Edge, NormalizeError> {
    let obj = as_record(value, "edge", index)?;

    Ok(Edge {
        id: str_or(obj, "id", || format!("edge_{}", index)),
        source: str_or(obj, "source", String::new),
        target: str_or(obj, "target", String::new),
        label: str_or(obj, "label", String::new),
        animated: bool_or(obj, "animated", true),
        kind: str_or(obj, "type", || defaults.edge_kind.clone()),
    })
}

fn as_record<'a>(value: &'a Value, what: &str, index: usize) -> Result<&'a Object, NormalizeError> {
    value.as_object().ok_or_else(|| {
        NormalizeError::ExtractionFailed(format!(
            "{} {} must be an object, got {}",
            what,
            index,
            kind_of(value)
        ))
    })
}

fn props(data: &Object, index: usize) -> Result<Vec<String>, NormalizeError> {
    let Some(items) = data.get("props").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .enumerate()
        .map(|(j, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                NormalizeError::ExtractionFailed(format!(
                    "node {}: props[{}] must be a string, got {}",
                    index,
                    j,
                    kind_of(item)
                ))
            })
        })
        .collect()
}

// --- Optional-field accessors ---

fn str_or(obj: &Object, key: &str, default: impl FnOnce() -> String) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(default)
}

fn bool_or(obj: &Object, key: &str, default: bool) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Integers pass as-is; integral floats like `250.0` are accepted too.
fn int_or(obj: &Object, key: &str, default: i64) -> i64 {
    let Some(Value::Number(n)) = obj.get(key) else {
        return default;
    };
    n.as_i64()
        .or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .unwrap_or(default)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
