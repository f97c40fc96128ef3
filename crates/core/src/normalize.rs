//! Normalization of the `services` value into the canonical map.
//!
//! Different upstream tools hand us the same logical content in different
//! encodings: a Dhall-to-JSON pipeline emits an array of `mapKey`/`mapValue`
//! entries, `jq to_entries` emits `key`/`value` objects, hand-written JSON
//! is usually already an object map, and some generators emit plain
//! `[key, record]` tuples. This module folds all four into one
//! [`ServiceMap`] so the rest of the engine never sees an array encoding.
//!
//! # Shape detection
//!
//! The top-level JSON type is inspected first. An object is Shape A and is
//! copied as-is. An empty array normalizes to the empty map. A non-empty
//! array is disambiguated by its first element: an object with `mapKey` and
//! `mapValue` fields is Shape B, an object with `key` and `value` fields is
//! Shape C, a 2-element array is Shape D. Anything else is fatal.
//!
//! Normalization is pure: all four shapes of equal logical content produce
//! identical maps, and no record field is altered on the way through.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::{ServiceKey, ServiceMap, ServiceRecord, ServicesDoc};

/// The input encoding detected for a `services` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
  /// Object map `{key: record}`.
  Object,
  /// Array of `{"mapKey": k, "mapValue": v}` (Dhall map encoding).
  DhallEntries,
  /// Array of `{"key": k, "value": v}` (jq `to_entries` encoding).
  KeyValueEntries,
  /// Array of `[k, v]` pairs.
  Tuples,
}

impl Shape {
  pub fn as_str(self) -> &'static str {
    match self {
      Shape::Object => "object",
      Shape::DhallEntries => "dhall-entries",
      Shape::KeyValueEntries => "key-value-entries",
      Shape::Tuples => "tuples",
    }
  }
}

/// Errors raised while normalizing a `services` value.
#[derive(Debug, Error)]
pub enum NormalizeError {
  /// The document has no `services` field at all.
  #[error("document has no 'services' field")]
  MissingServices,

  /// The top-level `services` value is neither an object nor an array.
  #[error("unrecognized 'services' shape: expected object or array, found {found}")]
  UnsupportedShape { found: &'static str },

  /// An array element doesn't match any of the supported entry encodings.
  #[error("unrecognized 'services' array element at index {index}: {detail}")]
  UnsupportedElement { index: usize, detail: String },

  /// The same key appeared twice; keys must be unique within a map.
  #[error("duplicate service key '{key}'")]
  DuplicateKey { key: ServiceKey },

  /// An entry's record failed to deserialize.
  #[error("invalid record for service '{key}': {source}")]
  InvalidRecord {
    key: ServiceKey,
    #[source]
    source: serde_json::Error,
  },
}

/// Name of a JSON value's type, for diagnostics.
fn json_type(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Parse a full services document, normalizing its `services` field.
///
/// Top-level fields other than `services` are preserved verbatim in
/// [`ServicesDoc::rest`].
pub fn parse_document(doc: Value) -> Result<ServicesDoc, NormalizeError> {
  let Value::Object(mut fields) = doc else {
    return Err(NormalizeError::UnsupportedShape {
      found: json_type(&doc),
    });
  };

  let services = fields
    .remove("services")
    .ok_or(NormalizeError::MissingServices)?;

  Ok(ServicesDoc {
    services: normalize(services)?,
    rest: fields,
  })
}

/// Normalize a `services` value in any of the four supported shapes.
pub fn normalize(value: Value) -> Result<ServiceMap, NormalizeError> {
  let (shape, map) = match value {
    Value::Object(fields) => {
      let entries = fields.into_iter().map(|(k, v)| (Value::String(k), v));
      (Shape::Object, collect_entries(entries)?)
    }
    Value::Array(items) if items.is_empty() => (Shape::Object, ServiceMap::new()),
    Value::Array(items) => {
      let shape = detect_array_shape(&items[0])?;
      let entries = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| split_entry(shape, index, item))
        .collect::<Result<Vec<_>, _>>()?;
      (shape, collect_entries(entries.into_iter())?)
    }
    other => {
      return Err(NormalizeError::UnsupportedShape {
        found: json_type(&other),
      });
    }
  };

  debug!(shape = shape.as_str(), services = map.len(), "normalized services");
  Ok(map)
}

/// Decide which array encoding is in play from the first element.
fn detect_array_shape(first: &Value) -> Result<Shape, NormalizeError> {
  match first {
    Value::Object(fields) if fields.contains_key("mapKey") && fields.contains_key("mapValue") => {
      Ok(Shape::DhallEntries)
    }
    Value::Object(fields) if fields.contains_key("key") && fields.contains_key("value") => {
      Ok(Shape::KeyValueEntries)
    }
    Value::Array(pair) if pair.len() == 2 => Ok(Shape::Tuples),
    Value::Array(pair) => Err(NormalizeError::UnsupportedElement {
      index: 0,
      detail: format!("expected a 2-element array, found {} elements", pair.len()),
    }),
    other => Err(NormalizeError::UnsupportedElement {
      index: 0,
      detail: format!(
        "expected a mapKey/mapValue object, a key/value object, or a 2-element array, found {}",
        json_type(other)
      ),
    }),
  }
}

/// Pull the `(key, record)` pair out of one array element.
fn split_entry(shape: Shape, index: usize, item: Value) -> Result<(Value, Value), NormalizeError> {
  let (key_field, value_field) = match shape {
    Shape::DhallEntries => ("mapKey", "mapValue"),
    Shape::KeyValueEntries => ("key", "value"),
    Shape::Tuples => {
      let Value::Array(pair) = item else {
        return Err(NormalizeError::UnsupportedElement {
          index,
          detail: format!("expected a 2-element array, found {}", json_type(&item)),
        });
      };
      let mut pair = pair;
      if pair.len() != 2 {
        return Err(NormalizeError::UnsupportedElement {
          index,
          detail: format!("expected a 2-element array, found {} elements", pair.len()),
        });
      }
      let value = pair.pop().unwrap_or(Value::Null);
      let key = pair.pop().unwrap_or(Value::Null);
      return Ok((key, value));
    }
    Shape::Object => unreachable!("object shape has no array elements"),
  };

  let Value::Object(mut fields) = item else {
    return Err(NormalizeError::UnsupportedElement {
      index,
      detail: format!(
        "expected an object with '{key_field}'/'{value_field}', found {}",
        json_type(&item)
      ),
    });
  };

  match (fields.remove(key_field), fields.remove(value_field)) {
    (Some(key), Some(value)) => Ok((key, value)),
    _ => Err(NormalizeError::UnsupportedElement {
      index,
      detail: format!("missing '{key_field}' or '{value_field}' field"),
    }),
  }
}

/// Build the map, deserializing records and rejecting duplicate keys.
fn collect_entries(
  entries: impl Iterator<Item = (Value, Value)>,
) -> Result<ServiceMap, NormalizeError> {
  let mut map = ServiceMap::new();

  for (index, (key, value)) in entries.enumerate() {
    let Value::String(key) = key else {
      return Err(NormalizeError::UnsupportedElement {
        index,
        detail: format!("service key must be a string, found {}", json_type(&key)),
      });
    };
    let key = ServiceKey(key);

    let record: ServiceRecord =
      serde_json::from_value(value).map_err(|source| NormalizeError::InvalidRecord {
        key: key.clone(),
        source,
      })?;

    if map.insert(key.clone(), record).is_some() {
      return Err(NormalizeError::DuplicateKey { key });
    }
  }

  Ok(map)
}
