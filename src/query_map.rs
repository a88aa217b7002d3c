//! Flattening of plain objects into query parameters.

use crate::api::default_expander;
use crate::error::{Error, Result};
use serde_json::Value;

/// Turns a query-map argument into name/value pairs. The order of resulting
/// entries is not guaranteed.
pub trait QueryMapEncoder: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<(String, String)>>;
}

/// Flattens an object's fields into query pairs: null fields are skipped,
/// scalar fields render in their natural string form, array fields yield one
/// pair per element, and nested objects render as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldQueryMapEncoder;

impl QueryMapEncoder for FieldQueryMapEncoder {
    fn encode(&self, value: &Value) -> Result<Vec<(String, String)>> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Vec::new()),
            other => {
                return Err(Error::Encode(format!(
                    "query map parameter must be an object, got {other}"
                )));
            }
        };
        let mut pairs = Vec::with_capacity(map.len());
        for (name, field) in map {
            match field {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        pairs.push((name.clone(), default_expander(item)));
                    }
                }
                other => pairs.push((name.clone(), default_expander(other))),
            }
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_scalars_and_skips_nulls() {
        let pairs = FieldQueryMapEncoder
            .encode(&json!({"page": 2, "q": "rust", "skip": null, "strict": true}))
            .unwrap();
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert!(pairs.contains(&("q".to_string(), "rust".to_string())));
        assert!(pairs.contains(&("strict".to_string(), "true".to_string())));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn arrays_yield_one_pair_per_element() {
        let pairs = FieldQueryMapEncoder
            .encode(&json!({"tag": ["a", "b"]}))
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string())
            ]
        );
    }

    #[test]
    fn null_argument_contributes_nothing() {
        assert!(FieldQueryMapEncoder.encode(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn non_object_argument_is_an_encode_error() {
        let err = FieldQueryMapEncoder.encode(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }
}
