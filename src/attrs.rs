//! Attribute-bag codec helpers.
//!
//! The host carries every nested block as a JSON array, even blocks that hold
//! at most one item. Resource models use these serde adapters so a block can
//! be an `Option<T>` or a `T` in Rust while staying a list on the wire:
//!
//! ```
//! use hemmer_provider_iot::attrs;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Schedule {
//!     expression: String,
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct Trigger {
//!     #[serde(default, with = "attrs::single_block")]
//!     schedule: Option<Schedule>,
//! }
//!
//! let trigger: Trigger =
//!     serde_json::from_value(serde_json::json!({"schedule": [{"expression": "rate(1 day)"}]}))
//!         .unwrap();
//! assert_eq!(trigger.schedule.unwrap().expression, "rate(1 day)");
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

/// A block holding zero or one item, stored as `Option<T>`.
///
/// `null`, a missing key and `[]` all decode to `None`.
pub mod single_block {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(value.iter())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let mut items = Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default();
        match items.len() {
            0 | 1 => Ok(items.pop()),
            n => Err(D::Error::custom(format!(
                "expected at most one block, got {}",
                n
            ))),
        }
    }
}

/// A block holding exactly one item, stored as `T`.
pub mod required_block {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(std::iter::once(value))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let mut items = Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default();
        match (items.pop(), items.is_empty()) {
            (Some(item), true) => Ok(item),
            (None, _) => Err(D::Error::custom("expected exactly one block, got none")),
            (Some(_), false) => Err(D::Error::custom(format!(
                "expected exactly one block, got {}",
                items.len() + 1
            ))),
        }
    }
}

/// Decode a block list where `null` means no items.
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Drop empty strings, which the host uses for unset optional strings.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Drop integers below one, which the host uses for unset optional counts.
pub fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v >= 1)
}

/// Decode an attribute bag into a resource model.
pub fn decode<T: DeserializeOwned>(resource_type: &str, value: &Value) -> Result<T, ProviderError> {
    T::deserialize(value)
        .map_err(|e| ProviderError::Validation(format!("{}: {}", resource_type, e)))
}

/// Encode a resource model as an attribute bag.
pub fn encode<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Destination {
        bucket: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Rule {
        #[serde(default)]
        entry_name: Option<String>,
        #[serde(with = "required_block")]
        destination: Destination,
        #[serde(default, with = "single_block")]
        glue: Option<Destination>,
        #[serde(default, deserialize_with = "null_as_empty")]
        tags: Vec<Destination>,
    }

    #[test]
    fn test_single_block_absent_null_and_empty() {
        for glue in [json!(null), json!([])] {
            let rule: Rule = serde_json::from_value(json!({
                "destination": [{"bucket": "b"}],
                "glue": glue
            }))
            .unwrap();
            assert_eq!(rule.glue, None);
        }

        let rule: Rule = serde_json::from_value(json!({"destination": [{"bucket": "b"}]})).unwrap();
        assert_eq!(rule.glue, None);
        assert!(rule.tags.is_empty());
    }

    #[test]
    fn test_single_block_rejects_two_items() {
        let err = serde_json::from_value::<Rule>(json!({
            "destination": [{"bucket": "b"}],
            "glue": [{"bucket": "x"}, {"bucket": "y"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("at most one block"));
    }

    #[test]
    fn test_required_block() {
        let err = serde_json::from_value::<Rule>(json!({"destination": []})).unwrap_err();
        assert!(err.to_string().contains("got none"));

        let err = serde_json::from_value::<Rule>(json!({
            "destination": [{"bucket": "a"}, {"bucket": "b"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn test_blocks_encode_as_lists() {
        let rule = Rule {
            entry_name: None,
            destination: Destination {
                bucket: "b".to_string(),
            },
            glue: None,
            tags: vec![],
        };
        assert_eq!(
            encode(&rule).unwrap(),
            json!({
                "entry_name": null,
                "destination": [{"bucket": "b"}],
                "glue": [],
                "tags": []
            })
        );
    }

    #[test]
    fn test_filters() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("raw/".to_string())), Some("raw/".to_string()));
        assert_eq!(positive(Some(0)), None);
        assert_eq!(positive(Some(-3)), None);
        assert_eq!(positive(Some(30)), Some(30));
        assert_eq!(positive(None), None);
    }

    #[test]
    fn test_decode_maps_to_validation_error() {
        let err = decode::<Rule>("aws_iotanalytics_dataset", &json!({"entry_name": 4})).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.to_string().starts_with("Validation error: aws_iotanalytics_dataset:"));
    }
}
