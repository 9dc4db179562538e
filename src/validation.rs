//! Attribute bag validation.
//!
//! Checks a `serde_json::Value` against a [`Schema`] and reports every problem
//! as an error [`Diagnostic`] carrying the attribute path, e.g.
//! `storage.0.customer_managed_s3.0.role_arn`.
//!
//! ```
//! use hemmer_provider_iot::schema::{Attribute, Schema, ValueConstraint};
//! use hemmer_provider_iot::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "role_arn",
//!         Attribute::optional_string().with_constraint(ValueConstraint::Arn),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "telemetry"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "telemetry", "role_arn": "role"}));
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("role_arn"));
//! ```

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::schema::{
    Attribute, AttributeType, Block, Diagnostic, NestedBlock, Schema, ValueConstraint,
};

/// Validate a value against a schema, returning one diagnostic per problem.
///
/// - required attributes must be present and non-null
/// - computed-only attributes are skipped
/// - types, value constraints and `conflicts_with` are enforced
/// - nested blocks are checked recursively against their item bounds
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Like [`validate`], but as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diag =
                Diagnostic::error("Expected object").with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested, obj.get(name), &block_path, diagnostics);
    }

    validate_conflicts(block, obj, path, diagnostics);
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            if validate_attribute_type(&attr.attr_type, v, path, diagnostics) {
                for constraint in &attr.constraints {
                    validate_constraint(constraint, v, path, diagnostics);
                }
            }
        },
    }
}

/// Returns whether the value had the expected type.
fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let (ok, expected) = match attr_type {
        AttributeType::String => (value.is_string(), "string"),
        AttributeType::Int64 => (as_int64(value).is_some(), "int64"),
        AttributeType::Float64 => (value.is_number(), "float64"),
        AttributeType::Bool => (value.is_boolean(), "bool"),
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                let before = diagnostics.len();
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, item, &item_path, diagnostics);
                }
                return diagnostics.len() == before;
            },
            None => (false, "list"),
        },
    };

    if !ok {
        diagnostics.push(type_error(path, expected, value));
    }
    ok
}

fn validate_constraint(
    constraint: &ValueConstraint,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constraint {
        ValueConstraint::IntAtLeast(min) => {
            if let Some(n) = as_int64(value) {
                if n < *min {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!("Expected at least {}, got {}", min, n))
                            .with_attribute(path),
                    );
                }
            }
        },
        ValueConstraint::OneOf(allowed) => {
            if let Some(s) = value.as_str() {
                if !allowed.iter().any(|a| a == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!(
                                "Expected one of [{}], got {:?}",
                                allowed.join(", "),
                                s
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
        ValueConstraint::Arn => {
            if let Some(s) = value.as_str() {
                if !is_arn(s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid ARN for attribute '{}'", path))
                            .with_detail(format!(
                                "Expected arn:partition:service:region:account:resource, got {:?}",
                                s
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let items: &[Value] = match value {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items.as_slice(),
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
            return;
        },
    };

    let len = items.len() as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }

    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}.{}", path, i);
        validate_block(&nested.block, item, &item_path, diagnostics);
    }
}

fn validate_conflicts(
    block: &Block,
    obj: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let declared = block
        .attributes
        .iter()
        .map(|(name, attr)| (name, &attr.conflicts_with))
        .chain(
            block
                .blocks
                .iter()
                .map(|(name, nested)| (name, &nested.conflicts_with)),
        );

    let mut reported = BTreeSet::new();
    for (name, conflicts) in declared {
        if !is_set(obj.get(name)) {
            continue;
        }
        for other in conflicts {
            if !is_set(obj.get(other)) {
                continue;
            }
            let pair = if name < other {
                (name.as_str(), other.as_str())
            } else {
                (other.as_str(), name.as_str())
            };
            if reported.insert(pair) {
                let first = join_path(path, pair.0);
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Conflicting attributes '{}' and '{}'",
                        first,
                        join_path(path, pair.1)
                    ))
                    .with_detail("Only one of these may be set")
                    .with_attribute(first),
                );
            }
        }
    }
}

/// A value counts as set unless it is absent, null or an empty block list.
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn is_arn(s: &str) -> bool {
    let parts: Vec<&str> = s.splitn(6, ':').collect();
    parts.len() == 6
        && parts[0] == "arn"
        && !parts[1].is_empty()
        && !parts[2].is_empty()
        && !parts[5].is_empty()
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integers may arrive as whole floats (`42.0`).
fn as_int64(value: &Value) -> Option<i64> {
    let n = match value {
        Value::Number(n) => n,
        _ => return None,
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    fn retention_schema() -> Schema {
        Schema::v0().with_block(
            "retention_period",
            NestedBlock::at_most_one(
                Block::new()
                    .with_attribute(
                        "number_of_days",
                        Attribute::optional_int64()
                            .with_conflicts_with(&["unlimited"])
                            .with_constraint(ValueConstraint::IntAtLeast(1)),
                    )
                    .with_attribute(
                        "unlimited",
                        Attribute::optional_bool().with_conflicts_with(&["number_of_days"]),
                    ),
            ),
        )
    }

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "telemetry"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("arn", Attribute::computed_string());
        assert!(validate(&schema, &json!({"arn": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64_accepts_whole_floats() {
        let schema = Schema::v0().with_attribute("count", Attribute::required_int64());

        assert!(validate(&schema, &json!({"count": 42})).is_empty());
        assert!(validate(&schema, &json!({"count": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"count": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"count": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_list_of_int64() {
        let schema = Schema::v0().with_attribute(
            "delays",
            Attribute::new(
                AttributeType::list(AttributeType::Int64),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"delays": [1, 2, 5]})).is_empty());
        let diagnostics = validate(&schema, &json!({"delays": [1, "two"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("delays.1"));
    }

    #[test]
    fn test_int_at_least() {
        let diagnostics = validate(
            &retention_schema(),
            &json!({"retention_period": [{"number_of_days": 0}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("retention_period.0.number_of_days")
        );

        assert!(validate(
            &retention_schema(),
            &json!({"retention_period": [{"number_of_days": 1}]})
        )
        .is_empty());
    }

    #[test]
    fn test_conflicting_attributes_reported_once() {
        let diagnostics = validate(
            &retention_schema(),
            &json!({"retention_period": [{"number_of_days": 30, "unlimited": true}]}),
        );

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Conflicting attributes"));
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("retention_period.0.number_of_days")
        );
    }

    #[test]
    fn test_unset_sibling_does_not_conflict() {
        assert!(validate(
            &retention_schema(),
            &json!({"retention_period": [{"number_of_days": 30, "unlimited": null}]})
        )
        .is_empty());
    }

    #[test]
    fn test_conflicting_blocks() {
        let schema = Schema::v0().with_block(
            "storage",
            NestedBlock::at_most_one(
                Block::new()
                    .with_block(
                        "customer_managed_s3",
                        NestedBlock::at_most_one(
                            Block::new().with_attribute("bucket", Attribute::required_string()),
                        )
                        .with_conflicts_with(&["service_managed_s3"]),
                    )
                    .with_block(
                        "service_managed_s3",
                        NestedBlock::at_most_one(Block::new())
                            .with_conflicts_with(&["customer_managed_s3"]),
                    ),
            ),
        );

        let diagnostics = validate(
            &schema,
            &json!({"storage": [{
                "customer_managed_s3": [{"bucket": "b"}],
                "service_managed_s3": [{}]
            }]}),
        );
        assert_eq!(diagnostics.len(), 1);

        assert!(validate(
            &schema,
            &json!({"storage": [{"customer_managed_s3": [{"bucket": "b"}], "service_managed_s3": []}]})
        )
        .is_empty());
    }

    #[test]
    fn test_one_of() {
        let schema = Schema::v0().with_attribute(
            "level",
            Attribute::required_string()
                .with_constraint(ValueConstraint::one_of(&["DEBUG", "INFO", "WARN"])),
        );

        assert!(validate(&schema, &json!({"level": "INFO"})).is_empty());
        let diagnostics = validate(&schema, &json!({"level": "TRACE"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("DEBUG, INFO, WARN"));
    }

    #[test]
    fn test_arn() {
        let schema = Schema::v0().with_attribute(
            "role_arn",
            Attribute::required_string().with_constraint(ValueConstraint::Arn),
        );

        assert!(validate(
            &schema,
            &json!({"role_arn": "arn:aws:iam::123456789012:role/iotanalytics"})
        )
        .is_empty());
        assert_eq!(validate(&schema, &json!({"role_arn": "iotanalytics"})).len(), 1);
        assert_eq!(validate(&schema, &json!({"role_arn": "arn:aws:iam"})).len(), 1);
    }

    #[test]
    fn test_block_item_bounds() {
        let schema = Schema::v0().with_block(
            "action",
            NestedBlock::set(Block::new().with_attribute("name", Attribute::required_string()))
                .with_min_items(1),
        );

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(&schema, &json!({"action": [{}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("action.0.name"));

        let diagnostics = validate(&schema, &json!({"action": {"name": "x"}}));
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_max_items() {
        let schema = Schema::v0().with_block(
            "trigger",
            NestedBlock::set(Block::new()).with_max_items(2),
        );
        let diagnostics = validate(&schema, &json!({"trigger": [{}, {}, {}]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 2"));
    }

    #[test]
    fn test_validate_result() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert!(validate_result(&schema, &json!({"name": "x"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }
}
