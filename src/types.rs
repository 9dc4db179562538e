//! Plan results, attribute changes and handshake constants.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::{Attribute, Block, BlockNestingMode, NestedBlock, Schema};

/// A change to a single top-level attribute or block during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute or block name.
    pub path: String,
    /// The value before the change (`None` if it was unset).
    pub before: Option<Value>,
    /// The value after the change (`None` if it becomes unset).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// A value that is being set.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// A value that is being unset.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// A value that is being replaced.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

fn optional_json(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(bytes).ok()
    }
}

fn json_bytes(value: Option<Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(&v).ok())
        .unwrap_or_default()
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            path: proto.path,
            before: optional_json(&proto.before),
            after: optional_json(&proto.after),
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: json_bytes(change.before),
            after: json_bytes(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The state expected after apply (`null` for a destroy).
    pub planned_state: Value,
    /// Changed attributes and blocks, in name order.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource must be destroyed and created again.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Diff `proposed` against `prior` using `schema`.
    ///
    /// - `prior == None` plans a create; a null `proposed` plans a destroy.
    /// - Null, absent and `[]` are the same value for a block. `Set` blocks
    ///   ignore item order at every nesting level.
    /// - Attributes marked `empty_is_unset` compare `""` and integers below
    ///   one as absent.
    /// - Computed-only attributes are not compared. Their prior values are
    ///   carried into the planned state unless the resource is replaced.
    /// - Any change to a `force_new` attribute requires replacement.
    pub fn compute(
        schema: &Schema,
        prior: Option<&Value>,
        proposed: &Value,
    ) -> Result<Self, ProviderError> {
        let prior = match prior {
            Some(Value::Null) | None => None,
            Some(Value::Object(obj)) => Some(obj),
            Some(_) => {
                return Err(ProviderError::InvalidRequest(
                    "prior state must be an object".to_string(),
                ))
            },
        };

        let proposed = match proposed {
            Value::Null => return Ok(Self::destroy(prior)),
            Value::Object(obj) => obj,
            _ => {
                return Err(ProviderError::InvalidRequest(
                    "proposed state must be an object".to_string(),
                ))
            },
        };

        let empty = Map::new();
        let before_obj = prior.unwrap_or(&empty);
        let mut changes = Vec::new();
        let mut requires_replace = false;

        for (name, attr) in &schema.block.attributes {
            if attr.flags.is_computed_only() {
                continue;
            }
            if comparable(attr, before_obj.get(name)) != comparable(attr, proposed.get(name)) {
                let before = scalar(before_obj.get(name));
                let after = scalar(proposed.get(name));
                if attr.force_new && prior.is_some() {
                    requires_replace = true;
                }
                changes.push(AttributeChange::new(name.clone(), before, after));
            }
        }

        for (name, nested) in &schema.block.blocks {
            let before = before_obj.get(name);
            let after = proposed.get(name);
            if normalized_items(nested, before) != normalized_items(nested, after) {
                changes.push(AttributeChange::new(
                    name.clone(),
                    non_empty(block_items(before)),
                    non_empty(block_items(after)),
                ));
            }
        }
        changes.sort_by(|a, b| a.path.cmp(&b.path));

        let mut planned = proposed.clone();
        for (name, attr) in &schema.block.attributes {
            if !attr.flags.is_computed_only() {
                continue;
            }
            match prior.and_then(|p| p.get(name)) {
                Some(value) if !requires_replace => {
                    planned.insert(name.clone(), value.clone());
                },
                _ => {
                    planned.insert(name.clone(), Value::Null);
                },
            }
        }

        Ok(Self {
            planned_state: Value::Object(planned),
            changes,
            requires_replace,
        })
    }

    fn destroy(prior: Option<&Map<String, Value>>) -> Self {
        let changes = prior
            .map(|obj| {
                let mut changes: Vec<_> = obj
                    .iter()
                    .filter(|(_, v)| !is_empty_value(v))
                    .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                    .collect();
                changes.sort_by(|a, b| a.path.cmp(&b.path));
                changes
            })
            .unwrap_or_default();

        Self {
            planned_state: Value::Null,
            changes,
            requires_replace: false,
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn scalar(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

fn block_items(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn non_empty(items: Vec<Value>) -> Option<Value> {
    if items.is_empty() {
        None
    } else {
        Some(Value::Array(items))
    }
}

/// The value an attribute is compared by, with unset values as `None`.
fn comparable(attr: &Attribute, value: Option<&Value>) -> Option<Value> {
    let value = value.filter(|v| !v.is_null())?;
    if attr.empty_is_unset && is_zero_like(value) {
        return None;
    }
    Some(value.clone())
}

fn is_zero_like(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_i64().is_some_and(|n| n < 1),
        _ => false,
    }
}

/// Items of a nested block in canonical form. Set items are sorted, so two
/// sets holding the same items compare equal whatever their order. Items
/// with every value unset are dropped unless the block has no fields, since
/// then the item's presence is the value.
fn normalized_items(nested: &NestedBlock, value: Option<&Value>) -> Vec<Value> {
    let has_fields = !nested.block.attributes.is_empty() || !nested.block.blocks.is_empty();
    let mut items: Vec<Value> = block_items(value)
        .iter()
        .map(|item| normalized_block(&nested.block, item))
        .filter(|item| !has_fields || item.as_object().is_some_and(|obj| !obj.is_empty()))
        .collect();
    if nested.nesting_mode == BlockNestingMode::Set {
        items.sort_by_cached_key(|item| item.to_string());
    }
    items
}

fn normalized_block(block: &Block, item: &Value) -> Value {
    let mut out = Map::new();
    for (name, attr) in &block.attributes {
        if attr.flags.is_computed_only() {
            continue;
        }
        if let Some(value) = comparable(attr, item.get(name)) {
            out.insert(name.clone(), value);
        }
    }
    for (name, nested) in &block.blocks {
        let items = normalized_items(nested, item.get(name));
        if !items.is_empty() {
            out.insert(name.clone(), Value::Array(items));
        }
    }
    Value::Object(out)
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider plans destroy operations.
    pub plan_destroy: bool,
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix printed on stdout.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock};
    use serde_json::json;

    fn channel_like_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("arn", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_block(
                "retention_period",
                NestedBlock::at_most_one(
                    Block::new().with_attribute("unlimited", Attribute::optional_bool()),
                ),
            )
            .with_block(
                "trigger",
                NestedBlock::set(Block::new().with_attribute("expression", Attribute::optional_string())),
            )
    }

    fn prior() -> Value {
        json!({
            "id": "telemetry",
            "arn": "arn:aws:iotanalytics:us-east-1:123456789012:channel/telemetry",
            "name": "telemetry",
            "retention_period": [{"unlimited": true}],
            "trigger": [{"expression": "rate(1 hour)"}, {"expression": "rate(1 day)"}]
        })
    }

    #[test]
    fn test_attribute_change_conversion() {
        let change = AttributeChange::modified("name", json!("old"), json!("new"));
        let proto: crate::generated::AttributeChange = change.clone().into();
        assert_eq!(proto.path, "name");
        let back: AttributeChange = proto.into();
        assert_eq!(back, change);

        let proto: crate::generated::AttributeChange =
            AttributeChange::added("name", json!("x")).into();
        assert!(proto.before.is_empty());
    }

    #[test]
    fn test_plan_create() {
        let plan = PlanResult::compute(
            &channel_like_schema(),
            None,
            &json!({"name": "telemetry", "retention_period": [{"unlimited": true}]}),
        )
        .unwrap();

        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "retention_period"]);
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
    }

    #[test]
    fn test_plan_no_change_carries_computed() {
        let mut proposed = prior();
        proposed["id"] = Value::Null;
        proposed["arn"] = Value::Null;
        proposed["trigger"] = json!([{"expression": "rate(1 day)"}, {"expression": "rate(1 hour)"}]);

        let plan = PlanResult::compute(&channel_like_schema(), Some(&prior()), &proposed).unwrap();

        assert!(plan.changes.is_empty(), "{:?}", plan.changes);
        assert_eq!(plan.planned_state["id"], "telemetry");
        assert_eq!(
            plan.planned_state["arn"],
            "arn:aws:iotanalytics:us-east-1:123456789012:channel/telemetry"
        );
    }

    #[test]
    fn test_plan_null_block_equals_empty() {
        let mut before = prior();
        before["retention_period"] = json!([]);
        let mut proposed = prior();
        proposed["retention_period"] = Value::Null;

        let plan = PlanResult::compute(&channel_like_schema(), Some(&before), &proposed).unwrap();
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_plan_block_change_updates_in_place() {
        let mut proposed = prior();
        proposed["retention_period"] = json!([{"unlimited": false}]);

        let plan = PlanResult::compute(&channel_like_schema(), Some(&prior()), &proposed).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "retention_period");
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], "telemetry");
    }

    #[test]
    fn test_plan_force_new_replaces() {
        let mut proposed = prior();
        proposed["name"] = json!("telemetry-v2");

        let plan = PlanResult::compute(&channel_like_schema(), Some(&prior()), &proposed).unwrap();
        assert!(plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_eq!(plan.planned_state["arn"], Value::Null);
    }

    #[test]
    fn test_plan_destroy() {
        let plan =
            PlanResult::compute(&channel_like_schema(), Some(&prior()), &Value::Null).unwrap();
        assert_eq!(plan.planned_state, Value::Null);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
        assert!(plan.changes.iter().any(|c| c.path == "name"));
    }

    fn versioned_schema() -> Schema {
        let entry = Block::new()
            .with_attribute("id", Attribute::required_string())
            .with_attribute("space", Attribute::optional_int64().with_empty_as_unset());
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("label", Attribute::optional_string().with_empty_as_unset())
            .with_block(
                "version",
                NestedBlock::at_most_one(Block::new().with_block("entry", NestedBlock::set(entry))),
            )
    }

    #[test]
    fn test_plan_nested_set_ignores_order() {
        let prior = json!({
            "id": "d-1",
            "version": [{"entry": [{"id": "a", "space": 5}, {"id": "b"}]}]
        });
        let proposed = json!({
            "version": [{"entry": [{"id": "b"}, {"id": "a", "space": 5}]}]
        });

        let plan = PlanResult::compute(&versioned_schema(), Some(&prior), &proposed).unwrap();
        assert!(plan.changes.is_empty(), "{:?}", plan.changes);

        let proposed = json!({
            "version": [{"entry": [{"id": "b"}, {"id": "a", "space": 6}]}]
        });
        let plan = PlanResult::compute(&versioned_schema(), Some(&prior), &proposed).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "version");
    }

    #[test]
    fn test_plan_empty_values_match_unset_state() {
        let prior = json!({
            "id": "d-1",
            "label": null,
            "version": [{"entry": [{"id": "a", "space": null}]}]
        });
        let proposed = json!({
            "label": "",
            "version": [{"entry": [{"id": "a", "space": 0}]}]
        });

        let plan = PlanResult::compute(&versioned_schema(), Some(&prior), &proposed).unwrap();
        assert!(plan.changes.is_empty(), "{:?}", plan.changes);

        let proposed = json!({"label": "edge", "version": [{"entry": [{"id": "a"}]}]});
        let plan = PlanResult::compute(&versioned_schema(), Some(&prior), &proposed).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "label");
        assert_eq!(plan.changes[0].after, Some(json!("edge")));
    }

    #[test]
    fn test_plan_rejects_non_object() {
        assert!(PlanResult::compute(&channel_like_schema(), None, &json!("x")).is_err());
    }

    #[test]
    fn test_protocol_constants() {
        assert_eq!(PROTOCOL_VERSION, 1);
        assert_eq!(HANDSHAKE_PREFIX, "HEMMER_PROVIDER");
    }
}
