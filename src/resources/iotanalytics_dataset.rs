//! `aws_iotanalytics_dataset`: SQL or container actions that produce dataset
//! content, plus delivery rules, triggers and versioning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::iotanalytics_storage::{retention_period_block, RetentionPeriodModel};
use super::{state_id, Resource, ResourceContext};
use crate::api::iotanalytics::{
    ContainerDatasetAction, Dataset, DatasetAction, DatasetContentDeliveryDestination,
    DatasetContentDeliveryRule, DatasetContentVersionValue, DatasetRequest, DatasetTrigger,
    DeltaTime, GlueConfiguration, IotEventsDestinationConfiguration, OutputFileUriValue,
    QueryFilter, ResourceConfiguration, S3DestinationConfiguration, Schedule,
    SqlQueryDatasetAction, Variable, VersioningConfiguration,
};
use crate::attrs::{self, null_as_empty, required_block, single_block};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema, ValueConstraint};

const TYPE_NAME: &str = "aws_iotanalytics_dataset";

/// Compute types accepted by container actions.
pub const COMPUTE_TYPES: &[&str] = &["ACU_1", "ACU_2"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct DatasetModel {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    arn: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    action: Vec<ActionModel>,
    #[serde(default, deserialize_with = "null_as_empty")]
    content_delivery_rule: Vec<ContentDeliveryRuleModel>,
    #[serde(default, with = "single_block")]
    retention_period: Option<RetentionPeriodModel>,
    #[serde(default, deserialize_with = "null_as_empty")]
    trigger: Vec<TriggerModel>,
    #[serde(default, with = "single_block")]
    versioning_configuration: Option<VersioningModel>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct ActionModel {
    name: String,
    #[serde(default, with = "single_block")]
    query_action: Option<QueryActionModel>,
    #[serde(default, with = "single_block")]
    container_action: Option<ContainerActionModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct QueryActionModel {
    sql_query: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    filter: Vec<FilterModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct FilterModel {
    #[serde(with = "required_block")]
    delta_time: DeltaTimeModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct DeltaTimeModel {
    offset_seconds: i64,
    time_expression: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct ContainerActionModel {
    image: String,
    execution_role_arn: String,
    #[serde(with = "required_block")]
    resource_configuration: ResourceConfigurationModel,
    #[serde(default, deserialize_with = "null_as_empty")]
    variable: Vec<VariableModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct ResourceConfigurationModel {
    compute_type: String,
    volume_size_in_gb: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct VariableModel {
    name: String,
    #[serde(default)]
    string_value: Option<String>,
    #[serde(default)]
    double_value: Option<f64>,
    #[serde(default, with = "single_block")]
    dataset_content_version_value: Option<DatasetContentVersionValueModel>,
    #[serde(default, with = "single_block")]
    output_file_uri_value: Option<OutputFileUriValueModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct DatasetContentVersionValueModel {
    dataset_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct OutputFileUriValueModel {
    file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct ContentDeliveryRuleModel {
    #[serde(default)]
    entry_name: Option<String>,
    #[serde(with = "required_block")]
    destination: DestinationModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct DestinationModel {
    #[serde(default, with = "single_block")]
    iotevents_destination: Option<IotEventsDestinationModel>,
    #[serde(default, with = "single_block")]
    s3_destination: Option<S3DestinationModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct IotEventsDestinationModel {
    input_name: String,
    role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct S3DestinationModel {
    bucket: String,
    key: String,
    role_arn: String,
    #[serde(default, with = "single_block")]
    glue_configuration: Option<GlueConfigurationModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct GlueConfigurationModel {
    database_name: String,
    table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct TriggerModel {
    #[serde(default, with = "single_block")]
    schedule: Option<ScheduleModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct ScheduleModel {
    expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct VersioningModel {
    #[serde(default)]
    max_versions: Option<i64>,
    #[serde(default)]
    unlimited: Option<bool>,
}

impl DatasetModel {
    fn to_request(&self) -> DatasetRequest {
        DatasetRequest {
            dataset_name: self.name.clone(),
            actions: self.action.iter().map(ActionModel::to_api).collect(),
            content_delivery_rules: self
                .content_delivery_rule
                .iter()
                .map(ContentDeliveryRuleModel::to_api)
                .collect(),
            triggers: self.trigger.iter().map(TriggerModel::to_api).collect(),
            retention_period: self.retention_period.as_ref().map(RetentionPeriodModel::to_api),
            versioning_configuration: self
                .versioning_configuration
                .as_ref()
                .map(VersioningModel::to_api),
        }
    }

    fn from_api(dataset: Dataset) -> Self {
        Self {
            id: Some(dataset.name.clone()),
            name: dataset.name,
            arn: dataset.arn,
            action: dataset.actions.iter().map(ActionModel::from_api).collect(),
            content_delivery_rule: dataset
                .content_delivery_rules
                .iter()
                .map(ContentDeliveryRuleModel::from_api)
                .collect(),
            retention_period: dataset
                .retention_period
                .as_ref()
                .and_then(RetentionPeriodModel::from_api),
            trigger: dataset.triggers.iter().map(TriggerModel::from_api).collect(),
            versioning_configuration: dataset
                .versioning_configuration
                .as_ref()
                .and_then(VersioningModel::from_api),
        }
    }
}

impl ActionModel {
    fn to_api(&self) -> DatasetAction {
        DatasetAction {
            action_name: self.name.clone(),
            query_action: self.query_action.as_ref().map(|query| SqlQueryDatasetAction {
                sql_query: query.sql_query.clone(),
                filters: query
                    .filter
                    .iter()
                    .map(|filter| QueryFilter {
                        delta_time: DeltaTime {
                            offset_seconds: filter.delta_time.offset_seconds,
                            time_expression: filter.delta_time.time_expression.clone(),
                        },
                    })
                    .collect(),
            }),
            container_action: self.container_action.as_ref().map(|container| {
                ContainerDatasetAction {
                    image: container.image.clone(),
                    execution_role_arn: container.execution_role_arn.clone(),
                    resource_configuration: ResourceConfiguration {
                        compute_type: container.resource_configuration.compute_type.clone(),
                        volume_size_in_gb: container.resource_configuration.volume_size_in_gb,
                    },
                    variables: container.variable.iter().map(VariableModel::to_api).collect(),
                }
            }),
        }
    }

    fn from_api(action: &DatasetAction) -> Self {
        Self {
            name: action.action_name.clone(),
            query_action: action.query_action.as_ref().map(|query| QueryActionModel {
                sql_query: query.sql_query.clone(),
                filter: query
                    .filters
                    .iter()
                    .map(|filter| FilterModel {
                        delta_time: DeltaTimeModel {
                            offset_seconds: filter.delta_time.offset_seconds,
                            time_expression: filter.delta_time.time_expression.clone(),
                        },
                    })
                    .collect(),
            }),
            container_action: action.container_action.as_ref().map(|container| {
                ContainerActionModel {
                    image: container.image.clone(),
                    execution_role_arn: container.execution_role_arn.clone(),
                    resource_configuration: ResourceConfigurationModel {
                        compute_type: container.resource_configuration.compute_type.clone(),
                        volume_size_in_gb: container.resource_configuration.volume_size_in_gb,
                    },
                    variable: container.variables.iter().map(VariableModel::from_api).collect(),
                }
            }),
        }
    }
}

impl VariableModel {
    fn to_api(&self) -> Variable {
        Variable {
            name: self.name.clone(),
            string_value: attrs::non_empty(self.string_value.clone()),
            double_value: self.double_value,
            dataset_content_version_value: self.dataset_content_version_value.as_ref().map(
                |value| DatasetContentVersionValue {
                    dataset_name: value.dataset_name.clone(),
                },
            ),
            output_file_uri_value: self.output_file_uri_value.as_ref().map(|value| {
                OutputFileUriValue {
                    file_name: value.file_name.clone(),
                }
            }),
        }
    }

    fn from_api(variable: &Variable) -> Self {
        Self {
            name: variable.name.clone(),
            string_value: variable.string_value.clone(),
            double_value: variable.double_value,
            dataset_content_version_value: variable.dataset_content_version_value.as_ref().map(
                |value| DatasetContentVersionValueModel {
                    dataset_name: value.dataset_name.clone(),
                },
            ),
            output_file_uri_value: variable.output_file_uri_value.as_ref().map(|value| {
                OutputFileUriValueModel {
                    file_name: value.file_name.clone(),
                }
            }),
        }
    }
}

impl ContentDeliveryRuleModel {
    fn to_api(&self) -> DatasetContentDeliveryRule {
        let destination = &self.destination;
        DatasetContentDeliveryRule {
            entry_name: attrs::non_empty(self.entry_name.clone()),
            destination: DatasetContentDeliveryDestination {
                iot_events_destination_configuration: destination
                    .iotevents_destination
                    .as_ref()
                    .map(|iotevents| IotEventsDestinationConfiguration {
                        input_name: iotevents.input_name.clone(),
                        role_arn: iotevents.role_arn.clone(),
                    }),
                s3_destination_configuration: destination.s3_destination.as_ref().map(|s3| {
                    S3DestinationConfiguration {
                        bucket: s3.bucket.clone(),
                        key: s3.key.clone(),
                        role_arn: s3.role_arn.clone(),
                        glue_configuration: s3.glue_configuration.as_ref().map(|glue| {
                            GlueConfiguration {
                                database_name: glue.database_name.clone(),
                                table_name: glue.table_name.clone(),
                            }
                        }),
                    }
                }),
            },
        }
    }

    fn from_api(rule: &DatasetContentDeliveryRule) -> Self {
        let destination = &rule.destination;
        Self {
            entry_name: rule.entry_name.clone(),
            destination: DestinationModel {
                iotevents_destination: destination
                    .iot_events_destination_configuration
                    .as_ref()
                    .map(|iotevents| IotEventsDestinationModel {
                        input_name: iotevents.input_name.clone(),
                        role_arn: iotevents.role_arn.clone(),
                    }),
                s3_destination: destination.s3_destination_configuration.as_ref().map(|s3| {
                    S3DestinationModel {
                        bucket: s3.bucket.clone(),
                        key: s3.key.clone(),
                        role_arn: s3.role_arn.clone(),
                        glue_configuration: s3.glue_configuration.as_ref().map(|glue| {
                            GlueConfigurationModel {
                                database_name: glue.database_name.clone(),
                                table_name: glue.table_name.clone(),
                            }
                        }),
                    }
                }),
            },
        }
    }
}

impl TriggerModel {
    fn to_api(&self) -> DatasetTrigger {
        DatasetTrigger {
            schedule: self.schedule.as_ref().map(|schedule| Schedule {
                expression: schedule.expression.clone(),
            }),
        }
    }

    fn from_api(trigger: &DatasetTrigger) -> Self {
        Self {
            schedule: trigger.schedule.as_ref().map(|schedule| ScheduleModel {
                expression: schedule.expression.clone(),
            }),
        }
    }
}

impl VersioningModel {
    fn to_api(&self) -> VersioningConfiguration {
        VersioningConfiguration {
            max_versions: attrs::positive(self.max_versions),
            unlimited: self.unlimited,
        }
    }

    fn from_api(versioning: &VersioningConfiguration) -> Option<Self> {
        if versioning.max_versions.is_none() && versioning.unlimited.is_none() {
            return None;
        }
        Some(Self {
            max_versions: versioning.max_versions,
            unlimited: versioning.unlimited,
        })
    }
}

fn action_block() -> NestedBlock {
    let delta_time = Block::new()
        .with_attribute("offset_seconds", Attribute::required_int64())
        .with_attribute("time_expression", Attribute::required_string());

    let query_action = Block::new()
        .with_attribute("sql_query", Attribute::required_string())
        .with_block(
            "filter",
            NestedBlock::list(
                Block::new().with_block("delta_time", NestedBlock::exactly_one(delta_time)),
            ),
        );

    let variable = Block::new()
        .with_attribute("name", Attribute::required_string())
        .with_attribute("string_value", Attribute::optional_string().with_empty_as_unset())
        .with_attribute("double_value", Attribute::optional_float64())
        .with_block(
            "dataset_content_version_value",
            NestedBlock::at_most_one(
                Block::new().with_attribute("dataset_name", Attribute::required_string()),
            ),
        )
        .with_block(
            "output_file_uri_value",
            NestedBlock::at_most_one(
                Block::new().with_attribute("file_name", Attribute::required_string()),
            ),
        );

    let container_action = Block::new()
        .with_attribute("image", Attribute::required_string())
        .with_attribute(
            "execution_role_arn",
            Attribute::required_string().with_constraint(ValueConstraint::Arn),
        )
        .with_block(
            "resource_configuration",
            NestedBlock::exactly_one(
                Block::new()
                    .with_attribute(
                        "compute_type",
                        Attribute::required_string()
                            .with_constraint(ValueConstraint::one_of(COMPUTE_TYPES)),
                    )
                    .with_attribute("volume_size_in_gb", Attribute::required_int64()),
            ),
        )
        .with_block("variable", NestedBlock::list(variable));

    NestedBlock::set(
        Block::new()
            .with_attribute("name", Attribute::required_string())
            .with_block("query_action", NestedBlock::at_most_one(query_action))
            .with_block("container_action", NestedBlock::at_most_one(container_action)),
    )
    .with_min_items(1)
}

fn content_delivery_rule_block() -> NestedBlock {
    let iotevents = Block::new()
        .with_attribute("input_name", Attribute::required_string())
        .with_attribute(
            "role_arn",
            Attribute::required_string().with_constraint(ValueConstraint::Arn),
        );

    let s3 = Block::new()
        .with_attribute("bucket", Attribute::required_string())
        .with_attribute("key", Attribute::required_string())
        .with_attribute(
            "role_arn",
            Attribute::required_string().with_constraint(ValueConstraint::Arn),
        )
        .with_block(
            "glue_configuration",
            NestedBlock::at_most_one(
                Block::new()
                    .with_attribute("database_name", Attribute::required_string())
                    .with_attribute("table_name", Attribute::required_string()),
            ),
        );

    NestedBlock::set(
        Block::new()
            .with_attribute("entry_name", Attribute::optional_string().with_empty_as_unset())
            .with_block(
                "destination",
                NestedBlock::exactly_one(
                    Block::new()
                        .with_block("iotevents_destination", NestedBlock::at_most_one(iotevents))
                        .with_block("s3_destination", NestedBlock::at_most_one(s3)),
                ),
            ),
    )
}

fn trigger_block() -> NestedBlock {
    NestedBlock::set(Block::new().with_block(
        "schedule",
        NestedBlock::at_most_one(
            Block::new().with_attribute("expression", Attribute::required_string()),
        ),
    ))
    .with_max_items(5)
}

fn versioning_configuration_block() -> NestedBlock {
    NestedBlock::at_most_one(
        Block::new()
            .with_attribute(
                "max_versions",
                Attribute::optional_int64()
                    .with_constraint(ValueConstraint::IntAtLeast(1))
                    .with_conflicts_with(&["unlimited"])
                    .with_empty_as_unset(),
            )
            .with_attribute(
                "unlimited",
                Attribute::optional_bool().with_conflicts_with(&["max_versions"]),
            ),
    )
}

/// `aws_iotanalytics_dataset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IotAnalyticsDataset;

impl IotAnalyticsDataset {
    async fn read_by_name(ctx: &ResourceContext, name: &str) -> Result<Value, ProviderError> {
        debug!(dataset = name, "describing dataset");
        let dataset = ctx.iotanalytics.describe_dataset(name).await?;
        attrs::encode(&DatasetModel::from_api(dataset))
    }
}

#[async_trait]
impl Resource for IotAnalyticsDataset {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the dataset")
                    .with_force_new(),
            )
            .with_attribute("arn", Attribute::computed_string())
            .with_block("action", action_block())
            .with_block("content_delivery_rule", content_delivery_rule_block())
            .with_block("retention_period", retention_period_block())
            .with_block("trigger", trigger_block())
            .with_block("versioning_configuration", versioning_configuration_block())
    }

    async fn create(&self, ctx: &ResourceContext, planned: &Value) -> Result<Value, ProviderError> {
        let model: DatasetModel = attrs::decode(TYPE_NAME, planned)?;
        let request = model.to_request();
        debug!(?request, "creating dataset");

        ctx.iotanalytics.create_dataset(&request).await?;
        info!(dataset = %model.name, "created dataset");

        Self::read_by_name(ctx, &model.name).await
    }

    async fn read(&self, ctx: &ResourceContext, state: &Value) -> Result<Value, ProviderError> {
        Self::read_by_name(ctx, &state_id(state)?).await
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        _prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let model: DatasetModel = attrs::decode(TYPE_NAME, planned)?;
        let request = model.to_request();
        debug!(?request, "updating dataset");

        ctx.iotanalytics.update_dataset(&request).await?;

        Self::read_by_name(ctx, &model.name).await
    }

    async fn delete(&self, ctx: &ResourceContext, state: &Value) -> Result<(), ProviderError> {
        let name = state_id(state)?;
        debug!(dataset = %name, "deleting dataset");
        ctx.iotanalytics.delete_dataset(&name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::testing::{assert_error_contains, ProviderHarness};
    use crate::validation::validate;
    use serde_json::json;

    const ROLE: &str = "arn:aws:iam::123456789012:role/dataset";

    fn query_dataset() -> Value {
        json!({
            "name": "hourly",
            "action": [{
                "name": "query",
                "query_action": [{
                    "sql_query": "select * from archive",
                    "filter": [{"delta_time": [{"offset_seconds": -60, "time_expression": "from_unixtime(ts)"}]}]
                }]
            }],
            "content_delivery_rule": [{
                "entry_name": "",
                "destination": [{
                    "s3_destination": [{
                        "bucket": "exports",
                        "key": "hourly/!{iotanalytics:scheduleTime}.csv",
                        "role_arn": ROLE,
                        "glue_configuration": [{"database_name": "iot", "table_name": "hourly"}]
                    }]
                }]
            }],
            "trigger": [{"schedule": [{"expression": "rate(1 hour)"}]}],
            "versioning_configuration": [{"max_versions": null, "unlimited": true}]
        })
    }

    fn container_dataset() -> Value {
        json!({
            "name": "scoring",
            "action": [{
                "name": "score",
                "container_action": [{
                    "image": "123456789012.dkr.ecr.us-east-1.amazonaws.com/score:latest",
                    "execution_role_arn": ROLE,
                    "resource_configuration": [{"compute_type": "ACU_1", "volume_size_in_gb": 2}],
                    "variable": [
                        {"name": "threshold", "double_value": 0.75},
                        {"name": "label", "string_value": "prod"},
                        {"name": "input", "dataset_content_version_value": [{"dataset_name": "hourly"}]},
                        {"name": "output", "output_file_uri_value": [{"file_name": "scores.csv"}]}
                    ]
                }]
            }]
        })
    }

    #[test]
    fn test_request_drops_unset_values() {
        let mut config = query_dataset();
        config["versioning_configuration"] = json!([{"max_versions": 0, "unlimited": null}]);
        let model: DatasetModel = attrs::decode(TYPE_NAME, &config).unwrap();
        let request = model.to_request();

        assert_eq!(request.dataset_name, "hourly");
        assert_eq!(request.content_delivery_rules[0].entry_name, None);
        let versioning = request.versioning_configuration.unwrap();
        assert_eq!(versioning.max_versions, None);
        assert_eq!(versioning.unlimited, None);
        let filters = &request.actions[0].query_action.as_ref().unwrap().filters;
        assert_eq!(filters[0].delta_time.offset_seconds, -60);
    }

    #[test]
    fn test_schema_validation() {
        let schema = IotAnalyticsDataset.schema();
        assert!(validate(&schema, &query_dataset()).is_empty());
        assert!(validate(&schema, &container_dataset()).is_empty());

        let mut no_action = query_dataset();
        no_action["action"] = json!([]);
        let diags = validate(&schema, &no_action);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("action"));

        let mut bad_compute = container_dataset();
        bad_compute["action"][0]["container_action"][0]["resource_configuration"][0]
            ["compute_type"] = json!("ACU_4");
        let diags = validate(&schema, &bad_compute);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute.as_deref(),
            Some("action.0.container_action.0.resource_configuration.0.compute_type")
        );

        let mut many_triggers = query_dataset();
        many_triggers["trigger"] = json!([{}, {}, {}, {}, {}, {}]);
        assert_eq!(validate(&schema, &many_triggers).len(), 1);
    }

    #[tokio::test]
    async fn test_query_dataset_lifecycle() {
        let harness = ProviderHarness::immediate();
        let state = harness.create(TYPE_NAME, query_dataset()).await.unwrap();

        assert_eq!(state["id"], "hourly");
        assert_eq!(
            state["arn"],
            "arn:aws:iotanalytics:us-east-1:123456789012:dataset/hourly"
        );
        assert_eq!(
            state["content_delivery_rule"][0]["destination"][0]["s3_destination"][0]
                ["glue_configuration"][0]["table_name"],
            "hourly"
        );
        assert_eq!(state["content_delivery_rule"][0]["entry_name"], Value::Null);
        assert_eq!(state["trigger"][0]["schedule"][0]["expression"], "rate(1 hour)");
        assert_eq!(
            state["versioning_configuration"],
            json!([{"max_versions": null, "unlimited": true}])
        );

        let mut planned = state.clone();
        planned["trigger"] = json!([{"schedule": [{"expression": "rate(1 day)"}]}]);
        let updated = harness.update(TYPE_NAME, state, planned).await.unwrap();
        assert_eq!(updated["trigger"][0]["schedule"][0]["expression"], "rate(1 day)");

        harness.delete(TYPE_NAME, updated).await.unwrap();
        assert_eq!(harness.iotanalytics.calls("DeleteDataset"), 1);
    }

    #[tokio::test]
    async fn test_container_variables_round_trip_through_read() {
        let harness = ProviderHarness::immediate();
        let state = harness.create(TYPE_NAME, container_dataset()).await.unwrap();

        let variables = &state["action"][0]["container_action"][0]["variable"];
        assert_eq!(variables[0]["double_value"], 0.75);
        assert_eq!(variables[0]["string_value"], Value::Null);
        assert_eq!(variables[1]["string_value"], "prod");
        assert_eq!(variables[2]["dataset_content_version_value"][0]["dataset_name"], "hourly");
        assert_eq!(variables[3]["output_file_uri_value"][0]["file_name"], "scores.csv");
        assert_eq!(
            state["action"][0]["container_action"][0]["resource_configuration"],
            json!([{"compute_type": "ACU_1", "volume_size_in_gb": 2}])
        );
    }

    #[tokio::test]
    async fn test_create_is_not_retried() {
        let harness = ProviderHarness::immediate();
        harness.iotanalytics.fail_next(
            "CreateDataset",
            1,
            ApiError::invalid_request("role cannot be assumed"),
        );

        let err = harness.create(TYPE_NAME, query_dataset()).await.unwrap_err();
        assert_error_contains(&err, "role cannot be assumed");
        assert_eq!(harness.iotanalytics.calls("CreateDataset"), 1);
    }
}
