use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{state_id, Resource, ResourceContext};
use crate::api::greengrass::{CreateLoggerDefinitionVersionRequest, Logger};
use crate::attrs::{self, null_as_empty, single_block};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema, ValueConstraint};

const TYPE_NAME: &str = "aws_greengrass_logger_definition";

/// Sources a logger can capture.
pub const LOGGER_COMPONENTS: &[&str] = &["GreengrassSystem", "Lambda"];

/// Accepted log levels.
pub const LOGGER_LEVELS: &[&str] = &["DEBUG", "INFO", "WARN", "ERROR", "FATAL"];

/// Where a logger writes.
pub const LOGGER_TYPES: &[&str] = &["FileSystem", "AWSCloudWatch"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct LoggerDefinitionModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arn: Option<String>,
    #[serde(default)]
    latest_definition_version_arn: Option<String>,
    #[serde(default, with = "single_block")]
    logger_definition_version: Option<LoggerDefinitionVersionModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct LoggerDefinitionVersionModel {
    #[serde(default, deserialize_with = "null_as_empty")]
    logger: Vec<LoggerModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct LoggerModel {
    component: String,
    id: String,
    level: String,
    #[serde(default)]
    space: Option<i64>,
    #[serde(rename = "type")]
    logger_type: String,
}

impl LoggerDefinitionVersionModel {
    /// Loggers as the API receives them, in a stable order for comparison.
    fn sorted_api_loggers(&self) -> Vec<Logger> {
        let mut loggers: Vec<Logger> = self.logger.iter().map(LoggerModel::to_api).collect();
        loggers.sort_by(|a, b| {
            (&a.id, &a.component, &a.level, &a.logger_type, a.space)
                .cmp(&(&b.id, &b.component, &b.level, &b.logger_type, b.space))
        });
        loggers
    }
}

impl LoggerModel {
    fn to_api(&self) -> Logger {
        Logger {
            component: self.component.clone(),
            id: self.id.clone(),
            level: self.level.clone(),
            space: attrs::positive(self.space),
            logger_type: self.logger_type.clone(),
        }
    }

    fn from_api(logger: Logger) -> Self {
        Self {
            component: logger.component,
            id: logger.id,
            level: logger.level,
            space: logger.space,
            logger_type: logger.logger_type,
        }
    }
}

/// `aws_greengrass_logger_definition`: logging settings for a Greengrass
/// group, versioned like every Greengrass definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreengrassLoggerDefinition;

impl GreengrassLoggerDefinition {
    async fn create_version(
        ctx: &ResourceContext,
        definition_id: &str,
        version: &LoggerDefinitionVersionModel,
    ) -> Result<(), ProviderError> {
        let request = CreateLoggerDefinitionVersionRequest {
            logger_definition_id: definition_id.to_string(),
            amzn_client_token: ctx.client_token.clone(),
            loggers: version.logger.iter().map(LoggerModel::to_api).collect(),
        };
        debug!(?request, "creating logger definition version");
        let created = ctx.greengrass.create_logger_definition_version(&request).await?;
        info!(definition_id, version = %created.version, "created logger definition version");
        Ok(())
    }

    async fn read_by_id(ctx: &ResourceContext, definition_id: &str) -> Result<Value, ProviderError> {
        debug!(definition_id, "reading logger definition");
        let definition = ctx.greengrass.get_logger_definition(definition_id).await?;

        let mut model = LoggerDefinitionModel {
            id: Some(definition.id),
            name: definition.name,
            arn: Some(definition.arn),
            latest_definition_version_arn: None,
            logger_definition_version: None,
        };

        if let Some(version_id) = &definition.latest_version {
            let version = ctx
                .greengrass
                .get_logger_definition_version(definition_id, version_id)
                .await?;
            model.latest_definition_version_arn = Some(version.arn);
            model.logger_definition_version = Some(LoggerDefinitionVersionModel {
                logger: version
                    .definition
                    .loggers
                    .into_iter()
                    .map(LoggerModel::from_api)
                    .collect(),
            });
        }

        attrs::encode(&model)
    }
}

#[async_trait]
impl Resource for GreengrassLoggerDefinition {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let logger = Block::new()
            .with_attribute(
                "component",
                Attribute::required_string()
                    .with_constraint(ValueConstraint::one_of(LOGGER_COMPONENTS)),
            )
            .with_attribute("id", Attribute::required_string())
            .with_attribute(
                "level",
                Attribute::required_string().with_constraint(ValueConstraint::one_of(LOGGER_LEVELS)),
            )
            .with_attribute(
                "space",
                Attribute::optional_int64()
                    .with_empty_as_unset()
                    .with_description("Disk space in KB for FileSystem loggers"),
            )
            .with_attribute(
                "type",
                Attribute::required_string().with_constraint(ValueConstraint::one_of(LOGGER_TYPES)),
            );

        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::optional_string().with_empty_as_unset())
            .with_attribute("arn", Attribute::computed_string())
            .with_attribute("latest_definition_version_arn", Attribute::computed_string())
            .with_block(
                "logger_definition_version",
                NestedBlock::at_most_one(
                    Block::new().with_block("logger", NestedBlock::set(logger)),
                ),
            )
    }

    async fn create(&self, ctx: &ResourceContext, planned: &Value) -> Result<Value, ProviderError> {
        let model: LoggerDefinitionModel = attrs::decode(TYPE_NAME, planned)?;
        let name = attrs::non_empty(model.name.clone());

        debug!(name = ?name, "creating logger definition");
        let definition = ctx
            .greengrass
            .create_logger_definition(name.as_deref())
            .await?;
        info!(definition_id = %definition.id, "created logger definition");

        if let Some(version) = &model.logger_definition_version {
            Self::create_version(ctx, &definition.id, version).await?;
        }

        Self::read_by_id(ctx, &definition.id).await
    }

    async fn read(&self, ctx: &ResourceContext, state: &Value) -> Result<Value, ProviderError> {
        Self::read_by_id(ctx, &state_id(state)?).await
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let definition_id = state_id(prior)?;
        let before: LoggerDefinitionModel = attrs::decode(TYPE_NAME, prior)?;
        let after: LoggerDefinitionModel = attrs::decode(TYPE_NAME, planned)?;
        let name = attrs::non_empty(after.name.clone());

        debug!(definition_id = %definition_id, name = ?name, "updating logger definition");
        ctx.greengrass
            .update_logger_definition(&definition_id, name.as_deref())
            .await?;

        let before_loggers = before
            .logger_definition_version
            .as_ref()
            .map(LoggerDefinitionVersionModel::sorted_api_loggers);
        if let Some(version) = &after.logger_definition_version {
            if before_loggers.as_ref() != Some(&version.sorted_api_loggers()) {
                Self::create_version(ctx, &definition_id, version).await?;
            }
        }

        Self::read_by_id(ctx, &definition_id).await
    }

    async fn delete(&self, ctx: &ResourceContext, state: &Value) -> Result<(), ProviderError> {
        let definition_id = state_id(state)?;
        debug!(definition_id = %definition_id, "deleting logger definition");
        match ctx.greengrass.delete_logger_definition(&definition_id).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                info!(definition_id = %definition_id, "logger definition already deleted");
                Ok(())
            },
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_plan_no_changes, ProviderHarness};
    use crate::validation::validate;
    use serde_json::json;

    fn config() -> Value {
        json!({
            "name": "edge-logs",
            "logger_definition_version": [{
                "logger": [
                    {"component": "GreengrassSystem", "id": "system", "level": "INFO", "space": 0, "type": "FileSystem"},
                    {"component": "Lambda", "id": "lambda", "level": "WARN", "space": null, "type": "AWSCloudWatch"}
                ]
            }]
        })
    }

    #[test]
    fn test_schema_rejects_unknown_level() {
        let mut bad = config();
        bad["logger_definition_version"][0]["logger"][1]["level"] = json!("TRACE");
        let diags = validate(&GreengrassLoggerDefinition.schema(), &bad);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute.as_deref(),
            Some("logger_definition_version.0.logger.1.level")
        );
        assert!(validate(&GreengrassLoggerDefinition.schema(), &config()).is_empty());
    }

    #[tokio::test]
    async fn test_create_reads_latest_version() {
        let harness = ProviderHarness::immediate();
        let state = harness.create(TYPE_NAME, config()).await.unwrap();

        assert_eq!(state["id"], "definition-1");
        assert_eq!(state["name"], "edge-logs");
        assert!(state["latest_definition_version_arn"]
            .as_str()
            .unwrap()
            .ends_with("/versions/version-1"));

        let loggers = &state["logger_definition_version"][0]["logger"];
        assert_eq!(loggers[0]["type"], "FileSystem");
        assert_eq!(loggers[0]["space"], Value::Null);
        assert_eq!(loggers[1]["component"], "Lambda");

        let requests = harness.greengrass.logger_version_requests();
        assert_eq!(requests[0].loggers[0].space, None);
    }

    #[tokio::test]
    async fn test_create_without_name_or_version() {
        let harness = ProviderHarness::immediate();
        let state = harness.create(TYPE_NAME, json!({})).await.unwrap();

        assert_eq!(state["name"], Value::Null);
        assert_eq!(state["latest_definition_version_arn"], Value::Null);
        assert_eq!(state["logger_definition_version"], json!([]));
    }

    #[tokio::test]
    async fn test_update_versions_on_logger_change() {
        let harness = ProviderHarness::immediate();
        let state = harness.create(TYPE_NAME, config()).await.unwrap();

        let mut planned = state.clone();
        planned["logger_definition_version"][0]["logger"][1]["level"] = json!("ERROR");
        let updated = harness.update(TYPE_NAME, state, planned).await.unwrap();

        assert_eq!(harness.greengrass.calls("CreateLoggerDefinitionVersion"), 2);
        assert_eq!(
            updated["logger_definition_version"][0]["logger"][1]["level"],
            "ERROR"
        );
        assert!(updated["latest_definition_version_arn"]
            .as_str()
            .unwrap()
            .ends_with("/versions/version-2"));
    }

    #[tokio::test]
    async fn test_reapplying_unchanged_config_is_a_no_op() {
        let harness = ProviderHarness::immediate();
        let mut config = config();
        config["name"] = json!("");
        let state = harness.lifecycle_create(TYPE_NAME, config.clone()).await.unwrap();
        let state = harness.read(TYPE_NAME, state).await.unwrap();

        let plan = harness
            .plan_update(TYPE_NAME, state.clone(), config.clone())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        harness.update(TYPE_NAME, state, config).await.unwrap();
        assert_eq!(harness.greengrass.calls("CreateLoggerDefinitionVersion"), 1);
    }

    #[tokio::test]
    async fn test_reordered_loggers_do_not_version() {
        let harness = ProviderHarness::immediate();
        let state = harness.lifecycle_create(TYPE_NAME, config()).await.unwrap();

        let mut reordered = config();
        let loggers = reordered["logger_definition_version"][0]["logger"]
            .as_array_mut()
            .unwrap();
        loggers.reverse();

        let plan = harness
            .plan_update(TYPE_NAME, state.clone(), reordered.clone())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        harness.update(TYPE_NAME, state, reordered).await.unwrap();
        assert_eq!(harness.greengrass.calls("CreateLoggerDefinitionVersion"), 1);
    }

    #[tokio::test]
    async fn test_client_token_from_environment_lookup() {
        let harness = ProviderHarness::immediate().with_client_token("from-env");
        harness.create(TYPE_NAME, config()).await.unwrap();

        let requests = harness.greengrass.logger_version_requests();
        assert_eq!(requests[0].amzn_client_token.as_deref(), Some("from-env"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let harness = ProviderHarness::immediate();
        harness
            .delete(TYPE_NAME, json!({"id": "definition-9"}))
            .await
            .unwrap();
        assert_eq!(harness.greengrass.calls("DeleteLoggerDefinition"), 1);
    }
}
