use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{state_id, Resource, ResourceContext};
use crate::api::greengrass::{CreateGroupVersionRequest, GroupVersionDefinition};
use crate::attrs::{self, single_block};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};

const TYPE_NAME: &str = "aws_greengrass_group";

/// Definition version ARNs a group version may reference.
const DEFINITION_VERSION_ARNS: [&str; 7] = [
    "connector_definition_version_arn",
    "core_definition_version_arn",
    "device_definition_version_arn",
    "function_definition_version_arn",
    "logger_definition_version_arn",
    "resource_definition_version_arn",
    "subscription_definition_version_arn",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct GroupModel {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    arn: Option<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default, with = "single_block")]
    group_version: Option<GroupVersionModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct GroupVersionModel {
    #[serde(default)]
    connector_definition_version_arn: Option<String>,
    #[serde(default)]
    core_definition_version_arn: Option<String>,
    #[serde(default)]
    device_definition_version_arn: Option<String>,
    #[serde(default)]
    function_definition_version_arn: Option<String>,
    #[serde(default)]
    logger_definition_version_arn: Option<String>,
    #[serde(default)]
    resource_definition_version_arn: Option<String>,
    #[serde(default)]
    subscription_definition_version_arn: Option<String>,
}

impl GroupVersionModel {
    fn to_api(&self) -> GroupVersionDefinition {
        GroupVersionDefinition {
            connector_definition_version_arn: attrs::non_empty(
                self.connector_definition_version_arn.clone(),
            ),
            core_definition_version_arn: attrs::non_empty(self.core_definition_version_arn.clone()),
            device_definition_version_arn: attrs::non_empty(
                self.device_definition_version_arn.clone(),
            ),
            function_definition_version_arn: attrs::non_empty(
                self.function_definition_version_arn.clone(),
            ),
            logger_definition_version_arn: attrs::non_empty(
                self.logger_definition_version_arn.clone(),
            ),
            resource_definition_version_arn: attrs::non_empty(
                self.resource_definition_version_arn.clone(),
            ),
            subscription_definition_version_arn: attrs::non_empty(
                self.subscription_definition_version_arn.clone(),
            ),
        }
    }

    fn from_api(definition: GroupVersionDefinition) -> Self {
        Self {
            connector_definition_version_arn: definition.connector_definition_version_arn,
            core_definition_version_arn: definition.core_definition_version_arn,
            device_definition_version_arn: definition.device_definition_version_arn,
            function_definition_version_arn: definition.function_definition_version_arn,
            logger_definition_version_arn: definition.logger_definition_version_arn,
            resource_definition_version_arn: definition.resource_definition_version_arn,
            subscription_definition_version_arn: definition.subscription_definition_version_arn,
        }
    }
}

/// `aws_greengrass_group`: a Greengrass group and its latest group version.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreengrassGroup;

impl GreengrassGroup {
    async fn create_version(
        ctx: &ResourceContext,
        group_id: &str,
        version: &GroupVersionModel,
    ) -> Result<(), ProviderError> {
        let request = CreateGroupVersionRequest {
            group_id: group_id.to_string(),
            amzn_client_token: ctx.client_token.clone(),
            definition: version.to_api(),
        };
        debug!(?request, "creating group version");
        let created = ctx.greengrass.create_group_version(&request).await?;
        info!(group_id, version = %created.version, "created group version");
        Ok(())
    }

    async fn read_by_id(ctx: &ResourceContext, group_id: &str) -> Result<Value, ProviderError> {
        debug!(group_id, "reading group");
        let group = ctx.greengrass.get_group(group_id).await?;

        let group_version = match &group.latest_version {
            Some(version_id) => {
                debug!(group_id, version_id = %version_id, "reading group version");
                let version = ctx.greengrass.get_group_version(group_id, version_id).await?;
                Some(GroupVersionModel::from_api(version.definition))
            },
            None => None,
        };

        attrs::encode(&GroupModel {
            id: Some(group.id.clone()),
            name: group.name.unwrap_or_default(),
            arn: Some(group.arn),
            group_id: Some(group.id),
            group_version,
        })
    }
}

#[async_trait]
impl Resource for GreengrassGroup {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let version = DEFINITION_VERSION_ARNS
            .iter()
            .fold(Block::new(), |block, name| {
                block.with_attribute(*name, Attribute::optional_string().with_empty_as_unset())
            });

        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Name of the group"),
            )
            .with_attribute("arn", Attribute::computed_string())
            .with_attribute("group_id", Attribute::computed_string())
            .with_block("group_version", NestedBlock::at_most_one(version))
    }

    async fn create(&self, ctx: &ResourceContext, planned: &Value) -> Result<Value, ProviderError> {
        let model: GroupModel = attrs::decode(TYPE_NAME, planned)?;

        debug!(name = %model.name, "creating group");
        let group = ctx.greengrass.create_group(&model.name).await?;
        info!(group_id = %group.id, "created group");

        if let Some(version) = &model.group_version {
            Self::create_version(ctx, &group.id, version).await?;
        }

        Self::read_by_id(ctx, &group.id).await
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
        let group_id = state_id(prior)?;
        let before: GroupModel = attrs::decode(TYPE_NAME, prior)?;
        let after: GroupModel = attrs::decode(TYPE_NAME, planned)?;

        debug!(group_id = %group_id, name = %after.name, "updating group");
        ctx.greengrass.update_group(&group_id, &after.name).await?;

        let before_version = before.group_version.as_ref().map(GroupVersionModel::to_api);
        if let Some(version) = &after.group_version {
            if before_version.as_ref() != Some(&version.to_api()) {
                Self::create_version(ctx, &group_id, version).await?;
            }
        }

        Self::read_by_id(ctx, &group_id).await
    }

    async fn delete(&self, ctx: &ResourceContext, state: &Value) -> Result<(), ProviderError> {
        let group_id = state_id(state)?;
        debug!(group_id = %group_id, "deleting group");
        match ctx.greengrass.delete_group(&group_id).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                info!(group_id = %group_id, "group already deleted");
                Ok(())
            },
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::ApiError;
    use crate::testing::{assert_plan_no_changes, ProviderHarness};
    use serde_json::{json, Value};

    const CORE: &str = "arn:aws:greengrass:us-east-1:123456789012:/greengrass/definition/cores/c-1/versions/v-1";
    const LOGGER: &str = "arn:aws:greengrass:us-east-1:123456789012:/greengrass/definition/loggers/l-1/versions/v-1";

    fn config() -> Value {
        json!({
            "name": "plant-floor",
            "group_version": [{
                "core_definition_version_arn": CORE,
                "logger_definition_version_arn": ""
            }]
        })
    }

    #[tokio::test]
    async fn test_create_with_version() {
        let harness = ProviderHarness::immediate();
        let state = harness.create("aws_greengrass_group", config()).await.unwrap();

        assert_eq!(state["id"], "group-1");
        assert_eq!(state["group_id"], "group-1");
        assert_eq!(state["name"], "plant-floor");
        assert_eq!(state["group_version"][0]["core_definition_version_arn"], CORE);
        assert_eq!(state["group_version"][0]["logger_definition_version_arn"], Value::Null);

        let requests = harness.greengrass.group_version_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].definition.logger_definition_version_arn, None);
    }

    #[tokio::test]
    async fn test_create_without_version() {
        let harness = ProviderHarness::immediate();
        let state = harness
            .create("aws_greengrass_group", json!({"name": "bare"}))
            .await
            .unwrap();

        assert_eq!(state["group_version"], json!([]));
        assert_eq!(harness.greengrass.calls("CreateGroupVersion"), 0);
    }

    #[tokio::test]
    async fn test_reapplying_unchanged_config_is_a_no_op() {
        let harness = ProviderHarness::immediate();
        let state = harness
            .lifecycle_create("aws_greengrass_group", config())
            .await
            .unwrap();

        let plan = harness
            .plan_update("aws_greengrass_group", state.clone(), config())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        harness
            .update("aws_greengrass_group", state, config())
            .await
            .unwrap();
        assert_eq!(harness.greengrass.calls("CreateGroupVersion"), 1);
    }

    #[tokio::test]
    async fn test_client_token_forwarded() {
        let harness = ProviderHarness::immediate();
        harness
            .configure(json!({"client_token": "deploy-42", "mutation_retry_delays": []}))
            .await
            .unwrap();
        harness.create("aws_greengrass_group", config()).await.unwrap();

        let requests = harness.greengrass.group_version_requests();
        assert_eq!(requests[0].amzn_client_token.as_deref(), Some("deploy-42"));
    }

    #[tokio::test]
    async fn test_update_creates_version_only_on_change() {
        let harness = ProviderHarness::immediate();
        let state = harness.create("aws_greengrass_group", config()).await.unwrap();

        let mut renamed = state.clone();
        renamed["name"] = json!("plant-floor-2");
        let state = harness
            .update("aws_greengrass_group", state, renamed)
            .await
            .unwrap();
        assert_eq!(state["name"], "plant-floor-2");
        assert_eq!(harness.greengrass.calls("CreateGroupVersion"), 1);

        let mut reversioned = state.clone();
        reversioned["group_version"][0]["logger_definition_version_arn"] = json!(LOGGER);
        let state = harness
            .update("aws_greengrass_group", state, reversioned)
            .await
            .unwrap();
        assert_eq!(harness.greengrass.calls("CreateGroupVersion"), 2);
        assert_eq!(state["group_version"][0]["logger_definition_version_arn"], LOGGER);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_group() {
        let harness = ProviderHarness::immediate();
        harness
            .delete("aws_greengrass_group", json!({"id": "group-404"}))
            .await
            .unwrap();

        harness
            .greengrass
            .fail_next("DeleteGroup", 1, ApiError::access_denied("no"));
        let err = harness
            .delete("aws_greengrass_group", json!({"id": "group-404"}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("AccessDeniedException"));
    }

    #[tokio::test]
    async fn test_import_by_group_id() {
        let harness = ProviderHarness::immediate();
        harness.create("aws_greengrass_group", config()).await.unwrap();

        let imported = harness.import("aws_greengrass_group", "group-1").await.unwrap();
        assert_eq!(imported["name"], "plant-floor");
        assert_eq!(imported["group_version"][0]["core_definition_version_arn"], CORE);
    }
}
