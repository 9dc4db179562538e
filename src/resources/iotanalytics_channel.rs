use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::iotanalytics_storage::{storage_backed_schema, StorageBackedModel};
use super::{state_id, Resource, ResourceContext};
use crate::api::iotanalytics::ChannelRequest;
use crate::attrs;
use crate::error::ProviderError;
use crate::schema::Schema;

const TYPE_NAME: &str = "aws_iotanalytics_channel";

/// `aws_iotanalytics_channel`: collects raw messages before a pipeline
/// processes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct IotAnalyticsChannel;

impl IotAnalyticsChannel {
    fn request(model: &StorageBackedModel) -> ChannelRequest {
        ChannelRequest {
            channel_name: model.name.clone(),
            channel_storage: model.storage_to_api(),
            retention_period: model.retention_to_api(),
        }
    }

    async fn read_by_name(ctx: &ResourceContext, name: &str) -> Result<Value, ProviderError> {
        debug!(channel = name, "describing channel");
        let channel = ctx.iotanalytics.describe_channel(name).await?;
        attrs::encode(&StorageBackedModel::from_remote(
            channel.name,
            channel.arn,
            channel.storage.as_ref(),
            channel.retention_period.as_ref(),
        ))
    }
}

#[async_trait]
impl Resource for IotAnalyticsChannel {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        storage_backed_schema("channel")
    }

    async fn create(&self, ctx: &ResourceContext, planned: &Value) -> Result<Value, ProviderError> {
        let model: StorageBackedModel = attrs::decode(TYPE_NAME, planned)?;
        let request = Self::request(&model);
        debug!(?request, "creating channel");

        ctx.retrier
            .run("CreateChannel", || ctx.iotanalytics.create_channel(&request))
            .await?;
        info!(channel = %model.name, "created channel");

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
        let model: StorageBackedModel = attrs::decode(TYPE_NAME, planned)?;
        let request = Self::request(&model);
        debug!(?request, "updating channel");

        ctx.retrier
            .run("UpdateChannel", || ctx.iotanalytics.update_channel(&request))
            .await?;

        Self::read_by_name(ctx, &model.name).await
    }

    async fn delete(&self, ctx: &ResourceContext, state: &Value) -> Result<(), ProviderError> {
        let name = state_id(state)?;
        debug!(channel = %name, "deleting channel");
        ctx.iotanalytics.delete_channel(&name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::ApiError;
    use crate::testing::{assert_plan_no_changes, ProviderHarness};
    use serde_json::json;

    const ROLE: &str = "arn:aws:iam::123456789012:role/channel";

    fn config() -> serde_json::Value {
        json!({
            "name": "telemetry",
            "storage": [{
                "customer_managed_s3": [{"bucket": "raw", "key_prefix": "in/", "role_arn": ROLE}],
                "service_managed_s3": []
            }],
            "retention_period": [{"number_of_days": 30, "unlimited": null}]
        })
    }

    #[tokio::test]
    async fn test_create_reads_back() {
        let harness = ProviderHarness::immediate();
        let state = harness.create("aws_iotanalytics_channel", config()).await.unwrap();

        assert_eq!(state["id"], "telemetry");
        assert_eq!(
            state["arn"],
            "arn:aws:iotanalytics:us-east-1:123456789012:channel/telemetry"
        );
        assert_eq!(state["storage"][0]["customer_managed_s3"][0]["key_prefix"], "in/");
        assert_eq!(state["retention_period"][0]["number_of_days"], 30);
        assert_eq!(harness.iotanalytics.calls("CreateChannel"), 1);
    }

    #[tokio::test]
    async fn test_reapplying_unchanged_config_is_a_no_op() {
        let harness = ProviderHarness::immediate();
        let mut config = config();
        config["storage"][0]["customer_managed_s3"][0]["key_prefix"] = json!("");
        let state = harness
            .lifecycle_create("aws_iotanalytics_channel", config.clone())
            .await
            .unwrap();
        assert_eq!(
            state["storage"][0]["customer_managed_s3"][0]["key_prefix"],
            serde_json::Value::Null
        );

        let plan = harness
            .plan_update("aws_iotanalytics_channel", state, config)
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_role_propagation() {
        let harness = ProviderHarness::new();
        harness.iotanalytics.fail_next(
            "CreateChannel",
            2,
            ApiError::invalid_request("Unable to assume role"),
        );

        let start = tokio::time::Instant::now();
        let state = harness.create("aws_iotanalytics_channel", config()).await.unwrap();

        assert_eq!(state["id"], "telemetry");
        assert_eq!(harness.iotanalytics.calls("CreateChannel"), 3);
        assert!(start.elapsed() >= std::time::Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_surfaces_last_error() {
        let harness = ProviderHarness::new();
        harness.iotanalytics.fail_next(
            "CreateChannel",
            10,
            ApiError::access_denied("role is not assumable"),
        );

        let err = harness
            .create("aws_iotanalytics_channel", config())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "AccessDeniedException: role is not assumable");
        assert_eq!(harness.iotanalytics.calls("CreateChannel"), 6);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let harness = ProviderHarness::immediate();
        let state = harness.create("aws_iotanalytics_channel", config()).await.unwrap();

        let mut planned = state.clone();
        planned["storage"] = json!([{"customer_managed_s3": [], "service_managed_s3": [{}]}]);
        planned["retention_period"] = json!([{"number_of_days": null, "unlimited": true}]);

        let updated = harness
            .update("aws_iotanalytics_channel", state, planned)
            .await
            .unwrap();
        assert_eq!(updated["storage"][0]["service_managed_s3"], json!([{}]));
        assert_eq!(updated["retention_period"][0]["unlimited"], true);
        assert_eq!(harness.iotanalytics.calls("UpdateChannel"), 1);

        harness.delete("aws_iotanalytics_channel", updated).await.unwrap();
        let err = harness
            .read("aws_iotanalytics_channel", json!({"id": "telemetry"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ResourceNotFoundException"));
    }

    #[tokio::test]
    async fn test_import_reads_by_name() {
        let harness = ProviderHarness::immediate();
        harness.create("aws_iotanalytics_channel", config()).await.unwrap();

        let imported = harness
            .import("aws_iotanalytics_channel", "telemetry")
            .await
            .unwrap();
        assert_eq!(imported["name"], "telemetry");
    }

    #[tokio::test]
    async fn test_name_change_requires_replace() {
        let harness = ProviderHarness::immediate();
        let state = harness.create("aws_iotanalytics_channel", config()).await.unwrap();

        let mut proposed = state.clone();
        proposed["name"] = json!("telemetry-v2");
        let plan = harness
            .plan_update("aws_iotanalytics_channel", state, proposed)
            .await
            .unwrap();
        crate::testing::assert_plan_replaces(&plan);
    }
}
