use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::iotanalytics_storage::{storage_backed_schema, StorageBackedModel};
use super::{state_id, Resource, ResourceContext};
use crate::api::iotanalytics::DatastoreRequest;
use crate::attrs;
use crate::error::ProviderError;
use crate::schema::Schema;

const TYPE_NAME: &str = "aws_iotanalytics_datastore";

/// `aws_iotanalytics_datastore`: holds processed messages for querying.
#[derive(Debug, Clone, Copy, Default)]
pub struct IotAnalyticsDatastore;

impl IotAnalyticsDatastore {
    fn request(model: &StorageBackedModel) -> DatastoreRequest {
        DatastoreRequest {
            datastore_name: model.name.clone(),
            datastore_storage: model.storage_to_api(),
            retention_period: model.retention_to_api(),
        }
    }

    async fn read_by_name(ctx: &ResourceContext, name: &str) -> Result<Value, ProviderError> {
        debug!(datastore = name, "describing datastore");
        let datastore = ctx.iotanalytics.describe_datastore(name).await?;
        attrs::encode(&StorageBackedModel::from_remote(
            datastore.name,
            datastore.arn,
            datastore.storage.as_ref(),
            datastore.retention_period.as_ref(),
        ))
    }
}

#[async_trait]
impl Resource for IotAnalyticsDatastore {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        storage_backed_schema("datastore")
    }

    async fn create(&self, ctx: &ResourceContext, planned: &Value) -> Result<Value, ProviderError> {
        let model: StorageBackedModel = attrs::decode(TYPE_NAME, planned)?;
        let request = Self::request(&model);
        debug!(?request, "creating datastore");

        ctx.retrier
            .run("CreateDatastore", || ctx.iotanalytics.create_datastore(&request))
            .await?;
        info!(datastore = %model.name, "created datastore");

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
        debug!(?request, "updating datastore");

        ctx.retrier
            .run("UpdateDatastore", || ctx.iotanalytics.update_datastore(&request))
            .await?;

        Self::read_by_name(ctx, &model.name).await
    }

    async fn delete(&self, ctx: &ResourceContext, state: &Value) -> Result<(), ProviderError> {
        let name = state_id(state)?;
        debug!(datastore = %name, "deleting datastore");
        ctx.iotanalytics.delete_datastore(&name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::ApiError;
    use crate::testing::ProviderHarness;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_update_retries_then_succeeds() {
        let harness = ProviderHarness::new();
        let state = harness
            .create(
                "aws_iotanalytics_datastore",
                json!({"name": "archive", "storage": [{"service_managed_s3": [{}]}]}),
            )
            .await
            .unwrap();
        assert_eq!(state["id"], "archive");

        harness.iotanalytics.fail_next(
            "UpdateDatastore",
            5,
            ApiError::invalid_request("role cannot be assumed"),
        );

        let mut planned = state.clone();
        planned["retention_period"] = json!([{"number_of_days": 90}]);
        let start = tokio::time::Instant::now();
        let updated = harness
            .update("aws_iotanalytics_datastore", state, planned)
            .await
            .unwrap();

        assert_eq!(updated["retention_period"][0]["number_of_days"], 90);
        assert_eq!(harness.iotanalytics.calls("UpdateDatastore"), 6);
        assert!(start.elapsed() >= std::time::Duration::from_secs(26));
    }

    #[tokio::test]
    async fn test_read_without_storage() {
        let harness = ProviderHarness::immediate();
        let state = harness
            .create("aws_iotanalytics_datastore", json!({"name": "archive"}))
            .await
            .unwrap();

        assert_eq!(state["storage"], json!([]));
        assert_eq!(state["retention_period"], json!([]));
        assert_eq!(
            state["arn"],
            "arn:aws:iotanalytics:us-east-1:123456789012:datastore/archive"
        );
    }

    #[tokio::test]
    async fn test_delete_surfaces_not_found() {
        let harness = ProviderHarness::immediate();
        let err = harness
            .delete("aws_iotanalytics_datastore", json!({"id": "missing"}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("ResourceNotFoundException"));
    }
}
