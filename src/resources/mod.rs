//! Resource lifecycle handlers.
//!
//! Every resource kind decodes the host's attribute bag into its typed model
//! once, at the start of each operation, talks to AWS through the clients in
//! [`ResourceContext`], and finishes create and update by reading the remote
//! object back so the returned state reflects what AWS stored.

mod greengrass_group;
mod greengrass_logger_definition;
mod iotanalytics_channel;
mod iotanalytics_dataset;
mod iotanalytics_datastore;
mod iotanalytics_storage;

pub use greengrass_group::GreengrassGroup;
pub use greengrass_logger_definition::GreengrassLoggerDefinition;
pub use iotanalytics_channel::IotAnalyticsChannel;
pub use iotanalytics_dataset::IotAnalyticsDataset;
pub use iotanalytics_datastore::IotAnalyticsDatastore;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{GreengrassApi, IotAnalyticsApi};
use crate::error::ProviderError;
use crate::retry::MutationRetrier;
use crate::schema::Schema;

/// Everything a lifecycle handler may use.
#[derive(Clone)]
pub struct ResourceContext {
    /// IoT Analytics client.
    pub iotanalytics: Arc<dyn IotAnalyticsApi>,
    /// Greengrass client.
    pub greengrass: Arc<dyn GreengrassApi>,
    /// Retrier for mutations that may race IAM role propagation.
    pub retrier: MutationRetrier,
    /// Idempotency token for version-creation calls.
    pub client_token: Option<String>,
}

impl std::fmt::Debug for ResourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceContext")
            .field("retrier", &self.retrier)
            .field("client_token", &self.client_token)
            .finish_non_exhaustive()
    }
}

/// A managed resource kind.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The type name used by the host, e.g. `aws_iotanalytics_channel`.
    fn type_name(&self) -> &'static str;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Create the remote object and return its state.
    async fn create(&self, ctx: &ResourceContext, planned: &Value) -> Result<Value, ProviderError>;

    /// Refresh `state` from the remote object.
    async fn read(&self, ctx: &ResourceContext, state: &Value) -> Result<Value, ProviderError>;

    /// Apply `planned` to the remote object described by `prior`.
    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, ctx: &ResourceContext, state: &Value) -> Result<(), ProviderError>;

    /// Adopt an existing remote object. The import ID becomes `id`.
    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<Value, ProviderError> {
        self.read(ctx, &json!({ "id": id })).await
    }
}

/// Every resource kind the provider manages.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(IotAnalyticsChannel),
        Box::new(IotAnalyticsDataset),
        Box::new(IotAnalyticsDatastore),
        Box::new(GreengrassGroup),
        Box::new(GreengrassLoggerDefinition),
    ]
}

/// The `id` of a stored state.
pub(crate) fn state_id(state: &Value) -> Result<String, ProviderError> {
    match state.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ProviderError::InvalidRequest(
            "state has no id".to_string(),
        )),
    }
}
