//! The IoT provider: routes host requests to resource handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::{GreengrassApi, IotAnalyticsApi};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{self, Resource, ResourceContext};
use crate::retry::MutationRetrier;
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Provider for IoT Analytics channels, datasets and datastores, and
/// Greengrass groups and logger definitions.
///
/// The AWS clients are supplied by the caller; the provider only decides
/// which calls to make.
pub struct IotProvider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    iotanalytics: Arc<dyn IotAnalyticsApi>,
    greengrass: Arc<dyn GreengrassApi>,
    config: RwLock<ProviderConfig>,
    env: EnvLookup,
}

impl std::fmt::Debug for IotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IotProvider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl IotProvider {
    /// Create a provider with the default configuration, reading
    /// `AMZN_CLIENT_TOKEN` from the process environment.
    pub fn new(iotanalytics: Arc<dyn IotAnalyticsApi>, greengrass: Arc<dyn GreengrassApi>) -> Self {
        let resources = resources::all()
            .into_iter()
            .map(|resource| (resource.type_name(), resource))
            .collect();

        Self {
            resources,
            iotanalytics,
            greengrass,
            config: RwLock::new(ProviderConfig::default()),
            env: Arc::new(|key: &str| std::env::var(key).ok()),
        }
    }

    /// Start from `config` instead of the default.
    pub fn with_config(mut self, config: ProviderConfig) -> Self {
        self.config = RwLock::new(config);
        self
    }

    /// Replace the environment lookup used to resolve the client token.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// The configuration currently in effect.
    pub async fn config(&self) -> ProviderConfig {
        self.config.read().await.clone()
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|resource| &**resource)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    /// Build the context for one operation. The client token is resolved
    /// again every time.
    async fn context(&self) -> ResourceContext {
        let config = self.config.read().await;
        ResourceContext {
            iotanalytics: Arc::clone(&self.iotanalytics),
            greengrass: Arc::clone(&self.greengrass),
            retrier: MutationRetrier::new(config.retry_schedule()),
            client_token: config.resolve_client_token(|key| (self.env)(key)),
        }
    }

    fn check_config(config: &Value) -> (Option<ProviderConfig>, Vec<Diagnostic>) {
        match ProviderConfig::from_value(config) {
            Ok(parsed) => {
                let diagnostics = parsed.validate();
                (Some(parsed), diagnostics)
            },
            Err(err) => (
                None,
                vec![Diagnostic::error("Invalid provider configuration").with_detail(err.to_string())],
            ),
        }
    }
}

#[async_trait::async_trait]
impl ProviderService for IotProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.values().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, resource| schema.with_resource(resource.type_name(), resource.schema()),
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(Self::check_config(&config).1)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let (parsed, diagnostics) = Self::check_config(&config);
        match parsed {
            Some(parsed) if !has_errors(&diagnostics) => {
                info!(
                    attempts = parsed.retry_schedule().attempts(),
                    client_token = parsed.client_token.is_some(),
                    "provider configured"
                );
                *self.config.write().await = parsed;
            },
            _ => warn!(diagnostics = diagnostics.len(), "provider configuration rejected"),
        }
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("provider stopping");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(validate(&resource.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let plan = PlanResult::compute(&resource.schema(), prior_state.as_ref(), &proposed_state)?;
        debug!(
            resource_type,
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "planned"
        );
        Ok(plan)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await;
        resource.create(&ctx, &planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await;
        resource.read(&ctx, &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await;
        resource.update(&ctx, &prior_state, &planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await;
        resource.delete(&ctx, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await;
        let state = resource.import(&ctx, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        _version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource(resource_type)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGreengrass, FakeIotAnalytics, ProviderHarness};
    use serde_json::json;

    fn provider() -> IotProvider {
        IotProvider::new(
            Arc::new(FakeIotAnalytics::default()),
            Arc::new(FakeGreengrass::default()),
        )
        .with_env_lookup(|_| None)
    }

    #[test]
    fn test_schema_lists_every_resource() {
        let schema = provider().schema();
        let names: Vec<_> = schema.resources.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            [
                "aws_greengrass_group",
                "aws_greengrass_logger_definition",
                "aws_iotanalytics_channel",
                "aws_iotanalytics_dataset",
                "aws_iotanalytics_datastore",
            ]
        );
        assert!(schema.data_sources.is_empty());
        assert!(schema
            .provider
            .block
            .attributes
            .contains_key("mutation_retry_delays"));

        let metadata = provider().metadata();
        assert_eq!(metadata.resources.len(), 5);
    }

    #[tokio::test]
    async fn test_configure_keeps_previous_config_on_error() {
        let provider = provider();
        provider
            .configure(json!({"mutation_retry_delays": [0, 0]}))
            .await
            .unwrap();
        assert_eq!(provider.config().await.mutation_retry_delays, vec![0, 0]);

        let diags = provider
            .configure(json!({"mutation_retry_delays": [1], "region": "us-east-1"}))
            .await
            .unwrap();
        assert!(has_errors(&diags));
        assert_eq!(diags[0].summary, "Invalid provider configuration");
        assert_eq!(provider.config().await.mutation_retry_delays, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_validate_provider_config_does_not_apply() {
        let provider = provider();
        let diags = provider
            .validate_provider_config(json!({"client_token": "abc", "mutation_retry_delays": []}))
            .await
            .unwrap();
        assert!(diags.is_empty());
        assert_eq!(provider.config().await, ProviderConfig::default());
    }

    #[tokio::test]
    async fn test_client_token_is_resolved_per_operation() {
        let provider = provider().with_env_lookup(|key| {
            (key == crate::config::CLIENT_TOKEN_ENV).then(|| "env-token".to_string())
        });
        assert_eq!(provider.context().await.client_token.as_deref(), Some("env-token"));

        provider
            .configure(json!({"client_token": "configured"}))
            .await
            .unwrap();
        assert_eq!(provider.context().await.client_token.as_deref(), Some("configured"));

        provider.configure(json!({"client_token": ""})).await.unwrap();
        assert_eq!(provider.context().await.client_token.as_deref(), Some("env-token"));
    }

    #[tokio::test]
    async fn test_context_uses_configured_schedule() {
        let provider = provider();
        assert_eq!(provider.context().await.retrier.schedule().attempts(), 6);

        provider
            .configure(json!({"mutation_retry_delays": [3]}))
            .await
            .unwrap();
        assert_eq!(provider.context().await.retrier.schedule().attempts(), 2);
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = provider();
        let err = provider.create("aws_iot_thing", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(ref t) if t == "aws_iot_thing"));

        let err = provider
            .validate_resource_config("aws_iot_thing", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = provider
            .upgrade_resource_state("aws_iot_thing", 0, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_data_sources_are_unknown() {
        let provider = provider();
        let err = provider
            .read_data_source("aws_iotanalytics_channel", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_import_reports_resource_type() {
        let harness = ProviderHarness::immediate();
        harness
            .create("aws_greengrass_group", json!({"name": "plant"}))
            .await
            .unwrap();

        let imported = harness
            .provider()
            .import_resource("aws_greengrass_group", "group-1")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, "aws_greengrass_group");
        assert_eq!(imported[0].state["group_id"], "group-1");
    }

    #[tokio::test]
    async fn test_plan_destroy() {
        let harness = ProviderHarness::immediate();
        let state = harness
            .create("aws_iotanalytics_channel", json!({"name": "telemetry"}))
            .await
            .unwrap();

        let plan = harness
            .plan_delete("aws_iotanalytics_channel", state)
            .await
            .unwrap();
        assert_eq!(plan.planned_state, Value::Null);
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, ["arn", "id", "name"]);
    }
}
