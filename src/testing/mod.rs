//! Test support for the provider.
//!
//! [`ProviderHarness`] drives an [`IotProvider`] wired to in-memory AWS
//! clients, without a gRPC server in between.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_iot::testing::ProviderHarness;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let harness = ProviderHarness::immediate();
//! let state = harness
//!     .create("aws_iotanalytics_channel", json!({"name": "telemetry"}))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(state["id"], "telemetry");
//! assert_eq!(harness.iotanalytics.calls("CreateChannel"), 1);
//! # });
//! ```

mod fakes;

pub use fakes::{FakeGreengrass, FakeIotAnalytics};

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::{ProviderConfig, CLIENT_TOKEN_ENV};
use crate::error::ProviderError;
use crate::provider::IotProvider;
use crate::retry::DEFAULT_RETRY_DELAYS_SECS;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::PlanResult;

/// An [`IotProvider`] over fake clients, plus handles to those fakes.
pub struct ProviderHarness {
    provider: IotProvider,
    /// The IoT Analytics fake the provider talks to.
    pub iotanalytics: Arc<FakeIotAnalytics>,
    /// The Greengrass fake the provider talks to.
    pub greengrass: Arc<FakeGreengrass>,
}

impl Default for ProviderHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderHarness {
    /// A harness using the default retry schedule. Pair with
    /// `#[tokio::test(start_paused = true)]` to skip the real sleeps.
    pub fn new() -> Self {
        Self::with_config(ProviderConfig::default())
    }

    /// A harness whose retrier makes the default number of attempts without
    /// sleeping.
    pub fn immediate() -> Self {
        Self::with_config(ProviderConfig {
            mutation_retry_delays: vec![0; DEFAULT_RETRY_DELAYS_SECS.len()],
            ..ProviderConfig::default()
        })
    }

    /// A harness starting from `config`. The process environment is never
    /// consulted.
    pub fn with_config(config: ProviderConfig) -> Self {
        let iotanalytics = Arc::new(FakeIotAnalytics::default());
        let greengrass = Arc::new(FakeGreengrass::default());
        let provider = IotProvider::new(iotanalytics.clone(), greengrass.clone())
            .with_config(config)
            .with_env_lookup(|_| None);

        Self {
            provider,
            iotanalytics,
            greengrass,
        }
    }

    /// Pretend `AMZN_CLIENT_TOKEN` is set to `token`.
    pub fn with_client_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.provider = self
            .provider
            .with_env_lookup(move |key| (key == CLIENT_TOKEN_ENV).then(|| token.clone()));
        self
    }

    /// The provider under test.
    pub fn provider(&self) -> &IotProvider {
        &self.provider
    }

    /// Take the provider out, e.g. to put it behind a server. The fakes stay
    /// reachable through clones of the `Arc`s taken beforehand.
    pub fn into_provider(self) -> IotProvider {
        self.provider
    }

    // =========================================================================
    // Provider lifecycle
    // =========================================================================

    /// The provider schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Validate a provider config, failing on error diagnostics.
    pub async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Diagnostics for a resource config, errors included.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider
            .validate_resource_config(resource_type, config)
            .await
    }

    // =========================================================================
    // Plan
    // =========================================================================

    /// Plan creating a resource.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed.clone(), proposed)
            .await
    }

    /// Plan moving a resource from `prior` to `proposed`.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior: Value,
        proposed: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior), proposed.clone(), proposed)
            .await
    }

    /// Plan destroying a resource.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior), Value::Null, Value::Null)
            .await
    }

    // =========================================================================
    // Apply
    // =========================================================================

    /// Create a resource.
    pub async fn create(&self, resource_type: &str, planned: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned).await
    }

    /// Refresh a resource.
    pub async fn read(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.update(resource_type, prior, planned).await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, state).await
    }

    /// Import a resource by ID and return its state.
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<Value, ProviderError> {
        self.provider
            .import_resource(resource_type, id)
            .await?
            .into_iter()
            .next()
            .map(|imported| imported.state)
            .ok_or_else(|| ProviderError::InvalidRequest(format!("nothing imported for {}", id)))
    }

    // =========================================================================
    // Full lifecycles
    // =========================================================================

    /// Validate, plan and create a resource.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        check_diagnostics(self.validate_resource_config(resource_type, config.clone()).await?)?;
        let plan = self.plan_create(resource_type, config).await?;
        Ok(self.create(resource_type, plan.planned_state).await?)
    }

    /// Validate, plan and apply an update, refusing plans that replace.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        state: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        check_diagnostics(self.validate_resource_config(resource_type, config.clone()).await?)?;
        let plan = self.plan_update(resource_type, state.clone(), config).await?;
        if plan.requires_replace {
            return Err(TestError::Replacement(
                plan.changes.into_iter().map(|c| c.path).collect(),
            ));
        }
        Ok(self.update(resource_type, state, plan.planned_state).await?)
    }

    /// Plan and apply a destroy.
    pub async fn lifecycle_delete(&self, resource_type: &str, state: Value) -> Result<(), TestError> {
        self.plan_delete(resource_type, state.clone()).await?;
        Ok(self.delete(resource_type, state).await?)
    }

    /// Create, read back, update and delete a resource.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        create_config: Value,
        update_config: Value,
    ) -> Result<(), TestError> {
        let created = self.lifecycle_create(resource_type, create_config).await?;
        let refreshed = self.read(resource_type, created).await?;
        let updated = self
            .lifecycle_update(resource_type, refreshed, update_config)
            .await?;
        self.lifecycle_delete(resource_type, updated).await
    }
}

/// Why a harness operation failed.
#[derive(Debug, Error)]
pub enum TestError {
    /// The provider answered with error diagnostics.
    #[error("{}", format_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// An update plan required replacement.
    #[error("plan requires replacement, changed: {}", .0.join(", "))]
    Replacement(Vec<String>),

    /// The provider returned an error.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| {
            let mut line = d.summary.clone();
            if let Some(attribute) = &d.attribute {
                line.push_str(&format!(" ({})", attribute));
            }
            if let Some(detail) = &d.detail {
                line.push_str(&format!(": {}", detail));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>, TestError> {
    if diagnostics.iter().any(Diagnostic::is_error) {
        Err(TestError::Diagnostics(diagnostics))
    } else {
        Ok(diagnostics)
    }
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert the plan creates without replacing.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert the plan changes nothing.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, got: {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert the plan replaces the resource.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, changes: {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert the plan changes the resource in place.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "Expected changes, got none");
    assert!(
        !plan.requires_replace,
        "Expected an in-place update, but the plan replaces"
    );
}

/// Assert the plan touches `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected a change to '{}', changed: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert the plan leaves `path` alone.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changes.iter().any(|c| c.path == path),
        "Expected no change to '{}'",
        path
    );
}

/// Assert no diagnostic is an error.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    assert!(
        !diagnostics.iter().any(Diagnostic::is_error),
        "Expected no errors, got: {}",
        format_diagnostics(diagnostics)
    );
}

/// Assert at least one diagnostic is an error.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.iter().any(Diagnostic::is_error),
        "Expected at least one error, but got none"
    );
}

/// Assert an error diagnostic's summary or detail contains `substring`.
pub fn assert_diagnostic_contains(diagnostics: &[Diagnostic], substring: &str) {
    let found = diagnostics.iter().filter(|d| d.is_error()).any(|d| {
        d.summary.contains(substring)
            || d.detail.as_deref().is_some_and(|detail| detail.contains(substring))
    });
    assert!(
        found,
        "Expected an error containing '{}', got: {}",
        substring,
        format_diagnostics(diagnostics)
    );
}

/// Assert the error message contains `substring`.
pub fn assert_error_contains(err: &ProviderError, substring: &str) {
    let message = err.to_string();
    assert!(
        message.contains(substring),
        "Expected an error containing '{}', got '{}'",
        substring,
        message
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_configure_rejects_error_diagnostics() {
        let harness = ProviderHarness::immediate();
        let err = harness
            .configure(json!({"mutation_retry_delays": [1, 900]}))
            .await
            .unwrap_err();

        match &err {
            TestError::Diagnostics(diags) => {
                assert_diagnostic_contains(diags, "Retry delay too long")
            },
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.to_string().contains("mutation_retry_delays.1"));
    }

    #[tokio::test]
    async fn test_configure_passes_warnings_through() {
        let harness = ProviderHarness::immediate();
        let diags = harness.configure(json!({"client_token": ""})).await.unwrap();
        assert_eq!(diags.len(), 1);
        assert_no_errors(&diags);
    }

    #[tokio::test]
    async fn test_plan_helpers() {
        let harness = ProviderHarness::immediate();
        let config = json!({"name": "archive", "storage": [], "retention_period": []});

        let plan = harness
            .plan_create("aws_iotanalytics_datastore", config.clone())
            .await
            .unwrap();
        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "name");

        let state = harness
            .create("aws_iotanalytics_datastore", plan.planned_state)
            .await
            .unwrap();
        let plan = harness
            .plan_update("aws_iotanalytics_datastore", state.clone(), state.clone())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        let mut retained = state.clone();
        retained["retention_period"] = json!([{"number_of_days": 7, "unlimited": null}]);
        let plan = harness
            .plan_update("aws_iotanalytics_datastore", state.clone(), retained)
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);
        assert_plan_does_not_change_attribute(&plan, "name");

        let plan = harness
            .plan_delete("aws_iotanalytics_datastore", state)
            .await
            .unwrap();
        assert_eq!(plan.planned_state, Value::Null);
    }

    #[tokio::test]
    async fn test_lifecycle_crud() {
        let harness = ProviderHarness::immediate();
        harness
            .lifecycle_crud(
                "aws_greengrass_logger_definition",
                json!({"name": "logs"}),
                json!({
                    "name": "logs",
                    "logger_definition_version": [{
                        "logger": [{"component": "Lambda", "id": "l", "level": "INFO", "type": "AWSCloudWatch"}]
                    }]
                }),
            )
            .await
            .unwrap();

        assert_eq!(harness.greengrass.calls("CreateLoggerDefinitionVersion"), 1);
        assert_eq!(harness.greengrass.calls("DeleteLoggerDefinition"), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_update_refuses_replacement() {
        let harness = ProviderHarness::immediate();
        let state = harness
            .lifecycle_create("aws_iotanalytics_channel", json!({"name": "a"}))
            .await
            .unwrap();

        let err = harness
            .lifecycle_update("aws_iotanalytics_channel", state, json!({"name": "b"}))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Replacement(paths) if paths.contains(&"name".to_string())));
    }

    #[tokio::test]
    async fn test_lifecycle_create_stops_on_invalid_config() {
        let harness = ProviderHarness::immediate();
        let err = harness
            .lifecycle_create("aws_greengrass_group", json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, TestError::Diagnostics(_)));
        assert_eq!(harness.greengrass.calls("CreateGroup"), 0);
    }

    #[test]
    fn test_error_display_lists_diagnostics() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);
        let display = err.to_string();
        assert!(display.contains("First error (field1)"));
        assert!(display.contains("Second error: More info"));
    }
}
