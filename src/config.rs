//! Provider configuration.
//!
//! The host sends the provider block as a JSON object:
//!
//! ```text
//! provider "iot" {
//!   client_token          = "deploy-42"
//!   mutation_retry_delays = [1, 2, 5, 8, 10]
//! }
//! ```
//!
//! Both fields are optional. Without a configured `client_token` the value of
//! `AMZN_CLIENT_TOKEN` is used, when set and non-empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::retry::{RetrySchedule, DEFAULT_RETRY_DELAYS_SECS};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

/// Environment variable holding the idempotency token for version creation.
pub const CLIENT_TOKEN_ENV: &str = "AMZN_CLIENT_TOKEN";

/// Largest number of retry gaps that may be configured.
pub const MAX_RETRY_DELAYS: usize = 10;

/// Largest single retry gap, in seconds.
pub const MAX_RETRY_DELAY_SECS: u64 = 300;

/// Decoded provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Idempotency token forwarded on version-creation calls.
    pub client_token: Option<String>,
    /// Gaps between mutation attempts, in seconds.
    pub mutation_retry_delays: Vec<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_token: None,
            mutation_retry_delays: DEFAULT_RETRY_DELAYS_SECS.to_vec(),
        }
    }
}

impl ProviderConfig {
    /// Decode the host's provider block. A null block is the default config.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(fields) => {
                let present: serde_json::Map<String, Value> = fields
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                serde_json::from_value(Value::Object(present))
                    .map_err(|e| ProviderError::Configuration(e.to_string()))
            },
            other => Err(ProviderError::Configuration(format!(
                "provider configuration must be an object, got {}",
                other
            ))),
        }
    }

    /// The provider configuration schema published to the host.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "client_token",
                Attribute::optional_string().with_description(
                    "Idempotency token for version creation; overrides AMZN_CLIENT_TOKEN",
                ),
            )
            .with_attribute(
                "mutation_retry_delays",
                Attribute::new(
                    AttributeType::list(AttributeType::Int64),
                    AttributeFlags::optional(),
                )
                .with_description("Seconds slept between attempts of a mutating call"),
            )
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if self.mutation_retry_delays.len() > MAX_RETRY_DELAYS {
            diagnostics.push(
                Diagnostic::error("Too many retry delays")
                    .with_detail(format!(
                        "at most {} delays may be configured, got {}",
                        MAX_RETRY_DELAYS,
                        self.mutation_retry_delays.len()
                    ))
                    .with_attribute("mutation_retry_delays"),
            );
        }

        for (index, delay) in self.mutation_retry_delays.iter().enumerate() {
            if *delay > MAX_RETRY_DELAY_SECS {
                diagnostics.push(
                    Diagnostic::error("Retry delay too long")
                        .with_detail(format!(
                            "{}s exceeds the maximum of {}s",
                            delay, MAX_RETRY_DELAY_SECS
                        ))
                        .with_attribute(format!("mutation_retry_delays.{}", index)),
                );
            }
        }

        if matches!(&self.client_token, Some(token) if token.is_empty()) {
            diagnostics.push(
                Diagnostic::warning("Empty client token")
                    .with_detail(format!("an empty token is ignored; {} is used instead", CLIENT_TOKEN_ENV))
                    .with_attribute("client_token"),
            );
        }

        diagnostics
    }

    /// The retry schedule described by `mutation_retry_delays`.
    pub fn retry_schedule(&self) -> RetrySchedule {
        RetrySchedule::from_secs(&self.mutation_retry_delays)
    }

    /// The token to forward on version-creation calls. `lookup` reads the
    /// environment when no token is configured.
    pub fn resolve_client_token(
        &self,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Option<String> {
        match &self.client_token {
            Some(token) if !token.is_empty() => Some(token.clone()),
            _ => lookup(CLIENT_TOKEN_ENV).filter(|token| !token.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_null_config_is_default() {
        let config = ProviderConfig::from_value(&Value::Null).unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.retry_schedule().attempts(), 6);
    }

    #[test]
    fn test_null_fields_use_defaults() {
        let config = ProviderConfig::from_value(&json!({
            "client_token": null,
            "mutation_retry_delays": null
        }))
        .unwrap();
        assert_eq!(config.mutation_retry_delays, vec![1, 2, 5, 8, 10]);
    }

    #[test]
    fn test_custom_delays() {
        let config =
            ProviderConfig::from_value(&json!({"mutation_retry_delays": [0, 0]})).unwrap();
        let schedule = config.retry_schedule();
        assert_eq!(schedule.attempts(), 3);
        assert_eq!(schedule.total_delay(), Duration::ZERO);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProviderConfig::from_value(&json!({"region": "us-east-1"})).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(ProviderConfig::from_value(&json!("token")).is_err());
    }

    #[test]
    fn test_validate_bounds() {
        let config = ProviderConfig {
            client_token: None,
            mutation_retry_delays: vec![1; 11],
        };
        let diags = config.validate();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Too many retry delays");

        let config = ProviderConfig {
            client_token: None,
            mutation_retry_delays: vec![1, 301],
        };
        let diags = config.validate();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("mutation_retry_delays.1"));
    }

    #[test]
    fn test_empty_client_token_warns() {
        let config = ProviderConfig {
            client_token: Some(String::new()),
            ..Default::default()
        };
        let diags = config.validate();
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
    }

    #[test]
    fn test_client_token_resolution() {
        let env = |value: Option<&str>| {
            let value = value.map(str::to_string);
            move |key: &str| {
                assert_eq!(key, CLIENT_TOKEN_ENV);
                value
            }
        };

        let unset = ProviderConfig::default();
        assert_eq!(unset.resolve_client_token(env(None)), None);
        assert_eq!(unset.resolve_client_token(env(Some(""))), None);
        assert_eq!(
            unset.resolve_client_token(env(Some("from-env"))),
            Some("from-env".to_string())
        );

        let configured = ProviderConfig {
            client_token: Some("explicit".to_string()),
            ..Default::default()
        };
        assert_eq!(
            configured.resolve_client_token(env(Some("from-env"))),
            Some("explicit".to_string())
        );

        let empty = ProviderConfig {
            client_token: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            empty.resolve_client_token(env(Some("from-env"))),
            Some("from-env".to_string())
        );
    }

    #[test]
    fn test_schema_lists_fields() {
        let schema = ProviderConfig::schema();
        assert!(schema.block.attributes.contains_key("client_token"));
        assert!(schema.block.attributes.contains_key("mutation_retry_delays"));
    }
}
