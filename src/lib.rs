//! Hemmer provider for AWS IoT Analytics and AWS Greengrass.
//!
//! Manages five resource types over the Hemmer provider protocol:
//!
//! | Resource | Remote object |
//! |---|---|
//! | `aws_iotanalytics_channel` | IoT Analytics channel |
//! | `aws_iotanalytics_datastore` | IoT Analytics datastore |
//! | `aws_iotanalytics_dataset` | IoT Analytics dataset |
//! | `aws_greengrass_group` | Greengrass group and its latest group version |
//! | `aws_greengrass_logger_definition` | Greengrass logger definition and its latest version |
//!
//! The provider holds no AWS credentials. It is built around two client
//! traits, [`IotAnalyticsApi`] and [`GreengrassApi`], which the embedding
//! binary implements on top of its AWS SDK of choice.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use hemmer_provider_iot::{init_logging, serve, IotProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hemmer_provider_iot::ProviderError> {
//!     init_logging();
//!     let provider = IotProvider::new(Arc::new(SdkIotAnalytics::new()), Arc::new(SdkGreengrass::new()));
//!     serve(provider).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! [`serve`] prints one line to stdout and then serves gRPC on that address:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! # Role propagation
//!
//! IoT Analytics rejects a channel or datastore whose storage role was
//! created moments earlier. Channel and datastore create and update calls
//! therefore go through [`MutationRetrier`], which replays them after 1, 2,
//! 5, 8 and 10 seconds before giving up with the last error. See [`retry`].

#![warn(clippy::all)]

pub mod api;
pub mod attrs;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use api::{ApiError, ApiErrorKind, GreengrassApi, IotAnalyticsApi};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::IotProvider;
pub use retry::{MutationRetrier, RetrySchedule};
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{validate, validate_result};

pub use async_trait::async_trait;
