//! AWS Greengrass (v1) request/response shapes and client trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// `GetGroup` / `CreateGroup` output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupInformation {
    pub id: String,
    pub arn: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub latest_version_arn: Option<String>,
}

/// The definition versions a group version points at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupVersionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_definition_version_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_definition_version_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_definition_version_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_definition_version_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger_definition_version_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_definition_version_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_definition_version_arn: Option<String>,
}

/// Body of `CreateGroupVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGroupVersionRequest {
    pub group_id: String,
    /// Sent as the `X-Amzn-Client-Token` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amzn_client_token: Option<String>,
    #[serde(flatten)]
    pub definition: GroupVersionDefinition,
}

/// `GetGroupVersion` output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupVersion {
    pub id: String,
    pub arn: String,
    pub version: String,
    #[serde(default)]
    pub definition: GroupVersionDefinition,
}

/// Identity of a freshly created version of a group or definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInformation {
    pub id: String,
    pub arn: String,
    pub version: String,
}

/// `GetLoggerDefinition` / `CreateLoggerDefinition` output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefinitionInformation {
    pub id: String,
    pub arn: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub latest_version_arn: Option<String>,
}

/// A single logger entry of a logger definition version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Logger {
    pub component: String,
    pub id: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<i64>,
    #[serde(rename = "Type")]
    pub logger_type: String,
}

/// Body of `CreateLoggerDefinitionVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateLoggerDefinitionVersionRequest {
    pub logger_definition_id: String,
    /// Sent as the `X-Amzn-Client-Token` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amzn_client_token: Option<String>,
    #[serde(default)]
    pub loggers: Vec<Logger>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggerDefinitionVersionDefinition {
    #[serde(default)]
    pub loggers: Vec<Logger>,
}

/// `GetLoggerDefinitionVersion` output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggerDefinitionVersion {
    pub id: String,
    pub arn: String,
    pub version: String,
    #[serde(default)]
    pub definition: LoggerDefinitionVersionDefinition,
}

/// The subset of the Greengrass control plane used by the provider.
#[async_trait]
pub trait GreengrassApi: Send + Sync {
    async fn create_group(&self, name: &str) -> Result<GroupInformation, ApiError>;
    async fn get_group(&self, group_id: &str) -> Result<GroupInformation, ApiError>;
    async fn update_group(&self, group_id: &str, name: &str) -> Result<(), ApiError>;
    async fn delete_group(&self, group_id: &str) -> Result<(), ApiError>;

    async fn create_group_version(
        &self,
        request: &CreateGroupVersionRequest,
    ) -> Result<VersionInformation, ApiError>;
    async fn get_group_version(
        &self,
        group_id: &str,
        version_id: &str,
    ) -> Result<GroupVersion, ApiError>;

    async fn create_logger_definition(
        &self,
        name: Option<&str>,
    ) -> Result<DefinitionInformation, ApiError>;
    async fn get_logger_definition(
        &self,
        definition_id: &str,
    ) -> Result<DefinitionInformation, ApiError>;
    async fn update_logger_definition(
        &self,
        definition_id: &str,
        name: Option<&str>,
    ) -> Result<(), ApiError>;
    async fn delete_logger_definition(&self, definition_id: &str) -> Result<(), ApiError>;

    async fn create_logger_definition_version(
        &self,
        request: &CreateLoggerDefinitionVersionRequest,
    ) -> Result<VersionInformation, ApiError>;
    async fn get_logger_definition_version(
        &self,
        definition_id: &str,
        version_id: &str,
    ) -> Result<LoggerDefinitionVersion, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_version_request_flattens_definition() {
        let request = CreateGroupVersionRequest {
            group_id: "g-1".to_string(),
            amzn_client_token: Some("token-1".to_string()),
            definition: GroupVersionDefinition {
                core_definition_version_arn: Some("arn:core".to_string()),
                ..Default::default()
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "GroupId": "g-1",
                "AmznClientToken": "token-1",
                "CoreDefinitionVersionArn": "arn:core"
            })
        );
    }

    #[test]
    fn test_logger_type_field_name() {
        let logger: Logger = serde_json::from_value(json!({
            "Component": "Lambda",
            "Id": "lambda-logs",
            "Level": "INFO",
            "Type": "AWSCloudWatch"
        }))
        .unwrap();

        assert_eq!(logger.logger_type, "AWSCloudWatch");
        assert_eq!(logger.space, None);
    }
}
