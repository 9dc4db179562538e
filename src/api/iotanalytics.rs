//! AWS IoT Analytics request/response shapes and client trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// S3 bucket owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerManagedS3Storage {
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    pub role_arn: String,
}

/// S3 storage managed by the service. Carries no settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceManagedS3Storage {}

/// Where a channel or datastore keeps its data.
///
/// Channels and datastores use the same shape, so one type serves both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Storage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_managed_s3: Option<CustomerManagedS3Storage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_managed_s3: Option<ServiceManagedS3Storage>,
}

/// `ChannelStorage` in the IoT Analytics API.
pub type ChannelStorage = S3Storage;

/// `DatastoreStorage` in the IoT Analytics API.
pub type DatastoreStorage = S3Storage;

/// How long data is kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetentionPeriod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<bool>,
}

/// Body of `CreateChannel` and `UpdateChannel`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChannelRequest {
    pub channel_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_storage: Option<ChannelStorage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<RetentionPeriod>,
}

/// `Channel` as returned by `DescribeChannel`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub storage: Option<ChannelStorage>,
    #[serde(default)]
    pub retention_period: Option<RetentionPeriod>,
}

/// Body of `CreateDatastore` and `UpdateDatastore`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatastoreRequest {
    pub datastore_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore_storage: Option<DatastoreStorage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<RetentionPeriod>,
}

/// `Datastore` as returned by `DescribeDatastore`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Datastore {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub storage: Option<DatastoreStorage>,
    #[serde(default)]
    pub retention_period: Option<RetentionPeriod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeltaTime {
    pub offset_seconds: i64,
    pub time_expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryFilter {
    pub delta_time: DeltaTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqlQueryDatasetAction {
    pub sql_query: String,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceConfiguration {
    pub compute_type: String,
    #[serde(rename = "VolumeSizeInGB")]
    pub volume_size_in_gb: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetContentVersionValue {
    pub dataset_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputFileUriValue {
    pub file_name: String,
}

/// A value passed to a container action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Variable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_content_version_value: Option<DatasetContentVersionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_uri_value: Option<OutputFileUriValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDatasetAction {
    pub image: String,
    pub execution_role_arn: String,
    pub resource_configuration: ResourceConfiguration,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// One step that produces dataset content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetAction {
    pub action_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_action: Option<SqlQueryDatasetAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_action: Option<ContainerDatasetAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IotEventsDestinationConfiguration {
    pub input_name: String,
    pub role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlueConfiguration {
    pub database_name: String,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3DestinationConfiguration {
    pub bucket: String,
    pub key: String,
    pub role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glue_configuration: Option<GlueConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetContentDeliveryDestination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iot_events_destination_configuration: Option<IotEventsDestinationConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_destination_configuration: Option<S3DestinationConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetContentDeliveryRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_name: Option<String>,
    pub destination: DatasetContentDeliveryDestination,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Schedule {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersioningConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_versions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<bool>,
}

/// Body of `CreateDataset` and `UpdateDataset`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetRequest {
    pub dataset_name: String,
    pub actions: Vec<DatasetAction>,
    #[serde(default)]
    pub content_delivery_rules: Vec<DatasetContentDeliveryRule>,
    #[serde(default)]
    pub triggers: Vec<DatasetTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<RetentionPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning_configuration: Option<VersioningConfiguration>,
}

/// `Dataset` as returned by `DescribeDataset`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dataset {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub actions: Vec<DatasetAction>,
    #[serde(default)]
    pub content_delivery_rules: Vec<DatasetContentDeliveryRule>,
    #[serde(default)]
    pub triggers: Vec<DatasetTrigger>,
    #[serde(default)]
    pub retention_period: Option<RetentionPeriod>,
    #[serde(default)]
    pub versioning_configuration: Option<VersioningConfiguration>,
}

/// The subset of the IoT Analytics control plane used by the provider.
#[async_trait]
pub trait IotAnalyticsApi: Send + Sync {
    async fn create_channel(&self, request: &ChannelRequest) -> Result<(), ApiError>;
    async fn describe_channel(&self, name: &str) -> Result<Channel, ApiError>;
    async fn update_channel(&self, request: &ChannelRequest) -> Result<(), ApiError>;
    async fn delete_channel(&self, name: &str) -> Result<(), ApiError>;

    async fn create_datastore(&self, request: &DatastoreRequest) -> Result<(), ApiError>;
    async fn describe_datastore(&self, name: &str) -> Result<Datastore, ApiError>;
    async fn update_datastore(&self, request: &DatastoreRequest) -> Result<(), ApiError>;
    async fn delete_datastore(&self, name: &str) -> Result<(), ApiError>;

    async fn create_dataset(&self, request: &DatasetRequest) -> Result<(), ApiError>;
    async fn describe_dataset(&self, name: &str) -> Result<Dataset, ApiError>;
    async fn update_dataset(&self, request: &DatasetRequest) -> Result<(), ApiError>;
    async fn delete_dataset(&self, name: &str) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_request_wire_shape() {
        let request = ChannelRequest {
            channel_name: "telemetry".to_string(),
            channel_storage: Some(S3Storage {
                customer_managed_s3: Some(CustomerManagedS3Storage {
                    bucket: "raw-bucket".to_string(),
                    key_prefix: None,
                    role_arn: "arn:aws:iam::123456789012:role/channel".to_string(),
                }),
                service_managed_s3: None,
            }),
            retention_period: Some(RetentionPeriod {
                number_of_days: Some(30),
                unlimited: None,
            }),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "ChannelName": "telemetry",
                "ChannelStorage": {
                    "CustomerManagedS3": {
                        "Bucket": "raw-bucket",
                        "RoleArn": "arn:aws:iam::123456789012:role/channel"
                    }
                },
                "RetentionPeriod": {"NumberOfDays": 30}
            })
        );
    }

    #[test]
    fn test_resource_configuration_volume_name() {
        let config = ResourceConfiguration {
            compute_type: "ACU_1".to_string(),
            volume_size_in_gb: 2,
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["VolumeSizeInGB"], 2);

        let back: ResourceConfiguration = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_dataset_decodes_with_missing_lists() {
        let dataset: Dataset = serde_json::from_value(json!({
            "Name": "daily",
            "Actions": [{"ActionName": "q", "QueryAction": {"SqlQuery": "select * from ds"}}]
        }))
        .unwrap();

        assert_eq!(dataset.actions.len(), 1);
        assert!(dataset.triggers.is_empty());
        assert!(dataset.actions[0].query_action.as_ref().unwrap().filters.is_empty());
    }
}
