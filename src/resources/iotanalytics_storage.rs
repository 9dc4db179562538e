//! Model and schema shared by IoT Analytics channels and datastores.
//!
//! Both resources carry a name, a storage choice between customer-managed
//! and service-managed S3, and a retention period.

use serde::{Deserialize, Serialize};

use crate::api::iotanalytics::{
    CustomerManagedS3Storage, RetentionPeriod, S3Storage, ServiceManagedS3Storage,
};
use crate::attrs::{self, single_block};
use crate::schema::{Attribute, Block, NestedBlock, Schema, ValueConstraint};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct StorageBackedModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default, with = "single_block")]
    pub storage: Option<StorageModel>,
    #[serde(default, with = "single_block")]
    pub retention_period: Option<RetentionPeriodModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct StorageModel {
    #[serde(default, with = "single_block")]
    pub customer_managed_s3: Option<CustomerManagedS3Model>,
    #[serde(default, with = "single_block")]
    pub service_managed_s3: Option<ServiceManagedS3Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct CustomerManagedS3Model {
    pub bucket: String,
    #[serde(default)]
    pub key_prefix: Option<String>,
    pub role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct ServiceManagedS3Model {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct RetentionPeriodModel {
    #[serde(default)]
    pub number_of_days: Option<i64>,
    #[serde(default)]
    pub unlimited: Option<bool>,
}

impl StorageModel {
    pub fn to_api(&self) -> S3Storage {
        S3Storage {
            customer_managed_s3: self.customer_managed_s3.as_ref().map(|s3| {
                CustomerManagedS3Storage {
                    bucket: s3.bucket.clone(),
                    key_prefix: attrs::non_empty(s3.key_prefix.clone()),
                    role_arn: s3.role_arn.clone(),
                }
            }),
            service_managed_s3: self
                .service_managed_s3
                .as_ref()
                .map(|_| ServiceManagedS3Storage {}),
        }
    }

    /// `None` when AWS reports neither storage variant.
    pub fn from_api(storage: &S3Storage) -> Option<Self> {
        let model = Self {
            customer_managed_s3: storage.customer_managed_s3.as_ref().map(|s3| {
                CustomerManagedS3Model {
                    bucket: s3.bucket.clone(),
                    key_prefix: s3.key_prefix.clone(),
                    role_arn: s3.role_arn.clone(),
                }
            }),
            service_managed_s3: storage
                .service_managed_s3
                .as_ref()
                .map(|_| ServiceManagedS3Model {}),
        };
        if model.customer_managed_s3.is_none() && model.service_managed_s3.is_none() {
            None
        } else {
            Some(model)
        }
    }
}

impl RetentionPeriodModel {
    pub fn to_api(&self) -> RetentionPeriod {
        RetentionPeriod {
            number_of_days: attrs::positive(self.number_of_days),
            unlimited: self.unlimited,
        }
    }

    pub fn from_api(retention: &RetentionPeriod) -> Option<Self> {
        if retention.number_of_days.is_none() && retention.unlimited.is_none() {
            return None;
        }
        Some(Self {
            number_of_days: retention.number_of_days,
            unlimited: retention.unlimited,
        })
    }
}

impl StorageBackedModel {
    pub fn storage_to_api(&self) -> Option<S3Storage> {
        self.storage.as_ref().map(StorageModel::to_api)
    }

    pub fn retention_to_api(&self) -> Option<RetentionPeriod> {
        self.retention_period.as_ref().map(RetentionPeriodModel::to_api)
    }

    /// State as read back from AWS. The name doubles as the id.
    pub fn from_remote(
        name: String,
        arn: Option<String>,
        storage: Option<&S3Storage>,
        retention: Option<&RetentionPeriod>,
    ) -> Self {
        Self {
            id: Some(name.clone()),
            name,
            arn,
            storage: storage.and_then(StorageModel::from_api),
            retention_period: retention.and_then(RetentionPeriodModel::from_api),
        }
    }
}

/// Schema for a channel or datastore.
pub(crate) fn storage_backed_schema(kind: &str) -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_description(format!("Name of the {}", kind))
                .with_force_new(),
        )
        .with_attribute("arn", Attribute::computed_string())
        .with_block("storage", storage_block())
        .with_block("retention_period", retention_period_block())
}

fn storage_block() -> NestedBlock {
    let customer_managed = Block::new()
        .with_attribute("bucket", Attribute::required_string())
        .with_attribute("key_prefix", Attribute::optional_string().with_empty_as_unset())
        .with_attribute(
            "role_arn",
            Attribute::required_string().with_constraint(ValueConstraint::Arn),
        );

    NestedBlock::at_most_one(
        Block::new()
            .with_block(
                "customer_managed_s3",
                NestedBlock::at_most_one(customer_managed)
                    .with_conflicts_with(&["service_managed_s3"]),
            )
            .with_block(
                "service_managed_s3",
                NestedBlock::at_most_one(Block::new())
                    .with_conflicts_with(&["customer_managed_s3"]),
            ),
    )
}

pub(crate) fn retention_period_block() -> NestedBlock {
    NestedBlock::at_most_one(
        Block::new()
            .with_attribute(
                "number_of_days",
                Attribute::optional_int64()
                    .with_constraint(ValueConstraint::IntAtLeast(1))
                    .with_conflicts_with(&["unlimited"])
                    .with_empty_as_unset(),
            )
            .with_attribute(
                "unlimited",
                Attribute::optional_bool().with_conflicts_with(&["number_of_days"]),
            ),
    )
}
