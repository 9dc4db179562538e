//! In-memory stand-ins for the IoT Analytics and Greengrass control planes.
//!
//! The fakes store whatever they are sent, assign identifiers the way AWS
//! does, and answer `ResourceNotFoundException` /
//! `ResourceAlreadyExistsException` where AWS would. Every call is counted,
//! and [`fail_next`](FakeIotAnalytics::fail_next) queues failures for a named
//! operation.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::api::greengrass::{
    CreateGroupVersionRequest, CreateLoggerDefinitionVersionRequest, DefinitionInformation,
    GroupInformation, GroupVersion, LoggerDefinitionVersion, LoggerDefinitionVersionDefinition,
    VersionInformation,
};
use crate::api::iotanalytics::{
    Channel, ChannelRequest, Dataset, DatasetRequest, Datastore, DatastoreRequest,
};
use crate::api::{ApiError, GreengrassApi, IotAnalyticsApi};

const IOTANALYTICS_ARN_PREFIX: &str = "arn:aws:iotanalytics:us-east-1:123456789012";
const GREENGRASS_ARN_PREFIX: &str = "arn:aws:greengrass:us-east-1:123456789012:/greengrass";

/// Call counts and queued failures, keyed by AWS operation name.
#[derive(Debug, Default)]
struct Faults {
    calls: BTreeMap<String, usize>,
    pending: BTreeMap<String, (usize, ApiError)>,
}

impl Faults {
    fn fail_next(&mut self, operation: &str, times: usize, err: ApiError) {
        if times == 0 {
            self.pending.remove(operation);
        } else {
            self.pending.insert(operation.to_string(), (times, err));
        }
    }

    /// Count the call and pop a queued failure, if any.
    fn record(&mut self, operation: &str) -> Result<(), ApiError> {
        *self.calls.entry(operation.to_string()).or_default() += 1;

        let (err, exhausted) = match self.pending.get_mut(operation) {
            Some((remaining, err)) => {
                *remaining -= 1;
                (err.clone(), *remaining == 0)
            },
            None => return Ok(()),
        };
        if exhausted {
            self.pending.remove(operation);
        }
        Err(err)
    }

    fn calls(&self, operation: &str) -> usize {
        self.calls.get(operation).copied().unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn missing(kind: &str, name: &str) -> ApiError {
    ApiError::not_found(format!("A resource with the name {} of type {} could not be found", name, kind))
}

// =========================================================================
// IoT Analytics
// =========================================================================

#[derive(Debug, Default)]
struct IotAnalyticsState {
    faults: Faults,
    channels: BTreeMap<String, Channel>,
    datastores: BTreeMap<String, Datastore>,
    datasets: BTreeMap<String, Dataset>,
}

/// Fake [`IotAnalyticsApi`] keeping channels, datastores and datasets in
/// memory.
#[derive(Debug, Default)]
pub struct FakeIotAnalytics {
    state: Mutex<IotAnalyticsState>,
}

impl FakeIotAnalytics {
    /// Fail the next `times` calls of `operation` (e.g. `"CreateChannel"`)
    /// with `err`. Failed calls change nothing.
    pub fn fail_next(&self, operation: &str, times: usize, err: ApiError) {
        lock(&self.state).faults.fail_next(operation, times, err);
    }

    /// How many times `operation` was called, failed calls included.
    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.state).faults.calls(operation)
    }

    /// The stored channel named `name`.
    pub fn channel(&self, name: &str) -> Option<Channel> {
        lock(&self.state).channels.get(name).cloned()
    }

    /// The stored datastore named `name`.
    pub fn datastore(&self, name: &str) -> Option<Datastore> {
        lock(&self.state).datastores.get(name).cloned()
    }

    /// The stored dataset named `name`.
    pub fn dataset(&self, name: &str) -> Option<Dataset> {
        lock(&self.state).datasets.get(name).cloned()
    }

    fn arn(kind: &str, name: &str) -> Option<String> {
        Some(format!("{}:{}/{}", IOTANALYTICS_ARN_PREFIX, kind, name))
    }

    fn channel_from(request: &ChannelRequest) -> Channel {
        Channel {
            name: request.channel_name.clone(),
            arn: Self::arn("channel", &request.channel_name),
            storage: request.channel_storage.clone(),
            retention_period: request.retention_period.clone(),
        }
    }

    fn datastore_from(request: &DatastoreRequest) -> Datastore {
        Datastore {
            name: request.datastore_name.clone(),
            arn: Self::arn("datastore", &request.datastore_name),
            storage: request.datastore_storage.clone(),
            retention_period: request.retention_period.clone(),
        }
    }

    fn dataset_from(request: &DatasetRequest) -> Dataset {
        Dataset {
            name: request.dataset_name.clone(),
            arn: Self::arn("dataset", &request.dataset_name),
            actions: request.actions.clone(),
            content_delivery_rules: request.content_delivery_rules.clone(),
            triggers: request.triggers.clone(),
            retention_period: request.retention_period.clone(),
            versioning_configuration: request.versioning_configuration.clone(),
        }
    }
}

/// Insert `value` under `name` unless the name is taken.
fn insert_new<T>(map: &mut BTreeMap<String, T>, kind: &str, name: &str, value: T) -> Result<(), ApiError> {
    if map.contains_key(name) {
        return Err(ApiError::already_exists(format!("{} {} already exists", kind, name)));
    }
    map.insert(name.to_string(), value);
    Ok(())
}

/// Replace the value stored under `name`, which must exist.
fn replace<T>(map: &mut BTreeMap<String, T>, kind: &str, name: &str, value: T) -> Result<(), ApiError> {
    match map.get_mut(name) {
        Some(slot) => {
            *slot = value;
            Ok(())
        },
        None => Err(missing(kind, name)),
    }
}

#[async_trait]
impl IotAnalyticsApi for FakeIotAnalytics {
    async fn create_channel(&self, request: &ChannelRequest) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("CreateChannel")?;
        insert_new(&mut state.channels, "channel", &request.channel_name, Self::channel_from(request))
    }

    async fn describe_channel(&self, name: &str) -> Result<Channel, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DescribeChannel")?;
        state.channels.get(name).cloned().ok_or_else(|| missing("channel", name))
    }

    async fn update_channel(&self, request: &ChannelRequest) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("UpdateChannel")?;
        replace(&mut state.channels, "channel", &request.channel_name, Self::channel_from(request))
    }

    async fn delete_channel(&self, name: &str) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DeleteChannel")?;
        state.channels.remove(name).map(drop).ok_or_else(|| missing("channel", name))
    }

    async fn create_datastore(&self, request: &DatastoreRequest) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("CreateDatastore")?;
        insert_new(
            &mut state.datastores,
            "datastore",
            &request.datastore_name,
            Self::datastore_from(request),
        )
    }

    async fn describe_datastore(&self, name: &str) -> Result<Datastore, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DescribeDatastore")?;
        state.datastores.get(name).cloned().ok_or_else(|| missing("datastore", name))
    }

    async fn update_datastore(&self, request: &DatastoreRequest) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("UpdateDatastore")?;
        replace(
            &mut state.datastores,
            "datastore",
            &request.datastore_name,
            Self::datastore_from(request),
        )
    }

    async fn delete_datastore(&self, name: &str) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DeleteDatastore")?;
        state.datastores.remove(name).map(drop).ok_or_else(|| missing("datastore", name))
    }

    async fn create_dataset(&self, request: &DatasetRequest) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("CreateDataset")?;
        insert_new(&mut state.datasets, "dataset", &request.dataset_name, Self::dataset_from(request))
    }

    async fn describe_dataset(&self, name: &str) -> Result<Dataset, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DescribeDataset")?;
        state.datasets.get(name).cloned().ok_or_else(|| missing("dataset", name))
    }

    async fn update_dataset(&self, request: &DatasetRequest) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("UpdateDataset")?;
        replace(&mut state.datasets, "dataset", &request.dataset_name, Self::dataset_from(request))
    }

    async fn delete_dataset(&self, name: &str) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DeleteDataset")?;
        state.datasets.remove(name).map(drop).ok_or_else(|| missing("dataset", name))
    }
}

// =========================================================================
// Greengrass
// =========================================================================

#[derive(Debug, Default)]
struct GreengrassState {
    faults: Faults,
    next_group: usize,
    next_definition: usize,
    next_version: usize,
    groups: BTreeMap<String, GroupInformation>,
    group_versions: BTreeMap<(String, String), GroupVersion>,
    logger_definitions: BTreeMap<String, DefinitionInformation>,
    logger_versions: BTreeMap<(String, String), LoggerDefinitionVersion>,
    group_version_requests: Vec<CreateGroupVersionRequest>,
    logger_version_requests: Vec<CreateLoggerDefinitionVersionRequest>,
}

impl GreengrassState {
    fn next_version_id(&mut self) -> String {
        self.next_version += 1;
        format!("version-{}", self.next_version)
    }
}

/// Fake [`GreengrassApi`] keeping groups, logger definitions and their
/// versions in memory.
///
/// Groups are numbered `group-1`, `group-2`, ...; logger definitions
/// `definition-1`, ...; versions share one counter, `version-1`, ....
#[derive(Debug, Default)]
pub struct FakeGreengrass {
    state: Mutex<GreengrassState>,
}

impl FakeGreengrass {
    /// Fail the next `times` calls of `operation` (e.g. `"DeleteGroup"`)
    /// with `err`.
    pub fn fail_next(&self, operation: &str, times: usize, err: ApiError) {
        lock(&self.state).faults.fail_next(operation, times, err);
    }

    /// How many times `operation` was called, failed calls included.
    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.state).faults.calls(operation)
    }

    /// Accepted `CreateGroupVersion` requests, oldest first.
    pub fn group_version_requests(&self) -> Vec<CreateGroupVersionRequest> {
        lock(&self.state).group_version_requests.clone()
    }

    /// Accepted `CreateLoggerDefinitionVersion` requests, oldest first.
    pub fn logger_version_requests(&self) -> Vec<CreateLoggerDefinitionVersionRequest> {
        lock(&self.state).logger_version_requests.clone()
    }
}

#[async_trait]
impl GreengrassApi for FakeGreengrass {
    async fn create_group(&self, name: &str) -> Result<GroupInformation, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("CreateGroup")?;

        state.next_group += 1;
        let id = format!("group-{}", state.next_group);
        let group = GroupInformation {
            arn: format!("{}/groups/{}", GREENGRASS_ARN_PREFIX, id),
            id: id.clone(),
            name: Some(name.to_string()),
            latest_version: None,
            latest_version_arn: None,
        };
        state.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, group_id: &str) -> Result<GroupInformation, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("GetGroup")?;
        state.groups.get(group_id).cloned().ok_or_else(|| missing("group", group_id))
    }

    async fn update_group(&self, group_id: &str, name: &str) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("UpdateGroup")?;
        let group = state.groups.get_mut(group_id).ok_or_else(|| missing("group", group_id))?;
        group.name = Some(name.to_string());
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DeleteGroup")?;
        state.groups.remove(group_id).ok_or_else(|| missing("group", group_id))?;
        state.group_versions.retain(|(owner, _), _| owner != group_id);
        Ok(())
    }

    async fn create_group_version(
        &self,
        request: &CreateGroupVersionRequest,
    ) -> Result<VersionInformation, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("CreateGroupVersion")?;

        let group_arn = state
            .groups
            .get(&request.group_id)
            .map(|group| group.arn.clone())
            .ok_or_else(|| missing("group", &request.group_id))?;
        let version_id = state.next_version_id();
        let info = VersionInformation {
            id: request.group_id.clone(),
            arn: format!("{}/versions/{}", group_arn, version_id),
            version: version_id.clone(),
        };

        state.group_versions.insert(
            (request.group_id.clone(), version_id.clone()),
            GroupVersion {
                id: info.id.clone(),
                arn: info.arn.clone(),
                version: version_id.clone(),
                definition: request.definition.clone(),
            },
        );
        if let Some(group) = state.groups.get_mut(&request.group_id) {
            group.latest_version = Some(version_id);
            group.latest_version_arn = Some(info.arn.clone());
        }
        state.group_version_requests.push(request.clone());
        Ok(info)
    }

    async fn get_group_version(
        &self,
        group_id: &str,
        version_id: &str,
    ) -> Result<GroupVersion, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("GetGroupVersion")?;
        state
            .group_versions
            .get(&(group_id.to_string(), version_id.to_string()))
            .cloned()
            .ok_or_else(|| missing("group version", version_id))
    }

    async fn create_logger_definition(
        &self,
        name: Option<&str>,
    ) -> Result<DefinitionInformation, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("CreateLoggerDefinition")?;

        state.next_definition += 1;
        let id = format!("definition-{}", state.next_definition);
        let definition = DefinitionInformation {
            arn: format!("{}/definition/loggers/{}", GREENGRASS_ARN_PREFIX, id),
            id: id.clone(),
            name: name.map(str::to_string),
            latest_version: None,
            latest_version_arn: None,
        };
        state.logger_definitions.insert(id, definition.clone());
        Ok(definition)
    }

    async fn get_logger_definition(
        &self,
        definition_id: &str,
    ) -> Result<DefinitionInformation, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("GetLoggerDefinition")?;
        state
            .logger_definitions
            .get(definition_id)
            .cloned()
            .ok_or_else(|| missing("logger definition", definition_id))
    }

    async fn update_logger_definition(
        &self,
        definition_id: &str,
        name: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("UpdateLoggerDefinition")?;
        let definition = state
            .logger_definitions
            .get_mut(definition_id)
            .ok_or_else(|| missing("logger definition", definition_id))?;
        definition.name = name.map(str::to_string);
        Ok(())
    }

    async fn delete_logger_definition(&self, definition_id: &str) -> Result<(), ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("DeleteLoggerDefinition")?;
        state
            .logger_definitions
            .remove(definition_id)
            .ok_or_else(|| missing("logger definition", definition_id))?;
        state.logger_versions.retain(|(owner, _), _| owner != definition_id);
        Ok(())
    }

    async fn create_logger_definition_version(
        &self,
        request: &CreateLoggerDefinitionVersionRequest,
    ) -> Result<VersionInformation, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("CreateLoggerDefinitionVersion")?;

        let definition_arn = state
            .logger_definitions
            .get(&request.logger_definition_id)
            .map(|definition| definition.arn.clone())
            .ok_or_else(|| missing("logger definition", &request.logger_definition_id))?;
        let version_id = state.next_version_id();
        let info = VersionInformation {
            id: request.logger_definition_id.clone(),
            arn: format!("{}/versions/{}", definition_arn, version_id),
            version: version_id.clone(),
        };

        state.logger_versions.insert(
            (request.logger_definition_id.clone(), version_id.clone()),
            LoggerDefinitionVersion {
                id: info.id.clone(),
                arn: info.arn.clone(),
                version: version_id.clone(),
                definition: LoggerDefinitionVersionDefinition {
                    loggers: request.loggers.clone(),
                },
            },
        );
        if let Some(definition) = state.logger_definitions.get_mut(&request.logger_definition_id) {
            definition.latest_version = Some(version_id);
            definition.latest_version_arn = Some(info.arn.clone());
        }
        state.logger_version_requests.push(request.clone());
        Ok(info)
    }

    async fn get_logger_definition_version(
        &self,
        definition_id: &str,
        version_id: &str,
    ) -> Result<LoggerDefinitionVersion, ApiError> {
        let mut state = lock(&self.state);
        state.faults.record("GetLoggerDefinitionVersion")?;
        state
            .logger_versions
            .get(&(definition_id.to_string(), version_id.to_string()))
            .cloned()
            .ok_or_else(|| missing("logger definition version", version_id))
    }
}
