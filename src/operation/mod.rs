use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::TaskError;

pub mod builder;

pub use builder::OperationBatchBuilder;

/// Typed request decoded from a stage, valid for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    resource_identifiers: Vec<String>,
    credentials: String,
    region: String,
    provider_type: String,
}

impl OperationRequest {
    pub fn new(
        resource_identifiers: Vec<String>,
        credentials: impl Into<String>,
        region: impl Into<String>,
        provider_type: impl Into<String>,
    ) -> Self {
        Self {
            resource_identifiers,
            credentials: credentials.into(),
            region: region.into(),
            provider_type: provider_type.into(),
        }
    }

    pub fn resource_identifiers(&self) -> &[String] {
        &self.resource_identifiers
    }

    pub fn credentials(&self) -> &str {
        &self.credentials
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if self.resource_identifiers.is_empty() {
            return Err(TaskError::invalid_request(
                "at least one resource identifier is required",
            ));
        }
        if let Some(position) = self.resource_identifiers.iter().position(|id| id.is_empty()) {
            return Err(TaskError::invalid_request(format!(
                "resource identifier at position {} is empty",
                position
            )));
        }
        for (field, value) in [
            ("credentials", &self.credentials),
            ("region", &self.region),
            ("providerType", &self.provider_type),
        ] {
            if value.is_empty() {
                return Err(TaskError::invalid_request(format!(
                    "'{}' must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// One atomic instruction for the execution backend.
///
/// Serializes as `{ "<operation_kind>": { ...parameters } }`. Parameters are
/// held in a key-sorted map, so equal descriptors serialize to equal bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    operation_kind: String,
    parameters: Map<String, Value>,
}

impl OperationDescriptor {
    pub fn new(operation_kind: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            operation_kind: operation_kind.into(),
            parameters,
        }
    }

    pub fn operation_kind(&self) -> &str {
        &self.operation_kind
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }
}

impl Serialize for OperationDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.operation_kind, &self.parameters)?;
        map.end()
    }
}

/// Ordered descriptors submitted together under one provider type.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationBatch {
    provider_type: String,
    operations: Vec<OperationDescriptor>,
}

impl OperationBatch {
    pub fn new(provider_type: impl Into<String>, operations: Vec<OperationDescriptor>) -> Self {
        Self {
            provider_type: provider_type.into(),
            operations,
        }
    }

    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Wire payload: the JSON array of descriptors.
    pub fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.operations)
    }
}

impl Serialize for OperationBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.operations.serialize(serializer)
    }
}
