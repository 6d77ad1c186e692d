use log::debug;
use serde_json::{Map, Value};

use super::{OperationBatch, OperationDescriptor, OperationRequest};
use crate::error::TaskError;

pub const DELETE_SNAPSHOT: &str = "deleteSnapshot";
pub const SNAPSHOT_ID: &str = "snapshotId";

/// Turns a request into one descriptor per resource identifier.
///
/// Resource-deletion tasks share this builder and differ only in the
/// operation kind and the parameter name carrying the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBatchBuilder {
    operation_kind: String,
    identifier_field: String,
}

impl OperationBatchBuilder {
    pub fn new(operation_kind: impl Into<String>, identifier_field: impl Into<String>) -> Self {
        Self {
            operation_kind: operation_kind.into(),
            identifier_field: identifier_field.into(),
        }
    }

    pub fn delete_snapshot() -> Self {
        Self::new(DELETE_SNAPSHOT, SNAPSHOT_ID)
    }

    pub fn operation_kind(&self) -> &str {
        &self.operation_kind
    }

    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }

    pub fn build(&self, request: &OperationRequest) -> Result<OperationBatch, TaskError> {
        request.validate()?;

        let operations: Vec<OperationDescriptor> = request
            .resource_identifiers()
            .iter()
            .map(|identifier| {
                let mut parameters = Map::new();
                parameters.insert(
                    "credentials".to_string(),
                    Value::String(request.credentials().to_string()),
                );
                parameters.insert(
                    "region".to_string(),
                    Value::String(request.region().to_string()),
                );
                parameters.insert(
                    self.identifier_field.clone(),
                    Value::String(identifier.clone()),
                );
                OperationDescriptor::new(self.operation_kind.clone(), parameters)
            })
            .collect();

        debug!(
            "Built {} '{}' operation(s) for provider '{}'",
            operations.len(),
            self.operation_kind,
            request.provider_type()
        );

        Ok(OperationBatch::new(request.provider_type(), operations))
    }
}
