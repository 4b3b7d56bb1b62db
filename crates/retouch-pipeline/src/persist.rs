//! Pipeline persistence as `{kind, params}` records.
//!
//! A saved pipeline is a JSON array of records. Loading rebuilds each
//! record through the catalog; records whose kind is unknown or whose
//! parameters no longer validate are skipped and reported, so an old
//! preset still loads as much as it can.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::operation::Operation;
use crate::pipeline::Pipeline;
use crate::types::{OperationError, Params, PipelineError};

/// One serialized operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// Operation kind.
    pub kind: String,
    /// Operation parameters.
    #[serde(default)]
    pub params: Params,
}

impl PipelineRecord {
    /// Record describing `operation`.
    #[must_use]
    pub fn of(operation: &dyn Operation) -> Self {
        Self {
            kind: operation.kind().to_owned(),
            params: operation.params(),
        }
    }
}

/// A record that could not be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position in the input.
    pub index: usize,
    /// Kind as written.
    pub kind: String,
    /// Why it was skipped.
    pub error: OperationError,
}

/// Records for every operation in `pipeline`, in order.
#[must_use]
pub fn to_records(pipeline: &Pipeline) -> Vec<PipelineRecord> {
    pipeline.iter().map(|op| PipelineRecord::of(op.as_ref())).collect()
}

/// Rebuild a pipeline, skipping records that fail to build.
#[must_use]
pub fn from_records(
    records: &[PipelineRecord],
    catalog: &Catalog,
) -> (Pipeline, Vec<SkippedRecord>) {
    let mut operations = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match catalog.create(&record.kind, &record.params) {
            Ok(op) => operations.push(op),
            Err(error) => skipped.push(skip(index, record.kind.clone(), error)),
        }
    }

    (Pipeline::from_operations(operations), skipped)
}

fn skip(index: usize, kind: String, error: OperationError) -> SkippedRecord {
    tracing::warn!(index, %kind, %error, "skipping pipeline record");
    SkippedRecord { index, kind, error }
}

/// Pretty-printed JSON for `pipeline`.
///
/// # Errors
///
/// Returns [`PipelineError::Serialization`] if a parameter cannot be
/// encoded (non-finite floats).
pub fn to_json(pipeline: &Pipeline) -> Result<String, PipelineError> {
    Ok(serde_json::to_string_pretty(&to_records(pipeline))?)
}

/// Parse JSON written by [`to_json`] and rebuild the pipeline.
///
/// Each array element is decoded on its own: an element that is not a
/// valid `{kind, params}` record is skipped with
/// [`OperationError::MalformedRecord`] and the rest still load.
///
/// # Errors
///
/// Returns [`PipelineError::Serialization`] if `json` is not a JSON
/// array. Individual bad records are skipped, not errors.
pub fn from_json(
    json: &str,
    catalog: &Catalog,
) -> Result<(Pipeline, Vec<SkippedRecord>), PipelineError> {
    let elements: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut operations = Vec::with_capacity(elements.len());
    let mut skipped = Vec::new();

    for (index, element) in elements.into_iter().enumerate() {
        let written_kind = element
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let record = match serde_json::from_value::<PipelineRecord>(element) {
            Ok(record) => record,
            Err(error) => {
                let error = OperationError::MalformedRecord(error.to_string());
                skipped.push(skip(index, written_kind, error));
                continue;
            }
        };
        match catalog.create(&record.kind, &record.params) {
            Ok(op) => operations.push(op),
            Err(error) => skipped.push(skip(index, record.kind, error)),
        }
    }

    Ok((Pipeline::from_operations(operations), skipped))
}
