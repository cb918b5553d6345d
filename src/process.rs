use base64::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::events::{
    FirehoseEvent, FirehoseRecord, FirehoseResponse, FirehoseResponseRecord, RecordResult,
};
use crate::transform::{self, Rule, TransformError};

/// Applies a fixed list of rules to every record of a Firehose batch.
///
/// Built once at cold start and shared by every invocation; it holds no
/// mutable state, so records can be handled in any order without changing
/// the result.
pub struct RecordTransformer<C = SystemClock> {
    rules: Vec<Rule>,
    clock: C,
}

impl<C: Clock> RecordTransformer<C> {
    pub fn new(rules: &[Rule], clock: C) -> Self {
        RecordTransformer {
            rules: rules.to_vec(),
            clock,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// decode -> parse -> apply rules -> serialize -> encode
    pub fn transform_payload(&self, data: &str) -> Result<String, TransformError> {
        let bytes = BASE64_STANDARD
            .decode(data)
            .map_err(|e| TransformError::Decode(e.to_string()))?;
        let payload = String::from_utf8(bytes).map_err(|e| TransformError::Decode(e.to_string()))?;
        debug!("decoded payload: {}", payload);

        let mapping = match serde_json::from_str::<Value>(&payload) {
            Ok(Value::Object(mapping)) => mapping,
            Ok(other) => {
                return Err(TransformError::Parse(format!(
                    "expected a JSON object at top level, got {}",
                    json_type_name(&other)
                )))
            }
            Err(e) => return Err(TransformError::Parse(e.to_string())),
        };

        let transformed = transform::apply_rules(mapping, &self.rules, &self.clock)?;

        let encoded = serde_json::to_string(&Value::Object(transformed))
            .map_err(|e| TransformError::Serialization(e.to_string()))?;
        debug!("transformed payload: {}", encoded);

        Ok(BASE64_STANDARD.encode(encoded.as_bytes()))
    }

    /// Transform a single record. Failures pass the original payload through
    /// with a `ProcessingFailed` status.
    pub fn process_record(&self, record: &FirehoseRecord) -> FirehoseResponseRecord {
        match self.transform_payload(&record.data) {
            Ok(data) => FirehoseResponseRecord {
                record_id: record.record_id.clone(),
                result: RecordResult::Ok,
                data,
            },
            Err(e) => {
                warn!(
                    record_id = %record.record_id,
                    kind = e.kind(),
                    "record transformation failed, passing original payload through: {}",
                    e
                );
                FirehoseResponseRecord {
                    record_id: record.record_id.clone(),
                    result: RecordResult::ProcessingFailed,
                    data: record.data.clone(),
                }
            }
        }
    }

    // transform_firehose_event - transforms every record of the batch, in order
    pub fn transform_firehose_event(&self, event: &FirehoseEvent) -> FirehoseResponse {
        info!(
            total_records = event.records.len(),
            invocation_id = event.invocation_id.as_deref().unwrap_or("-"),
            delivery_stream = event.delivery_stream_arn.as_deref().unwrap_or("-"),
            region = event.region.as_deref().unwrap_or("-"),
            "firehose transform start"
        );

        let records: Vec<FirehoseResponseRecord> = event
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                debug!(record_index = idx, record_id = %record.record_id, "processing record");
                self.process_record(record)
            })
            .collect();

        let failed = records
            .iter()
            .filter(|r| r.result == RecordResult::ProcessingFailed)
            .count();
        info!(
            ok = records.len() - failed,
            failed,
            "firehose transform complete"
        );

        FirehoseResponse { records }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
