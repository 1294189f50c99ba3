//! Provenance envelope attached to every stored message.
//!
//! Each message carries an `etl` attribute listing the stages it passed
//! through. The broker appends one stage per push; the newest stage is
//! authoritative for the owning queue and is what the flush packer consults
//! to recover serials and timestamps from stored lines. Stages supplied by
//! producers are never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BrokerError, Result};

pub const ETL_FIELD: &str = "etl";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStage {
    pub url: String,
    pub timestamp: i64,
    #[serde(rename = "date/time")]
    pub date_time: String,
    pub serial: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlStage {
    pub queue: QueueStage,
}

/// Appends a stage to the message's `etl` list, creating the list when
/// absent and wrapping a non-list value into a single-element list.
pub fn append_stage(message: &mut Value, stage: EtlStage) -> Result<()> {
    let object = message.as_object_mut().ok_or(BrokerError::InvalidMessage)?;
    let stage = serde_json::to_value(stage)?;
    match object.get_mut(ETL_FIELD) {
        Some(Value::Array(stages)) => stages.push(stage),
        Some(other) => {
            let previous = other.take();
            object.insert(ETL_FIELD.to_string(), Value::Array(vec![previous, stage]));
        }
        None => {
            object.insert(ETL_FIELD.to_string(), Value::Array(vec![stage]));
        }
    }
    Ok(())
}

/// Recovers the newest queue stage from a stored line.
pub fn last_stage(line: &str) -> Result<QueueStage> {
    let value: Value = serde_json::from_str(line)?;
    let stage = value
        .get(ETL_FIELD)
        .and_then(Value::as_array)
        .and_then(|stages| stages.last())
        .cloned()
        .ok_or_else(|| {
            BrokerError::InvariantViolated("stored line carries no etl stage".to_string())
        })?;
    let stage: EtlStage = serde_json::from_value(stage)?;
    Ok(stage.queue)
}

/// Date partition (`YYYY/MM/DD`) for a message timestamp.
pub fn format_path(timestamp: i64) -> Result<String> {
    Ok(datetime(timestamp)?.format("%Y/%m/%d").to_string())
}

pub fn format_date_time(timestamp: i64) -> Result<String> {
    Ok(datetime(timestamp)?.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn datetime(timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        BrokerError::InvariantViolated(format!("timestamp {timestamp} is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stage(serial: i64) -> EtlStage {
        EtlStage {
            queue: QueueStage {
                url: format!("file:///tmp/backing/q/2026/08/01/{serial}.json"),
                timestamp: 1_785_000_000,
                date_time: "2026-07-25 01:20:00".to_string(),
                serial,
            },
        }
    }

    #[test]
    fn append_creates_etl_list() {
        let mut message = json!({"a": 1});
        append_stage(&mut message, stage(7)).unwrap();
        assert_eq!(message[ETL_FIELD].as_array().unwrap().len(), 1);
        assert_eq!(message[ETL_FIELD][0]["queue"]["serial"], json!(7));
    }

    #[test]
    fn append_preserves_producer_stages() {
        let mut message = json!({"a": 1, "etl": [{"source": {"id": "upstream"}}]});
        append_stage(&mut message, stage(2)).unwrap();
        let stages = message[ETL_FIELD].as_array().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0]["source"]["id"], json!("upstream"));
        assert_eq!(stages[1]["queue"]["serial"], json!(2));
    }

    #[test]
    fn append_wraps_non_list_etl() {
        let mut message = json!({"etl": {"source": {"id": "upstream"}}});
        append_stage(&mut message, stage(3)).unwrap();
        let stages = message[ETL_FIELD].as_array().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[1]["queue"]["serial"], json!(3));
    }

    #[test]
    fn append_rejects_non_object() {
        let mut message = json!([1, 2, 3]);
        assert!(matches!(
            append_stage(&mut message, stage(1)),
            Err(BrokerError::InvalidMessage)
        ));
    }

    #[test]
    fn last_stage_reads_newest_entry() {
        let mut message = json!({"a": 1, "etl": [{"source": {"id": "upstream"}}]});
        append_stage(&mut message, stage(5)).unwrap();
        let line = serde_json::to_string(&message).unwrap();
        let recovered = last_stage(&line).unwrap();
        assert_eq!(recovered.serial, 5);
        assert_eq!(recovered.timestamp, 1_785_000_000);
    }

    #[test]
    fn path_is_date_partitioned() {
        assert_eq!(format_path(0).unwrap(), "1970/01/01");
    }
}
