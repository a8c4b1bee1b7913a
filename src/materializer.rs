use chrono::DateTime;
use serde_json::Value;

use crate::accumulator::{Buffer, Row, KEY_SEPARATOR};
use crate::entity::{Entity, EntityKind};

/// Turns a finished buffer into one flat row per bucket.
pub fn materialize(buffer: Buffer, entity: &Entity, kind: EntityKind) -> Vec<Row> {
    let policy = kind.policy();

    buffer
        .into_rows()
        .map(|(key, mut row)| {
            let bucket = key.split(KEY_SEPARATOR).next().unwrap_or_default();
            row.insert("date".to_string(), Value::String(calendar_date(bucket)));
            row.insert(policy.id_column.to_string(), Value::String(entity.id.clone()));
            row.insert(policy.name_column.to_string(), optional(&entity.name));
            if policy.created_time {
                row.insert("created_time".to_string(), optional(&entity.created_time));
            }
            row
        })
        .collect()
}

/// `2020-01-01T00:00:00+0000` becomes `2020-01-01`; anything else is kept as is.
///
/// RFC 3339 forms (`Z`, `+00:00`) are accepted as well.
fn calendar_date(bucket: &str) -> String {
    let parsed = DateTime::parse_from_str(bucket, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(bucket));
    match parsed {
        Ok(ts) => ts.date_naive().to_string(),
        Err(_) => bucket.to_string(),
    }
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}
