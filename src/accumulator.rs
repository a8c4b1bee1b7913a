//! Folding metric and event responses for one entity into a keyed buffer.
//!
//! One request is issued per metric (paired with one event name in event
//! mode). Each response is a list of values per time bucket; values land in
//! the buffer row for their bucket so that every metric of a day ends up on
//! the same output row.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::client::InsightsClient;
use crate::entity::Entity;
use crate::error::InsightsError;
use crate::retry::with_retry;
use crate::template::{model, render, UrlPatterns};

/// Separates the date from breakdown values inside a bucket key.
pub const KEY_SEPARATOR: &str = "__";
pub const LIFETIME_KEY: &str = "lifetime";

/// Events counted rather than summed.
const COUNT_EVENTS: [&str; 2] = ["fb_ad_network_imp", "fb_ad_network_click"];

pub type Row = Map<String, Value>;

pub fn aggregation_type(event: &str) -> &'static str {
    if COUNT_EVENTS.contains(&event) {
        "COUNT"
    } else {
        "SUM"
    }
}

/// Rows in progress, keyed by bucket.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Buffer {
    rows: BTreeMap<String, Row>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    pub fn into_rows(self) -> impl Iterator<Item = (String, Row)> {
        self.rows.into_iter()
    }

    /// Folds one value entry of a response into its bucket under `column`.
    pub fn fold(&mut self, entry: &Value, column: &str, breakdowns: &[String]) {
        let dimensions = entry.get("breakdowns").and_then(Value::as_object);

        let mut key = ["end_time", "time"]
            .iter()
            .filter_map(|field| entry.get(*field).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or(LIFETIME_KEY)
            .to_string();

        if let Some(dimensions) = dimensions {
            for value in dimensions.values() {
                key.push_str(KEY_SEPARATOR);
                key.push_str(&cell_text(value));
            }
        }

        let row = self.rows.entry(key).or_default();

        match entry.get("value") {
            Some(Value::Object(parts)) => {
                for (sub_metric, value) in parts {
                    row.insert(format!("{}_{}", column, sub_metric), value.clone());
                }
            }
            Some(value) => {
                row.insert(column.to_string(), value.clone());
            }
            None => {
                row.insert(column.to_string(), Value::Null);
            }
        }

        let Some(dimensions) = dimensions else {
            return;
        };

        for breakdown in breakdowns {
            match dimensions.get(breakdown) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    row.insert(breakdown.clone(), value.clone());
                }
            }
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pulls the list of value entries out of a time-series body.
///
/// Page and post responses wrap the values as `data[0].values`; app
/// responses return the values as `data` directly. An empty `data` list is
/// reported as skippable.
pub fn extract_values(body: &Value, metric: &str) -> Result<Vec<Value>, InsightsError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| InsightsError::Payload(format!("missing data for metric {}", metric)))?;

    let Some(first) = data.first() else {
        return Err(InsightsError::Skipped(format!("no data found for the metric {}", metric)));
    };

    match first.get("values").and_then(Value::as_array) {
        Some(values) => Ok(values.clone()),
        None => Ok(data.clone()),
    }
}

/// A read-only list consumed from the back.
///
/// The snapshot is shared; only the cursor moves.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    items: Arc<[String]>,
    remaining: usize,
}

impl WorkQueue {
    pub fn new(items: Arc<[String]>) -> Self {
        let remaining = items.len();
        Self { items, remaining }
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    pub fn len(&self) -> usize {
        self.remaining
    }

    /// The item the next step will consume.
    pub fn current(&self) -> Option<&str> {
        self.remaining
            .checked_sub(1)
            .map(|idx| self.items[idx].as_str())
    }

    /// Consumes one item; a no-op once empty.
    pub fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// One request's worth of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub metric: String,
    pub event: Option<String>,
}

impl Step {
    pub fn column(&self) -> &str {
        self.event.as_deref().unwrap_or(&self.metric)
    }
}

/// Collects every metric (and event) for one entity.
pub struct MetricAccumulator<'a> {
    client: &'a InsightsClient,
    patterns: &'a UrlPatterns,
    fallback_metric: Option<&'a str>,
    breakdowns: &'a [String],
}

impl<'a> MetricAccumulator<'a> {
    pub fn new(
        client: &'a InsightsClient,
        patterns: &'a UrlPatterns,
        metrics: &'a [String],
        breakdowns: &'a [String],
    ) -> Self {
        Self {
            client,
            patterns,
            fallback_metric: metrics.first().map(String::as_str),
            breakdowns,
        }
    }

    /// The next unit of work, or `None` when both queues are drained.
    ///
    /// With the metric queue empty but events left, the first configured
    /// metric is reused; audience queries pair one metric with many events.
    pub fn next_step(&self, metrics: &WorkQueue, events: &WorkQueue) -> Option<Step> {
        if metrics.is_empty() && events.is_empty() {
            return None;
        }
        let metric = metrics.current().or(self.fallback_metric)?;
        Some(Step {
            metric: metric.to_string(),
            event: events.current().map(str::to_string),
        })
    }

    pub fn step_url(&self, entity: &Entity, step: &Step) -> String {
        let mut pairs = vec![("id", entity.id.as_str()), ("metric", step.metric.as_str())];
        if let Some(event) = &step.event {
            pairs.push(("ev", event.as_str()));
            pairs.push(("agg", aggregation_type(event)));
        }
        render(&self.patterns.insights, &model(&pairs))
    }

    /// Drains both queues into `buffer`.
    pub async fn accumulate(
        &self,
        entity: &Entity,
        mut metrics: WorkQueue,
        mut events: WorkQueue,
        buffer: &mut Buffer,
    ) -> Result<(), InsightsError> {
        while let Some(step) = self.next_step(&metrics, &events) {
            self.run_step(entity, &step, buffer).await?;
            metrics.advance();
            events.advance();
        }
        Ok(())
    }

    async fn run_step(
        &self,
        entity: &Entity,
        step: &Step,
        buffer: &mut Buffer,
    ) -> Result<(), InsightsError> {
        let url = self.step_url(entity, step);

        let result = with_retry(self.client.retry_policy(), || async {
            let body = self.client.fetch(&url).await?;
            extract_values(&body, &step.metric)
        })
        .await;

        let values = match result {
            Ok(values) => values,
            Err(err) if err.is_skippable() => {
                tracing::warn!(
                    id = %entity.id,
                    metric = %step.metric,
                    event = ?step.event,
                    error = %err,
                    "skipping metric"
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let column = step.column();
        for entry in &values {
            buffer.fold(entry, column, self.breakdowns);
        }
        Ok(())
    }
}
