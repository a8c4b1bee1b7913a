//! insights-stream: per-day insights rows for pages, apps and posts
//!
//! This library reads time-series insights for a list of Graph API nodes and
//! streams them as flat rows, one row per day (and breakdown combination) per
//! node, with every requested metric as a column.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use insights_stream::{EntityKind, InsightsOptions, InsightsStream, ReqwestTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = InsightsOptions {
//!         node: EntityKind::Page,
//!         items: vec!["1234567890".to_string()].into(),
//!         access_token: std::env::var("INSIGHTS_ACCESS_TOKEN")?,
//!         period: "day".to_string(),
//!         past_days: 7,
//!         metrics: vec!["page_views_total".to_string(), "page_fans".to_string()],
//!         ..InsightsOptions::default()
//!     };
//!
//!     let mut stream = InsightsStream::new(options, Arc::new(ReqwestTransport::new()))?;
//!     let mut progress = stream.progress();
//!     tokio::spawn(async move {
//!         while let Some(p) = progress.next().await {
//!             println!("{}/{}: {}", p.loaded, p.total, p.message);
//!         }
//!     });
//!
//!     let mut rows = stream.into_rows();
//!     while let Some(row) = rows.next().await {
//!         println!("{}", serde_json::to_string(&row?)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod materializer;
pub mod observer;
pub mod resolver;
pub mod retry;
pub mod stream;
pub mod template;
pub mod transport;


pub use accumulator::{Buffer, MetricAccumulator, Row, WorkQueue};
pub use client::InsightsClient;
pub use crate::config::{InsightsOptions, ItemSource};
pub use entity::{Entity, EntityKind};
pub use error::{ApiError, ErrorClassifier, InsightsError};
pub use observer::{Progress, ProgressStream, RequestObserver, TracingObserver};
pub use retry::{ImmediateRetry, RetryPolicy};
pub use stream::{InsightsStream, StreamState};
pub use transport::{HttpResponse, ReqwestTransport, Transport};
