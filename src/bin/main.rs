//! Streams insights rows as JSON lines to stdout.
//!
//! Options come from `config/default.toml`, `config/local.toml` and
//! `INSIGHTS_*` environment variables (a `.env` file is honoured), e.g.
//!
//! ```text
//! INSIGHTS_NODE=page
//! INSIGHTS_ACCESS_TOKEN=...
//! INSIGHTS_ITEMS=1234,5678
//! INSIGHTS_METRICS=page_views_total,page_fans
//! ```

use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use futures::StreamExt;
use insights_stream::{InsightsOptions, InsightsStream, ReqwestTransport};
use tracing_subscriber::EnvFilter;

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = InsightsOptions::new()?;
    let transport = ReqwestTransport::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))?;
    let mut stream = InsightsStream::new(options, Arc::new(transport))?;

    let mut progress = stream.progress();
    tokio::spawn(async move {
        while let Some(p) = progress.next().await {
            tracing::info!(total = p.total, loaded = p.loaded, "{}", p.message);
        }
    });

    let mut rows = stream.into_rows();
    while let Some(row) = rows.next().await {
        println!("{}", serde_json::to_string(&row?)?);
    }

    Ok(())
}
