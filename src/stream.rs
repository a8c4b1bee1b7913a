//! The pull-driven controller tying resolution, collection and materialization together.
//!
//! Nothing happens until the consumer asks for rows. The first demand
//! resolves every entity id; each following demand collects one entity and
//! hands over all of its rows at once. Entities are taken from the back of
//! the resolved list.

use std::sync::Arc;

use futures::stream::BoxStream;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::accumulator::{Buffer, MetricAccumulator, Row, WorkQueue};
use crate::client::InsightsClient;
use crate::config::InsightsOptions;
use crate::entity::Entity;
use crate::error::InsightsError;
use crate::materializer::materialize;
use crate::observer::{progress_channel, Progress, ProgressSender, ProgressStream, RequestObserver};
use crate::resolver::EntityResolver;
use crate::retry::{with_retry, ImmediateRetry, RetryPolicy};
use crate::template::UrlPatterns;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Entities not resolved yet.
    Uninitialized,
    /// Waiting for the next demand.
    Active,
    /// Collecting one entity.
    Draining,
    Ended,
    Failed,
}

pub struct InsightsStream {
    options: InsightsOptions,
    client: InsightsClient,
    metrics: Arc<[String]>,
    events: Arc<[String]>,
    patterns: Option<UrlPatterns>,
    state: StreamState,
    pending: Vec<Entity>,
    total: usize,
    loaded: usize,
    progress: ProgressSender,
}

impl InsightsStream {
    pub fn new(
        options: InsightsOptions,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, InsightsError> {
        options.validate()?;

        let retry: Arc<dyn RetryPolicy> = Arc::new(ImmediateRetry {
            max_retries: options.max_retries,
        });
        let client = InsightsClient::new(transport, options.node, options.classifier())
            .with_retry_policy(retry);

        Ok(Self {
            metrics: options.metrics.clone().into(),
            events: options.events.clone().into(),
            options,
            client,
            patterns: None,
            state: StreamState::Uninitialized,
            pending: Vec::new(),
            total: 0,
            loaded: 0,
            progress: ProgressSender::disconnected(),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.client = self.client.with_observer(observer);
        self
    }

    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.client = self.client.with_retry_policy(retry);
        self
    }

    /// Subscribes to progress notifications, one per completed entity.
    ///
    /// Only the most recent subscriber receives updates.
    pub fn progress(&mut self) -> ProgressStream {
        let (tx, rx) = progress_channel();
        self.progress = tx;
        UnboundedReceiverStream::new(rx)
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Entities resolved but not yet emitted.
    pub fn pending(&self) -> &[Entity] {
        &self.pending
    }

    /// Answers one demand: the rows of the next entity, or `None` at the end.
    ///
    /// After an error the stream is failed and only returns `None`.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Row>>, InsightsError> {
        match self.state {
            StreamState::Ended | StreamState::Failed => return Ok(None),
            StreamState::Uninitialized => {
                if let Err(err) = self.initialize().await {
                    self.state = StreamState::Failed;
                    return Err(err);
                }
                self.state = StreamState::Active;
            }
            StreamState::Active | StreamState::Draining => {}
        }

        if self.pending.is_empty() {
            tracing::debug!(node = %self.options.node, loaded = self.loaded, "no entities left");
            self.state = StreamState::Ended;
            return Ok(None);
        }

        self.state = StreamState::Draining;
        match self.drain_one().await {
            Ok(rows) => {
                self.state = StreamState::Active;
                Ok(Some(rows))
            }
            Err(err) => {
                tracing::debug!(error = %err, "stream failed");
                self.state = StreamState::Failed;
                Err(err)
            }
        }
    }

    /// Consumes the controller as a stream of rows.
    ///
    /// Dropping the stream stops it at the next pending request.
    pub fn into_rows(mut self) -> BoxStream<'static, Result<Row, InsightsError>> {
        Box::pin(async_stream::try_stream! {
            while let Some(rows) = self.next_batch().await? {
                for row in rows {
                    yield row;
                }
            }
        })
    }

    async fn initialize(&mut self) -> Result<(), InsightsError> {
        let patterns = UrlPatterns::new(&self.options);

        let entities = {
            let resolver = EntityResolver::new(&self.client, &patterns, self.options.concurrency);
            let items = &self.options.items;
            with_retry(self.client.retry_policy(), || async {
                let ids = items.items().await?;
                resolver.resolve(ids).await
            })
            .await?
        };

        tracing::debug!(node = %self.options.node, total = entities.len(), "resolved entities");
        self.total = entities.len();
        self.loaded = 0;
        self.pending = entities;
        self.patterns = Some(patterns);
        Ok(())
    }

    async fn drain_one(&mut self) -> Result<Vec<Row>, InsightsError> {
        let Some(entity) = self.pending.last().cloned() else {
            return Ok(Vec::new());
        };
        let patterns = self
            .patterns
            .as_ref()
            .ok_or_else(|| InsightsError::Config("stream used before initialization".to_string()))?;

        let mut buffer = Buffer::new();
        MetricAccumulator::new(
            &self.client,
            patterns,
            &self.options.metrics,
            &self.options.breakdowns,
        )
        .accumulate(
            &entity,
            WorkQueue::new(self.metrics.clone()),
            WorkQueue::new(self.events.clone()),
            &mut buffer,
        )
        .await?;

        let rows = materialize(buffer, &entity, self.options.node);

        self.loaded += 1;
        self.progress.send(Progress::new(self.total, self.loaded, self.options.node));
        self.pending.pop();

        Ok(rows)
    }
}
