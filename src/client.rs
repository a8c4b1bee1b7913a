use std::sync::Arc;

use serde_json::Value;

use crate::entity::EntityKind;
use crate::error::{ErrorClassifier, InsightsError};
use crate::observer::{RequestObserver, TracingObserver};
use crate::retry::{ImmediateRetry, RetryPolicy};
use crate::transport::Transport;

/// Issues one request and turns the answer into a classified JSON body.
///
/// Shared by the entity resolver and the metric accumulator.
#[derive(Clone)]
pub struct InsightsClient {
    transport: Arc<dyn Transport>,
    observer: Arc<dyn RequestObserver>,
    retry: Arc<dyn RetryPolicy>,
    classifier: ErrorClassifier,
    kind: EntityKind,
}

impl InsightsClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        kind: EntityKind,
        classifier: ErrorClassifier,
    ) -> Self {
        Self {
            transport,
            observer: Arc::new(TracingObserver),
            retry: Arc::new(ImmediateRetry::unbounded()),
            classifier,
            kind,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn retry_policy(&self) -> &dyn RetryPolicy {
        self.retry.as_ref()
    }

    pub async fn fetch(&self, url: &str) -> Result<Value, InsightsError> {
        self.observer.on_request(self.kind, url);
        let response = self.transport.get(url).await?;
        self.classifier.parse(&response.body)
    }
}
