use futures::{StreamExt, TryStreamExt};

use crate::client::InsightsClient;
use crate::entity::Entity;
use crate::error::InsightsError;
use crate::retry::with_retry;
use crate::template::UrlPatterns;

/// Turns raw ids into entities with a bounded number of lookups in flight.
pub struct EntityResolver<'a> {
    client: &'a InsightsClient,
    patterns: &'a UrlPatterns,
    concurrency: usize,
}

impl<'a> EntityResolver<'a> {
    pub fn new(client: &'a InsightsClient, patterns: &'a UrlPatterns, concurrency: usize) -> Self {
        Self {
            client,
            patterns,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolves every id, dropping skipped ones and keeping the order of the rest.
    ///
    /// The first unrecovered failure aborts the whole resolution.
    pub async fn resolve(&self, ids: Vec<String>) -> Result<Vec<Entity>, InsightsError> {
        let resolved: Vec<Option<Entity>> = futures::stream::iter(ids)
            .map(|id| async move { self.resolve_one(&id).await })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(resolved.into_iter().flatten().collect())
    }

    async fn resolve_one(&self, id: &str) -> Result<Option<Entity>, InsightsError> {
        let url = self.patterns.metadata_url(id);
        let kind = self.client.kind();

        let result = with_retry(self.client.retry_policy(), || async {
            let body = self.client.fetch(&url).await?;
            Ok(Entity::from_metadata(id, kind, &body))
        })
        .await;

        match result {
            Ok(entity) => Ok(Some(entity)),
            Err(err) if err.is_skippable() => {
                tracing::warn!(id, error = %err, "skipping {}", kind);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
