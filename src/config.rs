use std::fmt;
use std::path::Path;
use std::sync::Arc;

use config::{Config, Environment, File};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Deserializer};

use crate::entity::EntityKind;
use crate::error::{ErrorClassifier, InsightsError};

pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v2.10";
pub const DEFAULT_CONCURRENCY: usize = 3;

type Producer = dyn Fn() -> BoxFuture<'static, Result<Vec<String>, InsightsError>> + Send + Sync;

/// Where the entity ids of a run come from.
#[derive(Clone)]
pub enum ItemSource {
    List(Vec<String>),
    /// Invoked once per initialization attempt.
    Producer(Arc<Producer>),
}

impl ItemSource {
    /// Wraps a synchronous producer.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        ItemSource::Producer(Arc::new(move || {
            let items = f();
            async move { Ok(items) }.boxed()
        }))
    }

    /// Wraps an asynchronous producer.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Vec<String>, InsightsError>> + Send + 'static,
    {
        ItemSource::Producer(Arc::new(move || f().boxed()))
    }

    pub async fn items(&self) -> Result<Vec<String>, InsightsError> {
        match self {
            ItemSource::List(items) => Ok(items.clone()),
            ItemSource::Producer(producer) => producer().await,
        }
    }
}

impl Default for ItemSource {
    fn default() -> Self {
        ItemSource::List(Vec::new())
    }
}

impl fmt::Debug for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemSource::List(items) => f.debug_tuple("List").field(items).finish(),
            ItemSource::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<Vec<String>> for ItemSource {
    fn from(items: Vec<String>) -> Self {
        ItemSource::List(items)
    }
}

impl<'de> Deserialize<'de> for ItemSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(ItemSource::List)
    }
}

/// Options for one insights run. Immutable once the stream is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightsOptions {
    #[serde(alias = "entity_kind")]
    pub node: EntityKind,
    #[serde(alias = "item_list")]
    pub items: ItemSource,
    #[serde(alias = "token")]
    pub access_token: String,
    pub period: String,
    #[serde(alias = "pastdays")]
    pub past_days: u32,
    pub metrics: Vec<String>,
    pub events: Vec<String>,
    pub breakdowns: Vec<String>,
    pub aggregate: bool,
    pub ignore_missing: bool,
    pub base_url: String,
    /// Metadata lookups in flight at once.
    pub concurrency: usize,
    /// API error codes treated as transient.
    pub retry_codes: Vec<i64>,
    /// Unset means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for InsightsOptions {
    fn default() -> Self {
        Self {
            node: EntityKind::Page,
            items: ItemSource::default(),
            access_token: String::new(),
            period: "day".to_string(),
            past_days: 30,
            metrics: Vec::new(),
            events: Vec::new(),
            breakdowns: Vec::new(),
            aggregate: false,
            ignore_missing: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            retry_codes: Vec::new(),
            max_retries: None,
        }
    }
}

impl InsightsOptions {
    /// Loads options from `config/default.toml`, `config/local.toml` and
    /// `INSIGHTS_*` environment variables, later sources winning.
    pub fn new() -> Result<Self, InsightsError> {
        Self::from_dir(Path::new("config"))
    }

    pub fn from_dir(config_dir: &Path) -> Result<Self, InsightsError> {
        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("INSIGHTS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("items")
                    .with_list_parse_key("metrics")
                    .with_list_parse_key("events")
                    .with_list_parse_key("breakdowns")
                    .with_list_parse_key("retry_codes"),
            );

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), InsightsError> {
        if self.access_token.is_empty() {
            return Err(InsightsError::Config("access_token is required".to_string()));
        }
        if self.metrics.is_empty() {
            return Err(InsightsError::Config("at least one metric is required".to_string()));
        }
        if self.concurrency == 0 {
            return Err(InsightsError::Config("concurrency must be positive".to_string()));
        }
        Ok(())
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn classifier(&self) -> ErrorClassifier {
        ErrorClassifier::new(self.ignore_missing, self.retry_codes.clone())
    }
}
