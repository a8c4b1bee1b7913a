//! URL templates.
//!
//! Request URLs are built in two stages: a per-run pattern is rendered once
//! with everything that is fixed for the run (base url, token, time window),
//! leaving `{id}`, `{metric}`, `{ev}` and `{agg}` in place for each request.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::InsightsOptions;

/// Replaces each `{key}` placeholder whose key is present in `model`.
///
/// Placeholders absent from the model are left untouched so a template can be
/// filled progressively. Values are inserted verbatim, without escaping.
pub fn render<K, V>(template: &str, model: &HashMap<K, V>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = template.to_string();
    for (key, value) in model {
        let placeholder = format!("{{{}}}", key.as_ref());
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, value.as_ref());
        }
    }
    out
}

/// Shorthand for building a render model from string pairs.
pub fn model<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
    pairs.iter().copied().collect()
}

/// URL patterns shared by every request of one run.
#[derive(Debug, Clone)]
pub struct UrlPatterns {
    /// Metadata lookup; `{id}` remains to be filled.
    pub metadata: String,
    /// Time-series request; `{id}`, `{metric}` and optionally `{ev}`/`{agg}` remain.
    pub insights: String,
}

impl UrlPatterns {
    /// Builds both patterns with the time window ending now.
    pub fn new(options: &InsightsOptions) -> Self {
        Self::at(options, Utc::now())
    }

    /// Builds both patterns with the time window ending at `until`.
    pub fn at(options: &InsightsOptions, until: DateTime<Utc>) -> Self {
        let since = until - Duration::days(i64::from(options.past_days));

        let metadata = render(
            "{base}/{id}?access_token={token}",
            &model(&[
                ("base", options.base_url.as_str()),
                ("token", options.access_token.as_str()),
            ]),
        );

        let path = [
            options.base_url.as_str(),
            "{id}",
            options.node.edge(),
            "{metric}",
        ]
        .join("/");

        let mut query = format!(
            "access_token={}&period={}&since={}&until={}",
            options.access_token,
            options.period,
            since.timestamp(),
            until.timestamp(),
        );

        if options.has_events() {
            query.push_str("&event_name={ev}");
        }

        if options.aggregate {
            query.push_str("&aggregateBy={agg}");
        }

        for (index, breakdown) in options.breakdowns.iter().enumerate() {
            query.push_str(&format!("&breakdowns[{}]={}", index, breakdown));
        }

        Self {
            metadata,
            insights: format!("{}?{}", path, query),
        }
    }

    pub fn metadata_url(&self, id: &str) -> String {
        render(&self.metadata, &model(&[("id", id)]))
    }
}
