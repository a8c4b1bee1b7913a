use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of node an insights run reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Page,
    App,
    Post,
}

/// Per-kind behaviour, looked up once instead of comparing kind names.
#[derive(Debug, Clone, Copy)]
pub struct KindPolicy {
    pub name: &'static str,
    pub edge: &'static str,
    pub id_column: &'static str,
    pub name_column: &'static str,
    pub created_time: bool,
}

const PAGE: KindPolicy = KindPolicy {
    name: "page",
    edge: "insights",
    id_column: "pageId",
    name_column: "pageName",
    created_time: false,
};

const APP: KindPolicy = KindPolicy {
    name: "app",
    edge: "app_insights",
    id_column: "appId",
    name_column: "appName",
    created_time: false,
};

const POST: KindPolicy = KindPolicy {
    name: "post",
    edge: "insights",
    id_column: "postId",
    name_column: "postName",
    created_time: true,
};

impl EntityKind {
    pub fn policy(self) -> &'static KindPolicy {
        match self {
            EntityKind::Page => &PAGE,
            EntityKind::App => &APP,
            EntityKind::Post => &POST,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.policy().name
    }

    pub fn edge(self) -> &'static str {
        self.policy().edge
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved node, ready for metric collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: String,
    pub name: Option<String>,
    pub created_time: Option<String>,
}

impl Entity {
    /// Builds an entity from a metadata response body.
    ///
    /// The display name falls back from `name` to `message` to `story`.
    pub fn from_metadata(id: &str, kind: EntityKind, body: &Value) -> Self {
        let name = ["name", "message", "story"]
            .iter()
            .filter_map(|field| body.get(*field).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string);

        let created_time = if kind.policy().created_time {
            body.get("created_time")
                .and_then(Value::as_str)
                .map(str::to_string)
        } else {
            None
        };

        Self {
            id: id.to_string(),
            name,
            created_time,
        }
    }
}
