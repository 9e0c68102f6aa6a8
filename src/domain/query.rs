// Query and query task domain models
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field name to filter expression
pub type FilterMap = BTreeMap<String, String>;

/// A saved query as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Query {
    pub id: String,
    pub model: String,
    pub view: String,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub pivots: Option<Vec<String>>,
    #[serde(default)]
    pub fill_fields: Option<Vec<String>>,
    #[serde(default)]
    pub filters: Option<FilterMap>,
    #[serde(default)]
    pub filter_expression: Option<String>,
    #[serde(default)]
    pub sorts: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub column_limit: Option<String>,
    #[serde(default)]
    pub total: Option<bool>,
    #[serde(default)]
    pub row_total: Option<String>,
    #[serde(default)]
    pub dynamic_fields: Option<String>,
    #[serde(default)]
    pub query_timezone: Option<String>,
    #[serde(default)]
    pub vis_config: Option<serde_json::Value>,
}

/// Body of a query-creation call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteQuery {
    pub model: String,
    pub view: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivots: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vis_config: Option<serde_json::Value>,
}

impl WriteQuery {
    /// Copy everything except the filters from an existing query
    pub fn unfiltered_from(query: &Query) -> Self {
        Self {
            model: query.model.clone(),
            view: query.view.clone(),
            fields: query.fields.clone(),
            pivots: query.pivots.clone(),
            fill_fields: query.fill_fields.clone(),
            filters: None,
            filter_expression: query.filter_expression.clone(),
            sorts: query.sorts.clone(),
            limit: query.limit.clone(),
            column_limit: query.column_limit.clone(),
            total: query.total,
            row_total: query.row_total.clone(),
            dynamic_fields: query.dynamic_fields.clone(),
            query_timezone: query.query_timezone.clone(),
            vis_config: query.vis_config.clone(),
        }
    }

    /// Same as `unfiltered_from`, with `filters` set. An empty map is omitted.
    pub fn filtered_from(query: &Query, filters: FilterMap) -> Self {
        let mut write = Self::unfiltered_from(query);
        if !filters.is_empty() {
            write.filters = Some(filters);
        }
        write
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFormat {
    /// JSON with field metadata
    JsonFe,
}

/// Body of an async query task creation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteCreateQueryTask {
    pub query_id: String,
    pub result_format: ResultFormat,
    pub deferred: bool,
}

/// Query-string options of an async query task creation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTaskOptions {
    pub cache: bool,
    pub force_production: bool,
}

impl QueryTaskOptions {
    /// Skip the result cache and run against production
    pub fn refresh() -> Self {
        Self {
            cache: false,
            force_production: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryTaskStatus {
    Added,
    Pending,
    Running,
    Complete,
    Error,
    Killed,
    Expired,
    Other(String),
}

impl QueryTaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "added" => Self::Added,
            "pending" => Self::Pending,
            "running" => Self::Running,
            "complete" => Self::Complete,
            "error" => Self::Error,
            "killed" => Self::Killed,
            "expired" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Added => "added",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Killed => "killed",
            Self::Expired => "expired",
            Self::Other(raw) => raw,
        }
    }

    /// Only `running` keeps a task under polling
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for QueryTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QueryTaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryTask {
    pub id: String,
    pub query_id: String,
    #[serde(default)]
    pub status: Option<QueryTaskStatus>,
}

/// The authenticated API user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
