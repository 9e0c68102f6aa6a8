// Dashboard domain model
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct Dashboard {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dashboard_elements: Vec<DashboardElement>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dashboard_filters: Vec<DashboardFilterSpec>,
}

/// The API sends `null` for empty lists as often as it omits them
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A dashboard tile
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardElement {
    pub id: String,
    #[serde(default)]
    pub result_maker: Option<ResultMaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultMaker {
    #[serde(default)]
    pub query_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub filterables: Vec<Filterable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Filterable {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub listen: Vec<FilterListen>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterListen {
    pub field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardFilterSpec {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// An active dashboard filter: the field it targets and its default value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardFilter {
    pub field: String,
    pub value: String,
}

impl DashboardFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// What a tile needs rebuilt: its query, plus the fields it listens to if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileQuery {
    Unfiltered { query_id: String },
    Filtered { query_id: String, listens: Vec<String> },
}

impl TileQuery {
    pub fn query_id(&self) -> &str {
        match self {
            TileQuery::Unfiltered { query_id } | TileQuery::Filtered { query_id, .. } => query_id,
        }
    }

    pub fn listens(&self) -> Option<&[String]> {
        match self {
            TileQuery::Unfiltered { .. } => None,
            TileQuery::Filtered { listens, .. } => Some(listens.as_slice()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlan {
    pub tile_id: String,
    pub query: TileQuery,
}

/// Everything the rebuild step needs from one dashboard fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardPlan {
    pub tiles: Vec<TilePlan>,
    pub filters: Vec<DashboardFilter>,
}
