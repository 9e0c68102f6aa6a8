// Query rebuild service - Clones each tile's query with dashboard filter defaults applied
use crate::application::looker_api::LookerApi;
use crate::domain::dashboard::{DashboardFilter, DashboardPlan, TilePlan};
use crate::domain::query::{FilterMap, WriteQuery};
use anyhow::Context;
use std::sync::Arc;

/// One tile's original query and the query created to replace it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuiltQuery {
    pub tile_id: String,
    pub old_query_id: String,
    pub new_query_id: String,
}

/// Rebuilt queries in dashboard tile order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuiltQueries {
    pub entries: Vec<RebuiltQuery>,
}

impl RebuiltQueries {
    pub fn new_query_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.new_query_id.clone()).collect()
    }

    pub fn old_query_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.old_query_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct QueryService {
    api: Arc<dyn LookerApi>,
}

impl QueryService {
    pub fn new(api: Arc<dyn LookerApi>) -> Self {
        Self { api }
    }

    pub async fn rebuild_queries(&self, plan: &DashboardPlan) -> anyhow::Result<RebuiltQueries> {
        let mut rebuilt = RebuiltQueries::default();

        for tile in &plan.tiles {
            rebuilt.entries.push(self.rebuild_tile(tile, &plan.filters).await?);
        }

        Ok(rebuilt)
    }

    async fn rebuild_tile(
        &self,
        tile: &TilePlan,
        dashboard_filters: &[DashboardFilter],
    ) -> anyhow::Result<RebuiltQuery> {
        let old_query_id = tile.query.query_id();
        let query = self
            .api
            .query(old_query_id)
            .await
            .with_context(|| {
                format!("Failed to fetch query {} for tile {}", old_query_id, tile.tile_id)
            })?;

        let body = match tile.query.listens() {
            Some(listens) => {
                WriteQuery::filtered_from(&query, bind_filters(listens, dashboard_filters))
            }
            None => WriteQuery::unfiltered_from(&query),
        };

        let created = self
            .api
            .create_query(&body)
            .await
            .with_context(|| format!("Failed to create query for tile {}", tile.tile_id))?;

        tracing::debug!(
            "Tile {}: query {} rebuilt as {}",
            tile.tile_id,
            old_query_id,
            created.id
        );

        Ok(RebuiltQuery {
            tile_id: tile.tile_id.clone(),
            old_query_id: old_query_id.to_string(),
            new_query_id: created.id,
        })
    }
}

/// Bind every dashboard filter whose field the tile listens to. Later filters on the
/// same field win.
pub fn bind_filters(listens: &[String], dashboard_filters: &[DashboardFilter]) -> FilterMap {
    let mut filters = FilterMap::new();

    for (idx, filter) in dashboard_filters.iter().enumerate() {
        println!("{} {} {}", idx + 1, filter.field, filter.value);
        if listens.iter().any(|field| field == &filter.field) {
            filters.insert(filter.field.clone(), filter.value.clone());
        }
    }

    filters
}
