// Dashboard service - Reads tiles and filter defaults from one dashboard
use crate::application::looker_api::LookerApi;
use crate::domain::dashboard::{
    Dashboard, DashboardElement, DashboardFilter, DashboardPlan, TilePlan, TileQuery,
};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    api: Arc<dyn LookerApi>,
}

impl DashboardService {
    pub fn new(api: Arc<dyn LookerApi>) -> Self {
        Self { api }
    }

    pub async fn read_dashboard(&self, dashboard_id: &str) -> anyhow::Result<DashboardPlan> {
        let dashboard = self
            .api
            .dashboard(dashboard_id)
            .await
            .with_context(|| format!("Failed to fetch dashboard {}", dashboard_id))?;

        let plan = plan_dashboard(&dashboard);
        tracing::info!(
            "Dashboard {} has {} query tiles and {} active filters",
            dashboard_id,
            plan.tiles.len(),
            plan.filters.len()
        );
        Ok(plan)
    }
}

/// Split a dashboard into the tiles to rebuild and its active filters
pub fn plan_dashboard(dashboard: &Dashboard) -> DashboardPlan {
    let tiles = dashboard
        .dashboard_elements
        .iter()
        .filter_map(tile_plan)
        .collect();

    let mut filters = Vec::new();
    for spec in &dashboard.dashboard_filters {
        // Untitled filters are not shown on the dashboard
        if spec.title.as_deref().unwrap_or_default().is_empty() {
            continue;
        }
        match &spec.dimension {
            Some(field) if !field.is_empty() => {
                filters.push(DashboardFilter::new(
                    field.clone(),
                    spec.default_value.clone().unwrap_or_default(),
                ));
            }
            _ => {
                tracing::warn!(
                    "Skipping dashboard filter {:?} without a dimension",
                    spec.title
                );
            }
        }
    }

    DashboardPlan { tiles, filters }
}

fn tile_plan(element: &DashboardElement) -> Option<TilePlan> {
    let Some(maker) = element.result_maker.as_ref() else {
        tracing::debug!("Tile {} has no result maker, skipping", element.id);
        return None;
    };
    let Some(query_id) = maker.query_id.clone() else {
        tracing::debug!("Tile {} has no query, skipping", element.id);
        return None;
    };

    // Only the first filterable is consulted
    let listens: Vec<String> = maker
        .filterables
        .first()
        .map(|f| f.listen.iter().map(|l| l.field.clone()).collect())
        .unwrap_or_default();

    let query = if listens.is_empty() {
        TileQuery::Unfiltered { query_id }
    } else {
        TileQuery::Filtered { query_id, listens }
    };

    Some(TilePlan {
        tile_id: element.id.clone(),
        query,
    })
}
