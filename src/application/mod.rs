// Application layer - The refresh pipeline, one service per step
pub mod credential_service;
pub mod dashboard_service;
pub mod looker_api;
pub mod query_service;
pub mod refresh_service;
pub mod task_runner;

#[cfg(test)]
pub mod test_support;
