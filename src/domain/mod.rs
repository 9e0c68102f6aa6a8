// Domain layer - Plain records exchanged with the analytics API
pub mod dashboard;
pub mod query;
