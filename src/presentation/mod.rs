// Presentation layer - Console output
pub mod report;
