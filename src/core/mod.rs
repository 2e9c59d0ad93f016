pub mod acquire;
pub mod billing;
pub mod config;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod models;
pub mod pipeline;
pub mod vision;
