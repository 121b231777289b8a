//! Collects a YouTube channel's statistics into a CSV history, keeps rotating
//! backups of it, and renders a README and charts from the result.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{Result, StatsError};
pub use models::MetricSample;
pub use pipeline::{Pipeline, RunReport, Stage};
