pub mod analyzers;
pub mod columns;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod output;

pub use error::{DashboardError, Result};
