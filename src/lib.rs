pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod ml;
pub mod services;
pub mod table;

pub use config::AppConfig;
pub use error::{PropensityError, Result};
pub use ml::{ProbabilityMatrix, ProbabilityScorer};
pub use services::{InferencePipeline, ModelLoader, OUTPUT_COLUMN};
pub use table::Table;
