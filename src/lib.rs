pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use adapters::ollama::OllamaClient;
pub use core::{etl::EtlEngine, pipeline::ClassificationPipeline};
pub use domain::model::{ClassificationResult, DateParsing, ExpenseRecord, FailurePolicy};
pub use utils::error::{Result, TaggerError};
