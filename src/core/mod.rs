pub mod classifier;
pub mod defaults;
pub mod etl;
pub mod extractor;
pub mod pipeline;
pub mod prompt;
pub mod table;

pub use crate::domain::model::{BatchOutcome, ClassificationResult, Dataset, ExpenseRecord};
pub use crate::domain::ports::{ConfigProvider, InferenceService, Pipeline, Storage};
pub use crate::utils::error::Result;
