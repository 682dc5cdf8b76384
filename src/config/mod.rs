pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::{ColumnMapping, DateParsing, FailurePolicy};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5";
pub const DEFAULT_TEMPERATURE: f64 = 0.1;
pub const DEFAULT_INPUT_PATH: &str = "data/test_input.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "data/categorized_expenses.csv";
pub const TABLE_EXTENSIONS: &[&str] = &["csv", "tsv", "tab"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "expense-tagger")]
#[command(about = "Categorize expenses and flag tax deductibility with a local language model")]
pub struct CliConfig {
    #[arg(long, env = "EXPENSE_INPUT_PATH", default_value = DEFAULT_INPUT_PATH)]
    pub input_path: String,

    #[arg(long, env = "EXPENSE_OUTPUT_PATH", default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    #[arg(long, env = "OLLAMA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "OLLAMA_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,

    #[arg(long, help = "Sampling seed passed to the model")]
    pub seed: Option<u64>,

    #[arg(long, help = "Per-request timeout in seconds (no timeout when omitted)")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, help = "Do not ask the model for JSON-formatted output")]
    pub no_json_format: bool,

    #[arg(long, env = "EXPENSE_PROMPT_FILE", help = "Prompt template file")]
    pub prompt_file: Option<String>,

    #[arg(long, value_enum, env = "EXPENSE_FAILURE_POLICY", default_value_t = FailurePolicy::ContinueOnError)]
    pub failure_policy: FailurePolicy,

    #[arg(long, value_enum, env = "EXPENSE_DATE_PARSING", default_value_t = DateParsing::Lenient)]
    pub date_parsing: DateParsing,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(skip)]
    pub columns: ColumnMapping,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn request_timeout_secs(&self) -> Option<u64> {
        self.request_timeout_secs
    }

    fn json_format(&self) -> bool {
        !self.no_json_format
    }

    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn prompt_file(&self) -> Option<&str> {
        self.prompt_file.as_deref()
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    fn date_parsing(&self) -> DateParsing {
        self.date_parsing
    }

    fn columns(&self) -> &ColumnMapping {
        &self.columns
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}

/// 所有設定來源共用的檢查，在處理任何資料列之前執行
pub fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    validation::validate_url("base_url", config.base_url())?;
    validation::validate_non_empty_string("model", config.model())?;
    validation::validate_range("temperature", config.temperature(), 0.0, 2.0)?;

    if let Some(timeout) = config.request_timeout_secs() {
        validation::validate_positive_number("request_timeout_secs", timeout, 1)?;
    }

    validation::validate_path("input_path", config.input_path())?;
    validation::validate_file_extension("input_path", config.input_path(), TABLE_EXTENSIONS)?;
    validation::validate_path("output_path", config.output_path())?;
    validation::validate_file_extension("output_path", config.output_path(), TABLE_EXTENSIONS)?;

    if let Some(prompt_file) = config.prompt_file() {
        validation::validate_path("prompt_file", prompt_file)?;
    }

    let columns = config.columns();
    for (field, value) in [
        ("columns.product_name", &columns.product_name),
        ("columns.unit_price", &columns.unit_price),
        ("columns.quantity", &columns.quantity),
        ("columns.order_date", &columns.order_date),
    ] {
        validation::validate_non_empty_string(field, value)?;
    }

    Ok(())
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::parse_from(["expense-tagger"]);

        assert_eq!(config.input_path(), DEFAULT_INPUT_PATH);
        assert_eq!(config.output_path(), DEFAULT_OUTPUT_PATH);
        assert_eq!(config.failure_policy(), FailurePolicy::ContinueOnError);
        assert_eq!(config.date_parsing(), DateParsing::Lenient);
        assert!(config.json_format());
        assert_eq!(config.columns(), &ColumnMapping::default());
    }

    #[test]
    fn test_policy_flags() {
        let config = CliConfig::parse_from([
            "expense-tagger",
            "--failure-policy",
            "halt-on-error",
            "--date-parsing",
            "strict",
            "--model",
            "llama3.2",
            "--no-json-format",
        ]);

        assert_eq!(config.failure_policy(), FailurePolicy::HaltOnError);
        assert_eq!(config.date_parsing(), DateParsing::Strict);
        assert_eq!(config.model(), "llama3.2");
        assert!(!config.json_format());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CliConfig::parse_from(["expense-tagger", "--base-url", "http://localhost:11434"]);
        assert!(config.validate().is_ok());

        config.temperature = 3.0;
        assert!(config.validate().is_err());

        config.temperature = 0.2;
        config.input_path = "expenses.xlsx".to_string();
        assert!(config.validate().is_err());

        config.input_path = "expenses.csv".to_string();
        config.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
