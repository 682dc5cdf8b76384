use crate::config::{
    validate_provider, DEFAULT_BASE_URL, DEFAULT_INPUT_PATH, DEFAULT_MODEL, DEFAULT_OUTPUT_PATH,
    DEFAULT_TEMPERATURE,
};
use crate::core::ConfigProvider;
use crate::domain::model::{ColumnMapping, DateParsing, FailurePolicy};
use crate::utils::error::{Result, TaggerError};
use crate::utils::validation::Validate;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub inference: InferenceConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub prompt: PromptConfig,
    pub processing: ProcessingConfig,
    pub columns: ColumnMapping,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub seed: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub json_format: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            seed: None,
            request_timeout_secs: None,
            json_format: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_INPUT_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub failure_policy: FailurePolicy,
    pub date_parsing: DateParsing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ${VAR} 或 ${VAR:-預設值}
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid env var pattern")
    })
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TaggerError::ConfigError {
            message: format!("cannot read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| TaggerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數；未設定且無預設值時保留原樣，交給驗證階段報錯
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &Captures| {
                let var_name = &caps[1];
                match (std::env::var(var_name), caps.get(2)) {
                    (Ok(value), _) => value,
                    (Err(_), Some(default)) => default.as_str().to_string(),
                    (Err(_), None) => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.inference.base_url
    }

    fn model(&self) -> &str {
        &self.inference.model
    }

    fn temperature(&self) -> f64 {
        self.inference.temperature
    }

    fn seed(&self) -> Option<u64> {
        self.inference.seed
    }

    fn request_timeout_secs(&self) -> Option<u64> {
        self.inference.request_timeout_secs
    }

    fn json_format(&self) -> bool {
        self.inference.json_format
    }

    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn prompt_file(&self) -> Option<&str> {
        self.prompt.file.as_deref()
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.processing.failure_policy
    }

    fn date_parsing(&self) -> DateParsing {
        self.processing.date_parsing
    }

    fn columns(&self) -> &ColumnMapping {
        &self.columns
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}
