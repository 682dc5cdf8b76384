use thiserror::Error;

/// 推論服務呼叫失敗（連線、模型不存在、逾時、回應格式錯誤）
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("request to inference service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("inference service reply is malformed: {message}")]
    MalformedReply { message: String },
}

/// 模型回應無法解析成 JSON 物件
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("model response is empty")]
    Empty,

    #[error("model response is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("model response is JSON {found}, expected an object")]
    NotAnObject { found: &'static str },
}

#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("Inference service error: {0}")]
    InferenceError(#[from] InferenceError),

    #[error("Extraction error: {0}")]
    ExtractionError(#[from] ExtractionError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid template: {message}")]
    TemplateError { message: String },

    #[error("Unable to parse order date '{value}'")]
    DateParseError { value: String },

    #[error("Invalid value '{value}' in column '{column}': {reason}")]
    InvalidInputError {
        column: String,
        value: String,
        reason: String,
    },

    #[error("Batch halted at row {row}: {source}")]
    BatchHalted {
        row: usize,
        #[source]
        source: Box<TaggerError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 程序結束碼：可重試 2、處理錯誤 1、系統錯誤 3
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl TaggerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TaggerError::InferenceError(_) => ErrorCategory::Network,
            TaggerError::ExtractionError(_)
            | TaggerError::CsvError(_)
            | TaggerError::DateParseError { .. }
            | TaggerError::InvalidInputError { .. } => ErrorCategory::Data,
            TaggerError::IoError(_) => ErrorCategory::Io,
            TaggerError::ConfigError { .. }
            | TaggerError::InvalidConfigValueError { .. }
            | TaggerError::ConfigValidationError { .. }
            | TaggerError::TemplateError { .. } => ErrorCategory::Configuration,
            TaggerError::BatchHalted { source, .. } => source.category(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// 是否屬於設定錯誤：一律在處理任何資料列之前中止
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            TaggerError::InferenceError(InferenceError::Status { status: 404, .. }) => {
                "Pull the configured model on the inference host (e.g. `ollama pull <model>`)"
                    .to_string()
            }
            TaggerError::InferenceError(_) => {
                "Check that the inference service is running and reachable at the configured base URL"
                    .to_string()
            }
            TaggerError::ExtractionError(_) => {
                "Lower the temperature or tighten the prompt so the model answers with a single JSON object"
                    .to_string()
            }
            TaggerError::CsvError(_) => {
                "Verify the input file is well-formed CSV/TSV with a header row".to_string()
            }
            TaggerError::IoError(_) => {
                "Check that the input file exists and the output directory is writable".to_string()
            }
            TaggerError::ConfigError { .. }
            | TaggerError::InvalidConfigValueError { .. }
            | TaggerError::ConfigValidationError { .. } => {
                "Review the command-line flags, environment variables or TOML file".to_string()
            }
            TaggerError::TemplateError { .. } => {
                "Placeholders must be one of {product_name}, {unit_price}, {quantity}, {order_date}; write literal braces as {{ and }}"
                    .to_string()
            }
            TaggerError::DateParseError { .. } => {
                "Fix the order date in the input, or switch date parsing to lenient".to_string()
            }
            TaggerError::InvalidInputError { .. } => {
                "Fix the offending cell in the input file".to_string()
            }
            TaggerError::BatchHalted { source, .. } => format!(
                "{} (or rerun with --failure-policy continue-on-error)",
                source.recovery_suggestion()
            ),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            TaggerError::InferenceError(_) => {
                format!("Could not get an answer from the language model: {}", self)
            }
            TaggerError::BatchHalted { row, source } => format!(
                "Processing stopped at row {} and no output was written: {}",
                row, source
            ),
            _ if self.is_configuration() => format!("Invalid configuration: {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaggerError>;
