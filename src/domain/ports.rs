use crate::domain::model::{BatchOutcome, ColumnMapping, DateParsing, Dataset, FailurePolicy, RawModelResponse};
use crate::utils::error::{InferenceError, Result};
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn model(&self) -> &str;
    fn temperature(&self) -> f64;
    fn seed(&self) -> Option<u64>;
    fn request_timeout_secs(&self) -> Option<u64>;
    fn json_format(&self) -> bool;
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn prompt_file(&self) -> Option<&str>;
    fn failure_policy(&self) -> FailurePolicy;
    fn date_parsing(&self) -> DateParsing;
    fn columns(&self) -> &ColumnMapping;
}

/// 語言模型推論服務。實作端的所有失敗都以 [`InferenceError`] 回報
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn complete(&self, prompt: &str) -> std::result::Result<RawModelResponse, InferenceError>;
}

#[async_trait]
impl<T: InferenceService + ?Sized> InferenceService for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str) -> std::result::Result<RawModelResponse, InferenceError> {
        (**self).complete(prompt).await
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<BatchOutcome>;
    async fn load(&self, result: BatchOutcome) -> Result<String>;
}
