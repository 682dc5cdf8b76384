use crate::adapters::ollama::OllamaClient;
use crate::core::classifier::{RecordClassifier, RowOutcome};
use crate::core::prompt::{PromptBuilder, PromptTemplate};
use crate::core::table;
use crate::core::{ConfigProvider, InferenceService, Pipeline, Storage};
use crate::domain::model::{
    BatchOutcome, BatchSummary, Dataset, FailurePolicy, CATEGORY_COLUMN, DEDUCTIBLE_COLUMN,
    JUSTIFICATION_COLUMN,
};
use crate::utils::error::{Result, TaggerError};

/// 讀取支出表、逐列分類、寫出附加三個欄位的新表
pub struct ClassificationPipeline<S: Storage, C: ConfigProvider, I: InferenceService = OllamaClient> {
    storage: S,
    config: C,
    classifier: RecordClassifier<I>,
}

impl<S: Storage, C: ConfigProvider> ClassificationPipeline<S, C, OllamaClient> {
    /// 以設定建立 Ollama 用戶端；整個批次共用同一個連線
    pub fn new(storage: S, config: C) -> Result<Self> {
        let inference = OllamaClient::from_config(&config)?;
        Self::with_inference(storage, config, inference)
    }
}

impl<S: Storage, C: ConfigProvider, I: InferenceService> ClassificationPipeline<S, C, I> {
    /// 先載入模板；模板錯誤時不處理任何資料列
    pub fn with_inference(storage: S, config: C, inference: I) -> Result<Self> {
        let template = PromptTemplate::load(config.prompt_file())?;
        let prompts = PromptBuilder::new(template, config.date_parsing());
        Ok(Self {
            storage,
            config,
            classifier: RecordClassifier::new(inference, prompts),
        })
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn classifier(&self) -> &RecordClassifier<I> {
        &self.classifier
    }

    async fn classify_row(&self, data: &Dataset, index: usize) -> RowOutcome {
        let total = data.len();
        match table::record_at(data, index, self.config.columns()) {
            Ok(record) => self.classifier.classify(&record, index, total).await,
            Err(e) => self.classifier.fail(index, total, e),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, I: InferenceService> Pipeline for ClassificationPipeline<S, C, I> {
    async fn extract(&self) -> Result<Dataset> {
        let input_path = self.config.input_path();
        tracing::info!("📂 Reading input file: {}", input_path);

        let bytes = self.storage.read_file(input_path).await?;
        let dataset = table::read_table(&bytes, table::delimiter_for(input_path))?;

        tracing::info!("✓ Successfully read {} rows from {}", dataset.len(), input_path);
        Ok(dataset)
    }

    async fn transform(&self, mut data: Dataset) -> Result<BatchOutcome> {
        let total = data.len();
        let policy = self.config.failure_policy();
        tracing::info!("🚀 Classifying {} rows ({:?})", total, policy);

        let mut results = Vec::with_capacity(total);
        let mut summary = BatchSummary::default();

        for index in 0..total {
            tracing::info!("⏳ Processing row {}/{}...", index + 1, total);

            let result = match self.classify_row(&data, index).await {
                RowOutcome::Classified(result) => {
                    summary.classified += 1;
                    result
                }
                RowOutcome::Skipped(result) => {
                    summary.skipped += 1;
                    result
                }
                RowOutcome::Failed { error, .. } if policy == FailurePolicy::HaltOnError => {
                    tracing::error!("🛑 Halting batch at row {}; no output will be written", index + 1);
                    return Err(TaggerError::BatchHalted {
                        row: index + 1,
                        source: Box::new(error),
                    });
                }
                RowOutcome::Failed { result, .. } => {
                    summary.failed += 1;
                    result
                }
            };
            results.push(result);
        }

        let mut categories = Vec::with_capacity(total);
        let mut deductibility = Vec::with_capacity(total);
        let mut justifications = Vec::with_capacity(total);
        for result in &results {
            let [category, deductible, justification] = result.to_cells();
            categories.push(category);
            deductibility.push(deductible);
            justifications.push(justification);
        }

        data.set_column(CATEGORY_COLUMN, categories);
        data.set_column(DEDUCTIBLE_COLUMN, deductibility);
        data.set_column(JUSTIFICATION_COLUMN, justifications);

        tracing::info!(
            "✅ Classification finished: {} classified, {} skipped, {} failed",
            summary.classified,
            summary.skipped,
            summary.failed
        );

        Ok(BatchOutcome {
            table: data,
            results,
            summary,
        })
    }

    async fn load(&self, result: BatchOutcome) -> Result<String> {
        let output_path = self.config.output_path().to_string();
        tracing::info!("💾 Saving results to {}", output_path);

        let bytes = table::write_table(&result.table, table::delimiter_for(&output_path))?;
        self.storage.write_file(&output_path, &bytes).await?;

        tracing::debug!("Wrote {} bytes ({} rows)", bytes.len(), result.table.len());
        Ok(output_path)
    }
}
