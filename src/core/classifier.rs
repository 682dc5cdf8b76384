use crate::core::defaults::apply_defaults;
use crate::core::extractor;
use crate::core::prompt::PromptBuilder;
use crate::domain::model::{
    cell_text, ClassificationResult, ExpenseRecord, DEFAULT_CATEGORY, DEFAULT_DEDUCTIBLE, ERROR_CATEGORY,
    MISSING_PRODUCT_JUSTIFICATION,
};
use crate::domain::ports::InferenceService;
use crate::utils::error::{Result, TaggerError};

/// 單列處理結果；失敗也會帶一份可寫入輸出的結果
#[derive(Debug)]
pub enum RowOutcome {
    Classified(ClassificationResult),
    Skipped(ClassificationResult),
    Failed {
        result: ClassificationResult,
        error: TaggerError,
    },
}

impl RowOutcome {
    pub fn skipped() -> Self {
        RowOutcome::Skipped(ClassificationResult::new(
            DEFAULT_CATEGORY,
            DEFAULT_DEDUCTIBLE,
            MISSING_PRODUCT_JUSTIFICATION,
        ))
    }

    pub fn failed(error: TaggerError) -> Self {
        let justification = match &error {
            TaggerError::ExtractionError(e) => format!("LLM response parsing error: {}", e),
            other => format!("Processing error: {}", other),
        };
        RowOutcome::Failed {
            result: ClassificationResult::new(ERROR_CATEGORY, DEFAULT_DEDUCTIBLE, justification),
            error,
        }
    }

    pub fn result(&self) -> &ClassificationResult {
        match self {
            RowOutcome::Classified(result) | RowOutcome::Skipped(result) => result,
            RowOutcome::Failed { result, .. } => result,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RowOutcome::Failed { .. })
    }
}

/// 逐列分類，錯誤一律收進 [`RowOutcome`]
pub struct RecordClassifier<I: InferenceService> {
    inference: I,
    prompts: PromptBuilder,
}

impl<I: InferenceService> RecordClassifier<I> {
    pub fn new(inference: I, prompts: PromptBuilder) -> Self {
        Self { inference, prompts }
    }

    pub fn prompts(&self) -> &PromptBuilder {
        &self.prompts
    }

    /// `index`、`total` 只用於日誌
    pub async fn classify(&self, record: &ExpenseRecord, index: usize, total: usize) -> RowOutcome {
        if record.is_missing_product() {
            tracing::warn!(
                "⚠️ Skipping row {}/{} due to missing 'Product Name'",
                index + 1,
                total
            );
            return RowOutcome::skipped();
        }

        match self.try_classify(record).await {
            Ok(result) => {
                tracing::info!("  📦 Product: {}", record.product_name);
                tracing::info!("  🏷️ Categorized as: {}", cell_text(&result.category));
                tracing::info!("  💰 Deductible: {}", cell_text(&result.is_deductible));
                tracing::info!("  📝 Justification: {}", cell_text(&result.justification));
                RowOutcome::Classified(result)
            }
            Err(error) => self.fail(index, total, error),
        }
    }

    /// 記錄錯誤並轉成錯誤列
    pub fn fail(&self, index: usize, total: usize, error: TaggerError) -> RowOutcome {
        tracing::error!("❌ Error processing row {}/{}: {}", index + 1, total, error);
        RowOutcome::failed(error)
    }

    async fn try_classify(&self, record: &ExpenseRecord) -> Result<ClassificationResult> {
        let prompt = self.prompts.build(record)?;
        tracing::debug!("Prompt for '{}' ({} chars)", record.product_name, prompt.len());

        let raw = self.inference.complete(&prompt).await?;
        tracing::debug!("Raw model response: {:?}", raw);

        let fields = extractor::extract(raw)?;
        Ok(apply_defaults(fields))
    }
}
