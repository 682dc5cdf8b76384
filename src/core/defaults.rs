use crate::domain::model::{
    ClassificationResult, DEFAULT_CATEGORY, DEFAULT_DEDUCTIBLE, DEFAULT_JUSTIFICATION,
};
use serde_json::{Map, Value};

/// 補齊缺少的欄位。鍵名大小寫需完全一致；已存在的值不做型別轉換
pub fn apply_defaults(mut fields: Map<String, Value>) -> ClassificationResult {
    ClassificationResult {
        category: fields
            .remove("category")
            .unwrap_or_else(|| Value::String(DEFAULT_CATEGORY.to_string())),
        is_deductible: fields
            .remove("is_deductible")
            .unwrap_or(Value::Bool(DEFAULT_DEDUCTIBLE)),
        justification: fields
            .remove("justification")
            .unwrap_or_else(|| Value::String(DEFAULT_JUSTIFICATION.to_string())),
    }
}
