use crate::domain::model::RawModelResponse;
use crate::utils::error::ExtractionError;
use serde_json::{Map, Value};

const FENCE: &str = "```";

/// 將模型回應轉成 JSON 物件；缺少欄位不算失敗，交給預設值處理
pub fn extract(response: RawModelResponse) -> Result<Map<String, Value>, ExtractionError> {
    match response {
        RawModelResponse::Structured(map) => Ok(map),
        RawModelResponse::Text(text) => decode_text(&text),
    }
}

fn decode_text(text: &str) -> Result<Map<String, Value>, ExtractionError> {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        // 字串值裡可能本來就有 ```，先當作純 JSON 解析
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
            return Ok(map);
        }
    }
    decode_object(strip_code_fence(trimmed))
}

/// 去除 Markdown 程式碼區塊標記，也找得到夾在說明文字中的區塊；沒有標記時回傳去除空白後的原文
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(body) = fenced_body(trimmed) {
        return body.trim();
    }
    match trimmed.find(FENCE).and_then(|start| fenced_body(&trimmed[start..])) {
        Some(body) => body.trim(),
        None => trimmed,
    }
}

fn fenced_body(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FENCE)?;
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(rest.len());
    let rest = &rest[tag_len..];

    if let Some(body) = rest.trim_end().strip_suffix(FENCE) {
        return Some(body);
    }
    Some(match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    })
}

fn decode_object(body: &str) -> Result<Map<String, Value>, ExtractionError> {
    if body.is_empty() {
        return Err(ExtractionError::Empty);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ExtractionError::NotAnObject {
            found: json_kind(&other),
        }),
        Err(e) => Err(ExtractionError::InvalidJson {
            message: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
