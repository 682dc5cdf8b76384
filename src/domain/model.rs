use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 缺值的佔位字串
pub const MISSING_PLACEHOLDER: &str = "N/A";

pub const DEFAULT_CATEGORY: &str = "Unknown";
pub const ERROR_CATEGORY: &str = "Error";
pub const DEFAULT_DEDUCTIBLE: bool = false;
pub const DEFAULT_JUSTIFICATION: &str = "No justification provided by LLM";
pub const MISSING_PRODUCT_JUSTIFICATION: &str = "Missing product information";

pub const CATEGORY_COLUMN: &str = "Category";
pub const DEDUCTIBLE_COLUMN: &str = "Is Deductible";
pub const JUSTIFICATION_COLUMN: &str = "Justification";

/// 批次失敗處理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    ContinueOnError,
    HaltOnError,
}

/// 訂單日期解析嚴格度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum DateParsing {
    /// 解析失敗時原樣使用
    #[default]
    Lenient,
    /// 解析失敗視為該列錯誤
    Strict,
}

/// 輸入表格的欄位名稱對應
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub product_name: String,
    pub unit_price: String,
    pub quantity: String,
    pub order_date: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            product_name: "Product Name".to_string(),
            unit_price: "Unit Price".to_string(),
            quantity: "Quantity".to_string(),
            order_date: "Order Date".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderDate {
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// 尚未解析的原始字串（包含缺值佔位）
    Text(String),
}

impl Default for OrderDate {
    fn default() -> Self {
        OrderDate::Text(MISSING_PLACEHOLDER.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub order_date: OrderDate,
}

impl ExpenseRecord {
    pub fn new(product_name: impl Into<String>, unit_price: f64, quantity: i64, order_date: OrderDate) -> Self {
        Self {
            product_name: product_name.into(),
            unit_price,
            quantity,
            order_date,
        }
    }

    pub fn is_missing_product(&self) -> bool {
        self.product_name == MISSING_PLACEHOLDER
    }
}

impl Default for ExpenseRecord {
    fn default() -> Self {
        Self {
            product_name: MISSING_PLACEHOLDER.to_string(),
            unit_price: 0.0,
            quantity: 1,
            order_date: OrderDate::default(),
        }
    }
}

/// 推論服務回傳的原始內容，只在單列處理期間存在
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelResponse {
    Text(String),
    Structured(Map<String, Value>),
}

impl From<String> for RawModelResponse {
    fn from(text: String) -> Self {
        RawModelResponse::Text(text)
    }
}

impl From<&str> for RawModelResponse {
    fn from(text: &str) -> Self {
        RawModelResponse::Text(text.to_string())
    }
}

/// 單列分類結果；保留 JSON 值，型別不符的回答原樣輸出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Value,
    pub is_deductible: Value,
    pub justification: Value,
}

impl ClassificationResult {
    pub fn new(category: impl Into<String>, is_deductible: bool, justification: impl Into<String>) -> Self {
        Self {
            category: Value::String(category.into()),
            is_deductible: Value::Bool(is_deductible),
            justification: Value::String(justification.into()),
        }
    }

    pub fn category_str(&self) -> Option<&str> {
        self.category.as_str()
    }

    pub fn deductible(&self) -> Option<bool> {
        self.is_deductible.as_bool()
    }

    pub fn justification_str(&self) -> Option<&str> {
        self.justification.as_str()
    }

    /// 依欄位順序輸出 CSV 儲存格
    pub fn to_cells(&self) -> [String; 3] {
        [
            cell_text(&self.category),
            cell_text(&self.is_deductible),
            cell_text(&self.justification),
        ]
    }
}

/// 字串原樣輸出，其他 JSON 值以精簡 JSON 文字輸出
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 以列順序保存的整份表格
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// 取得儲存格；欄位不存在、或內容為空白都視為缺值
    pub fn cell(&self, row: usize, column: Option<usize>) -> Option<&str> {
        let value = self.rows.get(row)?.get(column?)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// 設定欄位內容，同名欄位直接取代；`values` 須與 `rows` 逐列對齊
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    if row.len() <= index {
                        row.resize(index + 1, String::new());
                    }
                    row[index] = value;
                }
            }
            None => {
                let width = self.headers.len();
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.resize(width, String::new());
                    row.push(value);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub classified: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.classified + self.skipped + self.failed
    }
}

/// 附加三個結果欄位後的表格，於批次結束時寫出一次
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub table: Dataset,
    pub results: Vec<ClassificationResult>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_dataset() -> Dataset {
        Dataset::new(
            vec!["Product Name".to_string(), "Quantity".to_string()],
            vec![
                vec!["Laptop".to_string(), "1".to_string()],
                vec!["  ".to_string(), "2".to_string()],
            ],
        )
    }

    #[test]
    fn test_blank_cell_is_missing() {
        let dataset = sample_dataset();
        let column = dataset.column_index("Product Name");

        assert_eq!(dataset.cell(0, column), Some("Laptop"));
        assert_eq!(dataset.cell(1, column), None);
        assert_eq!(dataset.cell(0, dataset.column_index("Order Date")), None);
    }

    #[test]
    fn test_set_column_appends_new_header() {
        let mut dataset = sample_dataset();
        dataset.set_column("Category", vec!["Hardware".to_string(), "Unknown".to_string()]);

        assert_eq!(dataset.headers.len(), 3);
        assert_eq!(dataset.rows[0][2], "Hardware");
        assert_eq!(dataset.rows[1][2], "Unknown");
    }

    #[test]
    fn test_set_column_replaces_existing_header() {
        let mut dataset = sample_dataset();
        dataset.set_column("Quantity", vec!["5".to_string(), "6".to_string()]);

        assert_eq!(dataset.headers.len(), 2);
        assert_eq!(dataset.rows[0][1], "5");
        assert_eq!(dataset.rows[1][1], "6");
    }

    #[test]
    fn test_set_column_pads_short_rows() {
        let mut dataset = Dataset::new(
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["only-a".to_string()]],
        );
        dataset.set_column("C", vec!["c".to_string()]);

        assert_eq!(dataset.rows[0], vec!["only-a", "", "c"]);
    }

    #[test]
    fn test_cells_render_non_string_values_as_json() {
        let result = ClassificationResult {
            category: json!("Travel"),
            is_deductible: json!("yes"),
            justification: json!(["a", "b"]),
        };

        assert_eq!(result.to_cells(), ["Travel", "yes", "[\"a\",\"b\"]"]);
        assert_eq!(
            ClassificationResult::new("Travel", true, "ok").to_cells(),
            ["Travel", "true", "ok"]
        );
    }
}
