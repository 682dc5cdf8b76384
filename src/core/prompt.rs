use crate::domain::model::{DateParsing, ExpenseRecord, OrderDate};
use crate::utils::error::{Result, TaggerError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::Path;

const BUILTIN_TEMPLATE: &str = include_str!("../../prompts/expense_categorization.txt");

pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptField {
    ProductName,
    UnitPrice,
    Quantity,
    OrderDate,
}

impl PromptField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "product_name" => Some(PromptField::ProductName),
            "unit_price" => Some(PromptField::UnitPrice),
            "quantity" => Some(PromptField::Quantity),
            "order_date" => Some(PromptField::OrderDate),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PromptField::ProductName => "product_name",
            PromptField::UnitPrice => "unit_price",
            PromptField::Quantity => "quantity",
            PromptField::OrderDate => "order_date",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(PromptField),
}

/// 解析後的提示詞模板：`{name}` 代入同名欄位，`{{`、`}}` 為大括號本身
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(TaggerError::TemplateError {
                            message: format!("unterminated placeholder starting at byte {}", offset),
                        });
                    }
                    let field = PromptField::from_name(&name).ok_or_else(|| TaggerError::TemplateError {
                        message: format!("unknown placeholder {{{}}}", name),
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(TaggerError::TemplateError {
                        message: format!("unmatched '}}' at byte {}", offset),
                    });
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// 內建的報稅分類提示詞
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_TEMPLATE)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TaggerError::ConfigError {
            message: format!("cannot read prompt file {}: {}", path.display(), e),
        })?;
        let template = Self::parse(&content)?;
        tracing::info!("✓ Loaded prompt template from {}", path.display());
        Ok(template)
    }

    /// 有指定檔案就讀檔，否則使用內建模板
    pub fn load(path: Option<&str>) -> Result<Self> {
        let template = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin()?,
        };
        if !template.uses(PromptField::ProductName) {
            tracing::warn!("⚠️ Prompt template never references {{product_name}}");
        }
        Ok(template)
    }

    pub fn uses(&self, field: PromptField) -> bool {
        self.segments.iter().any(|s| *s == Segment::Field(field))
    }

    pub fn render(&self, fields: &PromptFields) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => out.push_str(fields.get(*field)),
            }
        }
        out
    }
}

/// 已格式化、可直接代入模板的欄位值
#[derive(Debug, Clone, PartialEq)]
pub struct PromptFields {
    pub product_name: String,
    pub unit_price: String,
    pub quantity: String,
    pub order_date: String,
}

impl PromptFields {
    fn get(&self, field: PromptField) -> &str {
        match field {
            PromptField::ProductName => &self.product_name,
            PromptField::UnitPrice => &self.unit_price,
            PromptField::Quantity => &self.quantity,
            PromptField::OrderDate => &self.order_date,
        }
    }
}

pub struct PromptBuilder {
    template: PromptTemplate,
    date_parsing: DateParsing,
}

impl PromptBuilder {
    pub fn new(template: PromptTemplate, date_parsing: DateParsing) -> Self {
        Self {
            template,
            date_parsing,
        }
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn fields(&self, record: &ExpenseRecord) -> Result<PromptFields> {
        Ok(PromptFields {
            product_name: record.product_name.clone(),
            unit_price: format_number(record.unit_price),
            quantity: record.quantity.to_string(),
            order_date: normalize_order_date(&record.order_date, self.date_parsing)?,
        })
    }

    /// 產生單列的提示詞；只有嚴格日期模式下日期無法解析時會失敗
    pub fn build(&self, record: &ExpenseRecord) -> Result<String> {
        Ok(self.template.render(&self.fields(record)?))
    }
}

pub fn normalize_order_date(date: &OrderDate, parsing: DateParsing) -> Result<String> {
    match date {
        OrderDate::Date(d) => Ok(d.format(DATE_FORMAT).to_string()),
        OrderDate::Timestamp(ts) => Ok(ts.date().format(DATE_FORMAT).to_string()),
        OrderDate::Text(raw) => match (parse_flexible_date(raw), parsing) {
            (Some(d), _) => Ok(d.format(DATE_FORMAT).to_string()),
            (None, DateParsing::Lenient) => Ok(raw.clone()),
            (None, DateParsing::Strict) => Err(TaggerError::DateParseError { value: raw.clone() }),
        },
    }
}

pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    // YYYYMMDD
    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value[0..4].parse().ok()?;
        let month = value[4..6].parse().ok()?;
        let day = value[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

/// 整數值保留一位小數（1.0、0.0），其餘用最短表示
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
