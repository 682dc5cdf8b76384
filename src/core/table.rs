use crate::domain::model::{ColumnMapping, Dataset, ExpenseRecord, OrderDate, MISSING_PLACEHOLDER};
use crate::utils::error::{Result, TaggerError};
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 依副檔名決定分隔字元：.tsv/.tab 為 tab，其餘為逗號
pub fn delimiter_for(path: &str) -> u8 {
    match Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

pub fn read_table(data: &[u8], delimiter: u8) -> Result<Dataset> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(data);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Dataset::new(headers, rows))
}

pub fn write_table(dataset: &Dataset, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(&dataset.headers)?;
    for row in &dataset.rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| TaggerError::IoError(e.into_error()))
}

/// 讀取第 `index` 列；空白欄位取預設值，價格或數量非數字時回傳錯誤
pub fn record_at(dataset: &Dataset, index: usize, columns: &ColumnMapping) -> Result<ExpenseRecord> {
    let cell = |name: &str| dataset.cell(index, dataset.column_index(name));

    let product_name = match cell(&columns.product_name) {
        Some(name) if !name.eq_ignore_ascii_case(MISSING_PLACEHOLDER) => name.to_string(),
        _ => {
            // 缺少品名的列一律略過，不檢查其他欄位
            return Ok(ExpenseRecord::default());
        }
    };

    let unit_price = match cell(&columns.unit_price) {
        Some(raw) => parse_price(raw).ok_or_else(|| TaggerError::InvalidInputError {
            column: columns.unit_price.clone(),
            value: raw.to_string(),
            reason: "expected a number".to_string(),
        })?,
        None => 0.0,
    };

    let quantity = match cell(&columns.quantity) {
        Some(raw) => parse_quantity(raw).ok_or_else(|| TaggerError::InvalidInputError {
            column: columns.quantity.clone(),
            value: raw.to_string(),
            reason: "expected a whole number".to_string(),
        })?,
        None => 1,
    };

    let order_date = cell(&columns.order_date)
        .map(|raw| OrderDate::Text(raw.to_string()))
        .unwrap_or_default();

    Ok(ExpenseRecord {
        product_name,
        unit_price,
        quantity,
        order_date,
    })
}

fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_quantity(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        // 試算表匯出的整數常帶 .0
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Product Name,Unit Price,Quantity,Order Date\n\
Adobe Creative Cloud,59.99,1,2024-01-15\n\
\"Standing Desk, Oak\",\"$1,299.00\",2.0,01/20/2024\n\
,10,,\n";

    #[test]
    fn test_delimiter_for() {
        assert_eq!(delimiter_for("data/in.csv"), b',');
        assert_eq!(delimiter_for("data/in.TSV"), b'\t');
        assert_eq!(delimiter_for("data/in"), b',');
    }

    #[test]
    fn test_read_table_keeps_row_order() {
        let dataset = read_table(CSV.as_bytes(), b',').unwrap();

        assert_eq!(dataset.headers, vec!["Product Name", "Unit Price", "Quantity", "Order Date"]);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.rows[1][0], "Standing Desk, Oak");
    }

    #[test]
    fn test_read_table_strips_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(CSV.as_bytes());

        let dataset = read_table(&data, b',').unwrap();
        assert_eq!(dataset.headers[0], "Product Name");
    }

    #[test]
    fn test_record_at_parses_fields() {
        let dataset = read_table(CSV.as_bytes(), b',').unwrap();
        let columns = ColumnMapping::default();

        let first = record_at(&dataset, 0, &columns).unwrap();
        assert_eq!(first.product_name, "Adobe Creative Cloud");
        assert_eq!(first.unit_price, 59.99);
        assert_eq!(first.quantity, 1);
        assert_eq!(first.order_date, OrderDate::Text("2024-01-15".to_string()));

        let second = record_at(&dataset, 1, &columns).unwrap();
        assert_eq!(second.unit_price, 1299.0);
        assert_eq!(second.quantity, 2);
    }

    #[test]
    fn test_record_at_applies_defaults() {
        let dataset = read_table(CSV.as_bytes(), b',').unwrap();

        let record = record_at(&dataset, 2, &ColumnMapping::default()).unwrap();

        assert!(record.is_missing_product());
        assert_eq!(record, ExpenseRecord::default());
    }

    #[test]
    fn test_record_at_with_absent_columns() {
        let dataset = read_table(b"Product Name\nPrinter paper\n", b',').unwrap();

        let record = record_at(&dataset, 0, &ColumnMapping::default()).unwrap();

        assert_eq!(record.product_name, "Printer paper");
        assert_eq!(record.unit_price, 0.0);
        assert_eq!(record.quantity, 1);
    }

    #[test]
    fn test_missing_product_ignores_bad_numbers() {
        let dataset = read_table(b"Product Name,Unit Price,Quantity\nN/A,unknown,lots\n,??,\n", b',').unwrap();
        let columns = ColumnMapping::default();

        for index in 0..2 {
            let record = record_at(&dataset, index, &columns).unwrap();
            assert!(record.is_missing_product());
        }
    }

    #[test]
    fn test_record_at_rejects_non_numeric_price() {
        let dataset = read_table(b"Product Name,Unit Price\nPens,cheap\n", b',').unwrap();

        let err = record_at(&dataset, 0, &ColumnMapping::default()).unwrap_err();

        assert!(matches!(err, TaggerError::InvalidInputError { ref column, .. } if column == "Unit Price"));
    }

    #[test]
    fn test_custom_column_mapping() {
        let dataset = read_table(b"Item\tCost\nMonitor\t199\n", b'\t').unwrap();
        let columns = ColumnMapping {
            product_name: "Item".to_string(),
            unit_price: "Cost".to_string(),
            ..ColumnMapping::default()
        };

        let record = record_at(&dataset, 0, &columns).unwrap();

        assert_eq!(record.product_name, "Monitor");
        assert_eq!(record.unit_price, 199.0);
    }

    #[test]
    fn test_write_table_quotes_fields() {
        let dataset = Dataset::new(
            vec!["Product Name".to_string(), "Justification".to_string()],
            vec![vec!["Desk".to_string(), "Ordinary, necessary".to_string()]],
        );

        let bytes = write_table(&dataset, b',').unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Product Name,Justification\nDesk,\"Ordinary, necessary\"\n"
        );
    }
}
