//! Spreadsheet-friendly CSV rendering of a batch.

use crate::domain::{Column, Row, RowSchema};
use chrono::NaiveDate;
use thiserror::Error;

/// UTF-8 byte order mark, so spreadsheet apps detect the encoding.
pub const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer error: {0}")]
    Buffer(String),
}

/// Attachment name for a batch export.
pub fn csv_filename(from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "orders_{}_{}.csv",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    )
}

/// Render rows as CSV: BOM prefix, CRLF line ends, every field quoted.
///
/// The sale id is written as an Excel text formula (`="123"`) so long ids are
/// not shown in scientific notation.
pub fn rows_to_csv(schema: &RowSchema, rows: &[Row]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(schema.headers())?;
    let columns = schema.columns();
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|&column| match (column, row.cell(column)) {
                (Column::SaleId, cell) => format!("=\"{}\"", cell.to_text()),
                (_, cell) => cell.to_text(),
            })
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))?;
    Ok(format!("{}{}", UTF8_BOM, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn row() -> Row {
        Row {
            sale_id: 2000008123456789,
            date: "2024-05-01 10:00:00".to_string(),
            title: "Mate \"imperial\"".to_string(),
            final_price: Decimal::from_str_canonical("1500.50").unwrap(),
            installments: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_layout() {
        let csv = rows_to_csv(&RowSchema::new(false), &[row()]).unwrap();
        assert!(csv.starts_with(UTF8_BOM));
        let body = csv.trim_start_matches(UTF8_BOM);
        let lines: Vec<&str> = body.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "");
        assert!(lines[0].starts_with("\"ID DE VENTA\",\"FECHA\",\"TITULO\""));
        assert!(lines[1].starts_with("\"=\"\"2000008123456789\"\"\",\"2024-05-01 10:00:00\""));
        assert!(lines[1].contains("\"Mate \"\"imperial\"\"\""));
        assert!(lines[1].contains("\"1500.5\""));
        assert!(lines[1].ends_with("\"3\""));
    }

    #[test]
    fn test_interest_free_column_is_optional() {
        let without = rows_to_csv(&RowSchema::new(false), &[]).unwrap();
        let with = rows_to_csv(&RowSchema::new(true), &[]).unwrap();
        assert!(!without.contains("Precio Final sin interés"));
        assert!(with.contains("Precio Final sin interés"));
    }

    #[test]
    fn test_filename() {
        let from = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert_eq!(csv_filename(from, to), "orders_2024-05-01_2024-05-31.csv");
    }
}
