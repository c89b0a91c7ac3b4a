use suito_core::LineItem;
use thiserror::Error;

/// Column headers of the exported ledger: item, amount.
pub const CSV_HEADER: [&str; 2] = ["項目", "金額"];

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV flush error: {0}")]
    Flush(String),
}

/// Render line items as UTF-8 CSV without a BOM, CRLF-terminated, header first.
/// Fields are quoted only when they contain a comma, quote or line break.
pub fn line_items_to_csv(items: &[LineItem]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for item in items {
        writer.write_record([item.item.as_str(), item.amount.as_str()])?;
    }

    writer.into_inner().map_err(|e| ExportError::Flush(e.to_string()))
}
