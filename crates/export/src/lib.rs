pub mod csv;

pub use crate::csv::{line_items_to_csv, ExportError, CSV_CONTENT_TYPE, CSV_HEADER};
