pub mod api;
pub mod exporter;
pub mod fake;

pub use api::{HttpSheetsApi, SheetsApi, SheetsConfig, SheetsError};
pub use exporter::{ExportError, ExportOutcome, LedgerExporter};
pub use fake::InMemorySheet;
