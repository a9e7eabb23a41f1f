use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use lockbox_core::dates::parse_statement_date;
use lockbox_core::{LineItem, Office};

use crate::backend::ExtractionBackend;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("'{0}' is not a PDF statement")]
    UnsupportedFormat(String),
    #[error("Extraction failed for '{filename}': {diagnostic}")]
    ExtractionFailed { filename: String, diagnostic: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The structured result of extracting one statement document.
#[derive(Debug, Clone)]
pub struct ExtractedStatement {
    /// Line-item candidates in statement order, dates resolved to the
    /// statement year, descriptions whitespace-normalized.
    pub items: Vec<LineItem>,
    /// Office guess the capability derived from statement text, if any.
    /// Callers prefer filename resolution; this is the fallback.
    pub office_hint: Option<Office>,
}

// Wire shape of the capability's JSON output.
#[derive(Deserialize)]
struct WireResult {
    #[serde(default)]
    deposits: Vec<WireDeposit>,
    office: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct WireDeposit {
    date: String,
    description: String,
    amount: Decimal,
}

/// Orchestrates: format sniff → scratch copy → external capability → wire
/// JSON decode.
///
/// Each invocation gets its own uniquely named scratch file (timestamp prefix
/// plus random suffix), so concurrent batch extractions never collide. The
/// scratch file is removed on every exit path via RAII; a failed removal is
/// logged, never escalated — a stale scratch file wastes disk, it cannot
/// corrupt results.
pub struct StatementPipeline<B: ExtractionBackend> {
    backend: B,
    scratch_dir: PathBuf,
    /// Pinned year for year-less dates; `None` means "the year at the time
    /// the statement is processed". Resolving lazily keeps a long-running
    /// process correct across a year boundary.
    statement_year: Option<i32>,
}

impl<B: ExtractionBackend> StatementPipeline<B> {
    pub fn new(backend: B, scratch_dir: PathBuf) -> Self {
        Self {
            backend,
            scratch_dir,
            statement_year: None,
        }
    }

    /// Pin the year used to resolve year-less statement dates ("Jun 30").
    pub fn with_statement_year(mut self, year: i32) -> Self {
        self.statement_year = Some(year);
        self
    }

    pub async fn process(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<ExtractedStatement, ExtractError> {
        if !looks_like_pdf(bytes, filename) {
            return Err(ExtractError::UnsupportedFormat(filename.to_string()));
        }

        let scratch = tempfile::Builder::new()
            .prefix(&format!("statement-{}-", Utc::now().timestamp_millis()))
            .suffix(".pdf")
            .tempfile_in(&self.scratch_dir)?;
        tokio::fs::write(scratch.path(), bytes).await?;

        // Any early return below still deletes the scratch file when
        // `scratch` drops; the explicit close on the success path is only to
        // observe removal failures.
        let raw = self
            .backend
            .extract(scratch.path(), filename)
            .await
            .map_err(|e| ExtractError::ExtractionFailed {
                filename: filename.to_string(),
                diagnostic: e.to_string(),
            })?;

        let year = self
            .statement_year
            .unwrap_or_else(|| Utc::now().year());
        let statement = self.decode(&raw, filename, year)?;

        if let Err(e) = scratch.close() {
            tracing::warn!(%filename, "failed to remove scratch file: {e}");
        }

        Ok(statement)
    }

    fn decode(
        &self,
        raw: &str,
        filename: &str,
        year: i32,
    ) -> Result<ExtractedStatement, ExtractError> {
        let wire: WireResult =
            serde_json::from_str(raw).map_err(|e| ExtractError::ExtractionFailed {
                filename: filename.to_string(),
                diagnostic: format!("malformed extractor output ({e}): {}", truncate(raw, 200)),
            })?;

        if let Some(message) = wire.error {
            return Err(ExtractError::ExtractionFailed {
                filename: filename.to_string(),
                diagnostic: message,
            });
        }

        let mut items = Vec::with_capacity(wire.deposits.len());
        for dep in wire.deposits {
            let date = parse_statement_date(&dep.date, year).ok_or_else(|| {
                ExtractError::ExtractionFailed {
                    filename: filename.to_string(),
                    diagnostic: format!("unparseable line-item date '{}'", dep.date),
                }
            })?;
            items.push(LineItem::new(date, &dep.description, dep.amount));
        }

        let office_hint = wire.office.as_deref().and_then(Office::from_hint);

        Ok(ExtractedStatement { items, office_hint })
    }
}

fn looks_like_pdf(bytes: &[u8], filename: &str) -> bool {
    bytes.starts_with(b"%PDF-") || filename.to_lowercase().ends_with(".pdf")
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use chrono::NaiveDate;

    fn pipeline(backend: MockBackend) -> StatementPipeline<MockBackend> {
        StatementPipeline::new(backend, std::env::temp_dir()).with_statement_year(2025)
    }

    const PDF_BYTES: &[u8] = b"%PDF-1.7 fake";

    #[tokio::test]
    async fn process_decodes_deposits() {
        let json = r#"{
            "deposits": [
                {"date": "Jun 30", "description": "METLIFE  DENTAL/HCCLAIMPMT", "amount": 100.0},
                {"date": "Jul 1", "description": "FEP DENTAL", "amount": 250.5}
            ],
            "office": "GENUINE SMILES KEARNY"
        }"#;
        let result = pipeline(MockBackend::new(json))
            .process(PDF_BYTES, "Kearny_June.pdf")
            .await
            .unwrap();

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].date, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        assert_eq!(result.items[0].description, "METLIFE DENTAL/HCCLAIMPMT");
        assert_eq!(result.items[1].amount, Decimal::new(2505, 1));
        assert_eq!(result.office_hint, Some(Office::Kearny));
    }

    #[tokio::test]
    async fn process_without_office_hint() {
        let json = r#"{"deposits": []}"#;
        let result = pipeline(MockBackend::new(json))
            .process(PDF_BYTES, "statement.pdf")
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.office_hint, None);
    }

    #[tokio::test]
    async fn non_pdf_rejected_before_invocation() {
        // A failing backend proves the capability is never reached.
        let err = pipeline(MockBackend::failing("must not run"))
            .process(b"PK\x03\x04 zip bytes", "statement.xlsx")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(f) if f == "statement.xlsx"));
    }

    #[tokio::test]
    async fn pdf_magic_accepted_despite_odd_extension() {
        let json = r#"{"deposits": []}"#;
        assert!(pipeline(MockBackend::new(json))
            .process(PDF_BYTES, "statement.bin")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn capability_error_field_is_extraction_failure() {
        let err = pipeline(MockBackend::new(r#"{"error": "Failed to process PDF: no text"}"#))
            .process(PDF_BYTES, "union.pdf")
            .await
            .unwrap_err();
        match err {
            ExtractError::ExtractionFailed { filename, diagnostic } => {
                assert_eq!(filename, "union.pdf");
                assert!(diagnostic.contains("no text"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_output_is_extraction_failure() {
        let err = pipeline(MockBackend::new("traceback: KeyError"))
            .process(PDF_BYTES, "union.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn process_failure_is_extraction_failure() {
        let err = pipeline(MockBackend::failing("exit status 1: pdfplumber missing"))
            .process(PDF_BYTES, "union.pdf")
            .await
            .unwrap_err();
        match err {
            ExtractError::ExtractionFailed { diagnostic, .. } => {
                assert!(diagnostic.contains("pdfplumber missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unpinned_year_resolved_when_processing_not_at_construction() {
        let json = r#"{"deposits": [{"date": "Jan 2", "description": "FEP DENTAL", "amount": 1.0}]}"#;
        // No pinned year: a pipeline built in one year must stamp statements
        // processed in a later year with the later year.
        let pipeline = StatementPipeline::new(MockBackend::new(json), std::env::temp_dir());
        let result = pipeline.process(PDF_BYTES, "union.pdf").await.unwrap();
        assert_eq!(result.items[0].date.year(), Utc::now().year());
    }

    #[tokio::test]
    async fn unparseable_date_is_extraction_failure() {
        let json = r#"{"deposits": [{"date": "??", "description": "X", "amount": 1.0}]}"#;
        let err = pipeline(MockBackend::new(json))
            .process(PDF_BYTES, "union.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
    }
}
