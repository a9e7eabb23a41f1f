use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use lockbox_core::dates::format_sheet_date;
use lockbox_core::office::DROPDOWN_OPTIONS;
use lockbox_core::{ConsolidatedLedger, Deposit};

use crate::api::{SheetsApi, SheetsError};

pub const COLUMN_HEADERS: [&str; 3] = ["Amount", "Insurance Company", "Office"];

/// Column A rows 1–2 are a global header maintained by hand in the sheet;
/// the cursor scan starts below them.
const FIRST_DATA_ROW: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Rows actually written (date headers + column headers + deposit rows;
    /// blank separators are skipped rows, not writes).
    pub rows_written: u32,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Ledger contains no deposits to export")]
    EmptyLedger,
    #[error("Could not locate the next writable row: {0}")]
    Cursor(#[source] SheetsError),
    #[error("Export aborted after {rows_written} rows: {source}")]
    Partial {
        rows_written: u32,
        #[source]
        source: SheetsError,
    },
}

impl ExportError {
    pub fn rows_written(&self) -> u32 {
        match self {
            ExportError::Partial { rows_written, .. } => *rows_written,
            _ => 0,
        }
    }
}

/// Replicates a consolidated ledger into the remote sheet.
///
/// The write protocol is append-only and strictly sequential: every row
/// write depends on the cursor advanced by the one before it, and the remote
/// store has no transaction primitive, so nothing here is parallelized. The
/// cursor is recomputed from the sheet on every export — the sheet is also
/// hand-edited between exports, and a cached cursor would silently overwrite
/// user rows.
pub struct LedgerExporter<S: SheetsApi> {
    api: S,
}

impl<S: SheetsApi> LedgerExporter<S> {
    pub fn new(api: S) -> Self {
        Self { api }
    }

    pub fn into_inner(self) -> S {
        self.api
    }

    pub async fn export(&self, ledger: &ConsolidatedLedger) -> Result<ExportOutcome, ExportError> {
        if ledger.is_empty() {
            return Err(ExportError::EmptyLedger);
        }

        let groups = group_by_date(&ledger.deposits);
        let mut cursor = self.next_empty_row().await.map_err(ExportError::Cursor)?;
        let mut rows_written = 0u32;

        tracing::info!(
            start_row = cursor,
            dates = groups.len(),
            deposits = ledger.deposits.len(),
            "starting ledger export"
        );

        for (date, deposits) in groups {
            self.write_checked(cursor, &[json!(format!("Date {}", format_sheet_date(date)))], &mut rows_written)
                .await?;
            cursor += 1;

            let headers: Vec<Value> = COLUMN_HEADERS.iter().map(|h| json!(h)).collect();
            self.write_checked(cursor, &headers, &mut rows_written).await?;
            cursor += 1;

            for deposit in deposits {
                let row = deposit_row(deposit);
                self.write_checked(cursor, &row, &mut rows_written).await?;

                // Best-effort dropdown on the office cell; a failure here is
                // cosmetic and must not abort the export.
                if let Err(e) = self
                    .api
                    .set_cell_validation(cursor, 3, &DROPDOWN_OPTIONS)
                    .await
                {
                    tracing::warn!(row = cursor, "office dropdown not applied: {e}");
                }
                cursor += 1;
            }

            // Blank separator row: advance without writing.
            cursor += 1;
        }

        Ok(ExportOutcome { rows_written })
    }

    async fn write_checked(
        &self,
        row: u32,
        values: &[Value],
        rows_written: &mut u32,
    ) -> Result<(), ExportError> {
        self.api
            .write_row(row, values)
            .await
            .map_err(|source| ExportError::Partial { rows_written: *rows_written, source })?;
        *rows_written += 1;
        Ok(())
    }

    /// First blank row in column A at or below the reserved header rows.
    async fn next_empty_row(&self) -> Result<u32, SheetsError> {
        let column = self.api.read_column_a().await?;
        for (idx, cell) in column.iter().enumerate().skip(FIRST_DATA_ROW as usize - 1) {
            if cell.trim().is_empty() {
                return Ok(idx as u32 + 1);
            }
        }
        Ok((column.len() as u32 + 1).max(FIRST_DATA_ROW))
    }
}

fn deposit_row(deposit: &Deposit) -> Vec<Value> {
    vec![
        json!(deposit.amount),
        json!(deposit.description),
        json!(deposit.office.to_string()),
    ]
}

/// Group deposits by exact calendar date, ascending; input order is
/// preserved within each group.
fn group_by_date(deposits: &[Deposit]) -> BTreeMap<NaiveDate, Vec<&Deposit>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Deposit>> = BTreeMap::new();
    for deposit in deposits {
        groups.entry(deposit.date).or_default().push(deposit);
    }
    groups
}
