use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::api::{SheetsApi, SheetsError};

/// In-memory `SheetsApi` for exporter tests: records writes and validation
/// rules, and can be told to start failing after N successful row writes to
/// exercise partial-failure reporting.
#[derive(Default)]
pub struct InMemorySheet {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// (row, col) → cell value, both 1-based.
    cells: BTreeMap<(u32, u32), Value>,
    validations: Vec<(u32, u32, Vec<String>)>,
    writes: u32,
    fail_after_writes: Option<u32>,
    fail_validation: bool,
}

impl InMemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate column A from row 1 downward ("" leaves a blank row).
    pub fn with_column_a(rows: &[&str]) -> Self {
        let sheet = Self::new();
        {
            let mut state = sheet.state.lock().unwrap();
            for (i, cell) in rows.iter().enumerate() {
                if !cell.is_empty() {
                    state
                        .cells
                        .insert((i as u32 + 1, 1), Value::String(cell.to_string()));
                }
            }
        }
        sheet
    }

    pub fn fail_after_writes(self, n: u32) -> Self {
        self.state.lock().unwrap().fail_after_writes = Some(n);
        self
    }

    pub fn fail_validation(self) -> Self {
        self.state.lock().unwrap().fail_validation = true;
        self
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<Value> {
        self.state.lock().unwrap().cells.get(&(row, col)).cloned()
    }

    pub fn validations(&self) -> Vec<(u32, u32, Vec<String>)> {
        self.state.lock().unwrap().validations.clone()
    }

    /// Rows that have at least one cell, in order.
    pub fn occupied_rows(&self) -> Vec<u32> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<u32> = state.cells.keys().map(|(r, _)| *r).collect();
        rows.dedup();
        rows
    }
}

#[async_trait]
impl SheetsApi for InMemorySheet {
    async fn read_column_a(&self) -> Result<Vec<String>, SheetsError> {
        let state = self.state.lock().unwrap();
        let last_row = state
            .cells
            .keys()
            .filter(|(_, c)| *c == 1)
            .map(|(r, _)| *r)
            .max()
            .unwrap_or(0);
        Ok((1..=last_row)
            .map(|r| match state.cells.get(&(r, 1)) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect())
    }

    async fn write_row(&self, row: u32, values: &[Value]) -> Result<(), SheetsError> {
        let mut state = self.state.lock().unwrap();
        if let Some(limit) = state.fail_after_writes {
            if state.writes >= limit {
                return Err(SheetsError::Api {
                    status: 503,
                    body: "injected write failure".to_string(),
                });
            }
        }
        for (i, value) in values.iter().enumerate() {
            state.cells.insert((row, i as u32 + 1), value.clone());
        }
        state.writes += 1;
        Ok(())
    }

    async fn set_cell_validation(
        &self,
        row: u32,
        column: u32,
        options: &[&str],
    ) -> Result<(), SheetsError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_validation {
            return Err(SheetsError::Api {
                status: 400,
                body: "injected validation failure".to_string(),
            });
        }
        state
            .validations
            .push((row, column, options.iter().map(|s| s.to_string()).collect()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn column_a_reflects_seeded_rows_and_gaps() {
        let sheet = InMemorySheet::with_column_a(&["Deposits", "", "Date 6/30/25"]);
        let col = sheet.read_column_a().await.unwrap();
        assert_eq!(col, vec!["Deposits", "", "Date 6/30/25"]);
    }

    #[tokio::test]
    async fn write_failure_injection_counts_rows() {
        let sheet = InMemorySheet::new().fail_after_writes(1);
        sheet.write_row(3, &[json!("ok")]).await.unwrap();
        assert!(sheet.write_row(4, &[json!("nope")]).await.is_err());
        assert_eq!(sheet.occupied_rows(), vec![3]);
    }
}
