use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Sheets configuration missing: {0} is not set")]
    ConfigurationMissing(&'static str),
    #[error("Sheets request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API rejected the request ({status}): {body}")]
    Api { status: u16, body: String },
}

/// The narrow remote-store capability the exporter needs: read the first
/// column, write a small row range, and attach a one-of-list validation rule
/// to a single cell. No transactional multi-row write exists.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Contents of column A from row 1 downward. Blank trailing rows may be
    /// omitted; blanks inside the range come back as empty strings.
    async fn read_column_a(&self) -> Result<Vec<String>, SheetsError>;

    /// Write one row of cells starting at column A of `row` (1-based).
    async fn write_row(&self, row: u32, values: &[Value]) -> Result<(), SheetsError>;

    /// Apply a ONE_OF_LIST dropdown constraint to the single cell at
    /// (`row`, `column`), both 1-based.
    async fn set_cell_validation(
        &self,
        row: u32,
        column: u32,
        options: &[&str],
    ) -> Result<(), SheetsError>;
}

/// Remote-store identity and credentials, sourced from the environment.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub token: String,
    /// Numeric sheet id inside the spreadsheet (tab 0 by default).
    pub sheet_id: i64,
    pub base_url: String,
}

impl SheetsConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://sheets.googleapis.com/v4/spreadsheets";

    /// Fail-fast constructor: a missing spreadsheet identity or credential is
    /// `ConfigurationMissing` before any write is attempted.
    pub fn from_env() -> Result<Self, SheetsError> {
        let spreadsheet_id = std::env::var("LOCKBOX_SPREADSHEET_ID")
            .map_err(|_| SheetsError::ConfigurationMissing("LOCKBOX_SPREADSHEET_ID"))?;
        let token = std::env::var("LOCKBOX_SHEETS_TOKEN")
            .map_err(|_| SheetsError::ConfigurationMissing("LOCKBOX_SHEETS_TOKEN"))?;
        let sheet_id = std::env::var("LOCKBOX_SHEET_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        Ok(Self {
            spreadsheet_id,
            token,
            sheet_id,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        })
    }
}

/// `SheetsApi` over the Google Sheets v4 REST surface.
pub struct HttpSheetsApi {
    client: reqwest::Client,
    config: SheetsConfig,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl HttpSheetsApi {
    pub fn new(config: SheetsConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{range}",
            self.config.base_url, self.config.spreadsheet_id
        )
    }

    async fn check(response: reqwest::Response) -> Result<(), SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::Api { status: status.as_u16(), body })
    }
}

/// "A5" for a single cell, "A5:C5" for a wider row. Only single-letter end
/// columns are representable; wider rows never occur in this layout.
fn row_range(row: u32, width: usize) -> String {
    assert!(width <= 26, "row width {width} exceeds column Z");
    if width <= 1 {
        format!("A{row}")
    } else {
        let end = (b'A' + (width as u8 - 1)) as char;
        format!("A{row}:{end}{row}")
    }
}

#[async_trait]
impl SheetsApi for HttpSheetsApi {
    async fn read_column_a(&self) -> Result<Vec<String>, SheetsError> {
        let response = self
            .client
            .get(self.values_url("A:A"))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api { status: status.as_u16(), body });
        }
        let range: ValueRange = response.json().await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| match row.into_iter().next() {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect())
    }

    async fn write_row(&self, row: u32, values: &[Value]) -> Result<(), SheetsError> {
        let range = row_range(row, values.len());
        let response = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.config.token)
            .json(&json!({ "values": [values] }))
            .send()
            .await?;
        Self::check(response).await
    }

    async fn set_cell_validation(
        &self,
        row: u32,
        column: u32,
        options: &[&str],
    ) -> Result<(), SheetsError> {
        let url = format!(
            "{}/{}:batchUpdate",
            self.config.base_url, self.config.spreadsheet_id
        );
        let body = json!({
            "requests": [{
                "setDataValidation": {
                    "range": {
                        "sheetId": self.config.sheet_id,
                        "startRowIndex": row - 1,
                        "endRowIndex": row,
                        "startColumnIndex": column - 1,
                        "endColumnIndex": column
                    },
                    "rule": {
                        "condition": {
                            "type": "ONE_OF_LIST",
                            "values": options
                                .iter()
                                .map(|o| json!({ "userEnteredValue": o }))
                                .collect::<Vec<_>>()
                        },
                        "showCustomUi": true,
                        "strict": false
                    }
                }
            }]
        });
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }
}
