use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use lockbox_classify::{Classification, Classifier};
use lockbox_core::dates::parse_statement_date;
use lockbox_core::{ConsolidatedLedger, Deposit, LineItem, Office, Summary};
use lockbox_extract::CommandBackend;
use lockbox_recon::{OfficeSource, Reconciler, StatementUpload};
use lockbox_sheets::{HttpSheetsApi, LedgerExporter, SheetsConfig};

use crate::error::ApiError;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    reconciler: Reconciler<CommandBackend>,
    classifier: Arc<Classifier>,
}

impl AppState {
    /// Export classifies with the same rule table the reconciler uses, so a
    /// custom rules file applies to every endpoint.
    pub fn new(reconciler: Reconciler<CommandBackend>) -> Self {
        let classifier = reconciler.classifier();
        Self { reconciler, classifier }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/statements", post(upload_statement))
        .route("/api/reconcile", post(reconcile_batch))
        .route("/api/export", post(export_ledger))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Upload (single statement) ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    filename: String,
    office: Office,
    office_source: OfficeSource,
    deposits: Vec<Deposit>,
    summary: Summary,
}

async fn upload_statement(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut uploads = collect_uploads(multipart).await?;
    if uploads.len() != 1 {
        return Err(ApiError::BadRequest(format!(
            "Expected exactly one file, got {}",
            uploads.len()
        )));
    }
    let upload = uploads.remove(0);

    let processed = state.reconciler.process_one(upload).await?;
    let summary = ConsolidatedLedger::from_deposits(processed.deposits.clone()).summary;

    Ok(Json(UploadResponse {
        filename: processed.filename,
        office: processed.office,
        office_source: processed.office_source,
        deposits: processed.deposits,
        summary,
    }))
}

// ── Reconcile (multi-statement batch) ─────────────────────────────────────────

async fn reconcile_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConsolidatedLedger>, ApiError> {
    let uploads = collect_uploads(multipart).await?;
    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }
    let ledger = state.reconciler.reconcile(uploads).await?;
    Ok(Json(ledger))
}

async fn collect_uploads(mut multipart: Multipart) -> Result<Vec<StatementUpload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        uploads.push(StatementUpload { bytes: bytes.to_vec(), filename });
    }
    Ok(uploads)
}

// ── Export ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExportRequest {
    deposits: Vec<ExportDeposit>,
    /// Offices for a multi-file upload.
    #[serde(default)]
    offices: Vec<String>,
    /// Legacy single-office field, kept for older clients.
    #[serde(default)]
    office: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExportDeposit {
    date: String,
    description: String,
    amount: Decimal,
    #[serde(default)]
    office: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResponse {
    success: bool,
    rows_written: u32,
    deposits_added: usize,
    message: String,
}

async fn export_ledger(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, ApiError> {
    if request.deposits.is_empty() {
        return Err(ApiError::BadRequest("No deposits provided".to_string()));
    }

    let deposits = build_export_deposits(request, &state.classifier)?;
    let count = deposits.len();
    let ledger = ConsolidatedLedger::from_deposits(deposits);

    // Resolved per request so a misconfigured sheet fails fast here, before
    // any write attempt, without blocking the upload endpoints at startup.
    let config = SheetsConfig::from_env()?;
    let exporter = LedgerExporter::new(HttpSheetsApi::new(config));
    let outcome = exporter.export(&ledger).await?;

    Ok(Json(ExportResponse {
        success: true,
        rows_written: outcome.rows_written,
        deposits_added: count,
        message: format!("Successfully added {count} deposits to the sheet"),
    }))
}

fn build_export_deposits(
    request: ExportRequest,
    classifier: &Classifier,
) -> Result<Vec<Deposit>, ApiError> {
    let default_office = request
        .offices
        .first()
        .cloned()
        .or(request.office)
        .map(|label| Office::parse(&label))
        .unwrap_or(Office::Unknown);
    let year = Utc::now().year();

    request
        .deposits
        .into_iter()
        .map(|dep| {
            let date = parse_statement_date(&dep.date, year).ok_or_else(|| {
                ApiError::BadRequest(format!("Unparseable deposit date '{}'", dep.date))
            })?;
            let office = dep
                .office
                .as_deref()
                .map(Office::parse)
                .filter(|o| !o.is_unknown())
                .unwrap_or_else(|| default_office.clone());
            let item = LineItem::new(date, &dep.description, dep.amount);
            let category = match classifier.classify(&item) {
                Classification::Accepted { category } => category,
                // The caller already filtered; keep excluded-looking rows
                // but bucket them with the rest.
                Classification::Excluded { .. } => "other".to_string(),
            };
            Ok(Deposit::from_line_item(item, office, category))
        })
        .collect()
}
