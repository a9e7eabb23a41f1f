use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use lockbox_classify::{Classification, Classifier};
use lockbox_core::{ConsolidatedLedger, Deposit, Office};
use lockbox_extract::{ExtractError, ExtractionBackend, StatementPipeline};

/// One uploaded document: raw bytes plus the name it was uploaded under.
#[derive(Debug, Clone)]
pub struct StatementUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Where a document's office resolution came from, reported for
/// observability on the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeSource {
    Filename,
    Document,
    Unknown,
}

/// One document run through extract → classify → office stamping.
#[derive(Debug, Clone)]
pub struct ProcessedStatement {
    pub filename: String,
    pub office: Office,
    pub office_source: OfficeSource,
    /// Accepted deposits in statement order, office already stamped.
    pub deposits: Vec<Deposit>,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A single document failing fails the whole batch — no partial ledger.
    #[error("Reconciliation failed on '{filename}': {source}")]
    Document {
        filename: String,
        #[source]
        source: ExtractError,
    },
}

/// Fans the extraction pipeline out over a batch of uploads and merges the
/// per-document results into one `ConsolidatedLedger`.
///
/// Tasks share nothing mutable — each owns its bytes and scratch file — so
/// the fan-out needs no locks. The fan-in waits for every task (a failing
/// document does not force-cancel its siblings; their results are discarded)
/// and then fails atomically on the first error in document order.
pub struct Reconciler<B: ExtractionBackend + 'static> {
    pipeline: Arc<StatementPipeline<B>>,
    classifier: Arc<Classifier>,
}

impl<B: ExtractionBackend + 'static> Clone for Reconciler<B> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<B: ExtractionBackend + 'static> Reconciler<B> {
    pub fn new(pipeline: StatementPipeline<B>, classifier: Classifier) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            classifier: Arc::new(classifier),
        }
    }

    /// Handle on the rule table this reconciler classifies with, for callers
    /// that also classify outside the batch path.
    pub fn classifier(&self) -> Arc<Classifier> {
        Arc::clone(&self.classifier)
    }

    /// Extract and classify a single document.
    ///
    /// Office resolution order: filename match, then the extractor's embedded
    /// hint, then `Unknown`. The filename always wins when present.
    pub async fn process_one(
        &self,
        upload: StatementUpload,
    ) -> Result<ProcessedStatement, ExtractError> {
        let StatementUpload { bytes, filename } = upload;
        let extracted = self.pipeline.process(&bytes, &filename).await?;

        let (office, office_source) = match Office::from_filename(&filename) {
            Some(office) => (office, OfficeSource::Filename),
            None => match extracted.office_hint {
                Some(office) => (office, OfficeSource::Document),
                None => {
                    tracing::warn!(%filename, "could not resolve office, falling back to Unknown");
                    (Office::Unknown, OfficeSource::Unknown)
                }
            },
        };

        let deposits = extracted
            .items
            .into_iter()
            .filter_map(|item| match self.classifier.classify(&item) {
                Classification::Accepted { category } => {
                    Some(Deposit::from_line_item(item, office.clone(), category))
                }
                Classification::Excluded { .. } => None,
            })
            .collect();

        Ok(ProcessedStatement { filename, office, office_source, deposits })
    }

    /// Reconcile a batch of uploads into one consolidated ledger.
    ///
    /// Documents are processed concurrently; deposits merge in document
    /// order. If any document fails, the whole batch fails and the error
    /// names the offending file.
    pub async fn reconcile(
        &self,
        uploads: Vec<StatementUpload>,
    ) -> Result<ConsolidatedLedger, ReconcileError> {
        let (filenames, handles): (Vec<_>, Vec<_>) = uploads
            .into_iter()
            .map(|upload| {
                let filename = upload.filename.clone();
                let this = self.clone();
                (
                    filename,
                    tokio::spawn(async move { this.process_one(upload).await }),
                )
            })
            .unzip();

        // Every sibling runs to completion before the first error (in
        // document order) aborts the batch; failed siblings' results are
        // simply discarded.
        let joined = futures::future::join_all(handles).await;

        let mut deposits: Vec<Deposit> = Vec::new();
        for (filename, joined) in filenames.into_iter().zip(joined) {
            let processed = match joined {
                Ok(Ok(processed)) => processed,
                Ok(Err(source)) => {
                    return Err(ReconcileError::Document { filename, source });
                }
                Err(join_err) => {
                    return Err(ReconcileError::Document {
                        filename: filename.clone(),
                        source: ExtractError::ExtractionFailed {
                            filename,
                            diagnostic: format!("extraction task aborted: {join_err}"),
                        },
                    });
                }
            };
            deposits.extend(processed.deposits);
        }

        Ok(ConsolidatedLedger::from_deposits(deposits))
    }
}
