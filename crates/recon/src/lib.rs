pub mod reconciler;

pub use reconciler::{
    OfficeSource, ProcessedStatement, ReconcileError, Reconciler, StatementUpload,
};
