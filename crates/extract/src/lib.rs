pub mod backend;
pub mod pipeline;

pub use backend::{BackendError, CommandBackend, ExtractionBackend, MockBackend};
pub use pipeline::{ExtractError, ExtractedStatement, StatementPipeline};
