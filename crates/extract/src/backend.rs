use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to spawn text-extraction process: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Text-extraction process failed: {0}")]
    Process(String),
}

/// Abstraction over the external text-extraction capability.
///
/// Implementations receive a filesystem path to a scratch copy of the
/// document plus the original display filename (so multi-location parsing
/// hints can be derived inside the capability), and return the capability's
/// raw output — conceptually JSON. Everything behind this seam is an
/// I/O-bound suspension point; timeouts live on the implementation side.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn extract(&self, scratch_path: &Path, display_name: &str)
        -> Result<String, BackendError>;
}

// ── Command backend (production) ──────────────────────────────────────────────

/// Invokes an external parser process, e.g. `python3 parse_statement.py
/// <scratch> <display-name>`, and captures its stdout.
pub struct CommandBackend {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), leading_args: Vec::new() }
    }

    /// Arguments placed before the scratch path, e.g. the script path when
    /// `program` is an interpreter.
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.leading_args = args.into_iter().collect();
        self
    }
}

#[async_trait]
impl ExtractionBackend for CommandBackend {
    async fn extract(
        &self,
        scratch_path: &Path,
        display_name: &str,
    ) -> Result<String, BackendError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.leading_args)
            .arg(scratch_path)
            .arg(display_name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BackendError::Process(format!(
                "exit status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            // The parser writes debug lines to stderr even on success.
            tracing::debug!(%display_name, "extractor stderr: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── Mock backend (tests) ──────────────────────────────────────────────────────

/// Returns a preset result — lets the pipeline and reconciler be tested
/// without a real parser process installed.
pub struct MockBackend {
    result: Result<String, String>,
}

impl MockBackend {
    pub fn new(output: impl Into<String>) -> Self {
        Self { result: Ok(output.into()) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { result: Err(message.into()) }
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    async fn extract(
        &self,
        _scratch_path: &Path,
        _display_name: &str,
    ) -> Result<String, BackendError> {
        self.result
            .clone()
            .map_err(BackendError::Process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_preset_output() {
        let b = MockBackend::new(r#"{"deposits": []}"#);
        let out = b.extract(Path::new("/tmp/x.pdf"), "x.pdf").await.unwrap();
        assert_eq!(out, r#"{"deposits": []}"#);
    }

    #[tokio::test]
    async fn mock_failing_surfaces_process_error() {
        let b = MockBackend::failing("boom");
        let err = b.extract(Path::new("/tmp/x.pdf"), "x.pdf").await.unwrap_err();
        assert!(matches!(err, BackendError::Process(msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn command_backend_captures_stdout() {
        // `echo` ignores its arguments' meaning but exercises the spawn path.
        let b = CommandBackend::new("echo").with_args(["hello".to_string()]);
        let out = b.extract(Path::new("/tmp/x.pdf"), "x.pdf").await.unwrap();
        assert!(out.starts_with("hello"));
    }

    #[tokio::test]
    async fn command_backend_nonzero_exit_is_process_error() {
        let b = CommandBackend::new("false");
        let err = b.extract(Path::new("/tmp/x.pdf"), "x.pdf").await.unwrap_err();
        assert!(matches!(err, BackendError::Process(_)));
    }
}
