use std::env;
use std::path::PathBuf;

/// Server configuration, read from the environment once at startup.
///
/// Sheets identity/credentials are deliberately not read here: the export
/// handler resolves them per request so the server can run (upload and
/// reconcile still work) while the sheet side is unconfigured.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Program that runs the statement parser, e.g. "python3".
    pub parser_program: String,
    /// Leading arguments, e.g. the parser script path.
    pub parser_args: Vec<String>,
    pub scratch_dir: PathBuf,
    /// Optional TOML rule table overriding the built-in classifier rules.
    pub rules_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::var("LOCKBOX_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let parser_program =
            env::var("LOCKBOX_PARSER_CMD").unwrap_or_else(|_| "python3".to_string());
        let parser_args = env::var("LOCKBOX_PARSER_SCRIPT")
            .map(|script| vec![script])
            .unwrap_or_default();
        let scratch_dir = env::var("LOCKBOX_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir());
        let rules_file = env::var("LOCKBOX_RULES_FILE").ok().map(PathBuf::from);
        Self { port, parser_program, parser_args, scratch_dir, rules_file }
    }
}
