/// Errors raised at the typed seams of the index (configuration, I/O,
/// thread pools, watching, remote fetching).
///
/// Per-document extraction failures are not errors: they are collected in
/// dispatch reports. Pipeline-level failures travel as `anyhow::Error` with
/// phase context attached.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to build parse thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
