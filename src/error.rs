//! Error types for directive rewriting and run-list planning.

use std::path::PathBuf;

/// Failure of one file-transformation call. Nothing is written when any of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// One or more requests matched nothing after disambiguation.
    #[error("no match in {}: {}", path.display(), labels.join(", "))]
    NotFound {
        /// File the batch was applied to.
        path: PathBuf,
        /// Every failing request label, in request order.
        labels: Vec<String>,
    },

    /// A replacement value cannot be written as a single value token.
    #[error("cannot render value for {label}: {reason}")]
    ValueConversion {
        /// Name or key the value belongs to.
        label: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A name, key or tag that no line could ever match.
    #[error("cannot match `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    /// Source file unreadable or destination unwritable.
    #[error("storage error on {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RewriteError {
    /// Labels of the requests that failed, if this is a matching failure.
    pub fn failed_labels(&self) -> &[String] {
        match self {
            RewriteError::NotFound { labels, .. } => labels,
            _ => &[],
        }
    }
}

/// Failure while reading a run list or building a mutation plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("run list has no `selected run IDs` line")]
    MissingSelection,

    #[error("run list has no `#START` line")]
    MissingStart,

    #[error("bad run ID list `{0}`: only integers, ',' and '-' are allowed")]
    InvalidRunIds(String),

    #[error("line {line}: {reason}")]
    InvalidRow { line: usize, reason: String },

    #[error("run ID range `{0}` spans more than {1} runs")]
    RangeTooLarge(String, u32),

    #[error("run setting {name}={value}: {reason}")]
    InvalidSetting {
        name: String,
        value: String,
        reason: String,
    },

    #[error("run {0} has auxiliary entries but no auxiliary file is configured")]
    MissingAuxFile(u32),

    #[error("parameter `{0}` is not of the form key=value")]
    InvalidParam(String),

    #[error("bad command reference `{0}`")]
    InvalidCommand(String),

    #[error("run {0} is not listed")]
    UnknownRun(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad JSON plan: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

/// Convenience result type for the rewriting engine.
pub type Result<T> = std::result::Result<T, RewriteError>;
