use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("filesystem error on {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("step count must be at least 1")]
    InvalidSteps,

    #[error("disruption type `{0}` not supported (expected BC or V)")]
    UnsupportedDisruptionType(String),

    #[error("scenario directory missing: {} (run the replication step first)", .0.display())]
    MissingScenario(PathBuf),

    #[error("element `{element}` not found in {}", path.display())]
    MissingElement { path: PathBuf, element: String },

    #[error("malformed xml in {}: {message}", path.display())]
    Xml { path: PathBuf, message: String },

    #[error("edge-cost store busy ({}): {source}", path.display())]
    TransientStorage {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("edge-cost store error ({}): {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("edge importance table: {0}")]
    Csv(#[from] csv::Error),

    #[error("edge importance table lists edge_id {0} more than once")]
    DuplicateEdge(i64),

    #[error("route cost sentinel must be finite and positive, got {0}")]
    InvalidSentinel(f64),
}

impl ScenarioError {
    /// Whether the caller should retry the operation after a pause.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStorage { .. })
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
