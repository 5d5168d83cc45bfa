use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unable to open feature store {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse layer `{layer}` ({}): {message}", path.display())]
    Parse {
        layer: String,
        path: PathBuf,
        message: String,
    },

    #[error("geometry type {kind} not supported")]
    UnsupportedGeometry { kind: String },

    #[error("line string needs at least 2 vertices, got {points}")]
    DegenerateLine { points: usize },

    #[error("position needs at least 2 ordinates, got {ordinates}")]
    InvalidPosition { ordinates: usize },

    #[error("layer `{layer}` not found in feature store {}", path.display())]
    LayerNotFound { layer: String, path: PathBuf },
}
