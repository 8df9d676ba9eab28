use std::path::PathBuf;

/// Errors that can occur in pingpong.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("malformed alignment record in {path}: {message}")]
    Alignment { path: PathBuf, message: String },

    #[error("@SQ header lines of '{path}' differ from those of previous input files")]
    HeaderMismatch { path: PathBuf },

    #[error("no reference sequence name for contig index {index}")]
    UnknownContig { index: usize },

    #[error("failed to start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}
