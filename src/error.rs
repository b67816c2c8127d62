use std::path::PathBuf;

/// Errors surfaced by the export paths and terminal front-end.
///
/// Everything that runs per frame is infallible; only I/O can fail.
#[derive(Debug, thiserror::Error)]
pub enum Marble3dError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG encoding error for {path:?}: {source}")]
    PngEncoding {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
    #[error("invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, Marble3dError>;
