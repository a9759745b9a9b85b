use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnpackError {
    // carries the name of whatever was being read at the time
    #[error("Error while reading {0} (premature end or corrupt file)")]
    TruncatedInput(String),

    #[error("Invalid boot magic: {}", .0.escape_ascii())]
    UnrecognizedFormat(Vec<u8>),

    #[error("Could not create output directory {}", .path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not extract image: {name}")]
    ExtractImage {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl UnpackError {
    pub fn truncated(field: impl Into<String>) -> Self {
        UnpackError::TruncatedInput(field.into())
    }
}
