use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for a comparison run. Configuration errors are raised
/// before any file is touched; format errors abort the load of the file
/// they occur in.
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("format error in {path} (line {line}): {reason}")]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("missing input: {reason}")]
    MissingInput { reason: String },

    #[error("expected exactly one quant-site file in '{folder}' for dataset '{label}', found {found}")]
    StructuralMismatch {
        folder: PathBuf,
        label: String,
        found: usize,
    },
}

impl CompareError {
    pub fn config(reason: impl Into<String>) -> Self {
        CompareError::Config {
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompareError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        CompareError::Format {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
