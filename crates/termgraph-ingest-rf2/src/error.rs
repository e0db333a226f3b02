use termgraph_store::{ConversionError, GraphError};
use thiserror::Error;

/// Failure on a single RF2 row.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("expected {expected} columns, found {found}")]
    MissingColumns { expected: usize, found: usize },

    #[error("invalid {column} `{value}`: {message}")]
    InvalidField {
        column: String,
        value: String,
        message: String,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Failure loading an RF2 file. Any row failure aborts the whole file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{file}: error on line {line}: {source}")]
    Line {
        file: String,
        line: usize,
        #[source]
        source: RowError,
    },

    #[error("{file}: missing header")]
    MissingHeader { file: String },

    #[error("I/O error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Physical line number of the offending row, if the failure was row-level.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoadError::Line { line, .. } => Some(*line),
            _ => None,
        }
    }
}
