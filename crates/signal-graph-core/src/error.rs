//! Error types for topology and ingestion operations.

use thiserror::Error;

use crate::model::NodeId;

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised by topology lookups and file ingestion.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// No edge connects the two nodes.
    #[error("nodes {a} and {b} are not adjacent")]
    NotAdjacent { a: NodeId, b: NodeId },

    /// A name-based lookup found nothing.
    #[error("unknown entity: {name}")]
    UnknownEntity { name: String },

    /// A row or field of an input file could not be parsed. The whole load is aborted.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// An index or count outside the accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error while reading or writing a file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl TopologyError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }
}
