//! Error handling types for treelens
//!
//! Every failure path in the projection layer degrades to "no update"; these
//! types exist so the degradation is explicit at the call site and can be
//! logged with context.

use std::path::PathBuf;
use thiserror::Error;

use crate::document::Span;

/// Rejection reasons for a batch of host text changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditBatchError {
    /// Two changes in the same batch touch overlapping ranges
    #[error("overlapping edits: change at {next_start} starts before previous change ends at {previous_end}")]
    Overlapping {
        previous_end: usize,
        next_start: usize,
    },

    /// A change addresses bytes past the end of the document
    #[error("edit range {start}..{end} is outside the document (length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// A change boundary splits a multi-byte character
    #[error("edit offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

/// Failure to load a grammar from a dynamic library
#[derive(Debug, Error)]
pub enum ParserLoadError {
    #[error("Failed to load library: {0}")]
    Library(#[from] libloading::Error),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
}

/// Failure to construct or drive the external parser
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(transparent)]
    Load(#[from] ParserLoadError),

    #[error("Incompatible language: {0}")]
    IncompatibleLanguage(#[from] tree_sitter::LanguageError),
}

/// Failure talking to the analysis engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process could not be started
    #[error("Failed to spawn engine `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Framing or serialization problem on the wire
    #[error("Engine protocol error: {0}")]
    Protocol(String),

    /// The engine answered with `status: err` or a JSON-RPC error
    #[error("Engine reported an error: {message}")]
    Remote {
        message: String,
        /// Where the engine located the problem, when it said so validly
        span: Option<Span>,
    },

    /// The engine did not answer in time
    #[error("Engine request `{method}` timed out")]
    Timeout { method: String },

    /// The connection to the engine is gone
    #[error("Engine connection closed")]
    Closed,

    /// No advertised method matched the candidates for this capability
    #[error("Engine does not support {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reading a configuration layer
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Umbrella error type for treelens operations
#[derive(Debug, Error)]
pub enum TreelensError {
    #[error(transparent)]
    EditBatch(#[from] EditBatchError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Document not found in the session manager
    #[error("Document not found: {uri}")]
    DocumentNotFound { uri: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for treelens operations
pub type TreelensResult<T> = Result<T, TreelensError>;

impl TreelensError {
    /// Create a document not found error
    pub fn document_not_found(uri: impl Into<String>) -> Self {
        TreelensError::DocumentNotFound { uri: uri.into() }
    }
}

impl EngineError {
    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        EngineError::Protocol(message.into())
    }

    /// Create a remote error without a location
    pub fn remote(message: impl Into<String>) -> Self {
        EngineError::Remote {
            message: message.into(),
            span: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_batch_error_display() {
        let err = EditBatchError::Overlapping {
            previous_end: 10,
            next_start: 7,
        };
        assert_eq!(
            err.to_string(),
            "overlapping edits: change at 7 starts before previous change ends at 10"
        );
    }

    #[test]
    fn test_parser_load_error_display() {
        let err = ParserLoadError::SymbolNotFound("tree_sitter_rust".to_string());
        assert_eq!(err.to_string(), "Symbol not found: tree_sitter_rust");
    }

    #[test]
    fn test_umbrella_wraps_transparently() {
        let err: TreelensError = EngineError::Unsupported("hover").into();
        assert_eq!(err.to_string(), "Engine does not support hover");

        let err = TreelensError::document_not_found("file:///a.rs");
        assert_eq!(err.to_string(), "Document not found: file:///a.rs");
    }
}
