//! Error types for the statefix state editor.
//!
//! Errors fall into two tiers. Input errors (missing paths, unreadable or
//! malformed documents) and invariant errors (a change operation that cannot
//! be carried out, a validation predicate that cannot be rendered). Both
//! abort the run before any output is written.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for statefix.
#[derive(Debug, Error)]
pub enum StatefixError {
    /// Input document errors.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Change operation errors.
    #[error("Change error: {0}")]
    Change(#[from] ChangeError),

    /// Validation predicate errors.
    #[error("Validation predicate error: {0}")]
    Predicate(#[from] PredicateError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while resolving, reading, parsing or writing documents.
#[derive(Debug, Error)]
pub enum InputError {
    /// A required path was not supplied.
    #[error("no {kind} file specified")]
    MissingPath {
        /// Which document the path was for (plan, state).
        kind: String,
    },

    /// The document file does not exist.
    #[error("{document} file not found: {path}")]
    FileNotFound {
        /// Which document was being loaded.
        document: String,
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The document file could not be read.
    #[error("failed to read {document} file {path}: {message}")]
    ReadFailed {
        /// Which document was being loaded.
        document: String,
        /// Path to the unreadable file.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },

    /// The document could not be parsed.
    #[error("failed to parse {document} file{}: {message}", at(.location.as_deref()))]
    ParseError {
        /// Which document was being parsed.
        document: String,
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// The updated state could not be serialized.
    #[error("failed to serialize updated state: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// The updated state could not be written.
    #[error("failed to write updated state to {path}: {message}")]
    WriteFailed {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },
}

/// Invariant violations raised by change operations.
#[derive(Debug, Error)]
pub enum ChangeError {
    /// The operation's source address could not be parsed.
    #[error("invalid address: {address}")]
    InvalidAddress {
        /// The unparseable address.
        address: String,
    },

    /// The new address of a move does not carry an index key.
    #[error("invalid new address: {address}")]
    InvalidNewAddress {
        /// The offending address.
        address: String,
    },

    /// The resource an instance should move into does not exist.
    #[error("target resource {address:?} not found")]
    TargetNotFound {
        /// Bare address of the missing resource.
        address: String,
    },

    /// An instance's attribute payload is not a JSON object.
    #[error("failed to decode attributes of {address}: {message}")]
    AttributeDecode {
        /// Address of the instance.
        address: String,
        /// Description of the decode failure.
        message: String,
    },

    /// Rewriting an attribute on a moved instance failed.
    #[error("failed to set name on {address}: {message}")]
    SetAttributeFailed {
        /// Address of the instance.
        address: String,
        /// Description of the failure.
        message: String,
    },
}

/// Errors raised while parsing or rendering a validation predicate.
#[derive(Debug, Error)]
pub enum PredicateError {
    /// The predicate template is malformed.
    #[error("failed to parse predicate {expression:?}: {message}")]
    Parse {
        /// The predicate source.
        expression: String,
        /// Description of the parse error.
        message: String,
    },

    /// The predicate could not be evaluated.
    #[error("failed to evaluate predicate: {message}")]
    Eval {
        /// Description of the evaluation error.
        message: String,
    },

    /// The predicate rendered to something other than a boolean.
    #[error("predicate rendered {rendered:?}, expected a boolean")]
    NotBoolean {
        /// The trimmed rendered text.
        rendered: String,
    },
}

/// Result type alias for statefix operations.
pub type Result<T> = std::result::Result<T, StatefixError>;

impl StatefixError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error belongs to the input tier.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::Input(_) | Self::Io(_))
    }
}

impl InputError {
    /// Creates a parse error for the given document.
    #[must_use]
    pub fn parse(
        document: impl Into<String>,
        message: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self::ParseError {
            document: document.into(),
            message: message.into(),
            location,
        }
    }
}

fn at(location: Option<&str>) -> String {
    location.map_or_else(String::new, |l| format!(" at {l}"))
}

impl PredicateError {
    /// Creates an evaluation error with the given message.
    #[must_use]
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }
}
