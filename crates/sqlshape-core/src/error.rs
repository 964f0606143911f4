//! Error types.

use std::error::Error as StdError;
use std::fmt;

/// Result alias used throughout SQLShape.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug)]
pub enum Error {
    /// A result type graph could not be expanded.
    TypeGraph(TypeGraphError),
    /// Plan compilation failed.
    Compile(CompileError),
    /// Invalid configuration.
    Config(ConfigError),
    /// Free-form error.
    Custom(String),
}

impl Error {
    /// Create a free-form error.
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }

    /// Create a compile error for the given SQL.
    pub fn compile(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Error::Compile(CompileError {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeGraph(e) => write!(f, "{}", e),
            Error::Compile(e) => write!(f, "{}", e),
            Error::Config(e) => write!(f, "{}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Compile(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn StdError + 'static)),
            Error::Config(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn StdError + 'static)),
            Error::TypeGraph(_) | Error::Custom(_) => None,
        }
    }
}

impl From<TypeGraphError> for Error {
    fn from(err: TypeGraphError) -> Self {
        Error::TypeGraph(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(ConfigError {
            message: format!("invalid configuration: {}", err),
            source: Some(Box::new(err)),
        })
    }
}

/// Which traversal limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeGraphErrorKind {
    /// Nesting went deeper than the configured maximum depth.
    TooDeep,
    /// More distinct types were discovered than the configured maximum.
    TooManyTypes,
}

/// Type-graph expansion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeGraphError {
    pub kind: TypeGraphErrorKind,
    /// Name of the type the expansion started from
    pub root: &'static str,
    /// The limit that was hit
    pub limit: usize,
}

impl fmt::Display for TypeGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            TypeGraphErrorKind::TooDeep => "nesting depth",
            TypeGraphErrorKind::TooManyTypes => "linked type count",
        };
        write!(
            f,
            "type graph too complex to analyze: {} of '{}' exceeds {}",
            what, self.root, self.limit
        )
    }
}

impl StdError for TypeGraphError {}

/// Plan compilation failure reported by the caller's compiler.
#[derive(Debug)]
pub struct CompileError {
    pub message: String,
    /// SQL being compiled, when known
    pub sql: Option<String>,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "plan compilation failed: {} (sql: {})", self.message, sql),
            None => write!(f, "plan compilation failed: {}", self.message),
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
