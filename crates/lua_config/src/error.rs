use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating, parsing, or reading a configuration.
///
/// Every variant is fatal for the caller: there is no partially loaded
/// configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The search path has no directories in it.
    #[error("configuration search path is empty")]
    EmptySearchPath,

    /// The basename is absolute or climbs out of the search directories.
    #[error("configuration basename '{basename}' must be a relative path inside the search path")]
    InvalidBasename { basename: String },

    /// The basename is not present in any search directory.
    #[error("configuration file '{basename}' was not found in {searched:?}")]
    FileNotFound {
        basename: String,
        searched: Vec<PathBuf>,
    },

    /// The file exists but could not be read.
    #[error("failed to read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content is not valid configuration syntax.
    #[error("{file}:{line}:{column}: {message}")]
    Syntax {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// Executing the configuration failed.
    #[error("{file}: {message}")]
    Eval { file: String, message: String },

    /// An include chain returned to a file that is still being executed.
    #[error("include cycle: {}", chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },

    /// A file was included a second time.
    #[error("tried to include '{file}' twice; already included: {}", included.join(", "))]
    DuplicateInclude { file: String, included: Vec<String> },

    /// A value that has to be a table is something else.
    #[error("{what} must be a table, found {found}")]
    NotATable { what: String, found: &'static str },

    /// A key is present but holds a value of the wrong type.
    #[error("key '{key}' has type {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A required key is absent.
    #[error("key '{0}' is missing")]
    MissingKey(String),

    /// A numeric value is outside the accepted range.
    #[error("key '{key}' is out of range: {message}")]
    OutOfRange { key: String, message: String },
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
