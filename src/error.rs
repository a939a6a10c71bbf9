//! Error types for cloud-init-fixture

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::userdata::ContentType;

/// Line and column of a YAML syntax error, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

fn at_location(location: &Option<Location>) -> String {
    location.map(|l| format!(" at {l}")).unwrap_or_default()
}

/// Errors produced while loading a cloud-config document
///
/// Every variant is terminal for the load: nothing is defaulted or
/// partially recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("YAML parsing error: {message}{}", at_location(.location))]
    Parse {
        message: String,
        location: Option<Location>,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid permissions {value:?} for {path}: expected 3 or 4 octal digits")]
    InvalidPermissions { path: String, value: String },

    #[error("User entry {index} has an empty name")]
    EmptyUserName { index: usize },

    #[error("Field '{field}' has the wrong type: expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    #[error("write_files entry {index} has a relative path: {path}")]
    RelativePath { index: usize, path: String },

    #[error("Failed to render cloud-config: {0}")]
    Render(String),
}

impl LoadError {
    /// Create a type mismatch error for `field`
    pub fn invalid_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidType {
            field: field.into(),
            expected,
        }
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(err: serde_yaml::Error) -> Self {
        let location = err.location().map(|l| Location {
            line: l.line(),
            column: l.column(),
        });
        Self::Parse {
            message: err.to_string(),
            location,
        }
    }
}

/// Errors from the payload, seed and CLI layers around the loader
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("User-data is not a cloud-config (detected {0})")]
    NotCloudConfig(ContentType),

    #[error("User-data payload is empty")]
    EmptyPayload,
}

impl FixtureError {
    /// Create an IO error tagged with the path being accessed
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
