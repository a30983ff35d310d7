use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidInput,
    MultipleRecords,
    UnknownEnzyme,
    NoUsableEnzyme,
    Io,
    Internal,
}

/// A design failure. Only input problems and digests without any usable
/// enzyme end up here; everything recoverable is reported as a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct DesignError {
    pub code: ErrorCode,
    pub message: String,
}

impl DesignError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }
}

impl From<std::io::Error> for DesignError {
    fn from(err: std::io::Error) -> Self {
        DesignError::new(ErrorCode::Io, err.to_string())
    }
}

impl From<serde_json::Error> for DesignError {
    fn from(err: serde_json::Error) -> Self {
        DesignError::invalid_input(format!("Invalid JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = DesignError::new(ErrorCode::NoUsableEnzyme, "EcoRI has no site");
        assert_eq!(e.to_string(), "NoUsableEnzyme: EcoRI has no site");
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.fa");
        let e: DesignError = io.into();
        assert_eq!(e.code, ErrorCode::Io);
    }
}
