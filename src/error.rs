//! Error handling for the DARF engine
//!
//! Library operations return the typed [`TaxError`]; the binary and the
//! importers use anyhow for context chaining.

use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by record management and tax runs
///
/// Cloneable so run observers can keep a copy; I/O errors are shared
/// behind an `Arc` to keep their source.
#[derive(Error, Debug, Clone)]
pub enum TaxError {
    /// A sale asks for more units than are held, or for an instrument with no position
    #[error("oversold position {name}: selling {requested} units but only {available} held")]
    OversoldPosition {
        name: String,
        requested: u64,
        available: u64,
    },

    #[error("malformed day trade pair at index {index}: {reason}")]
    MalformedDayTradePair { index: usize, reason: String },

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl From<std::io::Error> for TaxError {
    fn from(err: std::io::Error) -> Self {
        TaxError::Io(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversold_message_is_readable() {
        let err = TaxError::OversoldPosition {
            name: "PETR4".to_string(),
            requested: 150,
            available: 100,
        };
        assert_eq!(
            err.to_string(),
            "oversold position PETR4: selling 150 units but only 100 held"
        );
    }

    #[test]
    fn test_anyhow_context_chains_tax_errors() {
        use anyhow::Context;
        let result: anyhow::Result<()> =
            Err(TaxError::NotFound("stock VALE3".to_string())).context("failed to edit position");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to edit position"));
        assert!(format!("{:?}", err).contains("stock VALE3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing state");
        let err: TaxError = io.into();
        assert!(err.to_string().starts_with("io error"));

        let source = std::error::Error::source(&err).expect("io source kept");
        assert_eq!(source.to_string(), "missing state");
        let TaxError::Io(inner) = err.clone() else {
            panic!("expected an io error");
        };
        assert_eq!(inner.kind(), std::io::ErrorKind::NotFound);
    }
}
