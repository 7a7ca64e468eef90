//! Error taxonomy for the ledger synchronization subsystem.
//!
//! Low-level backend errors are translated into this closed set at the
//! accessor/storage boundary; nothing above that layer sees a raw driver
//! error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(anyhow::Error),

    #[error("permission denied: {0}")]
    PermissionDenied(anyhow::Error),

    #[error("not found: {0}")]
    NotFound(anyhow::Error),

    #[error("transient failure: {0}")]
    Transient(anyhow::Error),

    #[error("validation error: {0}")]
    Validation(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Taxonomy code of a [`LedgerError`], exhaustively matchable and cheap to
/// store for user display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Transient,
    Validation,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<mongodb::error::Error> for LedgerError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind as MongoKind;

        let kind = match err.kind.as_ref() {
            MongoKind::Authentication { .. } => ErrorKind::PermissionDenied,
            // Code 13 is the server's Unauthorized.
            MongoKind::Command(c) if c.code == 13 => ErrorKind::PermissionDenied,
            MongoKind::Io(_) | MongoKind::ServerSelection { .. } => ErrorKind::Transient,
            _ => ErrorKind::Internal,
        };

        let err = anyhow::Error::new(err);
        match kind {
            ErrorKind::PermissionDenied => Self::PermissionDenied(err),
            ErrorKind::Transient => Self::Transient(err),
            _ => Self::Internal(err),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(anyhow::Error::new(err)),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(anyhow::Error::new(err)),
            std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset => Self::Transient(anyhow::Error::new(err)),
            _ => Self::Internal(anyhow::Error::new(err)),
        }
    }
}
