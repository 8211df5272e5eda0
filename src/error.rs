// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Domain error taxonomy.
//!
//! Everything raised while composing a query is detected before any backend
//! call. Backend failures other than not-found / conflict are carried through
//! unmodified in [`StacError::Backend`].

use thiserror::Error;

use crate::storage::traits::BackendError;

/// Stable error code, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidFilterExpression,
    ResultWindowExceeded,
    NotFound,
    Conflict,
    Backend,
}

impl ErrorKind {
    /// HTTP status class for the error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument | Self::InvalidFilterExpression => 400,
            Self::ResultWindowExceeded => 424,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Backend => 502,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidFilterExpression => "InvalidFilterExpression",
            Self::ResultWindowExceeded => "ResultWindowExceeded",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Backend => "BackendError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum StacError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid filter expression: {0}")]
    InvalidFilterExpression(String),
    #[error("The number of results requested ({requested}) is outside the maximum window {max}")]
    ResultWindowExceeded { requested: usize, max: usize },
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error(transparent)]
    Backend(BackendError),
}

impl StacError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidFilterExpression(_) => ErrorKind::InvalidFilterExpression,
            Self::ResultWindowExceeded { .. } => ErrorKind::ResultWindowExceeded,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<BackendError> for StacError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound { index, id } => Self::NotFound(format!("Document {} in {}", id, index)),
            BackendError::Conflict { index, id } => Self::Conflict(format!("Document {} in {}", id, index)),
            other => Self::Backend(other),
        }
    }
}
