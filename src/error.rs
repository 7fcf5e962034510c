//! The boundary between internal `anyhow` error chains and the wire's closed
//! three-value error taxonomy (spec §7).

use crate::models::ErrorCode;

/// Classifies an internal failure into the wire taxonomy. Every failure path
/// in the pipeline engine picks one of these explicitly rather than trying to
/// infer a classification from the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TaxonomyError {
    #[error("invalid request")]
    InvalidRequest,
    #[error("internal server error")]
    InternalServerError,
}

impl TaxonomyError {
    pub fn code(self) -> ErrorCode {
        match self {
            TaxonomyError::InvalidRequest => ErrorCode::InvalidRequest,
            TaxonomyError::InternalServerError => ErrorCode::InternalServerError,
        }
    }
}

/// Pairs an `anyhow::Error` with its wire classification so a failure can be
/// published without re-deriving which `ErrorCode` it maps to.
pub struct ClassifiedError {
    pub source: anyhow::Error,
    pub taxonomy: TaxonomyError,
}

impl ClassifiedError {
    pub fn invalid_request(source: anyhow::Error) -> Self {
        Self {
            source,
            taxonomy: TaxonomyError::InvalidRequest,
        }
    }

    pub fn internal(source: anyhow::Error) -> Self {
        Self {
            source,
            taxonomy: TaxonomyError::InternalServerError,
        }
    }

    pub fn description(&self) -> String {
        format!("{:#}", self.source)
    }
}

pub trait InvalidRequest<T> {
    fn invalid_request(self) -> Result<T, ClassifiedError>;
}

pub trait Internal<T> {
    fn internal(self) -> Result<T, ClassifiedError>;
}

impl<T> InvalidRequest<T> for anyhow::Result<T> {
    fn invalid_request(self) -> Result<T, ClassifiedError> {
        self.map_err(ClassifiedError::invalid_request)
    }
}

impl<T> Internal<T> for anyhow::Result<T> {
    fn internal(self) -> Result<T, ClassifiedError> {
        self.map_err(ClassifiedError::internal)
    }
}
