//! Frontend error types

use crate::location::CodeLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("unsupported construct `{construct}` at {location}")]
    Unsupported {
        construct: String,
        location: CodeLocation,
    },

    #[error("unresolved type `{name}` at {location}")]
    UnresolvedType { name: String, location: CodeLocation },

    #[error("enum `{name}` declares {variants} variants but {shapes} field lists")]
    ArityMismatch {
        name: String,
        variants: usize,
        shapes: usize,
    },

    #[error("function `{function}` can complete without a return value at {location}")]
    MissingReturnValue {
        function: String,
        location: CodeLocation,
    },

    #[error("`{keyword}` outside of a matching loop at {location}")]
    InvalidBreak {
        keyword: &'static str,
        location: CodeLocation,
    },

    #[error("parse error: {0}")]
    Parse(#[from] syn::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrontendError {
    pub fn unsupported(construct: impl Into<String>, location: CodeLocation) -> Self {
        FrontendError::Unsupported {
            construct: construct.into(),
            location,
        }
    }

    /// Location the error points at, when it has one
    pub fn location(&self) -> Option<&CodeLocation> {
        match self {
            FrontendError::Unsupported { location, .. }
            | FrontendError::UnresolvedType { location, .. }
            | FrontendError::MissingReturnValue { location, .. }
            | FrontendError::InvalidBreak { location, .. } => Some(location),
            FrontendError::ArityMismatch { .. } | FrontendError::Parse(_) | FrontendError::Io(_) => None,
        }
    }
}

pub type FrontendResult<T> = Result<T, FrontendError>;
