//! Core error taxonomy
//!
//! Every failure inside the core is one of these. The boundary turns each
//! variant into exactly one envelope (see [`crate::response::boundary`]).

use thiserror::Error;

use crate::response::Abort;
use crate::store::StoreError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error(transparent)]
    Abort(#[from] Abort),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = Error::not_found("track", "abc");
        assert_eq!(err.to_string(), "track 'abc' not found");
    }

    #[test]
    fn validation_is_transparent() {
        let err = Error::from(ValidationError::Empty { field: "title" });
        assert_eq!(err.to_string(), "title cannot be empty");
    }
}
