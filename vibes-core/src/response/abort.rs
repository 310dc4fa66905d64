//! Abort signal
//!
//! Raised anywhere in a call chain with [`throw`] and carried up by `?` as
//! [`Error::Abort`]; the boundary renders it with its own status and text.

use axum::http::StatusCode;
use thiserror::Error;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct Abort {
    pub status: StatusCode,
    pub error: String,
}

impl Abort {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

/// Fail with `status` and `error`. Never returns `Ok`.
pub fn throw<T>(status: StatusCode, error: impl Into<String>) -> Result<T> {
    Err(Error::Abort(Abort::new(status, error)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guarded(flag: bool) -> Result<&'static str> {
        if flag {
            throw(StatusCode::FORBIDDEN, "not allowed")?;
        }
        Ok("passed")
    }

    #[test]
    fn throw_short_circuits() {
        assert_eq!(guarded(false).unwrap(), "passed");
        match guarded(true) {
            Err(Error::Abort(abort)) => {
                assert_eq!(abort.status, StatusCode::FORBIDDEN);
                assert_eq!(abort.error, "not allowed");
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }
}
