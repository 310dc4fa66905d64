//! Error to envelope conversion
//!
//! Errors are converted to envelopes with appropriate status codes. Anything
//! unexpected is logged in full and answered with a fixed text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use super::{Abort, Reply};
use crate::error::Error;
use crate::store::StoreError;

/// Text returned for every unhandled failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

impl Error {
    /// The reply this error renders as.
    pub fn to_reply(&self) -> Reply {
        match self {
            Self::Validation(e) => Reply::error(StatusCode::BAD_REQUEST, e.to_string()),
            Self::NotFound { .. } => Reply::error(StatusCode::NOT_FOUND, self.to_string()),
            Self::Abort(abort) => Reply::error(abort.status, abort.error.clone()),
            Self::Store(StoreError::Conflict { constraint }) => {
                warn!(%constraint, "unique constraint rejected write");
                Reply::error(StatusCode::CONFLICT, "record already exists")
            }
            Self::Store(StoreError::MissingReference { constraint }) => {
                warn!(%constraint, "foreign key rejected write");
                Reply::error(StatusCode::BAD_REQUEST, "referenced record does not exist")
            }
            Self::Store(e) => {
                // Log the actual error, return generic message
                error!(error = %e, "unhandled store error");
                internal_error()
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.to_reply().into_response()
    }
}

impl IntoResponse for Abort {
    fn into_response(self) -> Response {
        Reply::error(self.status, self.error).into_response()
    }
}

/// The generic 500 reply.
pub fn internal_error() -> Reply {
    Reply::error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use crate::value::{FieldKind, ValueError};
    use serde_json::json;

    fn body(err: &Error) -> serde_json::Value {
        serde_json::to_value(err.to_reply().envelope()).unwrap()
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let err = Error::from(ValidationError::UnknownAttribute {
            context: "filter",
            name: "colour".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_message_names_field() {
        let err = Error::from(ValidationError::Empty { field: "title" });
        assert_eq!(body(&err), json!({"error": "title cannot be empty", "data": {}}));
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let response = Error::not_found("track", "abc").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn abort_keeps_status_and_text() {
        let err = Error::from(Abort::new(StatusCode::IM_A_TEAPOT, "short and stout"));
        assert_eq!(err.to_reply().status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(body(&err)["error"], json!("short and stout"));
    }

    #[tokio::test]
    async fn conflict_is_409() {
        let err = Error::from(StoreError::Conflict {
            constraint: "added_by_name_key".into(),
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn missing_reference_is_400() {
        let err = Error::from(StoreError::MissingReference {
            constraint: "track_added_by_name_fkey".into(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = Error::from(StoreError::Decode {
            column: "track.year".into(),
            source: ValueError {
                expected: FieldKind::Integer,
                found: "text",
            },
        });
        let reply = err.to_reply();
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let rendered = serde_json::to_string(reply.envelope()).unwrap();
        assert!(!rendered.contains("track.year"));
        assert_eq!(body(&err)["error"], json!(INTERNAL_ERROR_MESSAGE));
    }
}
