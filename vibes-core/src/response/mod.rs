//! Response envelope
//!
//! Every response body is `{"message": ..., "data": ...}` on success or
//! `{"error": ..., "data": ...}` on failure. `data` is `{}` when there is
//! nothing to return. Rendering never fails: a payload that cannot be
//! serialized is replaced by a fixed placeholder.

pub mod abort;
pub mod boundary;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

pub use abort::{throw, Abort};
pub use boundary::INTERNAL_ERROR_MESSAGE;

/// Message used when a success response names none
pub const DEFAULT_MESSAGE: &str = "Success";

/// Which of `message` / `error` the envelope carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Message(String),
    Error(String),
}

impl Outcome {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(text.into())
    }

    fn key(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Error(_) => "error",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Message(text) | Self::Error(text) => text,
        }
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Self::Message(DEFAULT_MESSAGE.to_owned())
    }
}

/// The canonical response body
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub outcome: Outcome,
    pub data: JsonValue,
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.outcome.key(), self.outcome.text())?;
        map.serialize_entry("data", &self.data)?;
        map.end()
    }
}

/// A status code plus envelope, ready for the transport
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    envelope: Envelope,
}

impl Reply {
    /// Success reply without data.
    pub fn message(status: StatusCode, text: impl Into<String>) -> Self {
        respond(status, Outcome::message(text), &())
    }

    /// Failure reply without data.
    pub fn error(status: StatusCode, text: impl Into<String>) -> Self {
        respond(status, Outcome::error(text), &())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Build the canonical reply for `data`.
pub fn respond<T: Serialize + ?Sized>(status: StatusCode, outcome: Outcome, data: &T) -> Reply {
    Reply {
        status,
        envelope: Envelope {
            outcome,
            data: render(data),
        },
    }
}

const UNSERIALIZABLE: &str = "unserializable data";

/// Serialize `data` for an envelope.
///
/// `null` becomes `{}`. A value that cannot be serialized renders as a fixed
/// placeholder; the cause is only logged.
pub fn render<T: Serialize + ?Sized>(data: &T) -> JsonValue {
    match serde_json::to_value(data) {
        Ok(JsonValue::Null) => JsonValue::Object(Map::new()),
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "response data could not be serialized");
            JsonValue::String(UNSERIALIZABLE.to_owned())
        }
    }
}
