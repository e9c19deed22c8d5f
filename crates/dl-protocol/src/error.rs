//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding or encoding frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is JSON but not an object
    #[error("Frame is not a JSON object")]
    NotAnObject,

    /// Object has no string `type` discriminant
    #[error("Frame has no `type` field")]
    MissingType,

    /// Known message type whose fields do not match the expected shape
    #[error("Malformed `{kind}` message: {source}")]
    Shape {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}
