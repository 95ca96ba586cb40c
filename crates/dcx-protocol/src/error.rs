//! Protocol error types

use thiserror::Error;

use crate::reply::ReplyStatus;

/// Errors that can occur while building requests or validating replies
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unknown command tag
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Reply body could not be decoded into the shape its command requires
    #[error("Malformed {command} reply: {source}")]
    MalformedReply {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reply answered a different command than the one sent
    #[error("Reply for {actual} does not answer {expected}")]
    CommandMismatch { expected: String, actual: String },

    /// Worker answered with `status: "error"`
    #[error("Worker reported error for {command}: {message}")]
    WorkerReported { command: String, message: String },

    /// Reply status is not one the command can answer with
    #[error("Unexpected status {status:?} in {command} reply")]
    UnexpectedStatus { command: String, status: ReplyStatus },

    /// A typed reply was asked for a shape it does not carry
    #[error("Unexpected reply for {0}")]
    UnexpectedReply(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
