//! dcx-protocol: Worker protocol for display context coordination
//!
//! This crate defines the JSON documents exchanged between the coordinator
//! and display workers over the message broker, and the topics the
//! coordinator publishes and consumes.

pub mod command;
pub mod error;
pub mod layout;
pub mod reply;
pub mod request;
pub mod topic;

pub use command::Command;
pub use error::ProtocolError;
pub use layout::{Bounds, GridCell, GridSpec, LayoutMap, WindowLayout};
pub use reply::{
    ContextState, FocusedWindow, ReplyStatus, ReportedViewObject, ReportedWindow, WorkerReply,
};
pub use request::WorkerRequest;
