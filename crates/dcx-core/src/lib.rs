//! dcx-core: Core abstractions and configuration for dcx
//!
//! This crate provides the domain types, error taxonomy, broker and store
//! traits, and configuration shared by the coordinator and its tools.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::DcxError;
pub use types::{DisplayName, WorkerEndpoint};
