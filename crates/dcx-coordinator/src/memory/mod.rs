//! In-process broker and store
//!
//! These implement the broker and store traits entirely in memory so the
//! coordination protocol can run inside one process: in tests, and in the
//! `dcx` sandbox binary against simulated workers.

mod broker;
mod store;

pub use broker::{MemoryBroker, RequestHandler};
pub use store::MemoryStore;
