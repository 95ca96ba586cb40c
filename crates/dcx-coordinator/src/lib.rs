//! dcx-coordinator: Display context coordination over a message broker
//!
//! The coordinator keeps a named display context (windows and the panes
//! embedded in them) consistent across independently crashing display
//! workers. It discovers live workers through the broker, rebuilds context
//! state from what the workers report, arbitrates the single active context
//! through a shared store, and prunes state when a worker disappears.

pub mod arbitrator;
pub mod context;
pub mod directory;
pub mod fanout;
pub mod memory;
pub mod registry;
pub mod sim;
pub mod state;

pub use arbitrator::{Activation, Arbitrator};
pub use context::{CloseOutcome, ContextQuit, DisplayContext, ReconcileOutcome};
pub use directory::WorkerDirectory;
pub use fanout::{EndpointReply, FanOut};
pub use registry::ContextRegistry;
pub use state::CoordinatorState;
