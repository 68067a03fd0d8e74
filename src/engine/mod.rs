//! Boundary to the out-of-process analysis engine.

pub mod capability;
pub mod connection;
pub mod envelope;
mod handle;

pub use capability::{Capabilities, Capability};
pub use connection::EngineConnection;
pub use envelope::{CompletionData, Envelope, FormatData, HoverData, RawCompletionItem};
pub use handle::{DEFAULT_TIMEOUT, EngineHandle};

#[cfg(test)]
pub(crate) use handle::tests::handle_with;
