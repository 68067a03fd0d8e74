pub mod edit;
pub mod node;
pub mod parser;
pub mod synchronizer;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export main types
pub use edit::{EditBatch, EditBatchBuilder, TextChange, compute_new_end_position};
pub use node::{Preorder, SyntaxNode, Visit};
pub use parser::{IncrementalParser, ParserLoader, TreeSitterParser};
pub use synchronizer::{SkipReason, SyncOutcome, TreeEditSynchronizer};
