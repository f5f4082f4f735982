//! # Block Parsing
//!
//! Streaming recognition of fenced blocks inside free model output.
//!
//! ## Modules
//!
//! - **`fence`**: Fence grammar (`BlockFence`): head matching, closing fence
//!   search, and the partial-marker rule for chunk boundaries
//! - **`parser`**: `BlockParser` state machine (`Idle` → `AwaitingHead` →
//!   `InBlock` → `Idle`) driving finished blocks into resolvers; with a byte cap,
//!   oversized blocks detour through `Discarding` up to their closing fence
//!
//! ## Key Invariants
//!
//! - At most one block is open at a time; fences never nest
//! - Output does not depend on where the input was split into chunks
//! - Whitespace-only narration is never emitted

pub mod fence;
pub mod parser;

pub use fence::{BlockFence, BlockMeta};
pub use parser::{BlockParser, ParserError, ParserOptions, ParserState};
