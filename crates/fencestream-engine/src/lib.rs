pub mod board;
pub mod messages;
pub mod models;
pub mod pages;
pub mod parsing;
pub mod resolvers;
pub mod session;

// Re-export key types for easier usage
pub use board::Board;
pub use messages::{DrawLookup, Message, MessageKind, MessageResolver};
pub use models::{Action, ActionKind, Lifecycle, Page, Phase, RunningKind};
pub use pages::PageRegistry;
pub use parsing::{BlockMeta, BlockParser, ParserError, ParserOptions, ParserState};
pub use resolvers::{BlockResolver, ResolverRegistry};
pub use session::Session;
