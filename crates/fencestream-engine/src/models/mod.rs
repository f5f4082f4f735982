pub mod action;
pub mod page;

pub use action::{Action, ActionKind, Lifecycle, Phase, RunningKind};
pub use page::Page;
