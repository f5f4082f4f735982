//! # Block Resolvers
//!
//! A resolver turns the finalized content of one fenced block into exactly
//! one committed [`Action`] for a page. Resolvers are registered under the
//! fence keyword they handle (the `mermaid` in ```` ```mermaid[p1] ````).
//!
//! ## Contract
//!
//! Given a page and the block content (trailing whitespace already trimmed),
//! a resolver must append exactly one action to `page.steps`, pass that same
//! action to `emit`, and return it. It must not touch anything outside the
//! page and the emit channel.

pub mod mermaid;
pub mod note;

use std::collections::HashMap;
use std::fmt;

use crate::models::{Action, Page};

pub use mermaid::resolve_mermaid;
pub use note::resolve_note;

pub trait BlockResolver: Send + Sync {
    fn resolve(&self, page: &mut Page, content: &str, emit: &mut dyn FnMut(Action)) -> Action;
}

impl<F> BlockResolver for F
where
    F: Fn(&mut Page, &str, &mut dyn FnMut(Action)) -> Action + Send + Sync,
{
    fn resolve(&self, page: &mut Page, content: &str, emit: &mut dyn FnMut(Action)) -> Action {
        self(page, content, emit)
    }
}

/// Mapping from fence keyword to the resolver that handles it.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<String, Box<dyn BlockResolver>>,
}

impl ResolverRegistry {
    pub const MERMAID: &'static str = "mermaid";
    pub const NOTE: &'static str = "note";

    /// An empty registry; every block is discarded until something is registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `mermaid` and `note` resolvers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Self::MERMAID, resolve_mermaid);
        registry.register(Self::NOTE, resolve_note);
        registry
    }

    /// Register `resolver` for `keyword`, replacing any previous one.
    pub fn register<R>(&mut self, keyword: impl Into<String>, resolver: R)
    where
        R: BlockResolver + 'static,
    {
        self.resolvers.insert(keyword.into(), Box::new(resolver));
    }

    pub fn get(&self, keyword: &str) -> Option<&dyn BlockResolver> {
        self.resolvers.get(keyword).map(|r| r.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.resolvers.contains_key(keyword)
    }

    /// Registered keywords, sorted.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("keywords", &self.keywords())
            .finish()
    }
}
