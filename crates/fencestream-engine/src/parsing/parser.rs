use thiserror::Error;

use crate::models::{Action, ActionKind};
use crate::pages::PageRegistry;
use crate::resolvers::ResolverRegistry;

use super::fence::{BlockFence, BlockMeta, CloseMatch, HeadMatch};

/// Observable parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// No fence context; the buffer holds narration awaiting flush.
    Idle,
    /// An opening marker was seen but its head line is not complete yet.
    AwaitingHead,
    /// Head resolved; the buffer accumulates block content.
    InBlock,
    /// An oversized block was aborted; input is dropped through its closing fence.
    Discarding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Idle,
    AwaitingHead,
    /// `scanned` is a line start in the buffer; no closing fence precedes it.
    InBlock { meta: BlockMeta, scanned: usize },
    /// `mid_line` means the buffer was cut inside a line, so nothing can
    /// close before the next line break.
    Discarding { mid_line: bool },
}

impl Mode {
    fn state(&self) -> ParserState {
        match self {
            Mode::Idle => ParserState::Idle,
            Mode::AwaitingHead => ParserState::AwaitingHead,
            Mode::InBlock { .. } => ParserState::InBlock,
            Mode::Discarding { .. } => ParserState::Discarding,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Cap on the size of a block head or block content. A block over the cap
    /// is dropped whole, however its input was chunked. `None` buffers
    /// without bound.
    pub max_block_bytes: Option<usize>,
    /// Treat a completed first line that is not a valid head as plain text
    /// instead of waiting forever for a head that cannot arrive.
    pub reject_malformed_heads: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("Block exceeded {limit} bytes and was aborted ({discarded} bytes discarded)")]
    BlockTooLarge {
        meta: Option<BlockMeta>,
        limit: usize,
        /// Bytes known to belong to the block when it was aborted.
        discarded: usize,
    },

    #[error("Stream ended inside an unterminated block ({discarded} bytes discarded)")]
    Unterminated {
        meta: Option<BlockMeta>,
        discarded: usize,
    },
}

/// Streaming parser that lifts fenced blocks out of chunked model output.
///
/// Text chunks are appended to a single buffer and parsed as far as the
/// buffered input allows. Plain narration is emitted as text actions; a
/// completed block is handed to the resolver registered for its keyword,
/// creating its page on first reference. The emitted actions are the same no
/// matter where the input was split into chunks.
pub struct BlockParser {
    options: ParserOptions,
    pages: PageRegistry,
    resolvers: ResolverRegistry,
    buffer: String,
    mode: Mode,
}

impl BlockParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            pages: PageRegistry::new(),
            resolvers: ResolverRegistry::with_defaults(),
            buffer: String::new(),
            mode: Mode::Idle,
        }
    }

    pub fn with_pages(mut self, pages: PageRegistry) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_resolvers(mut self, resolvers: ResolverRegistry) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn state(&self) -> ParserState {
        self.mode.state()
    }

    /// Metadata of the block being collected, if any.
    pub fn current_block(&self) -> Option<&BlockMeta> {
        match &self.mode {
            Mode::InBlock { meta, .. } => Some(meta),
            _ => None,
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn pages(&self) -> &PageRegistry {
        &self.pages
    }

    pub fn into_pages(self) -> PageRegistry {
        self.pages
    }

    pub fn resolvers_mut(&mut self) -> &mut ResolverRegistry {
        &mut self.resolvers
    }

    /// Handle one action from the upstream stream.
    ///
    /// Text chunks are parsed; every other action passes through unchanged.
    pub fn handle(
        &mut self,
        action: Action,
        emit: &mut dyn FnMut(Action),
    ) -> Result<(), ParserError> {
        let Action { page, kind } = action;
        match kind {
            ActionKind::Text { chunk } => self.push_text(&chunk, emit),
            kind => {
                emit(Action { page, kind });
                Ok(())
            }
        }
    }

    /// Append a raw text chunk and make as much progress as it allows.
    ///
    /// The whole chunk is always consumed. If blocks were aborted along the
    /// way, the first abort is reported.
    pub fn push_text(
        &mut self,
        chunk: &str,
        emit: &mut dyn FnMut(Action),
    ) -> Result<(), ParserError> {
        self.buffer.push_str(chunk);

        let mut result = Ok(());
        loop {
            let (len, mode) = (self.buffer.len(), self.mode.clone());
            let step = self.step(emit);
            if result.is_ok() {
                result = step;
            }
            if self.buffer.len() == len && self.mode == mode {
                break;
            }
        }

        if self.mode == Mode::Idle {
            self.flush_plain_text(emit);
        }
        result
    }

    /// Signal end of stream.
    ///
    /// Withheld backticks are released as text, and a closing fence on the
    /// final unterminated line still closes its block. A head or block that
    /// never completed is discarded and reported. The parser is idle and
    /// empty afterwards either way.
    pub fn finish(&mut self, emit: &mut dyn FnMut(Action)) -> Result<(), ParserError> {
        let buffer = std::mem::take(&mut self.buffer);
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Idle => {
                Self::emit_text(buffer, emit);
                Ok(())
            }
            Mode::InBlock { meta, scanned } => {
                match BlockFence::find_close_from(&buffer, scanned) {
                    CloseMatch::Pending { content_end } => {
                        if let Some(limit) = self.over_limit(content_end) {
                            return Err(Self::abort(Some(meta), limit, content_end));
                        }
                        self.finish_block(&meta, &buffer[..content_end], emit);
                        Ok(())
                    }
                    _ => {
                        log::warn!(
                            "Stream ended inside block {}[{}], content discarded",
                            meta.block_type,
                            meta.page
                        );
                        Err(ParserError::Unterminated {
                            meta: Some(meta),
                            discarded: buffer.len(),
                        })
                    }
                }
            }
            Mode::AwaitingHead => {
                log::warn!("Stream ended before block head completed: {buffer:?}");
                Err(ParserError::Unterminated {
                    meta: None,
                    discarded: buffer.len(),
                })
            }
            // Already reported when the block was aborted.
            Mode::Discarding { .. } => Ok(()),
        }
    }

    fn step(&mut self, emit: &mut dyn FnMut(Action)) -> Result<(), ParserError> {
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Idle => {
                if let Some(idx) = self.buffer.find(BlockFence::MARKER) {
                    let before: String = self.buffer.drain(..idx).collect();
                    Self::emit_text(before, emit);
                    self.mode = Mode::AwaitingHead;
                }
                Ok(())
            }
            Mode::AwaitingHead => self.step_head(emit),
            Mode::InBlock { meta, scanned } => self.step_block(meta, scanned, emit),
            Mode::Discarding { mid_line } => {
                self.step_discard(mid_line);
                Ok(())
            }
        }
    }

    fn step_head(&mut self, emit: &mut dyn FnMut(Action)) -> Result<(), ParserError> {
        match BlockFence::match_head(&self.buffer) {
            HeadMatch::Complete { meta, len } => {
                self.buffer.drain(..len);
                if let Some(limit) = self.over_limit(len) {
                    self.mode = Mode::Discarding { mid_line: false };
                    return Err(Self::abort(Some(meta), limit, len));
                }
                log::debug!("Opened block {}[{}]", meta.block_type, meta.page);
                self.mode = Mode::InBlock { meta, scanned: 0 };
            }
            HeadMatch::Malformed { line_len } if self.options.reject_malformed_heads => {
                let line: String = self.buffer.drain(..line_len).collect();
                Self::emit_text(line, emit);
            }
            HeadMatch::Malformed { line_len } => {
                // Everything after an unusable head is held until the cap runs out.
                if let Some(limit) = self.over_limit(self.buffer.len()) {
                    let discarded = self.buffer.len();
                    self.buffer.drain(..line_len);
                    self.mode = Mode::Discarding { mid_line: false };
                    return Err(Self::abort(None, limit, discarded));
                }
                self.mode = Mode::AwaitingHead;
            }
            HeadMatch::Incomplete => {
                if let Some(limit) = self.over_limit(self.buffer.len()) {
                    let discarded = self.buffer.len();
                    self.buffer.clear();
                    self.mode = Mode::Discarding { mid_line: true };
                    return Err(Self::abort(None, limit, discarded));
                }
                self.mode = Mode::AwaitingHead;
            }
        }
        Ok(())
    }

    fn step_block(
        &mut self,
        meta: BlockMeta,
        scanned: usize,
        emit: &mut dyn FnMut(Action),
    ) -> Result<(), ParserError> {
        // `settled` counts bytes that are content whatever arrives next.
        let (settled, scanned) = match BlockFence::find_close_from(&self.buffer, scanned) {
            CloseMatch::Found {
                content_end,
                fence_end,
            } => {
                let content = self.buffer[..content_end].to_string();
                self.buffer.drain(..fence_end);
                if let Some(limit) = self.over_limit(content_end) {
                    return Err(Self::abort(Some(meta), limit, content_end));
                }
                self.finish_block(&meta, &content, emit);
                return Ok(());
            }
            CloseMatch::Pending { content_end } => (content_end, content_end),
            CloseMatch::NotFound => {
                let tail = BlockFence::undecided_tail_start(&self.buffer);
                let line_start = self.buffer.rfind('\n').map_or(0, |i| i + 1);
                (tail, line_start)
            }
        };

        if let Some(limit) = self.over_limit(settled) {
            self.mode = Mode::Discarding { mid_line: false };
            return Err(Self::abort(Some(meta), limit, settled));
        }
        self.mode = Mode::InBlock { meta, scanned };
        Ok(())
    }

    /// Drop input up to and including the closing fence of an aborted block.
    fn step_discard(&mut self, mid_line: bool) {
        if mid_line {
            self.mode = match self.buffer.find('\n') {
                Some(pos) => {
                    self.buffer.drain(..=pos);
                    Mode::Discarding { mid_line: false }
                }
                None => {
                    self.buffer.clear();
                    Mode::Discarding { mid_line: true }
                }
            };
            return;
        }

        self.mode = match BlockFence::find_close(&self.buffer) {
            CloseMatch::Found { fence_end, .. } => {
                self.buffer.drain(..fence_end);
                log::debug!("Skipped the rest of an aborted block");
                Mode::Idle
            }
            CloseMatch::Pending { content_end } => {
                self.buffer.drain(..content_end);
                Mode::Discarding { mid_line: false }
            }
            CloseMatch::NotFound => {
                let tail = BlockFence::undecided_tail_start(&self.buffer);
                if tail < self.buffer.len() {
                    self.buffer.drain(..tail);
                    Mode::Discarding { mid_line: false }
                } else {
                    let mid_line = !self.buffer.is_empty() && !self.buffer.ends_with('\n');
                    self.buffer.clear();
                    Mode::Discarding { mid_line }
                }
            }
        };
    }

    /// The configured cap, if `len` exceeds it.
    fn over_limit(&self, len: usize) -> Option<usize> {
        self.options.max_block_bytes.filter(|&limit| len > limit)
    }

    fn abort(meta: Option<BlockMeta>, limit: usize, discarded: usize) -> ParserError {
        log::warn!("Aborting block {meta:?}: {discarded} bytes exceed {limit}");
        ParserError::BlockTooLarge {
            meta,
            limit,
            discarded,
        }
    }

    fn finish_block(&mut self, meta: &BlockMeta, content: &str, emit: &mut dyn FnMut(Action)) {
        let content = content.trim_end();
        log::debug!(
            "Finished block {}[{}] with {} bytes",
            meta.block_type,
            meta.page,
            content.len()
        );
        if content.is_empty() {
            log::warn!("Empty block {}[{}] ignored", meta.block_type, meta.page);
            return;
        }
        let Some(resolver) = self.resolvers.get(&meta.block_type) else {
            log::warn!(
                "No resolver for block type {:?}, block for page {} ignored",
                meta.block_type,
                meta.page
            );
            return;
        };
        let page = self
            .pages
            .ensure(&meta.page, &meta.block_type, meta.title.as_deref(), emit);
        resolver.resolve(page, content, emit);
    }

    fn flush_plain_text(&mut self, emit: &mut dyn FnMut(Action)) {
        let keep = BlockFence::partial_marker_len(&self.buffer);
        let end = self.buffer.len() - keep;
        let text: String = self.buffer.drain(..end).collect();
        Self::emit_text(text, emit);
    }

    /// Whitespace-only narration is never emitted.
    fn emit_text(text: String, emit: &mut dyn FnMut(Action)) {
        if !text.trim().is_empty() {
            emit(Action::text(text));
        }
    }
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}
