use std::sync::OnceLock;

use regex::Regex;

/// Metadata of the fence currently open, recovered from its head line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMeta {
    /// Block-type keyword, used to pick the resolver.
    pub block_type: String,
    pub page: String,
    pub title: Option<String>,
}

/// Outcome of matching a block head at the start of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadMatch {
    /// The whole head line matched; `len` bytes (line break included) belong to it.
    Complete { meta: BlockMeta, len: usize },
    /// The head line has not been fully received yet.
    Incomplete,
    /// The first line is complete and is not a block head.
    Malformed { line_len: usize },
}

/// Outcome of searching block content for its closing fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMatch {
    /// Closing fence found; content is `..content_end`, the fence line ends at `fence_end`.
    Found { content_end: usize, fence_end: usize },
    /// A closing candidate sits on the last, unfinished line.
    Pending { content_end: usize },
    NotFound,
}

/// Fence grammar for embedded blocks:
///
/// ```text
/// ```mermaid[page-id;Bracket title]|Trailing title
/// ...content...
/// ```
/// ```
pub struct BlockFence;

impl BlockFence {
    pub const MARKER: &'static str = "```";
    pub const TICK: char = '`';

    fn head_regex() -> &'static Regex {
        static HEAD_REGEX: OnceLock<Regex> = OnceLock::new();
        HEAD_REGEX.get_or_init(|| {
            Regex::new(
                r"^```[ \t]*([A-Za-z][A-Za-z0-9_-]*)[ \t]*\[([^\]\s|;]+)(?:;([^\]\n]+))?\](?:\|([^\n`]+))?[ \t]*\r?\n",
            )
            .expect("Invalid block head regex")
        })
    }

    /// Matches a block head at offset 0 of `buf`.
    ///
    /// `buf` is expected to start with [`Self::MARKER`].
    pub fn match_head(buf: &str) -> HeadMatch {
        if let Some(caps) = Self::head_regex().captures(buf) {
            let title = caps
                .get(3)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            return HeadMatch::Complete {
                meta: BlockMeta {
                    block_type: caps[1].to_string(),
                    page: caps[2].to_string(),
                    title,
                },
                len: caps[0].len(),
            };
        }
        match buf.find('\n') {
            Some(pos) => HeadMatch::Malformed { line_len: pos + 1 },
            None => HeadMatch::Incomplete,
        }
    }

    /// Finds the first closing fence at the start of a line in `buf`.
    ///
    /// `buf` must begin at the start of a line.
    pub fn find_close(buf: &str) -> CloseMatch {
        Self::find_close_from(buf, 0)
    }

    /// [`Self::find_close`] starting at `from`, which must be the start of a
    /// line. Lines before it are known not to hold a closing fence.
    pub fn find_close_from(buf: &str, from: usize) -> CloseMatch {
        let mut from = from;
        while let Some(rel) = buf[from..].find(Self::MARKER) {
            let start = from + rel;
            from = start + Self::MARKER.len();
            if start > 0 && !buf[..start].ends_with('\n') {
                continue;
            }

            let rest = buf[from..].trim_start_matches([' ', '\t']);
            let fence_end = buf.len() - rest.len();
            if rest.starts_with('\n') {
                return CloseMatch::Found {
                    content_end: start,
                    fence_end: fence_end + 1,
                };
            }
            if rest.starts_with("\r\n") {
                return CloseMatch::Found {
                    content_end: start,
                    fence_end: fence_end + 2,
                };
            }
            if rest.is_empty() || rest == "\r" {
                return CloseMatch::Pending { content_end: start };
            }
        }
        CloseMatch::NotFound
    }

    /// Start of the last line of `buf` when that line could still grow into a
    /// closing fence, otherwise `buf.len()`. Everything before it is settled
    /// block content.
    pub fn undecided_tail_start(buf: &str) -> usize {
        let line_start = buf.rfind('\n').map_or(0, |i| i + 1);
        if Self::MARKER.starts_with(&buf[line_start..]) {
            line_start
        } else {
            buf.len()
        }
    }

    /// Number of trailing backticks (one or two) that may be the beginning of
    /// a marker split across chunks.
    pub fn partial_marker_len(buf: &str) -> usize {
        if buf.ends_with("``") {
            2
        } else if buf.ends_with(Self::TICK) {
            1
        } else {
            0
        }
    }
}
