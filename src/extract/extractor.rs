use std::ops::Range;

use crate::extract::block::{DEFAULT_TITLE, OutputBlock};
use crate::extract::markers::{
    Dialect, MarkerAttributes, StartMatch, partial_suffix_len, pending_start,
};
use crate::foundation::core::BlockKind;
use crate::foundation::hash::synthesize_block_id;

/// Result of scanning one message's cumulative text.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Extraction {
    /// Blocks in the order their start markers appear.
    pub blocks: Vec<OutputBlock>,
    /// The text with every recognized marker span removed, trimmed.
    pub visible_text: String,
}

/// Scan `text` (everything streamed so far for `message_id`) for output blocks.
///
/// Pure: the same inputs always produce the same blocks, ids and visible text, so callers re-run
/// it over the whole text on every chunk instead of tracking parser state between chunks. For
/// append-only text, a streaming block's content only ever grows between calls.
pub fn extract(text: &str, message_id: &str) -> Extraction {
    let tagged = scan(text, message_id, Dialect::Tagged, text.len());

    let pending = pending_start(text);
    let mut found = if tagged.blocks.is_empty() {
        let limit = pending.unwrap_or(text.len());
        Dialect::LEGACY
            .into_iter()
            .map(|d| scan(text, message_id, d, limit))
            .find(|s| !s.blocks.is_empty())
            .inspect(|_| tracing::debug!(message_id, "using legacy output markers"))
            .unwrap_or(tagged)
    } else {
        tagged
    };
    if let Some(at) = pending {
        found.hidden.push(at..text.len());
    }

    Extraction {
        visible_text: strip_ranges(text, found.hidden),
        blocks: found.blocks,
    }
}

struct Scan {
    blocks: Vec<OutputBlock>,
    hidden: Vec<Range<usize>>,
}

fn scan(full: &str, message_id: &str, dialect: Dialect, limit: usize) -> Scan {
    let text = &full[..limit];
    let mut out = Scan {
        blocks: Vec::new(),
        hidden: Vec::new(),
    };

    let mut pos = 0;
    while let Some(found) = dialect.find_start(text, pos) {
        let (at, tag_end, attrs) = match found {
            StartMatch::Partial { at } => {
                out.hidden.push(at..text.len());
                break;
            }
            StartMatch::Complete { at, tag_end, attrs } => (at, tag_end, attrs),
        };

        let (kind, title, explicit_id) = resolve_attributes(attrs);
        let id = explicit_id
            .unwrap_or_else(|| synthesize_block_id(message_id, at, kind, &title));
        let mut block = OutputBlock {
            id,
            title,
            kind,
            content: String::new(),
            is_complete: false,
            start_index: at,
            end_index: text.len(),
            message_id: message_id.to_string(),
            chat_id: None,
        };

        let newline = text[tag_end..].find('\n').map(|i| tag_end + i);
        let end = dialect.find_end(text, tag_end);

        match (newline, end) {
            // Closed on the marker's own line.
            (nl, Some((_, end_after))) if nl.is_none_or(|nl| end_after <= nl) => {
                block.is_complete = true;
                block.end_index = end_after;
            }
            (Some(nl), _) => {
                let content_start = nl + 1;
                match dialect.find_end(text, content_start) {
                    Some((end_at, end_after)) => {
                        block.content = text[content_start..end_at].to_string();
                        block.is_complete = true;
                        block.end_index = end_after;
                    }
                    None => {
                        let rest = &text[content_start..];
                        let held = partial_suffix_len(rest, dialect.end_literals());
                        block.content = rest[..rest.len() - held].to_string();
                    }
                }
            }
            // Start marker line still arriving.
            (None, _) => {}
        }

        out.hidden.push(block.start_index..block.end_index);
        let done = !block.is_complete;
        pos = block.end_index;
        out.blocks.push(block);
        if done {
            break;
        }
    }
    out
}

fn resolve_attributes(attrs: MarkerAttributes) -> (BlockKind, String, Option<String>) {
    let kind = match attrs.kind.as_deref() {
        Some(raw) => BlockKind::parse(raw).unwrap_or_else(|| {
            tracing::debug!(kind = raw, "unknown output block type; using document");
            BlockKind::Document
        }),
        None => BlockKind::Document,
    };
    let title = attrs
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let id = attrs
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    (kind, title, id)
}

fn strip_ranges(text: &str, mut ranges: Vec<Range<usize>>) -> String {
    ranges.sort_by_key(|r| r.start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for r in ranges {
        if r.start > cursor {
            out.push_str(&text[cursor..r.start]);
        }
        cursor = cursor.max(r.end);
    }
    if cursor < text.len() {
        out.push_str(&text[cursor..]);
    }
    out.trim().to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/extract/extractor.rs"]
mod tests;
