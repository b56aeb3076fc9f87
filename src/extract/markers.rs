//! Output marker dialects.
//!
//! The primary dialect is a tag with attributes:
//!
//! ```text
//! <OUTPUT_START type="code" title="demo" id="optional"/>
//! ...content...
//! <OUTPUT_END/>
//! ```
//!
//! Older model prompts produced attribute-less variants (`<OUTPUT_START/>`, `[OUTPUT_START]`,
//! bare `OUTPUT_START` keywords). Those are only consulted when no primary start tag exists.

/// Literal opening of a primary start tag.
pub const START_TAG: &str = "<OUTPUT_START";
/// Literal primary end tag.
pub const END_TAG: &str = "<OUTPUT_END/>";

const BARE_STARTS: &[&str] = &["<OUTPUT_START/>", "<OUTPUT_START>"];
const BARE_ENDS: &[&str] = &["<OUTPUT_END/>", "<OUTPUT_END>"];
const BRACKET_STARTS: &[&str] = &["[OUTPUT_START]"];
const BRACKET_ENDS: &[&str] = &["[OUTPUT_END]"];
const KEYWORD_STARTS: &[&str] = &["OUTPUT_START"];
const KEYWORD_ENDS: &[&str] = &["OUTPUT_END"];
const TAGGED_ENDS: &[&str] = &[END_TAG];

/// Marker dialect, in recognition priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dialect {
    Tagged,
    BareTag,
    Bracket,
    Keyword,
}

impl Dialect {
    /// Fallback dialects, tried in order when the tagged dialect finds no start tag.
    pub(crate) const LEGACY: [Dialect; 3] = [Dialect::BareTag, Dialect::Bracket, Dialect::Keyword];

    pub(crate) fn end_literals(self) -> &'static [&'static str] {
        match self {
            Dialect::Tagged => TAGGED_ENDS,
            Dialect::BareTag => BARE_ENDS,
            Dialect::Bracket => BRACKET_ENDS,
            Dialect::Keyword => KEYWORD_ENDS,
        }
    }

    fn start_literals(self) -> &'static [&'static str] {
        match self {
            Dialect::Tagged => &[START_TAG],
            Dialect::BareTag => BARE_STARTS,
            Dialect::Bracket => BRACKET_STARTS,
            Dialect::Keyword => KEYWORD_STARTS,
        }
    }

    /// Find the next start marker at or after `from`.
    pub(crate) fn find_start(self, text: &str, from: usize) -> Option<StartMatch> {
        match self {
            Dialect::Tagged => find_tagged_start(text, from),
            _ => find_earliest(text, from, self.start_literals()).map(|(at, len)| {
                StartMatch::Complete {
                    at,
                    tag_end: at + len,
                    attrs: MarkerAttributes::default(),
                }
            }),
        }
    }

    /// Find the next end marker at or after `from`, as `(start, end)` byte offsets.
    pub(crate) fn find_end(self, text: &str, from: usize) -> Option<(usize, usize)> {
        find_earliest(text, from, self.end_literals()).map(|(at, len)| (at, at + len))
    }
}

/// A start marker located in the text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum StartMatch {
    /// A fully-arrived start marker. `tag_end` is the offset just past the marker.
    Complete {
        at: usize,
        tag_end: usize,
        attrs: MarkerAttributes,
    },
    /// A start marker whose closing `>` has not arrived yet.
    Partial { at: usize },
}

/// Attributes declared on a primary start tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MarkerAttributes {
    pub kind: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
}

fn find_tagged_start(text: &str, from: usize) -> Option<StartMatch> {
    let mut search = from;
    while let Some(rel) = text[search..].find(START_TAG) {
        let at = search + rel;
        let after = at + START_TAG.len();
        match text[after..].chars().next() {
            None => return Some(StartMatch::Partial { at }),
            Some(c) if c.is_whitespace() => {
                let Some(gt) = find_tag_close(text, after) else {
                    return Some(StartMatch::Partial { at });
                };
                let inner = text[after..gt].trim_end();
                let inner = inner.strip_suffix('/').unwrap_or(inner);
                return Some(StartMatch::Complete {
                    at,
                    tag_end: gt + 1,
                    attrs: parse_attributes(inner),
                });
            }
            // `<OUTPUT_START/>` and friends belong to the bare-tag dialect.
            Some(_) => search = after,
        }
    }
    None
}

/// Offset of the `>` closing a tag whose attributes start at `from`, skipping quoted values.
fn find_tag_close(text: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in text[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + i),
            (None, _) => {}
        }
    }
    None
}

fn find_earliest(text: &str, from: usize, literals: &[&str]) -> Option<(usize, usize)> {
    literals
        .iter()
        .filter_map(|lit| text[from..].find(lit).map(|rel| (from + rel, lit.len())))
        .min_by_key(|&(at, len)| (at, std::cmp::Reverse(len)))
}

/// Parse `key="value"` pairs. Keys are case-insensitive; single quotes and bare values are
/// accepted; unknown keys are ignored.
pub(crate) fn parse_attributes(inner: &str) -> MarkerAttributes {
    let mut attrs = MarkerAttributes::default();
    let mut rest = inner.trim_start();
    while !rest.is_empty() {
        let key_len = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        rest = rest[key_len..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remaining) = match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    match body.find(q) {
                        Some(close) => (&body[..close], &body[close + 1..]),
                        None => (body, ""),
                    }
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            rest = remaining.trim_start();
            Some(value)
        } else {
            None
        };

        // A stray `=value` with no key, or a key without a value.
        let Some(value) = value.filter(|_| !key.is_empty()) else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "type" => attrs.kind = Some(value.to_string()),
            "title" => attrs.title = Some(value.to_string()),
            "id" => attrs.id = Some(value.to_string()),
            _ => {}
        }
    }
    attrs
}

/// Length of the longest suffix of `text` that is a proper prefix of one of `literals`.
///
/// Such a suffix might still turn into an end marker once more text arrives, so it is withheld
/// from streaming content.
pub(crate) fn partial_suffix_len(text: &str, literals: &[&str]) -> usize {
    literals
        .iter()
        .filter_map(|lit| {
            (1..lit.len())
                .rev()
                .find(|&n| text.ends_with(&lit[..n]))
        })
        .max()
        .unwrap_or(0)
}

/// Offset of a start marker that is still arriving at the end of `text`, if any.
///
/// Covers both an opened `<OUTPUT_START ...` tag that has no closing `>` yet and a trailing
/// fragment such as `<OUTP` or `[OUTPUT_ST`.
pub(crate) fn pending_start(text: &str) -> Option<usize> {
    if let Some(at) = text.rfind(START_TAG)
        && find_tag_close(text, at + START_TAG.len()).is_none()
    {
        return Some(at);
    }
    [START_TAG, BRACKET_STARTS[0]]
        .into_iter()
        .filter_map(|lit| {
            (2..lit.len())
                .rev()
                .find(|&n| text.ends_with(&lit[..n]))
                .map(|n| text.len() - n)
        })
        .min()
}

#[cfg(test)]
#[path = "../../tests/unit/extract/markers.rs"]
mod tests;
