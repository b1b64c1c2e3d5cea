//! Separates a model's `<think>...</think>` reasoning segment from the
//! user-facing answer. Works on completed responses and on growing prefixes
//! of a streamed response alike: the same rule is applied fresh on every
//! call, so repeated calls over a monotonically growing buffer never flicker
//! between classifications.
//!
//! Known limitation: only the first complete span is extracted. Behavior on
//! nested or repeated `<think>` spans beyond the first is unspecified.

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThinkingSplit {
    /// Trimmed reasoning text, if a marker was seen.
    pub thinking: Option<String>,
    /// Trimmed answer text. `None` while reasoning is still open, which
    /// signals "no answer yet" to streaming callers.
    pub content: Option<String>,
}

pub fn extract(text: &str) -> ThinkingSplit {
    let Some(open) = text.find(THINK_OPEN) else {
        return ThinkingSplit { thinking: None, content: non_empty(text) };
    };

    let after_open = &text[open + THINK_OPEN.len()..];

    match after_open.find(THINK_CLOSE) {
        Some(close) => {
            // Complete span: cut it out and keep whatever surrounds it.
            let mut remainder = String::with_capacity(text.len());
            remainder.push_str(&text[..open]);
            remainder.push_str(&after_open[close + THINK_CLOSE.len()..]);

            ThinkingSplit {
                thinking: non_empty(&after_open[..close]),
                content: non_empty(&remainder),
            }
        }
        // Close marker not arrived yet: everything after the open marker is
        // in-progress reasoning, there is no answer to show.
        None => ThinkingSplit { thinking: non_empty(after_open), content: None },
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
