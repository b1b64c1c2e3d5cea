//! Conversation titles: a derived fallback taken from the first user
//! message, and an optional model-generated title.

use anyhow::Result;

use crate::ollama::{ChatRequest, GenerationOptions, OllamaClient};
use crate::{Message, Role};

/// Derived titles keep the first 50 characters of the first user message.
const DERIVED_TITLE_CHARS: usize = 50;
const GENERATED_TITLE_MAX_CHARS: usize = 80;

const TITLE_INSTRUCTIONS: &str =
    "Generate a concise, descriptive title (3-5 words) for this conversation. \
     Return ONLY the title with no explanation, punctuation, or quotes.";

/// Fallback title: first 50 characters of the first user message with an
/// ellipsis when truncated, or a timestamp-based default when no user
/// message exists yet.
pub fn derive_title(messages: &[Message], now: i64) -> String {
    let first_user = messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty());

    match first_user {
        Some(content) => {
            let truncated: String = content.chars().take(DERIVED_TITLE_CHARS).collect();
            if content.chars().count() > DERIVED_TITLE_CHARS {
                format!("{}…", truncated)
            } else {
                truncated
            }
        }
        None => format!("chat_{}", now),
    }
}

/// Ask the model for a short title based on the opening user message. An
/// empty reply after normalization is an error so callers fall back to
/// `derive_title`.
pub async fn generate_title(
    client: &OllamaClient,
    model: &str,
    options: GenerationOptions,
    user_message: &Message,
) -> Result<String> {
    let messages = vec![
        Message::system(TITLE_INSTRUCTIONS),
        user_message.clone(),
    ];

    let request = ChatRequest::new(model, messages, false, true, options);
    let response = client.chat(&request).await?;

    let title = normalize_title(&response.content);
    if title.is_empty() {
        return Err(anyhow::anyhow!("Generated title was empty after normalization"));
    }

    Ok(title)
}

/// Model replies arrive with stray quotes, newlines, and the occasional
/// leftover thinking block. Reduce them to a single clean line.
fn normalize_title(raw: &str) -> String {
    let raw = crate::thinking::extract(raw).content.unwrap_or_default();

    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(GENERATED_TITLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_title_truncates_at_fifty_chars() {
        let messages = vec![Message::user("x".repeat(60))];
        let title = derive_title(&messages, 0);
        assert_eq!(title, format!("{}…", "x".repeat(50)));
    }

    #[test]
    fn short_message_is_kept_whole() {
        let messages = vec![Message::user("hello there")];
        assert_eq!(derive_title(&messages, 0), "hello there");
    }

    #[test]
    fn skips_non_user_messages() {
        let messages = vec![
            Message::system("be helpful"),
            Message::assistant("hi"),
            Message::user("the real opener"),
        ];
        assert_eq!(derive_title(&messages, 0), "the real opener");
    }

    #[test]
    fn no_user_message_falls_back_to_timestamp() {
        assert_eq!(derive_title(&[], 1700000000), "chat_1700000000");
        let messages = vec![Message::system("be helpful")];
        assert_eq!(derive_title(&messages, 42), "chat_42");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let messages = vec![Message::user("é".repeat(60))];
        let title = derive_title(&messages, 0);
        assert_eq!(title.chars().count(), 51);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn normalize_strips_quotes_and_collapses_whitespace() {
        assert_eq!(normalize_title("\"Rust  Memory\nModel\""), "Rust Memory Model");
        assert_eq!(normalize_title("<think>hmm</think>Chat Title"), "Chat Title");
        assert_eq!(normalize_title("   "), "");
    }
}
