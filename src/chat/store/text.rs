//! Text shaping for prompts, titles and replies.

/// Prefix of the input sent with a title request.
pub const TITLE_PROMPT_PREFIX: &str = "Generate a title for this conversation: ";

/// Prefix of the assistant message written when inference fails.
pub const ERROR_REPLY_PREFIX: &str = "Sorry, I encountered an error: ";

/// Marker appended to a truncated fallback title.
pub const TRUNCATION_MARKER: &str = "...";

/// Input of the title request for a conversation opened with `text`.
#[must_use]
pub fn title_prompt(text: &str) -> String {
    format!("{TITLE_PROMPT_PREFIX}{text}")
}

/// Local title: the first `max_chars` characters, marked when cut.
#[must_use]
pub fn fallback_title(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}{TRUNCATION_MARKER}")
    } else {
        head
    }
}

/// Remove markdown fence delimiters the model wraps replies in.
#[must_use]
pub fn strip_code_fences(reply: &str) -> String {
    reply.replace("```markdown", "").replace("```", "")
}

/// Assistant message shown when inference fails.
#[must_use]
pub fn error_reply(description: &str) -> String {
    format!("{ERROR_REPLY_PREFIX}{description}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_title_keeps_short_text() {
        assert_eq!(fallback_title("Hello there", 50), "Hello there");
        let exact = "a".repeat(50);
        assert_eq!(fallback_title(&exact, 50), exact);
    }

    #[test]
    fn test_fallback_title_truncates_long_text() {
        let text = "Explain quantum tunneling in one sentence, please elaborate at length so the text exceeds fifty characters";
        assert_eq!(
            fallback_title(text, 50),
            "Explain quantum tunneling in one sentence, please ..."
        );
    }

    #[test]
    fn test_fallback_title_counts_characters_not_bytes() {
        let text = "é".repeat(60);
        let title = fallback_title(&text, 50);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```markdown\n# Hi\n```"), "\n# Hi\n");
        assert_eq!(strip_code_fences("plain"), "plain");
        assert_eq!(strip_code_fences("```rust\nfn main() {}\n```"), "rust\nfn main() {}\n");
    }

    #[test]
    fn test_error_reply_format() {
        assert_eq!(
            error_reply("network unreachable"),
            "Sorry, I encountered an error: network unreachable"
        );
    }

    #[test]
    fn test_title_prompt() {
        assert_eq!(
            title_prompt("hi"),
            "Generate a title for this conversation: hi"
        );
    }
}
