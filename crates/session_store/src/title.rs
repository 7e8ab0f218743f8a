/// Title used when the first message has no text (attachment-only sends).
pub const DEFAULT_TITLE: &str = "New Chat";

pub const TITLE_MAX_CHARS: usize = 30;

const ELLIPSIS: &str = "...";

/// Derives a session title from the first user message's content.
#[must_use]
pub fn derive_title(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_used_verbatim() {
        assert_eq!(derive_title("Fix my parser"), "Fix my parser");
    }

    #[test]
    fn content_of_exactly_thirty_chars_is_not_marked_truncated() {
        let content = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&content), content);
    }

    #[test]
    fn long_content_is_truncated_with_ellipsis() {
        assert_eq!(
            derive_title("Refactor this function to use iterators instead of loops"),
            "Refactor this function to use ..."
        );
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let content = "é".repeat(40);
        assert_eq!(derive_title(&content), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn empty_content_yields_default_title() {
        assert_eq!(derive_title(""), DEFAULT_TITLE);
        assert_eq!(derive_title("   \n"), DEFAULT_TITLE);
    }
}
