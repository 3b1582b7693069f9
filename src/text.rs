//! Text helpers for prompt titles and previews.

pub const DEFAULT_TITLE_WORDS: usize = 8;
pub const MAX_TITLE_CHARS: usize = 60;
pub const UNTITLED: &str = "Untitled prompt";

const ELLIPSIS: char = '…';

/// Derive a short title from prompt content: the first non-empty line with
/// markdown markers removed, cut to `max_words` words and
/// [`MAX_TITLE_CHARS`] characters.
pub fn generate_title(content: &str, max_words: usize) -> String {
    let Some(line) = content
        .lines()
        .map(strip_markdown)
        .find(|line| !line.is_empty())
    else {
        return UNTITLED.to_string();
    };

    let words: Vec<&str> = line.split_whitespace().collect();
    let max_words = max_words.max(1);
    let mut title = words.iter().take(max_words).copied().collect::<Vec<_>>().join(" ");
    let mut shortened = words.len() > max_words;

    if title.chars().count() > MAX_TITLE_CHARS {
        title = title.chars().take(MAX_TITLE_CHARS).collect::<String>();
        shortened = true;
    }

    if shortened {
        let trimmed_len = title
            .trim_end_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .len();
        title.truncate(trimmed_len);
        title.push(ELLIPSIS);
    }
    title
}

/// Shorten `text` to at most `max_chars` characters, ending with an
/// ellipsis when anything was cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push(ELLIPSIS);
    out
}

fn strip_markdown(line: &str) -> String {
    let mut rest = line.trim();
    rest = rest.trim_start_matches('#').trim_start();
    rest = rest.trim_start_matches('>').trim_start();
    for bullet in ["- ", "* ", "+ "] {
        if let Some(stripped) = rest.strip_prefix(bullet) {
            rest = stripped;
            break;
        }
    }
    if let Some(pos) = rest.find(". ") {
        if pos > 0 && rest[..pos].chars().all(|c| c.is_ascii_digit()) {
            rest = &rest[pos + 2..];
        }
    }

    rest.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_uses_first_meaningful_line() {
        let content = "\n\n## **Blog post** outline\nWrite an outline for {topic}";
        assert_eq!(generate_title(content, DEFAULT_TITLE_WORDS), "Blog post outline");
    }

    #[test]
    fn title_is_cut_to_word_limit_with_ellipsis() {
        let content = "Act as a senior Rust engineer and review the following pull request carefully";
        assert_eq!(
            generate_title(content, DEFAULT_TITLE_WORDS),
            "Act as a senior Rust engineer and review…"
        );
    }

    #[test]
    fn title_strips_list_markers_and_trailing_punctuation() {
        assert_eq!(generate_title("1. Summarize, then translate: all of it", 3), "Summarize, then translate…");
        assert_eq!(generate_title("- `code` reviewer", 8), "code reviewer");
    }

    #[test]
    fn title_respects_char_limit_on_char_boundary() {
        let long_word = "é".repeat(80);
        let title = generate_title(&long_word, 8);
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS + 1);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn empty_content_is_untitled() {
        assert_eq!(generate_title("   \n  # \n", 8), UNTITLED);
    }

    #[test]
    fn truncate_only_cuts_long_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("hello world again", 7), "hello…");
        assert_eq!(truncate("abc", 0), "");
    }
}
