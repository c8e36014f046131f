//! Sentence splitting
//!
//! Text is first split on newlines, then on sentence terminators (`.`, `!`,
//! `?`) followed by whitespace. A leading list marker such as `1.` never ends a
//! sentence, so numbered items stay whole.

/// Split text into sentence spans on terminator or newline boundaries
pub fn split_spans(text: &str) -> Vec<String> {
    let mut spans = Vec::new();
    for line in text.lines() {
        split_line(line, &mut spans);
    }
    spans
}

/// Split text into sentences for claim analysis
///
/// Like [`split_spans`], but a segment made only of bracketed tags
/// (`Paris is the capital. [Source 1]`) is attached to the sentence before it.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    for span in split_spans(text) {
        match sentences.last_mut() {
            Some(prev) if is_bracket_only(&span) => {
                prev.push(' ');
                prev.push_str(&span);
            }
            _ => sentences.push(span),
        }
    }
    sentences
}

/// The first `max_chars` characters of `text`, cut on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn split_line(line: &str, out: &mut Vec<String>) {
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if !boundary {
            continue;
        }
        let end = pos + c.len_utf8();
        let segment = line[start..end].trim();
        if start == 0 && is_list_marker(segment) {
            continue;
        }
        if !segment.is_empty() {
            out.push(segment.to_string());
        }
        start = end;
    }

    let rest = line[start..].trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
}

fn is_list_marker(segment: &str) -> bool {
    match segment.strip_suffix('.') {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn is_bracket_only(segment: &str) -> bool {
    let trimmed = segment.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','));
    if !trimmed.starts_with('[') {
        return false;
    }
    let mut depth = 0usize;
    for c in trimmed.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if depth == 0 && !(c.is_whitespace() || c == ',') => return false,
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 400), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_split_on_terminators() {
        let spans = split_spans("Paris is the capital. It is large! Is it old?");
        assert_eq!(
            spans,
            vec!["Paris is the capital.", "It is large!", "Is it old?"]
        );
    }

    #[test]
    fn test_split_on_newlines() {
        let spans = split_spans("First line\nSecond line.\n\nThird");
        assert_eq!(spans, vec!["First line", "Second line.", "Third"]);
    }

    #[test]
    fn test_decimal_not_split() {
        let spans = split_spans("Pi is 3.14 roughly. Yes.");
        assert_eq!(spans, vec!["Pi is 3.14 roughly.", "Yes."]);
    }

    #[test]
    fn test_numbered_item_kept_whole() {
        let spans = split_spans("1. What is the capital of Spain?\n2. Where is Lyon?");
        assert_eq!(
            spans,
            vec!["1. What is the capital of Spain?", "2. Where is Lyon?"]
        );
    }

    #[test]
    fn test_trailing_tag_attached() {
        let sentences = split_sentences("The tower was completed in 1889 for the fair. [Source 1]");
        assert_eq!(
            sentences,
            vec!["The tower was completed in 1889 for the fair. [Source 1]"]
        );
    }

    #[test]
    fn test_tag_only_first_segment_not_attached() {
        let sentences = split_sentences("[Source 1] Paris.");
        assert_eq!(sentences, vec!["[Source 1] Paris."]);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_spans("").is_empty());
        assert!(split_sentences("   \n  ").is_empty());
    }
}
