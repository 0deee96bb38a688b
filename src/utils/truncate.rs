//! Truncation helpers for observations and previews.
//!
//! Long tool output is cut in the middle so both the first and last
//! results survive; cuts always land on UTF-8 boundaries.

const APPROX_BYTES_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationPolicy {
    Bytes(usize),
    Tokens(usize),
}

impl TruncationPolicy {
    pub fn byte_budget(&self) -> usize {
        match self {
            TruncationPolicy::Bytes(b) => *b,
            TruncationPolicy::Tokens(t) => t.saturating_mul(APPROX_BYTES_PER_TOKEN),
        }
    }
}

/// Keep a head and a tail of `content` within the policy's byte budget.
pub fn truncate_text(content: &str, policy: TruncationPolicy) -> String {
    let budget = policy.byte_budget();
    if content.len() <= budget {
        return content.to_string();
    }
    if budget == 0 {
        return format!("... [{} bytes truncated] ...", content.len());
    }

    let half = budget / 2;
    let head_end = floor_boundary(content, half);
    let tail_start = ceil_boundary(content, content.len() - half).max(head_end);

    let cut = tail_start - head_end;
    format!(
        "{} ... [{} bytes truncated] ... {}",
        &content[..head_end],
        cut,
        &content[tail_start..]
    )
}

/// Single-line preview of at most `max_chars` characters, ending in "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = flat.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_text("Section 302", TruncationPolicy::Bytes(100)), "Section 302");
    }

    #[test]
    fn test_keeps_head_and_tail() {
        let text = format!("HEAD{}TAIL", "x".repeat(100));
        let out = truncate_text(&text, TruncationPolicy::Bytes(8));
        assert!(out.starts_with("HEAD ..."));
        assert!(out.ends_with("... TAIL"));
        assert!(out.contains("[100 bytes truncated]"));
    }

    #[test]
    fn test_respects_utf8() {
        let text = "धारा ३०२ हत्या के लिए दंड".repeat(10);
        let out = truncate_text(&text, TruncationPolicy::Tokens(5));
        assert!(out.contains("bytes truncated"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("a\nb  c", 10), "a b c");
        assert_eq!(truncate_chars("abcdefghij", 6), "abc...");
    }
}
