//! Shared lexical scanning utilities for the text-level passes.
//!
//! Every pass that walks raw source must agree on what counts as code:
//! string literals, rune literals, and comments are opaque, and bracket
//! depth is tracked so nested expressions are never split.

/// Per-byte code/non-code classification of a text.
///
/// A byte is "code" when it is outside string literals, rune literals, and
/// comments. Delimiting quotes are classified as non-code along with their
/// contents.
#[derive(Debug)]
pub struct CodeMask {
    mask: Vec<bool>,
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Code,
    Str,
    RawStr,
    Char,
    LineComment,
    BlockComment,
}

impl CodeMask {
    pub fn compute(text: &str) -> CodeMask {
        let bytes = text.as_bytes();
        let mut mask = vec![true; bytes.len()];
        let mut state = State::Code;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match state {
                State::Code => match b {
                    b'"' => {
                        state = State::Str;
                        mask[i] = false;
                    }
                    b'`' => {
                        state = State::RawStr;
                        mask[i] = false;
                    }
                    b'\'' => {
                        state = State::Char;
                        mask[i] = false;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'/') => {
                        state = State::LineComment;
                        mask[i] = false;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        state = State::BlockComment;
                        mask[i] = false;
                    }
                    _ => {}
                },
                State::Str => {
                    mask[i] = false;
                    if b == b'\\' {
                        if i + 1 < bytes.len() {
                            mask[i + 1] = false;
                            i += 1;
                        }
                    } else if b == b'"' || b == b'\n' {
                        state = State::Code;
                    }
                }
                State::RawStr => {
                    mask[i] = false;
                    if b == b'`' {
                        state = State::Code;
                    }
                }
                State::Char => {
                    mask[i] = false;
                    if b == b'\\' {
                        if i + 1 < bytes.len() {
                            mask[i + 1] = false;
                            i += 1;
                        }
                    } else if b == b'\'' || b == b'\n' {
                        state = State::Code;
                    }
                }
                State::LineComment => {
                    mask[i] = false;
                    if b == b'\n' {
                        mask[i] = true;
                        state = State::Code;
                    }
                }
                State::BlockComment => {
                    mask[i] = false;
                    if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        mask[i + 1] = false;
                        i += 1;
                        state = State::Code;
                    }
                }
            }
            i += 1;
        }
        CodeMask { mask }
    }

    pub fn is_code(&self, idx: usize) -> bool {
        self.mask.get(idx).copied().unwrap_or(false)
    }
}

/// Find the index of the bracket closing the one at `open_idx`, tracking
/// nesting of all three bracket kinds. `None` when unbalanced.
pub fn find_matching(text: &str, mask: &CodeMask, open_idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = *bytes.get(open_idx)?;
    let close = match open {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        _ => return None,
    };
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open_idx) {
        if !mask.is_code(i) {
            continue;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Find the first occurrence of `needle` at bracket depth 0, scanning from
/// `start`. Only code bytes are considered.
pub fn find_at_depth0(text: &str, mask: &CodeMask, start: usize, needle: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let needle_bytes = needle.as_bytes();
    let mut depth = 0i32;
    let mut i = start;
    while i < bytes.len() {
        if !mask.is_code(i) {
            i += 1;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {}
        }
        if depth == 0
            && bytes[i..].starts_with(needle_bytes)
            && bytes[i..i + needle_bytes.len()]
                .iter()
                .enumerate()
                .all(|(k, _)| mask.is_code(i + k))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Whether `word` occurs in `text` as a standalone identifier.
pub fn contains_word(text: &str, word: &str) -> bool {
    find_word(text, word, 0).is_some()
}

/// Find the next standalone occurrence of identifier `word` from `start`.
pub fn find_word(text: &str, word: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let word_bytes = word.as_bytes();
    if word_bytes.is_empty() {
        return None;
    }
    let mut i = start;
    while i + word_bytes.len() <= bytes.len() {
        if bytes[i..].starts_with(word_bytes) {
            let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
            let after = i + word_bytes.len();
            let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Leading whitespace of a line, reused when splicing generated lines in.
pub fn indent_of(line: &str) -> &str {
    let end = line
        .find(|ch: char| !ch.is_whitespace())
        .unwrap_or(line.len());
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_and_comments_are_opaque() {
        let text = r#"foo("a ) b") // trailing ) comment"#;
        let mask = CodeMask::compute(text);
        let open = text.find('(').unwrap();
        let close = find_matching(text, &mask, open).unwrap();
        assert_eq!(&text[close..close + 1], ")");
        assert_eq!(close, text.find(r#"")"#).unwrap() + 1);
    }

    #[test]
    fn depth0_search_skips_nested_commas() {
        let text = "Ok(pair(a, b)) => body";
        let mask = CodeMask::compute(text);
        assert_eq!(find_at_depth0(text, &mask, 0, ","), None);
        assert!(find_at_depth0(text, &mask, 0, "=>").is_some());
    }

    #[test]
    fn word_search_requires_boundaries() {
        assert!(contains_word("x > 0 && ok", "ok"));
        assert!(!contains_word("token", "ok"));
        assert_eq!(find_word("book ok", "ok", 0), Some(5));
    }
}
