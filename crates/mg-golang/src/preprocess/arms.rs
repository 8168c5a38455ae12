//! Lexical parser for `match` arm lists.
//!
//! Works on raw text, independent of the host grammar and of every other
//! pass. Parens are balanced with a depth counter (taking the first `)`
//! is the classic bug here), string and rune literals are opaque, and a
//! single optional trailing comma after a brace body is stripped without
//! touching commas inside nested expressions.

use mg_core::error::{Error, Result};
use mg_core::span::Pos;

use crate::preprocess::buffer::Line;
use crate::preprocess::scan::{find_at_depth0, find_matching, CodeMask};

/// Recursive decomposition of a pattern.
///
/// A bare identifier parses as `Binding`; whether it actually names a unit
/// variant is resolved later against the enum registry — this parser is
/// purely lexical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    Wildcard,
    Binding(String),
    Constructor {
        variant: String,
        args: Vec<PatternNode>,
    },
}

impl PatternNode {
    pub fn variant_name(&self) -> Option<&str> {
        match self {
            PatternNode::Constructor { variant, .. } => Some(variant),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PatternNode::Wildcard)
    }
}

/// Body of one arm: a single expression or a brace-delimited block whose
/// inner lines keep their original positions.
#[derive(Debug, Clone)]
pub enum ArmBody {
    Expr(String),
    Block(Vec<Line>),
}

/// One `pattern => body` (or `pattern if guard => body`) clause.
#[derive(Debug, Clone)]
pub struct PatternArm {
    pub pattern: PatternNode,
    pub guard: Option<String>,
    pub body: ArmBody,
    pub pos: Pos,
}

impl PatternArm {
    /// Text the binding-usage check scans: the arm's guard plus its body.
    pub fn guard_and_body_text(&self) -> String {
        let mut text = self.guard.clone().unwrap_or_default();
        match &self.body {
            ArmBody::Expr(expr) => {
                text.push(' ');
                text.push_str(expr);
            }
            ArmBody::Block(lines) => {
                for line in lines {
                    text.push(' ');
                    text.push_str(&line.text);
                }
            }
        }
        text
    }
}

/// Parse the inner lines of a `match { ... }` block into an ordered arm list.
pub fn parse_arms(block: &[Line], fallback_pos: Pos) -> Result<Vec<PatternArm>> {
    let parser = ArmParser::new(block, fallback_pos);
    parser.parse()
}

struct ArmParser<'a> {
    block: &'a [Line],
    text: String,
    /// Byte offset where each block line starts in `text`.
    line_starts: Vec<usize>,
    mask: CodeMask,
    fallback_pos: Pos,
}

impl<'a> ArmParser<'a> {
    fn new(block: &'a [Line], fallback_pos: Pos) -> ArmParser<'a> {
        let mut text = String::new();
        let mut line_starts = Vec::with_capacity(block.len());
        for line in block {
            line_starts.push(text.len());
            text.push_str(&line.text);
            text.push('\n');
        }
        let mask = CodeMask::compute(&text);
        ArmParser {
            block,
            text,
            line_starts,
            mask,
            fallback_pos,
        }
    }

    /// Original position of byte offset `idx`, falling back to the match
    /// position for synthesized lines.
    fn pos_at(&self, idx: usize) -> Pos {
        let line_idx = match self.line_starts.binary_search(&idx) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        match self.block.get(line_idx).and_then(|line| line.origin) {
            Some(origin) => Pos::new(
                origin.line,
                (idx - self.line_starts[line_idx]) as u32 + origin.column,
            ),
            None => self.fallback_pos,
        }
    }

    fn line_index_at(&self, idx: usize) -> usize {
        match self.line_starts.binary_search(&idx) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Net bracket depth of the text from `start` to the end of the block.
    fn remaining_depth(&self, start: usize) -> i32 {
        let mut depth = 0i32;
        for (i, &b) in self.text.as_bytes().iter().enumerate().skip(start) {
            if !self.mask.is_code(i) {
                continue;
            }
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                _ => {}
            }
        }
        depth
    }

    fn skip_trivia(&self, mut i: usize) -> usize {
        let bytes = self.text.as_bytes();
        while i < bytes.len() {
            let code = self.mask.is_code(i);
            let b = bytes[i];
            if code && !b.is_ascii_whitespace() {
                break;
            }
            i += 1;
        }
        i
    }

    fn parse(self) -> Result<Vec<PatternArm>> {
        let mut arms = Vec::new();
        let mut i = self.skip_trivia(0);
        let bytes = self.text.as_bytes();

        while i < bytes.len() {
            let arm_start = i;
            let arm_pos = self.pos_at(arm_start);

            // Pattern and optional guard end at the `=>` of this arm. An
            // unbalanced open paren swallows the arrow, so distinguish the
            // two failures for the error message.
            let arrow = match find_at_depth0(&self.text, &self.mask, i, "=>") {
                Some(arrow) => arrow,
                None => {
                    let message = if self.remaining_depth(arm_start) != 0 {
                        "unbalanced parentheses in match arm"
                    } else {
                        "malformed match arm: expected `=>` after pattern"
                    };
                    return Err(Error::parse(arm_pos, message));
                }
            };

            let head = &self.text[arm_start..arrow];
            let head_mask = CodeMask::compute(head);
            let (pattern_text, guard_text) =
                match crate::preprocess::scan::find_word(head, "if", 0) {
                    Some(guard_idx)
                        if head_mask.is_code(guard_idx) && at_depth0(head, &head_mask, guard_idx) =>
                    {
                        (
                            head[..guard_idx].trim(),
                            Some(head[guard_idx + 2..].trim().to_string()),
                        )
                    }
                    _ => (head.trim(), None),
                };

            let pattern = parse_pattern(pattern_text, arm_pos)?;

            // Body: brace block or expression up to the arm-separating comma.
            i = self.skip_trivia(arrow + 2);
            if i >= bytes.len() {
                return Err(Error::parse(arm_pos, "malformed match arm: missing body"));
            }

            let (body, next) = if bytes[i] == b'{' {
                let close = find_matching(&self.text, &self.mask, i).ok_or_else(|| {
                    Error::parse(self.pos_at(i), "unbalanced braces in match arm body")
                })?;
                let body = self.block_body(i, close);
                // A single optional trailing comma after the closing brace.
                let mut next = self.skip_trivia(close + 1);
                if next < bytes.len() && bytes[next] == b',' {
                    next = self.skip_trivia(next + 1);
                }
                (body, next)
            } else {
                let end = find_at_depth0(&self.text, &self.mask, i, ",")
                    .unwrap_or_else(|| self.text.len());
                // Join continuation lines; interior spacing (string
                // literals included) is preserved.
                let expr = self.text[i..end]
                    .split('\n')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if expr.is_empty() {
                    return Err(Error::parse(arm_pos, "malformed match arm: empty body"));
                }
                let next = self.skip_trivia((end + 1).min(self.text.len()));
                (ArmBody::Expr(expr), next)
            };

            arms.push(PatternArm {
                pattern,
                guard: guard_text,
                body,
                pos: arm_pos,
            });
            i = next;
        }

        if arms.is_empty() {
            return Err(Error::parse(self.fallback_pos, "match block has no arms"));
        }
        Ok(arms)
    }

    /// Extract the lines between a body's braces, keeping origins. The
    /// braces themselves are dropped; content sharing a line with a brace
    /// is kept.
    fn block_body(&self, open: usize, close: usize) -> ArmBody {
        let inner = &self.text[open + 1..close];
        let first_line = self.line_index_at(open + 1);
        let mut lines = Vec::new();
        for (offset, segment) in inner.split('\n').enumerate() {
            if segment.trim().is_empty() {
                continue;
            }
            let origin = self
                .block
                .get(first_line + offset)
                .and_then(|line| line.origin);
            lines.push(Line {
                text: segment.trim_end().to_string(),
                origin,
            });
        }
        ArmBody::Block(lines)
    }
}

/// Whether `idx` in `text` sits at bracket depth 0.
fn at_depth0(text: &str, mask: &CodeMask, idx: usize) -> bool {
    let mut depth = 0i32;
    for (i, &b) in text.as_bytes().iter().enumerate().take(idx) {
        if !mask.is_code(i) {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {}
        }
    }
    depth == 0
}

/// Recursively parse a pattern: `_`, a bare identifier, or
/// `Variant(inner, ...)` with balanced parens.
pub fn parse_pattern(text: &str, pos: Pos) -> Result<PatternNode> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::parse(pos, "malformed match arm: empty pattern"));
    }
    if text == "_" {
        return Ok(PatternNode::Wildcard);
    }

    let mask = CodeMask::compute(text);
    match text.find('(') {
        None => {
            if !is_identifier(text) {
                return Err(Error::parse(
                    pos,
                    format!("malformed pattern: `{}` is not an identifier", text),
                ));
            }
            Ok(PatternNode::Binding(text.to_string()))
        }
        Some(open) => {
            let variant = text[..open].trim();
            if !is_identifier(variant) {
                return Err(Error::parse(
                    pos,
                    format!("malformed pattern: `{}` is not a constructor name", variant),
                ));
            }
            let close = find_matching(text, &mask, open)
                .ok_or_else(|| Error::parse(pos, "unbalanced parentheses in pattern"))?;
            if !text[close + 1..].trim().is_empty() {
                return Err(Error::parse(
                    pos,
                    "malformed pattern: trailing text after `)`",
                ));
            }
            let inner = &text[open + 1..close];
            let mut args = Vec::new();
            for part in split_depth0(inner) {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                args.push(parse_pattern(part, pos)?);
            }
            Ok(PatternNode::Constructor {
                variant: variant.to_string(),
                args,
            })
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(ch) if ch == '_' || ch.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Split on commas at bracket depth 0.
fn split_depth0(text: &str) -> Vec<&str> {
    let mask = CodeMask::compute(text);
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if !mask.is_code(i) {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(lines: &[&str]) -> Vec<Line> {
        lines
            .iter()
            .enumerate()
            .map(|(idx, text)| Line::original(*text, idx as u32 + 10))
            .collect()
    }

    fn pos() -> Pos {
        Pos::new(9, 1)
    }

    #[test]
    fn parses_expression_arms() {
        let arms = parse_arms(
            &block(&["    Ok(x) => x + 1,", "    Err(_) => -1,"]),
            pos(),
        )
        .expect("parse should succeed");
        assert_eq!(arms.len(), 2);
        assert_eq!(
            arms[0].pattern,
            PatternNode::Constructor {
                variant: "Ok".to_string(),
                args: vec![PatternNode::Binding("x".to_string())],
            }
        );
        assert!(matches!(&arms[0].body, ArmBody::Expr(e) if e == "x + 1"));
        assert_eq!(arms[0].pos, Pos::new(10, 5));
        assert_eq!(
            arms[1].pattern,
            PatternNode::Constructor {
                variant: "Err".to_string(),
                args: vec![PatternNode::Wildcard],
            }
        );
    }

    #[test]
    fn balances_nested_parens_in_bindings() {
        let arms = parse_arms(&block(&["    Ok(pair(a, b)) => use(a, b),"]), pos())
            .expect("parse should succeed");
        assert_eq!(
            arms[0].pattern,
            PatternNode::Constructor {
                variant: "Ok".to_string(),
                args: vec![PatternNode::Constructor {
                    variant: "pair".to_string(),
                    args: vec![
                        PatternNode::Binding("a".to_string()),
                        PatternNode::Binding("b".to_string()),
                    ],
                }],
            }
        );
    }

    #[test]
    fn parses_guards_and_nested_patterns() {
        let arms = parse_arms(
            &block(&[
                "    Ok(Some(v)) if v > 0 => v,",
                "    Ok(None) => 0,",
                "    _ => -1,",
            ]),
            pos(),
        )
        .expect("parse should succeed");
        assert_eq!(arms.len(), 3);
        assert_eq!(arms[0].guard.as_deref(), Some("v > 0"));
        assert_eq!(
            arms[0].pattern.variant_name(),
            Some("Ok"),
        );
        assert!(arms[2].pattern.is_wildcard());
    }

    #[test]
    fn strips_single_trailing_comma_after_block_body() {
        let arms = parse_arms(
            &block(&[
                "    Ok(x) => {",
                "        log(x)",
                "        return x",
                "    },",
                "    Err(_) => -1,",
            ]),
            pos(),
        )
        .expect("parse should succeed");
        assert_eq!(arms.len(), 2);
        let ArmBody::Block(lines) = &arms[0].body else {
            panic!("expected block body");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text.trim(), "log(x)");
        // Inner commas were not consumed.
        assert!(matches!(&arms[1].body, ArmBody::Expr(e) if e == "-1"));
    }

    #[test]
    fn missing_arrow_is_a_positional_error() {
        let err = parse_arms(&block(&["    Ok(x) x + 1,"]), pos()).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("expected `=>`"), "got: {rendered}");
        assert!(rendered.contains("10:5"), "got: {rendered}");
    }

    #[test]
    fn unbalanced_parens_are_a_positional_error() {
        let err = parse_arms(&block(&["    Ok(foo(x) => x,"]), pos()).unwrap_err();
        assert!(err.to_string().contains("parentheses"));
    }

    #[test]
    fn commas_inside_strings_do_not_split_arms() {
        let arms = parse_arms(
            &block(&[r#"    Ok(_) => fmt.Sprintf("a, b"),"#, "    Err(_) => -1,"]),
            pos(),
        )
        .expect("parse should succeed");
        assert_eq!(arms.len(), 2);
        assert!(matches!(&arms[0].body, ArmBody::Expr(e) if e == r#"fmt.Sprintf("a, b")"#));
    }
}
