//! Rewrites generic container annotations (`Result<int, error>`,
//! `Option<string>`) into their monomorphized Go names, registering every
//! instantiation with the per-file registry so the Inject phase can emit
//! each declaration exactly once.

use mg_core::error::{Error, Result};
use mg_core::span::Pos;

use crate::context::FileContext;
use crate::preprocess::buffer::SourceBuffer;
use crate::preprocess::scan::{find_word, CodeMask};
use crate::types::ContainerKind;

pub fn rewrite(buffer: &mut SourceBuffer, ctx: &mut FileContext) -> Result<()> {
    for idx in 0..buffer.len() {
        let line = buffer.line(idx);
        if !line.text.contains('<') {
            continue;
        }
        let pos = line.origin.unwrap_or(Pos::new(idx as u32 + 1, 1));
        let rewritten = rewrite_text(&line.text, pos, ctx)?;
        if rewritten != line.text {
            let origin = line.origin;
            let replacement = vec![crate::preprocess::buffer::Line {
                text: rewritten,
                origin,
            }];
            buffer.splice(idx, 1, replacement, &mut ctx.mappings);
        }
    }
    Ok(())
}

/// Rewrite every generic container reference in `text`, innermost first.
pub fn rewrite_text(text: &str, pos: Pos, ctx: &mut FileContext) -> Result<String> {
    let mut out = text.to_string();
    loop {
        let Some((kind, start, open)) = find_container_ref(&out) else {
            return Ok(out);
        };
        let close = find_closing_angle(&out, open)
            .ok_or_else(|| Error::parse(pos, "unterminated `<` in generic type"))?;

        let inner = out[open + 1..close].to_string();
        let inner = rewrite_text(&inner, pos, ctx)?;

        let args: Vec<String> = split_args(&inner)
            .into_iter()
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect();
        if args.len() != kind.arity() {
            return Err(Error::parse(
                pos,
                format!(
                    "`{}` takes {} type argument(s), found {}",
                    kind.name(),
                    kind.arity(),
                    args.len()
                ),
            ));
        }

        let name = ctx.monos.request(kind, args);
        out.replace_range(start..close + 1, &name);
    }
}

/// Find the first `Result<` / `Option<` reference, returning the kind, the
/// identifier's start, and the `<` offset.
fn find_container_ref(text: &str) -> Option<(ContainerKind, usize, usize)> {
    let mask = CodeMask::compute(text);
    let mut best: Option<(ContainerKind, usize, usize)> = None;
    for (word, kind) in [
        ("Result", ContainerKind::Result),
        ("Option", ContainerKind::Option),
    ] {
        let mut from = 0;
        while let Some(idx) = find_word(text, word, from) {
            let after = idx + word.len();
            if mask.is_code(idx) && text[after..].starts_with('<') {
                if best.map(|(_, s, _)| idx < s).unwrap_or(true) {
                    best = Some((kind, idx, after));
                }
                break;
            }
            from = after;
        }
    }
    best
}

/// Matching `>` for the `<` at `open`, tracking angle nesting.
fn find_closing_angle(text: &str, open: usize) -> Option<usize> {
    let mask = CodeMask::compute(text);
    let mut depth = 0i32;
    for (i, &b) in text.as_bytes().iter().enumerate().skip(open) {
        if !mask.is_code(i) {
            continue;
        }
        match b {
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split type arguments on commas outside brackets. Angle brackets are
/// already gone by the time this runs (inner rewrites happen first).
fn split_args(text: &str) -> Vec<&str> {
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

    fn rewrite_line(text: &str) -> (String, FileContext) {
        let mut ctx = FileContext::new("test.mgo", text);
        let out = rewrite_text(text, Pos::new(1, 1), &mut ctx).expect("rewrite should succeed");
        (out, ctx)
    }

    #[test]
    fn rewrites_function_signature() {
        let (out, ctx) = rewrite_line("func parse(s string) Result<int, error> {");
        assert_eq!(out, "func parse(s string) Result_int_error {");
        assert!(ctx.monos.contains("Result_int_error"));
        let mono = ctx.monos.lookup("Result_int_error").unwrap();
        assert_eq!(mono.args, vec!["int".to_string(), "error".to_string()]);
    }

    #[test]
    fn rewrites_nested_containers_innermost_first() {
        let (out, ctx) = rewrite_line("var x Result<Option<int>, error>");
        assert_eq!(out, "var x Result_Option_int_error");
        assert!(ctx.monos.contains("Option_int"));
        assert!(ctx.monos.contains("Result_Option_int_error"));
    }

    #[test]
    fn mangles_compound_type_args() {
        let (out, _) = rewrite_line("func f() Option<[]string> {");
        assert_eq!(out, "func f() Option_Slicestring {");
    }

    #[test]
    fn comparisons_are_left_alone() {
        let (out, ctx) = rewrite_line("if count < limit && limit > 0 {");
        assert_eq!(out, "if count < limit && limit > 0 {");
        assert!(ctx.monos.is_empty());
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let mut ctx = FileContext::new("test.mgo", "");
        let err = rewrite_text("var x Result<int>", Pos::new(3, 1), &mut ctx).unwrap_err();
        assert!(err.to_string().contains("takes 2 type argument(s)"));
    }
}
