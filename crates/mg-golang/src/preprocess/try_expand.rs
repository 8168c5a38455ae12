//! Expansion of the postfix `?` operator.
//!
//! `x := f()?` becomes a tag test with an early `Err` return; the payload
//! is re-wrapped through a plain `Err(...)` constructor call that the
//! AST plugin pipeline later types against the enclosing function's return
//! type. Defined over `Result` values.

use mg_core::error::{Error, Result};
use mg_core::span::Pos;

use crate::context::FileContext;
use crate::preprocess::buffer::{Line, SourceBuffer};
use crate::preprocess::scan::{indent_of, CodeMask};
use crate::types::{tag_const, ContainerKind};

pub fn expand(buffer: &mut SourceBuffer, ctx: &mut FileContext) -> Result<()> {
    // Expansion never produces a new try site, so a single forward sweep
    // suffices: after a splice the current index holds `__tmpN := expr`.
    let mut idx = 0;
    while idx < buffer.len() {
        let line = buffer.line(idx).clone();
        if let Some(site) = try_site(&line.text) {
            expand_one(buffer, idx, &line, site, ctx)?;
        }
        idx += 1;
    }
    Ok(())
}

struct TrySite {
    /// Column (0-based byte offset) of the `?` in the line.
    question: usize,
    /// `name :=` target, if the statement binds the unwrapped value.
    target: Option<String>,
    /// The expression the `?` applies to.
    expr: String,
    is_return: bool,
}

/// Recognize `lhs := expr?`, bare `expr?`, or `return expr?` statements.
/// The `?` must be the last code character of the line.
fn try_site(text: &str) -> Option<TrySite> {
    let mask = CodeMask::compute(text);
    let bytes = text.as_bytes();
    let question = (0..bytes.len())
        .rev()
        .find(|&i| mask.is_code(i) && !bytes[i].is_ascii_whitespace())?;
    if bytes[question] != b'?' {
        return None;
    }

    let head = &text[..question];
    let trimmed = head.trim_start();
    if let Some(rest) = trimmed.strip_prefix("return ") {
        return Some(TrySite {
            question,
            target: None,
            expr: rest.trim().to_string(),
            is_return: true,
        });
    }

    let define_idx = find_define(head, &mask);
    match define_idx {
        Some(op) => {
            let target = head[..op].trim().to_string();
            let expr = head[op + 2..].trim().to_string();
            Some(TrySite {
                question,
                target: Some(target),
                expr,
                is_return: false,
            })
        }
        None => Some(TrySite {
            question,
            target: None,
            expr: trimmed.trim().to_string(),
            is_return: false,
        }),
    }
}

fn find_define(text: &str, mask: &CodeMask) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(1))
        .find(|&i| mask.is_code(i) && bytes[i] == b':' && bytes[i + 1] == b'=')
}

fn expand_one(
    buffer: &mut SourceBuffer,
    idx: usize,
    line: &Line,
    site: TrySite,
    ctx: &mut FileContext,
) -> Result<()> {
    let pos = line.origin.unwrap_or(Pos::new(idx as u32 + 1, 1));

    if site.is_return {
        return Err(Error::parse(
            pos,
            "`?` cannot be applied inside a return statement; bind the value first",
        ));
    }
    if site.expr.is_empty() {
        return Err(Error::parse(pos, "`?` must follow an expression"));
    }
    if let Some(target) = &site.target {
        if target.contains(',') {
            return Err(Error::parse(
                pos,
                "`?` unwraps a single value; multiple assignment targets are not supported",
            ));
        }
    }

    let indent = indent_of(&line.text).to_string();
    let temp = ctx.temps.fresh();
    let err_tag = tag_const(ContainerKind::Result.name(), "Err");

    let mut replacement = vec![
        Line::synthesized(format!("{}{} := {}", indent, temp, site.expr)),
        Line::synthesized(format!("{}if {}.tag == {} {{", indent, temp, err_tag)),
        Line::synthesized(format!("{}    return Err(*{}.err_0)", indent, temp)),
        Line::synthesized(format!("{}}}", indent)),
    ];
    if let Some(target) = &site.target {
        replacement.push(Line::synthesized(format!(
            "{}{} := *{}.ok_0",
            indent, target, temp
        )));
    }

    buffer.splice(idx, 1, replacement, &mut ctx.mappings);

    // The `?` maps to the tag test it became, at its exact original column.
    ctx.mappings.record(
        Pos::new(pos.line, site.question as u32 + pos.column),
        Pos::new(idx as u32 + 2, indent.len() as u32 + 1),
        1,
        Some("?"),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (String, FileContext) {
        let mut ctx = FileContext::new("test.mgo", source);
        let mut buffer = SourceBuffer::from_source(source);
        expand(&mut buffer, &mut ctx).expect("expansion should succeed");
        (buffer.text(), ctx)
    }

    #[test]
    fn expands_binding_form() {
        let (text, ctx) = run("func run() Result_int_error {\n    x := parse(s)?\n    return Ok(x)\n}\n");
        let expected = concat!(
            "func run() Result_int_error {\n",
            "    __tmp0 := parse(s)\n",
            "    if __tmp0.tag == ResultTag_Err {\n",
            "        return Err(*__tmp0.err_0)\n",
            "    }\n",
            "    x := *__tmp0.ok_0\n",
            "    return Ok(x)\n",
            "}\n",
        );
        assert_eq!(text, expected);

        // The `?` was at line 2, column 18; length 1.
        let mapping = ctx
            .mappings
            .entries()
            .iter()
            .find(|m| m.name.as_deref() == Some("?"))
            .expect("? mapping recorded");
        assert_eq!(mapping.original, Pos::new(2, 18));
        assert_eq!(mapping.length, 1);
        assert_eq!(mapping.generated.line, 3);
    }

    #[test]
    fn expands_bare_form_without_binding() {
        let (text, _) = run("    send(conn)?\n");
        let expected = concat!(
            "    __tmp0 := send(conn)\n",
            "    if __tmp0.tag == ResultTag_Err {\n",
            "        return Err(*__tmp0.err_0)\n",
            "    }\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn question_mark_inside_string_is_ignored() {
        let (text, _) = run("    log(\"what?\")\n");
        assert_eq!(text, "    log(\"what?\")\n");
    }

    #[test]
    fn return_form_is_rejected() {
        let source = "    return f()?\n";
        let mut ctx = FileContext::new("test.mgo", source);
        let mut buffer = SourceBuffer::from_source(source);
        let err = expand(&mut buffer, &mut ctx).unwrap_err();
        assert!(err.to_string().contains("bind the value first"));
    }
}
