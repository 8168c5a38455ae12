//! Text→text preprocessing: everything that must happen before the host
//! grammar can parse the file.
//!
//! Pass order matters: generic annotations are rewritten first so enum
//! payloads and signatures are plain Go, enum declarations are expanded
//! next so match lowering knows every variant, then `match` statements are
//! lowered (repeatedly, so matches inside arm bodies surface), then `?`
//! statements, and finally imports are discovered and injected.

pub mod arms;
pub mod buffer;
pub mod enums;
pub mod generics;
pub mod imports;
pub mod scan;
pub mod switch_gen;
pub mod try_expand;

use mg_core::error::{Error, Result};
use mg_core::span::Pos;

use crate::context::FileContext;
use self::buffer::SourceBuffer;
use self::imports::ImportResolver;
use self::scan::{indent_of, CodeMask};
use self::switch_gen::MatchForm;

#[derive(Debug)]
pub struct PreprocessOutput {
    pub text: String,
    /// Original position of each output line; `None` for synthesized lines.
    pub origins: Vec<Option<Pos>>,
}

pub fn run(
    source: &str,
    ctx: &mut FileContext,
    resolver: &ImportResolver,
) -> Result<PreprocessOutput> {
    let mut buffer = SourceBuffer::from_source(source);
    generics::rewrite(&mut buffer, ctx)?;
    enums::expand(&mut buffer, ctx)?;
    lower_matches(&mut buffer, ctx)?;
    try_expand::expand(&mut buffer, ctx)?;
    imports::inject(&mut buffer, resolver, ctx)?;
    let origins = buffer.lines().iter().map(|line| line.origin).collect();
    Ok(PreprocessOutput {
        text: buffer.text(),
        origins,
    })
}

/// Upper bound on lowering rounds; one `match` is lowered per round, and a
/// match inside an arm body surfaces in a later round.
const MAX_MATCH_ROUNDS: usize = 256;

struct MatchSite {
    line: usize,
    form: MatchForm,
    scrutinee: String,
}

fn lower_matches(buffer: &mut SourceBuffer, ctx: &mut FileContext) -> Result<()> {
    for _ in 0..MAX_MATCH_ROUNDS {
        match find_match_site(buffer)? {
            Some(site) => lower_one(buffer, site, ctx)?,
            None => return Ok(()),
        }
    }
    Err(Error::generic(
        "match lowering did not converge; too many nested match statements",
    ))
}

fn find_match_site(buffer: &SourceBuffer) -> Result<Option<MatchSite>> {
    for idx in 0..buffer.len() {
        let line = &buffer.line(idx).text;
        let trimmed = line.trim();
        let mask = CodeMask::compute(line);
        let content_at = line.len() - line.trim_start().len();
        if !mask.is_code(content_at) {
            continue;
        }

        let (form, rest) = if let Some(rest) = trimmed.strip_prefix("return match ") {
            (MatchForm::Return, rest)
        } else if let Some(rest) = trimmed.strip_prefix("match ") {
            (MatchForm::Statement, rest)
        } else {
            // Expression-position match is not lowerable at text level;
            // reject it instead of leaving unparseable text behind.
            if (trimmed.contains(":= match ") || trimmed.contains("= match "))
                && trimmed.ends_with('{')
            {
                let pos = buffer
                    .line(idx)
                    .origin
                    .unwrap_or(Pos::new(idx as u32 + 1, 1));
                return Err(Error::parse(
                    pos,
                    "`match` is only supported as a statement or as `return match`",
                ));
            }
            continue;
        };

        let Some(scrutinee) = rest.trim_end().strip_suffix('{') else {
            continue;
        };
        let scrutinee = scrutinee.trim();
        if scrutinee.is_empty() || scrutinee.contains('{') {
            continue;
        }
        return Ok(Some(MatchSite {
            line: idx,
            form,
            scrutinee: scrutinee.to_string(),
        }));
    }
    Ok(None)
}

fn lower_one(buffer: &mut SourceBuffer, site: MatchSite, ctx: &mut FileContext) -> Result<()> {
    let header = buffer.line(site.line).clone();
    let indent = indent_of(&header.text).to_string();

    let keyword_column = match site.form {
        MatchForm::Return => indent.len() + "return ".len() + 1,
        MatchForm::Statement => indent.len() + 1,
    };
    let match_pos = header
        .origin
        .map(|origin| Pos::new(origin.line, keyword_column as u32))
        .unwrap_or(Pos::new(site.line as u32 + 1, keyword_column as u32));

    let close = buffer.block_end(site.line).ok_or_else(|| {
        Error::parse(match_pos, "unbalanced braces in match block")
    })?;

    let arm_lines = buffer.lines()[site.line + 1..close].to_vec();
    let arms = arms::parse_arms(&arm_lines, match_pos)?;

    let lowered = switch_gen::synthesize(
        &site.scrutinee,
        arms,
        site.form,
        &indent,
        match_pos,
        &ctx.enums,
        &mut ctx.temps,
    )?;

    buffer.splice(
        site.line,
        close - site.line + 1,
        lowered.lines,
        &mut ctx.mappings,
    );
    for rel in &lowered.mappings {
        let generated = Pos::new((site.line + rel.line_offset) as u32 + 1, rel.column);
        let name = (!rel.name.is_empty()).then_some(rel.name.as_str());
        ctx.mappings.record(rel.original, generated, rel.length, name);
    }
    ctx.matches.push(lowered.record);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn preprocess(source: &str) -> (String, FileContext) {
        let mut ctx = FileContext::new("test.mgo", source);
        let out = run(source, &mut ctx, &ImportResolver::stdlib()).expect("preprocess");
        (out.text, ctx)
    }

    #[test]
    fn lowers_two_case_match_with_trailing_panic() {
        let source = concat!(
            "package main\n",
            "\n",
            "func pick(r Result<int, error>) int {\n",
            "    return match r {\n",
            "        Ok(x) => x,\n",
            "        Err(_) => -1,\n",
            "    }\n",
            "}\n",
        );
        let (text, ctx) = preprocess(source);

        let expected = concat!(
            "package main\n",
            "\n",
            "func pick(r Result_int_error) int {\n",
            "    switch r.tag {\n",
            "    case ResultTag_Err:\n",
            "        return -1\n",
            "    case ResultTag_Ok:\n",
            "        x := *r.ok_0\n",
            "        return x\n",
            "    }\n",
            "    panic(\"unreachable: non-exhaustive match\")\n",
            "}\n",
        );
        assert_eq!(text, expected);

        let record = &ctx.matches[0];
        assert_eq!(record.enum_name.as_deref(), Some("Result"));
        assert_eq!(record.covered, vec!["Ok".to_string(), "Err".to_string()]);
        assert!(!record.has_wildcard);
    }

    #[test]
    fn lowers_nested_patterns_to_inner_switch() {
        let source = concat!(
            "package main\n",
            "\n",
            "func unwrap(r Result<Option<int>, error>) int {\n",
            "    return match r {\n",
            "        Ok(Some(v)) => v,\n",
            "        Ok(None) => 0,\n",
            "        Err(_) => -1,\n",
            "    }\n",
            "}\n",
        );
        let (text, _ctx) = preprocess(source);

        let expected_switch = concat!(
            "    switch r.tag {\n",
            "    case ResultTag_Err:\n",
            "        return -1\n",
            "    case ResultTag_Ok:\n",
            "        __tmp0 := r.ok_0\n",
            "        switch __tmp0.tag {\n",
            "        case OptionTag_None:\n",
            "            return 0\n",
            "        case OptionTag_Some:\n",
            "            v := *__tmp0.some_0\n",
            "            return v\n",
            "        }\n",
            "        panic(\"unreachable: non-exhaustive match\")\n",
            "    }\n",
            "    panic(\"unreachable: non-exhaustive match\")\n",
        );
        assert!(
            text.contains(expected_switch),
            "generated text was:\n{text}"
        );
    }

    #[test]
    fn guards_compile_to_if_chains_with_wildcard_fallback() {
        let source = concat!(
            "package main\n",
            "\n",
            "func grade(r Result<int, error>) int {\n",
            "    return match r {\n",
            "        Ok(x) if x > 0 => x,\n",
            "        Ok(_) => 0,\n",
            "        Err(_) => -1,\n",
            "    }\n",
            "}\n",
        );
        let (text, _) = preprocess(source);

        let expected_case = concat!(
            "    case ResultTag_Ok:\n",
            "        x := *r.ok_0\n",
            "        if x > 0 {\n",
            "            return x\n",
            "        } else {\n",
            "            return 0\n",
            "        }\n",
        );
        assert!(text.contains(expected_case), "generated text was:\n{text}");
    }

    #[test]
    fn wildcard_maps_to_lexically_last_default() {
        let source = concat!(
            "package main\n",
            "\n",
            "func label(r Result<int, error>) string {\n",
            "    return match r {\n",
            "        _ => \"other\",\n",
            "        Ok(_) => \"ok\",\n",
            "    }\n",
            "}\n",
        );
        let (text, ctx) = preprocess(source);
        let default_at = text.find("default:").expect("default case present");
        let ok_at = text.find("case ResultTag_Ok:").expect("ok case present");
        assert!(ok_at < default_at, "default must sort last:\n{text}");
        assert!(ctx.matches[0].has_wildcard);
        // A wildcard match never needs the trailing panic.
        assert!(!text.contains("panic("));
    }

    #[test]
    fn statement_form_match_keeps_bodies_as_statements() {
        let source = concat!(
            "package main\n",
            "\n",
            "func log(r Result<int, error>) {\n",
            "    match r {\n",
            "        Ok(x) => fmt.Println(x),\n",
            "        Err(_) => fmt.Println(\"error\"),\n",
            "    }\n",
            "}\n",
        );
        let (text, _) = preprocess(source);
        assert!(text.contains("import \"fmt\""));
        assert!(text.contains("fmt.Println(x)"));
        assert!(!text.contains("return fmt.Println"));
    }

    #[test]
    fn determinism_under_repeated_runs() {
        let source = concat!(
            "package main\n",
            "\n",
            "func f(r Result<int, error>) int {\n",
            "    return match r {\n",
            "        Err(_) => -1,\n",
            "        Ok(x) => x,\n",
            "    }\n",
            "}\n",
        );
        let (first, _) = preprocess(source);
        for _ in 0..5 {
            let (again, _) = preprocess(source);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn expression_position_match_is_rejected() {
        let source = concat!(
            "package main\n",
            "\n",
            "func f(r Result<int, error>) {\n",
            "    x := match r {\n",
            "        Ok(v) => v,\n",
            "    }\n",
            "}\n",
        );
        let mut ctx = FileContext::new("test.mgo", source);
        let err = run(source, &mut ctx, &ImportResolver::stdlib()).unwrap_err();
        assert!(err
            .to_string()
            .contains("only supported as a statement"));
    }

    #[test]
    fn arm_mappings_point_into_original_file() {
        let source = concat!(
            "package main\n",
            "\n",
            "func pick(r Result<int, error>) int {\n",
            "    return match r {\n",
            "        Ok(x) => x,\n",
            "        Err(_) => -1,\n",
            "    }\n",
            "}\n",
        );
        let (text, ctx) = preprocess(source);
        // The Ok arm sits on original line 5; its body lands on the
        // generated line holding `x := *r.ok_0`'s successor.
        let ok_mapping = ctx
            .mappings
            .entries()
            .iter()
            .find(|m| m.name.as_deref() == Some("Ok"))
            .expect("Ok arm mapped");
        assert_eq!(ok_mapping.original.line, 5);
        let generated_line = text
            .lines()
            .nth(ok_mapping.generated.line as usize - 1)
            .expect("generated line exists");
        assert_eq!(generated_line.trim(), "return x");
    }
}
