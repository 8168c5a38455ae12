//! Expansion of user `enum` declarations into plain Go.
//!
//! ```text
//! enum Shape {
//!     Circle(float64),
//!     Point,
//! }
//! ```
//!
//! becomes a tag type, an iota const block, and a payload struct whose
//! fields are pointers — the same encoding the monomorphized containers
//! use, so the Switch Synthesizer can treat both identically.

use mg_core::error::{Error, Result};
use mg_core::span::Pos;

use crate::context::FileContext;
use crate::preprocess::buffer::{Line, SourceBuffer};
use crate::preprocess::scan::{find_matching, CodeMask};
use crate::types::{payload_field, tag_const, EnumDef, VariantDef};

pub fn expand(buffer: &mut SourceBuffer, ctx: &mut FileContext) -> Result<()> {
    loop {
        let Some(start) = find_enum_line(buffer) else {
            return Ok(());
        };
        expand_one(buffer, start, ctx)?;
    }
}

fn find_enum_line(buffer: &SourceBuffer) -> Option<usize> {
    (0..buffer.len()).find(|&idx| {
        let line = &buffer.line(idx).text;
        let trimmed = line.trim_start();
        let mask = CodeMask::compute(line);
        let offset = line.len() - trimmed.len();
        trimmed.starts_with("enum ") && mask.is_code(offset) && trimmed.trim_end().ends_with('{')
    })
}

fn expand_one(buffer: &mut SourceBuffer, start: usize, ctx: &mut FileContext) -> Result<()> {
    let header = buffer.line(start).clone();
    let pos = header.origin.unwrap_or(Pos::new(start as u32 + 1, 1));

    let trimmed = header.text.trim();
    let name = trimmed
        .strip_prefix("enum ")
        .and_then(|rest| rest.strip_suffix('{'))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::parse(pos, "malformed enum declaration"))?;
    if !name.chars().all(|ch| ch == '_' || ch.is_ascii_alphanumeric()) {
        return Err(Error::parse(
            pos,
            format!("`{}` is not a valid enum name", name),
        ));
    }

    let close = buffer
        .block_end(start)
        .ok_or_else(|| Error::parse(pos, "unbalanced braces in enum declaration"))?;

    let mut variants = Vec::new();
    for idx in start + 1..close {
        let line = buffer.line(idx);
        let text = line.text.trim().trim_end_matches(',').trim();
        if text.is_empty() || text.starts_with("//") {
            continue;
        }
        let variant_pos = line.origin.unwrap_or(pos);
        variants.push(parse_variant(text, variant_pos)?);
    }
    if variants.is_empty() {
        return Err(Error::parse(pos, format!("enum `{}` has no variants", name)));
    }

    let replacement = emit_decls(name, &variants);
    buffer.splice(start, close - start + 1, replacement, &mut ctx.mappings);
    ctx.mappings.record(
        pos,
        Pos::new(start as u32 + 1, 1),
        name.len() as u32,
        Some(name),
    );

    ctx.enums.register(EnumDef {
        name: name.to_string(),
        variants,
    });
    Ok(())
}

fn parse_variant(text: &str, pos: Pos) -> Result<VariantDef> {
    match text.find('(') {
        None => {
            if !is_variant_name(text) {
                return Err(Error::parse(
                    pos,
                    format!("`{}` is not a valid variant name", text),
                ));
            }
            Ok(VariantDef {
                name: text.to_string(),
                payload: Vec::new(),
            })
        }
        Some(open) => {
            let name = text[..open].trim();
            if !is_variant_name(name) {
                return Err(Error::parse(
                    pos,
                    format!("`{}` is not a valid variant name", name),
                ));
            }
            let mask = CodeMask::compute(text);
            let close = find_matching(text, &mask, open)
                .ok_or_else(|| Error::parse(pos, "unbalanced parentheses in variant"))?;
            let payload: Vec<String> = text[open + 1..close]
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect();
            if payload.is_empty() {
                return Err(Error::parse(
                    pos,
                    format!("variant `{}` has empty payload parentheses", name),
                ));
            }
            Ok(VariantDef {
                name: name.to_string(),
                payload,
            })
        }
    }
}

fn is_variant_name(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(ch) if ch.is_ascii_uppercase())
        && chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

fn emit_decls(name: &str, variants: &[VariantDef]) -> Vec<Line> {
    let mut lines = Vec::new();
    let tag_type = format!("{}Tag", name);

    lines.push(Line::synthesized(format!("type {} int", tag_type)));
    lines.push(Line::synthesized(""));

    lines.push(Line::synthesized("const ("));
    for (index, variant) in variants.iter().enumerate() {
        if index == 0 {
            lines.push(Line::synthesized(format!(
                "    {} {} = iota",
                tag_const(name, &variant.name),
                tag_type
            )));
        } else {
            lines.push(Line::synthesized(format!(
                "    {}",
                tag_const(name, &variant.name)
            )));
        }
    }
    lines.push(Line::synthesized(")"));
    lines.push(Line::synthesized(""));

    lines.push(Line::synthesized(format!("type {} struct {{", name)));
    lines.push(Line::synthesized(format!("    tag {}", tag_type)));
    for variant in variants {
        for (index, payload_ty) in variant.payload.iter().enumerate() {
            lines.push(Line::synthesized(format!(
                "    {} *{}",
                payload_field(&variant.name, index),
                payload_ty
            )));
        }
    }
    lines.push(Line::synthesized("}"));
    lines.push(Line::synthesized(""));
    lines
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
    fn expands_enum_to_tag_and_struct() {
        let (text, ctx) = run(concat!(
            "package main\n",
            "\n",
            "enum Shape {\n",
            "    Circle(float64),\n",
            "    Rect(float64, float64),\n",
            "    Point,\n",
            "}\n",
        ));

        assert!(text.contains("type ShapeTag int"));
        assert!(text.contains("ShapeTag_Circle ShapeTag = iota"));
        assert!(text.contains("ShapeTag_Rect"));
        assert!(text.contains("ShapeTag_Point"));
        assert!(text.contains("type Shape struct {"));
        assert!(text.contains("circle_0 *float64"));
        assert!(text.contains("rect_1 *float64"));
        assert!(!text.contains("enum Shape"));

        let def = ctx.enums.get("Shape").expect("registered");
        assert_eq!(def.variants.len(), 3);
        assert_eq!(def.variant("Rect").unwrap().payload.len(), 2);
        assert_eq!(
            ctx.enums.enum_of_variant("Point").map(|d| d.name.as_str()),
            Some("Shape")
        );
    }

    #[test]
    fn rejects_malformed_variant() {
        let source = "enum Shape {\n    circle(float64),\n}\n";
        let mut ctx = FileContext::new("test.mgo", source);
        let mut buffer = SourceBuffer::from_source(source);
        let err = expand(&mut buffer, &mut ctx).unwrap_err();
        assert!(err.to_string().contains("not a valid variant name"));
    }
}
