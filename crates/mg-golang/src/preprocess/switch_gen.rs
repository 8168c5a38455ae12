//! Switch Synthesizer: lowers parsed arm lists into deterministic Go
//! `switch` text.
//!
//! Groups arms by top-level variant and sorts group keys explicitly
//! (alphabetical, wildcard last) so output never depends on map iteration
//! order. Guards become if/else chains inside a case; nested constructor
//! patterns become a further switch on the extracted inner tag, recursing
//! to arbitrary depth; the two compose.

use std::cmp::Ordering;

use mg_core::error::{Error, Result};
use mg_core::span::Pos;

use crate::context::{MatchLowering, Pass};
use crate::hygiene::TempVarCounter;
use crate::preprocess::arms::{ArmBody, PatternArm, PatternNode};
use crate::preprocess::buffer::Line;
use crate::preprocess::scan::contains_word;
use crate::types::{payload_field, tag_const, EnumRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchForm {
    /// `return match x { ... }`: expression bodies compile to `return`s.
    Return,
    /// Bare `match x { ... }` statement: expression bodies are statements.
    Statement,
}

/// A mapping relative to the start of the generated switch text.
#[derive(Debug, Clone)]
pub struct RelMapping {
    pub original: Pos,
    pub line_offset: usize,
    pub column: u32,
    pub length: u32,
    pub name: String,
}

pub struct LoweredMatch {
    pub lines: Vec<Line>,
    pub mappings: Vec<RelMapping>,
    pub record: MatchLowering,
}

const PANIC_LINE: &str = "panic(\"unreachable: non-exhaustive match\")";

pub fn synthesize(
    scrutinee: &str,
    arms: Vec<PatternArm>,
    form: MatchForm,
    base_indent: &str,
    match_pos: Pos,
    enums: &EnumRegistry,
    temps: &mut TempVarCounter,
) -> Result<LoweredMatch> {
    let arms: Vec<PatternArm> = arms
        .into_iter()
        .map(|mut arm| {
            arm.pattern = resolve_unit_variants(arm.pattern, enums);
            arm
        })
        .collect();

    // Record the typed marker before lowering so validation sees exactly
    // what the source covered, independent of how codegen regroups it.
    let mut covered = Vec::new();
    let mut enum_name: Option<String> = None;
    let mut has_wildcard = false;
    for arm in &arms {
        match &arm.pattern {
            PatternNode::Constructor { variant, .. } => {
                let def = enums.enum_of_variant(variant).ok_or_else(|| {
                    Error::parse(arm.pos, format!("unknown variant `{}` in pattern", variant))
                })?;
                match &enum_name {
                    None => enum_name = Some(def.name.clone()),
                    Some(existing) if *existing != def.name => {
                        return Err(Error::parse(
                            arm.pos,
                            format!(
                                "pattern mixes variants of `{}` and `{}`",
                                existing, def.name
                            ),
                        ));
                    }
                    Some(_) => {}
                }
                if !covered.contains(variant) {
                    covered.push(variant.clone());
                }
            }
            PatternNode::Wildcard | PatternNode::Binding(_) => has_wildcard = true,
        }
    }

    let record = MatchLowering {
        origin: Pass::MatchLowering,
        scrutinee: scrutinee.to_string(),
        enum_name: enum_name.clone(),
        covered,
        has_wildcard,
        pos: match_pos,
    };

    let mut gen = Gen {
        lines: Vec::new(),
        mappings: Vec::new(),
        enums,
        temps,
        form,
        base: base_indent.to_string(),
    };

    let top = Scrutinee {
        expr: scrutinee.to_string(),
        is_pointer: false,
    };
    gen.emit_match(&top, &arms, 0, None)?;

    Ok(LoweredMatch {
        lines: gen.lines,
        mappings: gen.mappings,
        record,
    })
}

/// A bare identifier naming a payload-less variant is a unit-variant
/// pattern, not a binding. Applied recursively before lowering.
fn resolve_unit_variants(pattern: PatternNode, enums: &EnumRegistry) -> PatternNode {
    match pattern {
        PatternNode::Binding(name) => {
            let is_unit = enums
                .enum_of_variant(&name)
                .and_then(|def| def.variant(&name))
                .map(|variant| variant.payload.is_empty())
                .unwrap_or(false);
            if is_unit {
                PatternNode::Constructor {
                    variant: name,
                    args: Vec::new(),
                }
            } else {
                PatternNode::Binding(name)
            }
        }
        PatternNode::Constructor { variant, args } => PatternNode::Constructor {
            variant,
            args: args
                .into_iter()
                .map(|arg| resolve_unit_variants(arg, enums))
                .collect(),
        },
        PatternNode::Wildcard => PatternNode::Wildcard,
    }
}

/// What the current switch level scrutinizes: the match operand itself at
/// the top, a `__tmpN` pointer to the inner container below.
#[derive(Debug, Clone)]
struct Scrutinee {
    expr: String,
    is_pointer: bool,
}

/// The arm a failing guard chain falls back to: the match-level wildcard
/// arm, captured with the scrutinee of the level it binds.
#[derive(Debug, Clone)]
struct Fallback {
    arm: PatternArm,
    scrutinee: Scrutinee,
}

struct Gen<'a> {
    lines: Vec<Line>,
    mappings: Vec<RelMapping>,
    enums: &'a EnumRegistry,
    temps: &'a mut TempVarCounter,
    form: MatchForm,
    base: String,
}

impl<'a> Gen<'a> {
    fn push(&mut self, level: usize, text: &str) {
        self.lines.push(Line::synthesized(format!(
            "{}{}{}",
            self.base,
            "    ".repeat(level),
            text
        )));
    }

    fn push_with_origin(&mut self, level: usize, text: &str, origin: Option<Pos>) {
        let rendered = format!("{}{}{}", self.base, "    ".repeat(level), text);
        self.lines.push(Line {
            text: rendered,
            origin,
        });
    }

    fn map_arm(&mut self, arm: &PatternArm, level: usize) {
        let (name, length) = match &arm.pattern {
            PatternNode::Constructor { variant, .. } => (variant.clone(), variant.len() as u32),
            PatternNode::Binding(name) => (name.clone(), name.len() as u32),
            PatternNode::Wildcard => ("_".to_string(), 1),
        };
        self.mappings.push(RelMapping {
            original: arm.pos,
            line_offset: self.lines.len(),
            column: (self.base.len() + level * 4) as u32 + 1,
            length,
            name,
        });
    }

    fn emit_match(
        &mut self,
        scrutinee: &Scrutinee,
        arms: &[PatternArm],
        level: usize,
        fallback: Option<&Fallback>,
    ) -> Result<()> {
        let constructor_arms: Vec<&PatternArm> = arms
            .iter()
            .filter(|arm| matches!(arm.pattern, PatternNode::Constructor { .. }))
            .collect();
        let wildcard_arms: Vec<&PatternArm> = arms
            .iter()
            .filter(|arm| !matches!(arm.pattern, PatternNode::Constructor { .. }))
            .collect();

        // No constructors at this level: the first catch-all arm always
        // runs; a guard chain applies when the catch-alls are guarded.
        if constructor_arms.is_empty() {
            return self.emit_chain(scrutinee, &wildcard_arms, level, fallback);
        }

        let enum_def = {
            let variant = constructor_arms[0]
                .pattern
                .variant_name()
                .expect("constructor arm has a variant");
            self.enums
                .enum_of_variant(variant)
                .expect("variant resolved during record construction")
                .clone()
        };

        // Group by variant in first-occurrence order, then sort explicitly:
        // alphabetical, wildcard last. Never rely on map iteration order.
        let mut groups: Vec<(String, Vec<&PatternArm>)> = Vec::new();
        for arm in &constructor_arms {
            let variant = arm.pattern.variant_name().unwrap_or_default().to_string();
            match groups.iter_mut().find(|(key, _)| *key == variant) {
                Some((_, group)) => group.push(arm),
                None => groups.push((variant, vec![arm])),
            }
        }
        if !wildcard_arms.is_empty() {
            groups.push(("_".to_string(), wildcard_arms.clone()));
        }
        groups.sort_by(|a, b| match (a.0 == "_", b.0 == "_") {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.0.cmp(&b.0),
        });

        // The match-level wildcard is the guard-chain fallback inside
        // every constructor case.
        let local_fallback: Option<Fallback> = wildcard_arms.first().map(|arm| Fallback {
            arm: (*arm).clone(),
            scrutinee: scrutinee.clone(),
        });
        let effective_fallback = local_fallback.as_ref().or(fallback);

        self.push(level, &format!("switch {}.tag {{", scrutinee.expr));
        for (variant, group) in &groups {
            if variant == "_" {
                self.push(level, "default:");
                self.emit_chain(scrutinee, group, level + 1, fallback)?;
            } else {
                self.push(
                    level,
                    &format!("case {}:", tag_const(&enum_def.name, variant)),
                );
                self.emit_group(
                    scrutinee,
                    &enum_def.name,
                    variant,
                    group,
                    level + 1,
                    effective_fallback,
                )?;
            }
        }

        // An inner switch without its own wildcard must still route
        // unmatched tags to the match-level wildcard arm.
        if wildcard_arms.is_empty() {
            if let Some(fallback) = fallback {
                self.push(level, "default:");
                self.emit_fallback(fallback, level + 1)?;
            }
        }
        self.push(level, "}");

        // Go cannot prove the switch exhaustive; when every arm returns and
        // there is no default, satisfy control-flow analysis explicitly.
        if self.form == MatchForm::Return && wildcard_arms.is_empty() && fallback.is_none() {
            self.push(level, PANIC_LINE);
        }
        Ok(())
    }

    fn emit_group(
        &mut self,
        scrutinee: &Scrutinee,
        enum_name: &str,
        variant: &str,
        group: &[&PatternArm],
        level: usize,
        fallback: Option<&Fallback>,
    ) -> Result<()> {
        let def = self
            .enums
            .get(enum_name)
            .and_then(|def| def.variant(variant))
            .cloned()
            .expect("variant resolved during record construction");
        let arity = def.payload.len();

        for arm in group {
            let args = constructor_args(arm);
            if args.len() != arity {
                return Err(Error::parse(
                    arm.pos,
                    format!(
                        "variant `{}` takes {} payload pattern(s), found {}",
                        variant,
                        arity,
                        args.len()
                    ),
                ));
            }
        }

        // A payload position where some arm destructures further forces a
        // nested switch on that position's tag.
        let nested_pos = (0..arity).find(|&i| {
            group.iter().any(|arm| {
                matches!(
                    constructor_args(arm).get(i),
                    Some(PatternNode::Constructor { .. })
                )
            })
        });

        match nested_pos {
            Some(pos) => self.emit_nested(scrutinee, variant, group, pos, level, fallback),
            None => self.emit_flat(scrutinee, variant, group, level, fallback),
        }
    }

    /// Arms that only bind or ignore payloads: bindings, then the body or
    /// an if/else guard chain.
    fn emit_flat(
        &mut self,
        scrutinee: &Scrutinee,
        variant: &str,
        group: &[&PatternArm],
        level: usize,
        fallback: Option<&Fallback>,
    ) -> Result<()> {
        let mut bound: Vec<String> = Vec::new();
        for arm in group {
            for (i, arg) in constructor_args(arm).iter().enumerate() {
                if let PatternNode::Binding(name) = arg {
                    if contains_word(&arm.guard_and_body_text(), name) && !bound.contains(name) {
                        self.push(
                            level,
                            &format!(
                                "{} := *{}.{}",
                                name,
                                scrutinee.expr,
                                payload_field(variant, i)
                            ),
                        );
                        bound.push(name.clone());
                    }
                }
            }
        }
        self.emit_chain_bodies(group, level, fallback)
    }

    /// Catch-all arms (`_` or a whole-value binding): bind the scrutinee
    /// where used, then body or guard chain.
    fn emit_chain(
        &mut self,
        scrutinee: &Scrutinee,
        group: &[&PatternArm],
        level: usize,
        fallback: Option<&Fallback>,
    ) -> Result<()> {
        let mut bound: Vec<String> = Vec::new();
        for arm in group {
            if let PatternNode::Binding(name) = &arm.pattern {
                if contains_word(&arm.guard_and_body_text(), name) && !bound.contains(name) {
                    let deref = if scrutinee.is_pointer { "*" } else { "" };
                    self.push(level, &format!("{} := {}{}", name, deref, scrutinee.expr));
                    bound.push(name.clone());
                }
            }
        }
        self.emit_chain_bodies(group, level, fallback)
    }

    /// Emit a group's bodies: direct for a single unguarded arm, otherwise
    /// an if/else-if chain with the guardless arm as the final else.
    fn emit_chain_bodies(
        &mut self,
        group: &[&PatternArm],
        level: usize,
        fallback: Option<&Fallback>,
    ) -> Result<()> {
        let guardless = group.iter().find(|arm| arm.guard.is_none());

        if group.len() == 1 && group[0].guard.is_none() {
            self.map_arm(group[0], level);
            self.emit_body(group[0], level);
            return Ok(());
        }

        let mut first = true;
        for arm in group.iter().filter(|arm| arm.guard.is_some()) {
            let guard = arm.guard.as_deref().unwrap_or_default();
            if first {
                self.push(level, &format!("if {} {{", guard));
                first = false;
            } else {
                self.push(level, &format!("}} else if {} {{", guard));
            }
            self.map_arm(arm, level + 1);
            self.emit_body(arm, level + 1);
        }

        if first {
            // Only unguarded arms; the first one wins, the rest are dead.
            if let Some(arm) = guardless {
                self.map_arm(arm, level);
                self.emit_body(arm, level);
            }
            return Ok(());
        }

        self.push(level, "} else {");
        match (guardless, fallback) {
            (Some(arm), _) => {
                self.map_arm(arm, level + 1);
                self.emit_body(arm, level + 1);
            }
            (None, Some(fallback)) => {
                self.emit_fallback(fallback, level + 1)?;
            }
            (None, None) => {
                // All guards failed and nothing catches the value.
                self.push(level + 1, PANIC_LINE);
            }
        }
        self.push(level, "}");
        Ok(())
    }

    /// Re-emit the match-level wildcard arm inside a constructor case whose
    /// guards were not exhaustive.
    fn emit_fallback(&mut self, fallback: &Fallback, level: usize) -> Result<()> {
        if let PatternNode::Binding(name) = &fallback.arm.pattern {
            if contains_word(&fallback.arm.guard_and_body_text(), name) {
                let deref = if fallback.scrutinee.is_pointer { "*" } else { "" };
                self.push(
                    level,
                    &format!("{} := {}{}", name, deref, fallback.scrutinee.expr),
                );
            }
        }
        self.emit_body(&fallback.arm, level);
        Ok(())
    }

    /// Destructure one payload position through a temporary and recurse.
    fn emit_nested(
        &mut self,
        scrutinee: &Scrutinee,
        variant: &str,
        group: &[&PatternArm],
        nested_pos: usize,
        level: usize,
        fallback: Option<&Fallback>,
    ) -> Result<()> {
        for arm in group {
            for (i, arg) in constructor_args(arm).iter().enumerate() {
                if i != nested_pos && matches!(arg, PatternNode::Binding(_)) {
                    return Err(Error::parse(
                        arm.pos,
                        "unsupported pattern: binding alongside a nested pattern in the \
                         same constructor; bind in the arm body instead",
                    ));
                }
            }
        }

        let temp = self.temps.fresh();
        self.push(
            level,
            &format!(
                "{} := {}.{}",
                temp,
                scrutinee.expr,
                payload_field(variant, nested_pos)
            ),
        );

        let inner_arms: Vec<PatternArm> = group
            .iter()
            .map(|arm| PatternArm {
                pattern: constructor_args(arm)
                    .get(nested_pos)
                    .cloned()
                    .unwrap_or(PatternNode::Wildcard),
                guard: arm.guard.clone(),
                body: arm.body.clone(),
                pos: arm.pos,
            })
            .collect();

        let inner = Scrutinee {
            expr: temp,
            is_pointer: true,
        };
        self.emit_match(&inner, &inner_arms, level, fallback)
    }

    fn emit_body(&mut self, arm: &PatternArm, level: usize) {
        match &arm.body {
            ArmBody::Expr(expr) => match self.form {
                MatchForm::Return => self.push(level, &format!("return {}", expr)),
                MatchForm::Statement => self.push(level, expr),
            },
            ArmBody::Block(lines) => {
                let min_indent = lines
                    .iter()
                    .filter(|line| !line.text.trim().is_empty())
                    .map(|line| line.text.len() - line.text.trim_start().len())
                    .min()
                    .unwrap_or(0);
                for line in lines {
                    let stripped = if line.text.len() >= min_indent {
                        &line.text[min_indent..]
                    } else {
                        line.text.trim_start()
                    };
                    if let Some(origin) = line.origin {
                        let column = (line.text.len() - line.text.trim_start().len()) as u32 + 1;
                        self.mappings.push(RelMapping {
                            original: Pos::new(origin.line, column),
                            line_offset: self.lines.len(),
                            column: (self.base.len() + level * 4) as u32 + 1,
                            length: stripped.trim_end().len() as u32,
                            name: String::new(),
                        });
                    }
                    self.push_with_origin(level, stripped, line.origin);
                }
            }
        }
    }
}

fn constructor_args(arm: &PatternArm) -> &[PatternNode] {
    match &arm.pattern {
        PatternNode::Constructor { args, .. } => args,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::arms::parse_arms;
    use pretty_assertions::assert_eq;

    fn lower(arm_lines: &[&str], form: MatchForm) -> LoweredMatch {
        let block: Vec<Line> = arm_lines
            .iter()
            .enumerate()
            .map(|(idx, text)| Line::original(*text, idx as u32 + 10))
            .collect();
        let arms = parse_arms(&block, Pos::new(9, 5)).expect("arms parse");
        let registry = EnumRegistry::new();
        let mut temps = TempVarCounter::new();
        synthesize("r", arms, form, "", Pos::new(9, 5), &registry, &mut temps)
            .expect("synthesis should succeed")
    }

    fn text_of(lowered: &LoweredMatch) -> String {
        let mut out = String::new();
        for line in &lowered.lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }

    #[test]
    fn guard_combined_with_nested_pattern_gets_both_switch_and_chain() {
        let lowered = lower(
            &[
                "    Ok(Some(v)) if v > 0 => v,",
                "    Ok(Some(_)) => 0,",
                "    Ok(None) => -1,",
                "    Err(_) => -2,",
            ],
            MatchForm::Return,
        );
        let expected = concat!(
            "switch r.tag {\n",
            "case ResultTag_Err:\n",
            "    return -2\n",
            "case ResultTag_Ok:\n",
            "    __tmp0 := r.ok_0\n",
            "    switch __tmp0.tag {\n",
            "    case OptionTag_None:\n",
            "        return -1\n",
            "    case OptionTag_Some:\n",
            "        v := *__tmp0.some_0\n",
            "        if v > 0 {\n",
            "            return v\n",
            "        } else {\n",
            "            return 0\n",
            "        }\n",
            "    }\n",
            "    panic(\"unreachable: non-exhaustive match\")\n",
            "}\n",
            "panic(\"unreachable: non-exhaustive match\")\n",
        );
        assert_eq!(text_of(&lowered), expected);
    }

    #[test]
    fn case_order_is_independent_of_arm_order() {
        let forward = lower(
            &["    Ok(x) => x,", "    Err(_) => -1,"],
            MatchForm::Return,
        );
        let reversed = lower(
            &["    Err(_) => -1,", "    Ok(x) => x,"],
            MatchForm::Return,
        );
        assert_eq!(text_of(&forward), text_of(&reversed));
    }

    #[test]
    fn unused_binding_is_not_materialized() {
        let lowered = lower(
            &["    Ok(x) => x,", "    Err(e) => -1,"],
            MatchForm::Return,
        );
        let text = text_of(&lowered);
        assert!(text.contains("x := *r.ok_0"));
        // `e` never appears in the Err arm's body, so binding it would
        // trip Go's unused-variable check.
        assert!(!text.contains("e := "), "got:\n{text}");
    }

    #[test]
    fn guarded_arms_without_catch_all_panic_in_final_else() {
        let lowered = lower(
            &["    Ok(x) if x > 0 => x,", "    Err(_) => -1,"],
            MatchForm::Return,
        );
        let text = text_of(&lowered);
        let expected_case = concat!(
            "case ResultTag_Ok:\n",
            "    x := *r.ok_0\n",
            "    if x > 0 {\n",
            "        return x\n",
            "    } else {\n",
            "        panic(\"unreachable: non-exhaustive match\")\n",
            "    }\n",
        );
        assert!(text.contains(expected_case), "got:\n{text}");
    }

    #[test]
    fn statement_form_emits_bodies_without_return_or_panic() {
        let lowered = lower(
            &["    Ok(x) => handle(x),", "    Err(_) => report(),"],
            MatchForm::Statement,
        );
        let text = text_of(&lowered);
        assert!(text.contains("handle(x)\n"));
        assert!(!text.contains("return"));
        assert!(!text.contains("panic("));
    }

    #[test]
    fn whole_value_binding_acts_as_wildcard_with_binding() {
        let lowered = lower(
            &["    Ok(x) => x,", "    other => use(other),"],
            MatchForm::Return,
        );
        let text = text_of(&lowered);
        let expected_default = concat!(
            "default:\n",
            "    other := r\n",
            "    return use(other)\n",
        );
        assert!(text.contains(expected_default), "got:\n{text}");
        assert!(lowered.record.has_wildcard);
    }
}
