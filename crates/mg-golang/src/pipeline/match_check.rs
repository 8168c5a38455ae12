//! Match-expression validation: exhaustiveness over the typed lowering
//! records the preprocessor left in the per-file context.
//!
//! A match with a wildcard always compiles. Without one, every variant of
//! the matched sum type must be covered, and the error names each missing
//! variant.

use std::collections::HashSet;

use mg_core::error::{Error, Result};

use crate::ast::File;
use crate::context::{FileContext, Pass};
use crate::pipeline::Plugin;

#[derive(Default)]
pub struct MatchValidationPlugin;

impl MatchValidationPlugin {
    pub fn new() -> MatchValidationPlugin {
        MatchValidationPlugin
    }
}

impl Plugin for MatchValidationPlugin {
    fn name(&self) -> &'static str {
        "match-validation"
    }

    fn discover(&mut self, _file: &File, ctx: &mut FileContext) -> Result<()> {
        for record in &ctx.matches {
            // Structural validation of the marker: only act on records the
            // lowering pass produced.
            if record.origin != Pass::MatchLowering {
                continue;
            }
            if record.has_wildcard {
                continue;
            }
            let Some(enum_name) = &record.enum_name else {
                continue;
            };
            let covered: HashSet<String> = record.covered.iter().cloned().collect();
            let missing = ctx.enums.missing_variants(enum_name, &covered);
            if !missing.is_empty() {
                return Err(Error::Exhaustiveness {
                    pos: record.pos,
                    missing,
                });
            }
        }
        Ok(())
    }

    fn transform(&mut self, _file: &mut File, _ctx: &mut FileContext) -> Result<()> {
        Ok(())
    }

    fn inject(&mut self, _file: &mut File, _ctx: &mut FileContext) -> Result<()> {
        Ok(())
    }
}
