//! Per-file transpile driver: preprocess → host parse → type check →
//! plugin pipeline → print, finalizing the source map last.

use mg_core::diagnostics::Diagnostics;
use mg_core::error::Result;
use mg_core::mappings::MappingTable;
use mg_core::source::SourceFile;
use rayon::prelude::*;

use crate::context::FileContext;
use crate::infer::HostTypeChecker;
use crate::parser::GoParser;
use crate::pipeline::{constructors::ConstructorPlugin, match_check::MatchValidationPlugin};
use crate::pipeline::{run_plugins, Plugin};
use crate::preprocess::{self, imports::ImportResolver};
use crate::printer::GoPrinter;

#[derive(Debug)]
pub struct TranspileOutput {
    /// Generated Go text.
    pub code: String,
    /// Original↔generated position table.
    pub mappings: MappingTable,
    /// Non-fatal conditions collected along the way.
    pub diagnostics: Diagnostics,
}

/// Transpile one extended-syntax source file with the stdlib import table.
pub fn transpile_source(file_name: &str, source: &str) -> Result<TranspileOutput> {
    transpile_with_resolver(file_name, source, &ImportResolver::stdlib())
}

pub fn transpile_with_resolver(
    file_name: &str,
    source: &str,
    resolver: &ImportResolver,
) -> Result<TranspileOutput> {
    let mut ctx = FileContext::new(file_name, source);

    let pre = preprocess::run(source, &mut ctx, resolver)?;
    ctx.preprocessed = Some(SourceFile::new(
        ctx.file_id,
        format!("{file_name}#preprocessed"),
        &pre.text,
    ));
    ctx.line_origins = pre.origins;

    let mut parser = GoParser::new()?;
    let mut file = parser.parse_file(&pre.text, ctx.file_id, &mut ctx.ids)?;

    // The host type checker logs and degrades; it never fails the file.
    let outcome = HostTypeChecker::new(&ctx.enums, &ctx.monos).check(&file);
    for (span, message) in outcome.warnings {
        let pos = ctx.pos_of_offset(span.lo);
        ctx.diagnostics
            .push(mg_core::diagnostics::Diagnostic::warning(message).with_pos(pos));
    }
    ctx.attach_types(outcome.table);

    let mut plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(ConstructorPlugin::new()),
        Box::new(MatchValidationPlugin::new()),
    ];
    run_plugins(&mut plugins, &mut file, &mut ctx)?;

    let code = GoPrinter::new().print(&file);
    Ok(TranspileOutput {
        code,
        mappings: ctx.mappings,
        diagnostics: ctx.diagnostics,
    })
}

/// Transpile N independent files concurrently. Every file owns its
/// context — temp counter, registries, mapping table — so no
/// synchronization is needed.
pub fn transpile_files(inputs: &[(String, String)]) -> Vec<Result<TranspileOutput>> {
    inputs
        .par_iter()
        .map(|(name, source)| transpile_source(name, source))
        .collect()
}
