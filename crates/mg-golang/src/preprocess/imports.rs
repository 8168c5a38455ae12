//! Import discovery and injection.
//!
//! The preprocessor asks an [`ImportResolver`] which standard-library
//! import a function call requires (keyed by both the qualified
//! `fmt.Sprintf` and the bare `Sprintf` form), merges the answers with the
//! file's existing imports into one de-duplicated, sorted block, and
//! re-parses the result through the host grammar — a failure there is an
//! explicit error, never a silent no-op.

use std::collections::{BTreeSet, HashMap};

use mg_core::error::{Error, Result};

use crate::parser::GoParser;
use crate::preprocess::buffer::{Line, SourceBuffer};
use crate::preprocess::scan::CodeMask;

/// Answers "which import does this call need?".
#[derive(Debug, Clone)]
pub struct ImportResolver {
    qualified: HashMap<String, String>,
    bare: HashMap<String, String>,
}

impl ImportResolver {
    pub fn empty() -> ImportResolver {
        ImportResolver {
            qualified: HashMap::new(),
            bare: HashMap::new(),
        }
    }

    /// The standard-library table the transpiler ships with.
    pub fn stdlib() -> ImportResolver {
        let mut resolver = ImportResolver::empty();
        for func in ["Println", "Printf", "Print", "Sprintf", "Sprint", "Errorf"] {
            resolver.add("fmt", func);
        }
        for func in ["New", "Is", "As", "Unwrap"] {
            resolver.add_qualified("errors", func);
        }
        for func in ["Itoa", "Atoi", "Quote", "FormatInt", "ParseInt"] {
            resolver.add("strconv", func);
        }
        for func in [
            "Join",
            "Split",
            "Contains",
            "HasPrefix",
            "HasSuffix",
            "TrimSpace",
            "ToUpper",
            "ToLower",
            "Repeat",
        ] {
            resolver.add_qualified("strings", func);
        }
        for func in ["Getenv", "Exit"] {
            resolver.add_qualified("os", func);
        }
        for func in ["Strings", "Ints", "Slice"] {
            resolver.add_qualified("sort", func);
        }
        resolver
    }

    /// Register under both the qualified and the bare key.
    pub fn add(&mut self, package: &str, func: &str) {
        self.add_qualified(package, func);
        self.bare.insert(func.to_string(), package.to_string());
    }

    /// Register under the qualified key only (for names too generic to
    /// resolve bare, like `New`).
    pub fn add_qualified(&mut self, package: &str, func: &str) {
        self.qualified
            .insert(format!("{}.{}", package, func), package.to_string());
    }

    /// Import needed by a call, keyed `pkg.Func` or bare `Func`.
    pub fn import_for(&self, call: &str) -> Option<&str> {
        if call.contains('.') {
            self.qualified.get(call).map(String::as_str)
        } else {
            self.bare.get(call).map(String::as_str)
        }
    }
}

impl Default for ImportResolver {
    fn default() -> Self {
        ImportResolver::stdlib()
    }
}

/// Inject the merged import block and validate the result re-parses.
pub fn inject(
    buffer: &mut SourceBuffer,
    resolver: &ImportResolver,
    ctx: &mut crate::context::FileContext,
) -> Result<()> {
    let mut needed: BTreeSet<String> = BTreeSet::new();
    for line in buffer.lines() {
        for call in calls_in_line(&line.text) {
            if let Some(package) = resolver.import_for(&call) {
                needed.insert(package.to_string());
            }
        }
    }

    // Merge with whatever the file already imports, then drop the old block.
    let existing = existing_import_block(buffer);
    if let Some(block) = &existing {
        needed.extend(block.paths.iter().cloned());
        buffer.splice(
            block.start,
            block.len,
            Vec::new(),
            &mut ctx.mappings,
        );
    }

    if !needed.is_empty() {
        let at = package_line(buffer).map(|idx| idx + 1).unwrap_or(0);
        let mut lines = vec![Line::synthesized("")];
        if needed.len() == 1 {
            let only = needed.iter().next().expect("nonempty set");
            lines.push(Line::synthesized(format!("import \"{}\"", only)));
        } else {
            lines.push(Line::synthesized("import ("));
            for path in &needed {
                lines.push(Line::synthesized(format!("    \"{}\"", path)));
            }
            lines.push(Line::synthesized(")"));
        }
        buffer.insert(at, lines, &mut ctx.mappings);
    }

    // The injected text must still be grammatical Go.
    let text = buffer.text();
    let mut parser = GoParser::new().map_err(|err| Error::generic(err.to_string()))?;
    parser
        .check_syntax(&text)
        .map_err(Error::ImportInjection)?;
    Ok(())
}

struct ImportBlock {
    start: usize,
    len: usize,
    paths: Vec<String>,
}

fn package_line(buffer: &SourceBuffer) -> Option<usize> {
    (0..buffer.len()).find(|&idx| buffer.line(idx).text.trim_start().starts_with("package "))
}

fn existing_import_block(buffer: &SourceBuffer) -> Option<ImportBlock> {
    for idx in 0..buffer.len() {
        let trimmed = buffer.line(idx).text.trim().to_string();
        if let Some(rest) = trimmed.strip_prefix("import") {
            let rest = rest.trim();
            if let Some(path) = rest.strip_prefix('"') {
                // Single-line form: import "fmt"
                return Some(ImportBlock {
                    start: idx,
                    len: 1,
                    paths: vec![path.trim_end_matches('"').to_string()],
                });
            }
            if rest.starts_with('(') {
                let mut paths = Vec::new();
                let mut end = idx;
                for inner in idx + 1..buffer.len() {
                    let inner_text = buffer.line(inner).text.trim().to_string();
                    if inner_text.starts_with(')') {
                        end = inner;
                        break;
                    }
                    let path = inner_text.trim_matches('"');
                    if !path.is_empty() {
                        paths.push(path.to_string());
                    }
                }
                return Some(ImportBlock {
                    start: idx,
                    len: end - idx + 1,
                    paths,
                });
            }
        }
    }
    None
}

/// Extract call targets from one line: `pkg.Func` for qualified calls,
/// `Func` for bare ones.
fn calls_in_line(text: &str) -> Vec<String> {
    let mask = CodeMask::compute(text);
    let bytes = text.as_bytes();
    let mut calls = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !mask.is_code(i) || !is_ident_start(bytes[i]) {
            i += 1;
            continue;
        }
        if i > 0 && is_ident_byte(bytes[i - 1]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && is_ident_byte(bytes[i]) {
            i += 1;
        }
        let ident = &text[start..i];
        if i < bytes.len() && bytes[i] == b'(' {
            if start > 0 && bytes[start - 1] == b'.' {
                // Qualified call: walk back over the package identifier.
                let mut package_start = start - 1;
                while package_start > 0 && is_ident_byte(bytes[package_start - 1]) {
                    package_start -= 1;
                }
                if package_start < start - 1 {
                    calls.push(format!("{}.{}", &text[package_start..start - 1], ident));
                    continue;
                }
            }
            calls.push(ident.to_string());
        }
    }
    calls
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FileContext;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolver_answers_both_key_forms() {
        let resolver = ImportResolver::stdlib();
        assert_eq!(resolver.import_for("fmt.Sprintf"), Some("fmt"));
        assert_eq!(resolver.import_for("Sprintf"), Some("fmt"));
        assert_eq!(resolver.import_for("errors.New"), Some("errors"));
        // `New` alone is too generic to resolve.
        assert_eq!(resolver.import_for("New"), None);
        assert_eq!(resolver.import_for("frobnicate"), None);
    }

    #[test]
    fn finds_qualified_and_bare_calls() {
        let calls = calls_in_line(r#"    fmt.Println(strconv.Itoa(n), helper(x))"#);
        assert!(calls.contains(&"fmt.Println".to_string()));
        assert!(calls.contains(&"strconv.Itoa".to_string()));
        assert!(calls.contains(&"helper".to_string()));
    }

    #[test]
    fn injects_merged_sorted_block() {
        let source = concat!(
            "package main\n",
            "\n",
            "import \"os\"\n",
            "\n",
            "func main() {\n",
            "    fmt.Println(strconv.Itoa(1))\n",
            "    os.Exit(0)\n",
            "}\n",
        );
        let mut ctx = FileContext::new("test.mgo", source);
        let mut buffer = SourceBuffer::from_source(source);
        inject(&mut buffer, &ImportResolver::stdlib(), &mut ctx).expect("injection");

        let text = buffer.text();
        let import_at = text.find("import (").expect("block present");
        let fmt_at = text.find("\"fmt\"").expect("fmt imported");
        let os_at = text.find("\"os\"").expect("os kept");
        let strconv_at = text.find("\"strconv\"").expect("strconv imported");
        assert!(import_at < fmt_at && fmt_at < os_at && os_at < strconv_at);
        assert_eq!(text.matches("import").count(), 1);
    }

    #[test]
    fn shifts_mappings_below_insertion_only() {
        let source = concat!(
            "package main\n",
            "\n",
            "func main() {\n",
            "    fmt.Println(1)\n",
            "}\n",
        );
        let mut ctx = FileContext::new("test.mgo", source);
        ctx.mappings.record(
            mg_core::span::Pos::new(4, 5),
            mg_core::span::Pos::new(4, 5),
            1,
            None,
        );
        let mut buffer = SourceBuffer::from_source(source);
        inject(&mut buffer, &ImportResolver::stdlib(), &mut ctx).expect("injection");

        // Two lines were inserted after line 1.
        assert_eq!(ctx.mappings.entries()[0].generated.line, 6);
        assert!(buffer.text().contains("import \"fmt\""));
    }

    #[test]
    fn unparseable_result_is_an_explicit_error() {
        let source = "package main\n\nfunc broken( {\n    fmt.Println(1)\n}\n";
        let mut ctx = FileContext::new("test.mgo", source);
        let mut buffer = SourceBuffer::from_source(source);
        let err = inject(&mut buffer, &ImportResolver::stdlib(), &mut ctx).unwrap_err();
        assert!(matches!(err, Error::ImportInjection(_)));
    }
}
