//! Per-file compilation context.
//!
//! Every piece of state the passes share — temp counter, registries, match
//! records, mappings, diagnostics — travels through this object. No
//! process-wide state exists; compiling N files concurrently needs no
//! synchronization.

use mg_core::diagnostics::Diagnostics;
use mg_core::error::{Error, Result};
use mg_core::mappings::MappingTable;
use mg_core::source::SourceFile;
use mg_core::span::{FileId, Pos};

use crate::ast::IdGen;
use crate::hygiene::TempVarCounter;
use crate::infer::TypeTable;
use crate::pipeline::ParentIndex;
use crate::types::{EnumRegistry, MonoRegistry};

/// Which pass produced a marker record. Later phases match on this instead
/// of sniffing generated names, so a user identifier that merely shares a
/// reserved prefix is never mistaken for pipeline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    MatchLowering,
}

/// Typed marker left behind for every lowered `match`, consumed by the
/// match-validation plugin.
#[derive(Debug, Clone)]
pub struct MatchLowering {
    pub origin: Pass,
    pub scrutinee: String,
    /// Sum type being matched; `None` when only wildcard arms were present.
    pub enum_name: Option<String>,
    /// Top-level variants covered by constructor arms, in source order.
    pub covered: Vec<String>,
    pub has_wildcard: bool,
    pub pos: Pos,
}

pub struct FileContext {
    pub file_name: String,
    pub file_id: FileId,
    pub source: SourceFile,
    pub ids: IdGen,
    pub temps: TempVarCounter,
    pub enums: EnumRegistry,
    pub monos: MonoRegistry,
    pub matches: Vec<MatchLowering>,
    pub mappings: MappingTable,
    pub diagnostics: Diagnostics,
    /// The preprocessed text the host parser saw, for span→position lookups.
    pub preprocessed: Option<SourceFile>,
    /// Original position of each preprocessed line, `None` for synthesized
    /// lines; lets AST-stage errors point back into the user's file.
    pub line_origins: Vec<Option<Pos>>,
    types: Option<TypeTable>,
    parents: Option<ParentIndex>,
}

impl FileContext {
    pub fn new(file_name: impl Into<String>, source: &str) -> FileContext {
        let file_name = file_name.into();
        let file_id: FileId = 1;
        FileContext {
            source: SourceFile::new(file_id, file_name.clone(), source),
            file_name,
            file_id,
            ids: IdGen::new(),
            temps: TempVarCounter::new(),
            enums: EnumRegistry::new(),
            monos: MonoRegistry::new(),
            matches: Vec::new(),
            mappings: MappingTable::new(),
            diagnostics: Diagnostics::new(),
            preprocessed: None,
            line_origins: Vec::new(),
            types: None,
            parents: None,
        }
    }

    /// Position of a byte offset into the preprocessed text, mapped back to
    /// the original file where the carrying line survived preprocessing.
    pub fn pos_of_offset(&self, offset: u32) -> Pos {
        let Some(pre) = &self.preprocessed else {
            return self.source.line_col(offset);
        };
        let pos = pre.line_col(offset);
        match self
            .line_origins
            .get(pos.line as usize - 1)
            .copied()
            .flatten()
        {
            Some(origin) => Pos::new(origin.line, pos.column),
            None => pos,
        }
    }

    pub fn attach_types(&mut self, table: TypeTable) {
        self.types = Some(table);
    }

    pub fn attach_parents(&mut self, index: ParentIndex) {
        self.parents = Some(index);
    }

    /// The host type-checker's table. Failing loudly here instead of
    /// returning an empty table is what turns "inference silently does
    /// nothing" into a wiring bug caught by the first test that hits it.
    pub fn types(&self) -> Result<&TypeTable> {
        self.types
            .as_ref()
            .ok_or_else(|| Error::generic("type table not attached to file context"))
    }

    pub fn parents(&self) -> Result<&ParentIndex> {
        self.parents
            .as_ref()
            .ok_or_else(|| Error::generic("parent index not attached to file context"))
    }

    /// Detach the table for a phase that must also borrow the context
    /// mutably; re-attach when done.
    pub fn take_types(&mut self) -> Result<TypeTable> {
        self.types
            .take()
            .ok_or_else(|| Error::generic("type table not attached to file context"))
    }

    pub fn take_parents(&mut self) -> Result<ParentIndex> {
        self.parents
            .take()
            .ok_or_else(|| Error::generic("parent index not attached to file context"))
    }
}
