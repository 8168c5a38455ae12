//! Original↔generated position table produced alongside code generation.

use crate::span::Pos;
use itertools::Itertools;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// One entry of the source map.
///
/// Serializes as the position tuple
/// `(original_line, original_column, generated_line, generated_column, length, name)`
/// so the table can be consumed by standard position-mapping tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub original: Pos,
    pub generated: Pos,
    pub length: u32,
    pub name: Option<String>,
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(6))?;
        seq.serialize_element(&self.original.line)?;
        seq.serialize_element(&self.original.column)?;
        seq.serialize_element(&self.generated.line)?;
        seq.serialize_element(&self.generated.column)?;
        seq.serialize_element(&self.length)?;
        seq.serialize_element(&self.name)?;
        seq.end()
    }
}

/// Append-only list of [`Mapping`] entries.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<Mapping>,
}

impl MappingTable {
    pub fn new() -> MappingTable {
        MappingTable::default()
    }

    pub fn push(&mut self, mapping: Mapping) {
        self.entries.push(mapping);
    }

    pub fn record(&mut self, original: Pos, generated: Pos, length: u32, name: Option<&str>) {
        self.entries.push(Mapping {
            original,
            generated,
            length,
            name: name.map(str::to_string),
        });
    }

    /// Shift every mapping at or after `at_line` down by `delta_lines`.
    ///
    /// Mappings on generated lines before `at_line` are untouched; this is
    /// the invariant later passes (import injection) rely on.
    pub fn adjust_for_insertion(&mut self, at_line: u32, delta_lines: u32) {
        for mapping in &mut self.entries {
            if mapping.generated.line >= at_line {
                mapping.generated.line += delta_lines;
            }
        }
    }

    /// Rewrite the table for a line splice that removed `removed` generated
    /// lines starting at `start` and inserted `added` lines in their place.
    /// Mappings into the removed range are dropped.
    pub fn adjust_for_splice(&mut self, start: u32, removed: u32, added: u32) {
        self.entries
            .retain(|m| m.generated.line < start || m.generated.line >= start + removed);
        for mapping in &mut self.entries {
            if mapping.generated.line >= start + removed {
                mapping.generated.line = mapping.generated.line - removed + added;
            }
        }
    }

    pub fn entries(&self) -> &[Mapping] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the table, ordered by generated position, as a JSON array of
    /// position tuples.
    pub fn to_json(&self) -> crate::Result<String> {
        let ordered: Vec<&Mapping> = self
            .entries
            .iter()
            .sorted_by_key(|m| (m.generated, m.original))
            .collect();
        Ok(serde_json::to_string(&ordered)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping(oline: u32, ocol: u32, gline: u32, gcol: u32) -> Mapping {
        Mapping {
            original: Pos::new(oline, ocol),
            generated: Pos::new(gline, gcol),
            length: 1,
            name: None,
        }
    }

    #[test]
    fn insertion_shifts_only_at_or_after() {
        let mut table = MappingTable::new();
        table.push(mapping(1, 1, 2, 1));
        table.push(mapping(2, 5, 4, 3));
        table.push(mapping(3, 1, 9, 1));

        table.adjust_for_insertion(4, 3);

        assert_eq!(table.entries()[0].generated, Pos::new(2, 1));
        assert_eq!(table.entries()[1].generated, Pos::new(7, 3));
        assert_eq!(table.entries()[2].generated, Pos::new(12, 1));
    }

    #[test]
    fn splice_drops_replaced_range() {
        let mut table = MappingTable::new();
        table.push(mapping(1, 1, 2, 1));
        table.push(mapping(2, 1, 3, 1));
        table.push(mapping(3, 1, 5, 1));

        // Replace generated lines 3..4 with four new lines.
        table.adjust_for_splice(3, 1, 4);

        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].generated, Pos::new(2, 1));
        assert_eq!(table.entries()[1].generated, Pos::new(8, 1));
    }

    #[test]
    fn serializes_as_position_tuples() {
        let mut table = MappingTable::new();
        table.push(Mapping {
            original: Pos::new(7, 12),
            generated: Pos::new(9, 5),
            length: 1,
            name: Some("?".to_string()),
        });
        let json = table.to_json().expect("serialize");
        assert_eq!(json, r#"[[7,12,9,5,1,"?"]]"#);
    }
}
