//! Sum-type model shared by the preprocessor and the plugin pipeline:
//! the per-file enum registry and the monomorphized-container registry.

use std::collections::{HashMap, HashSet};

/// The generic containers the transpiler monomorphizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Result,
    Option,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Result => "Result",
            ContainerKind::Option => "Option",
        }
    }

    pub fn from_name(name: &str) -> Option<ContainerKind> {
        match name {
            "Result" => Some(ContainerKind::Result),
            "Option" => Some(ContainerKind::Option),
            _ => None,
        }
    }

    /// Variants in declaration order; payload index into the type args.
    pub fn variants(&self) -> &'static [(&'static str, usize)] {
        match self {
            ContainerKind::Result => &[("Ok", 0), ("Err", 1)],
            ContainerKind::Option => &[("Some", 0)],
        }
    }

    /// All variant names in tag order, including payload-less ones.
    /// `Ok` and `None` hold tag zero.
    pub fn variant_names(&self) -> &'static [&'static str] {
        match self {
            ContainerKind::Result => &["Ok", "Err"],
            ContainerKind::Option => &["None", "Some"],
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            ContainerKind::Result => 2,
            ContainerKind::Option => 1,
        }
    }

    pub fn tag_enum(&self) -> String {
        format!("{}Tag", self.name())
    }
}

/// Tag constant for a variant: `ResultTag_Ok`, `ShapeTag_Circle`, ...
pub fn tag_const(enum_name: &str, variant: &str) -> String {
    format!("{}Tag_{}", enum_name, variant)
}

/// Payload field for a variant: `ok_0`, `circle_1`, ...
pub fn payload_field(variant: &str, index: usize) -> String {
    format!("{}_{}", variant.to_lowercase(), index)
}

/// Mangle one Go type argument into an identifier fragment.
///
/// `int` stays `int`, `*T` becomes `PtrT`, `[]T` becomes `SliceT`,
/// `pkg.T` becomes `pkg_T`.
pub fn mangle_type_arg(arg: &str) -> String {
    let mut out = String::new();
    let mut chars = arg.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => out.push_str("Ptr"),
            '[' if chars.peek() == Some(&']') => {
                chars.next();
                out.push_str("Slice");
            }
            '.' => out.push('_'),
            ch if ch.is_whitespace() => {}
            ch => out.push(ch),
        }
    }
    out
}

/// Canonical monomorphized name for a container instantiation,
/// e.g. `Result_int_error`, `Option_Slicestring`.
pub fn mono_name(kind: ContainerKind, args: &[String]) -> String {
    let mut name = kind.name().to_string();
    for arg in args {
        name.push('_');
        name.push_str(&mangle_type_arg(arg));
    }
    name
}

/// A concrete instantiation of a generic container.
#[derive(Debug, Clone)]
pub struct MonoType {
    pub name: String,
    pub kind: ContainerKind,
    /// Go type text of each type argument, already rewritten (no `<...>`).
    pub args: Vec<String>,
    pub emitted: bool,
}

impl MonoType {
    /// Payload type of `variant`'s field `index`, if the variant carries one.
    pub fn payload_type(&self, variant: &str) -> Option<&str> {
        self.kind
            .variants()
            .iter()
            .find(|(name, _)| *name == variant)
            .and_then(|(_, arg_index)| self.args.get(*arg_index))
            .map(String::as_str)
    }
}

/// Per-file registry of monomorphized container types.
///
/// Owned by the compilation context; requesting the same key twice is a
/// no-op, and `take_unemitted` hands each instantiation out exactly once,
/// in sorted name order for deterministic output.
#[derive(Debug, Default)]
pub struct MonoRegistry {
    by_name: HashMap<String, MonoType>,
    tags_emitted: HashSet<String>,
}

impl MonoRegistry {
    pub fn new() -> MonoRegistry {
        MonoRegistry::default()
    }

    /// Register an instantiation, returning its canonical name.
    pub fn request(&mut self, kind: ContainerKind, args: Vec<String>) -> String {
        let name = mono_name(kind, &args);
        self.by_name.entry(name.clone()).or_insert(MonoType {
            name: name.clone(),
            kind,
            args,
            emitted: false,
        });
        name
    }

    pub fn lookup(&self, name: &str) -> Option<&MonoType> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names of instantiations not yet emitted, sorted, marking them emitted.
    pub fn take_unemitted(&mut self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_name
            .values()
            .filter(|mono| !mono.emitted)
            .map(|mono| mono.name.clone())
            .collect();
        names.sort();
        for name in &names {
            if let Some(mono) = self.by_name.get_mut(name) {
                mono.emitted = true;
            }
        }
        names
    }

    /// Whether the tag enum for `kind` still needs to be emitted; flips the
    /// flag so a second call answers false.
    pub fn claim_tag_enum(&mut self, kind: ContainerKind) -> bool {
        self.tags_emitted.insert(kind.tag_enum())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// One variant of a user-declared or builtin sum type.
#[derive(Debug, Clone)]
pub struct VariantDef {
    pub name: String,
    /// Go type text of each payload slot; empty for unit variants.
    pub payload: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<VariantDef>,
}

impl EnumDef {
    pub fn variant(&self, name: &str) -> Option<&VariantDef> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// Per-file table of the sum types visible to the pipeline: the builtin
/// containers plus every user `enum` declaration.
#[derive(Debug)]
pub struct EnumRegistry {
    enums: HashMap<String, EnumDef>,
    variant_to_enum: HashMap<String, String>,
}

impl EnumRegistry {
    /// A fresh registry with the builtin containers pre-registered. Builtin
    /// payload types are generic; concrete payloads come from the mono
    /// registry, so they are recorded here as empty placeholders.
    pub fn new() -> EnumRegistry {
        let mut registry = EnumRegistry {
            enums: HashMap::new(),
            variant_to_enum: HashMap::new(),
        };
        registry.register(EnumDef {
            name: "Result".to_string(),
            variants: vec![
                VariantDef {
                    name: "Ok".to_string(),
                    payload: vec![String::new()],
                },
                VariantDef {
                    name: "Err".to_string(),
                    payload: vec![String::new()],
                },
            ],
        });
        registry.register(EnumDef {
            name: "Option".to_string(),
            variants: vec![
                VariantDef {
                    name: "None".to_string(),
                    payload: Vec::new(),
                },
                VariantDef {
                    name: "Some".to_string(),
                    payload: vec![String::new()],
                },
            ],
        });
        registry
    }

    pub fn register(&mut self, def: EnumDef) {
        for variant in &def.variants {
            self.variant_to_enum
                .insert(variant.name.clone(), def.name.clone());
        }
        self.enums.insert(def.name.clone(), def);
    }

    pub fn enum_of_variant(&self, variant: &str) -> Option<&EnumDef> {
        let name = self.variant_to_enum.get(variant)?;
        self.enums.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        ContainerKind::from_name(name).is_some()
    }

    /// Variant names of `enum_name` missing from `covered`, formatted for
    /// diagnostics (`Err(_)` for payload variants, `None` for unit ones).
    pub fn missing_variants(&self, enum_name: &str, covered: &HashSet<String>) -> Vec<String> {
        let Some(def) = self.enums.get(enum_name) else {
            return Vec::new();
        };
        def.variants
            .iter()
            .filter(|variant| !covered.contains(&variant.name))
            .map(|variant| {
                if variant.payload.is_empty() {
                    variant.name.clone()
                } else {
                    let wildcards = vec!["_"; variant.payload.len()].join(", ");
                    format!("{}({})", variant.name, wildcards)
                }
            })
            .collect()
    }
}

impl Default for EnumRegistry {
    fn default() -> Self {
        EnumRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mangles_type_args() {
        assert_eq!(mangle_type_arg("int"), "int");
        assert_eq!(mangle_type_arg("*User"), "PtrUser");
        assert_eq!(mangle_type_arg("[]string"), "Slicestring");
        assert_eq!(mangle_type_arg("net.Conn"), "net_Conn");
        assert_eq!(
            mono_name(
                ContainerKind::Result,
                &["int".to_string(), "error".to_string()]
            ),
            "Result_int_error"
        );
    }

    #[test]
    fn registry_emits_each_instantiation_once() {
        let mut registry = MonoRegistry::new();
        let a = registry.request(
            ContainerKind::Result,
            vec!["int".to_string(), "error".to_string()],
        );
        let b = registry.request(
            ContainerKind::Result,
            vec!["int".to_string(), "error".to_string()],
        );
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.take_unemitted(), vec!["Result_int_error"]);
        assert!(registry.take_unemitted().is_empty());

        assert!(registry.claim_tag_enum(ContainerKind::Result));
        assert!(!registry.claim_tag_enum(ContainerKind::Result));
    }

    #[test]
    fn missing_variants_are_formatted() {
        let registry = EnumRegistry::new();
        let covered: HashSet<String> = ["Ok".to_string()].into_iter().collect();
        assert_eq!(
            registry.missing_variants("Result", &covered),
            vec!["Err(_)"]
        );

        let covered: HashSet<String> = ["Some".to_string()].into_iter().collect();
        assert_eq!(registry.missing_variants("Option", &covered), vec!["None"]);
    }
}
