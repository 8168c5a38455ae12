//! Declaration builders for the Inject phase: the monomorphized container
//! struct, its shared tag enum, and the `Is{Variant}` helper methods.

use crate::ast::{
    Block, Decl, DeclConst, DeclFunc, DeclKind, DeclType, Expr, ExprBinary, ExprKind,
    ExprSelector, Field, GoType, IdGen, Param, Stmt, StmtKind, TypeDef, ValueSpec,
};
use crate::types::{payload_field, tag_const, MonoType};

/// `type ResultTag int` plus the iota const block for its variants.
pub fn build_tag_enum(kind: crate::types::ContainerKind, ids: &mut IdGen) -> Vec<Decl> {
    let tag_type = kind.tag_enum();

    let alias = Decl::synthesized(
        ids,
        DeclKind::Type(DeclType {
            name: tag_type.clone(),
            def: TypeDef::Alias(GoType::named("int")),
        }),
    );

    let mut specs = Vec::new();
    for (index, variant) in kind.variant_names().iter().enumerate() {
        let name = tag_const(kind.name(), variant);
        if index == 0 {
            specs.push(ValueSpec {
                names: vec![name],
                ty: Some(GoType::named(tag_type.clone())),
                values: vec![Expr::ident(ids, "iota")],
            });
        } else {
            specs.push(ValueSpec {
                names: vec![name],
                ty: None,
                values: Vec::new(),
            });
        }
    }
    let consts = Decl::synthesized(ids, DeclKind::Const(DeclConst { specs }));

    vec![alias, consts]
}

/// The payload struct for one instantiation: a `tag` field plus a pointer
/// field per payload-carrying variant.
pub fn build_mono_struct(mono: &MonoType, ids: &mut IdGen) -> Decl {
    let mut fields = vec![Field {
        name: "tag".to_string(),
        ty: GoType::named(mono.kind.tag_enum()),
    }];
    for (variant, arg_index) in mono.kind.variants() {
        if let Some(arg) = mono.args.get(*arg_index) {
            fields.push(Field {
                name: payload_field(variant, 0),
                ty: GoType::pointer(GoType::named(arg)),
            });
        }
    }
    Decl::synthesized(
        ids,
        DeclKind::Type(DeclType {
            name: mono.name.clone(),
            def: TypeDef::Struct(fields),
        }),
    )
}

/// `func (r Result_int_error) IsOk() bool { ... }` per variant.
pub fn build_helpers(mono: &MonoType, ids: &mut IdGen) -> Vec<Decl> {
    mono.kind
        .variant_names()
        .iter()
        .map(|variant| {
            let receiver = Param {
                name: "v".to_string(),
                ty: GoType::named(mono.name.clone()),
            };
            let tag_base = Expr::ident(ids, "v");
            let tag_field = Expr::synthesized(
                ids,
                ExprKind::Selector(ExprSelector {
                    base: Box::new(tag_base),
                    field: "tag".to_string(),
                }),
            );
            let tag_value = Expr::ident(ids, tag_const(mono.kind.name(), variant));
            let compare = Expr::synthesized(
                ids,
                ExprKind::Binary(ExprBinary {
                    op: "==".to_string(),
                    lhs: Box::new(tag_field),
                    rhs: Box::new(tag_value),
                }),
            );
            let body = Block {
                stmts: vec![Stmt::synthesized(ids, StmtKind::Return(vec![compare]))],
            };
            Decl::synthesized(
                ids,
                DeclKind::Func(DeclFunc {
                    name: format!("Is{}", variant),
                    receiver: Some(receiver),
                    params: Vec::new(),
                    results: vec![GoType::named("bool")],
                    body,
                }),
            )
        })
        .collect()
}
