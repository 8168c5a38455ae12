//! Sum-type constructor rewriting.
//!
//! Discovery finds `Ok`/`Err`/`Some` calls, bare `None` references, and
//! user-enum variant constructors — validating structural shape (argument
//! count, expression position) and skipping names shadowed by user
//! declarations, so an unrelated identifier is never rewritten. Transform
//! replaces each candidate with a composite literal of the monomorphized
//! container, payloads wrapped through the hygiene module. Inject emits
//! every registered instantiation exactly once.

use std::collections::{HashMap, HashSet};

use mg_core::error::{Error, Result};
use tracing::debug;

use crate::ast::{
    visit_exprs, visit_exprs_mut, DeclKind, Expr, ExprComposite, ExprKind, File, GoType, NodeId,
    StmtKind,
};
use crate::context::FileContext;
use crate::hygiene::address_of;
use crate::pipeline::{inject, ParentIndex, Plugin};
use crate::printer::render_expr;
use crate::types::{payload_field, tag_const, ContainerKind};

#[derive(Debug, Clone)]
enum Candidate {
    /// `Ok(x)`, `Err(e)`, `Some(v)` — payload-carrying builtin.
    ContainerCall { kind: ContainerKind, variant: String },
    /// Bare `None`.
    ContainerUnit { kind: ContainerKind, variant: String },
    /// `Circle(radius)` for a user enum.
    UserCall { enum_name: String, variant: String },
    /// Bare `Point` for a user enum.
    UserUnit { enum_name: String, variant: String },
}

#[derive(Default)]
pub struct ConstructorPlugin {
    candidates: HashMap<NodeId, Candidate>,
}

impl ConstructorPlugin {
    pub fn new() -> ConstructorPlugin {
        ConstructorPlugin::default()
    }
}

impl Plugin for ConstructorPlugin {
    fn name(&self) -> &'static str {
        "constructors"
    }

    fn discover(&mut self, file: &File, ctx: &mut FileContext) -> Result<()> {
        ctx.attach_parents(ParentIndex::build(file));

        let shadowed = shadowed_names(file);

        // Identifiers consumed by an enclosing form are not value uses:
        // call targets are constructor syntax, not unit references.
        let mut consumed: HashSet<NodeId> = HashSet::new();
        visit_exprs(file, &mut |expr| {
            match &expr.kind {
                ExprKind::Call(call) => {
                    consumed.insert(call.target.id);
                }
                ExprKind::Selector(sel) => {
                    // `x.Some` is a field access, never a constructor.
                    consumed.insert(sel.base.id);
                }
                _ => {}
            }
        });

        let mut candidates = HashMap::new();
        visit_exprs(file, &mut |expr| match &expr.kind {
            ExprKind::Call(call) => {
                let Some(name) = call.target.ident_name() else {
                    return;
                };
                if shadowed.contains(name) {
                    return;
                }
                match name {
                    "Ok" | "Err" | "Some" => {
                        // Structural shape: exactly one payload argument.
                        if call.args.len() != 1 {
                            debug!("skipping `{name}` call with {} args", call.args.len());
                            return;
                        }
                        let kind = if name == "Some" {
                            ContainerKind::Option
                        } else {
                            ContainerKind::Result
                        };
                        candidates.insert(
                            expr.id,
                            Candidate::ContainerCall {
                                kind,
                                variant: name.to_string(),
                            },
                        );
                    }
                    _ => {
                        let Some(def) = ctx.enums.enum_of_variant(name) else {
                            return;
                        };
                        if ctx.enums.is_builtin(&def.name) {
                            return;
                        }
                        let arity = def
                            .variant(name)
                            .map(|variant| variant.payload.len())
                            .unwrap_or(0);
                        if arity == 0 || call.args.len() != arity {
                            debug!("skipping `{name}` call: wrong payload count");
                            return;
                        }
                        candidates.insert(
                            expr.id,
                            Candidate::UserCall {
                                enum_name: def.name.clone(),
                                variant: name.to_string(),
                            },
                        );
                    }
                }
            }
            ExprKind::Ident(name) => {
                if consumed.contains(&expr.id) || shadowed.contains(name) {
                    return;
                }
                if name == "None" {
                    candidates.insert(
                        expr.id,
                        Candidate::ContainerUnit {
                            kind: ContainerKind::Option,
                            variant: "None".to_string(),
                        },
                    );
                    return;
                }
                let Some(def) = ctx.enums.enum_of_variant(name) else {
                    return;
                };
                if ctx.enums.is_builtin(&def.name) {
                    return;
                }
                let is_unit = def
                    .variant(name)
                    .map(|variant| variant.payload.is_empty())
                    .unwrap_or(false);
                if is_unit {
                    candidates.insert(
                        expr.id,
                        Candidate::UserUnit {
                            enum_name: def.name.clone(),
                            variant: name.to_string(),
                        },
                    );
                }
            }
            _ => {},
        });

        self.candidates = candidates;
        Ok(())
    }

    fn transform(&mut self, file: &mut File, ctx: &mut FileContext) -> Result<()> {
        if self.candidates.is_empty() {
            return Ok(());
        }

        // The inference service borrows the table and index; detach them so
        // the walk below can borrow the context's counters mutably.
        let types = ctx.take_types()?;
        let parents = ctx.take_parents()?;

        let pos_source = ctx
            .preprocessed
            .clone()
            .unwrap_or_else(|| ctx.source.clone());
        let line_origins = ctx.line_origins.clone();
        let pos_of = |offset: u32| {
            let pos = pos_source.line_col(offset);
            match line_origins
                .get(pos.line as usize - 1)
                .copied()
                .flatten()
            {
                Some(origin) => mg_core::span::Pos::new(origin.line, pos.column),
                None => pos,
            }
        };

        let candidates = std::mem::take(&mut self.candidates);
        let mut failure: Option<Error> = None;

        {
            let monos = &ctx.monos;
            let enums = &ctx.enums;
            let temps = &mut ctx.temps;
            let ids = &mut ctx.ids;
            let mut svc = crate::infer::InferenceService::new(&types, &parents, monos, enums);

            visit_exprs_mut(file, &mut |expr| {
                if failure.is_some() {
                    return;
                }
                let Some(candidate) = candidates.get(&expr.id) else {
                    return;
                };
                let pos = pos_of(expr.span.lo);

                let rewritten = match candidate {
                    Candidate::ContainerCall { kind, variant } => {
                        let container = match svc.infer_with_fallback(expr, pos) {
                            Ok(ty) => ty,
                            Err(err) => {
                                failure = Some(err);
                                return;
                            }
                        };
                        let GoType::Named(mono_name) = &container else {
                            failure = Some(Error::TypeInference {
                                pos,
                                expr: render_expr(expr),
                            });
                            return;
                        };
                        let Some(mono) = monos.lookup(mono_name).cloned() else {
                            failure = Some(Error::TypeInference {
                                pos,
                                expr: render_expr(expr),
                            });
                            return;
                        };
                        if mono.kind != *kind {
                            failure = Some(Error::generic(format!(
                                "constructor `{}` at {} does not belong to `{}`",
                                variant, pos, mono_name
                            )));
                            return;
                        }
                        let Some(payload_ty) = mono.payload_type(variant).map(GoType::named)
                        else {
                            failure = Some(Error::TypeInference {
                                pos,
                                expr: render_expr(expr),
                            });
                            return;
                        };

                        let ExprKind::Call(call) = &mut expr.kind else {
                            return;
                        };
                        let payload = call.args.remove(0);
                        let wrapped = address_of(payload, &payload_ty, temps, ids);
                        build_composite(
                            ids,
                            mono_name.clone(),
                            tag_const(kind.name(), variant),
                            vec![(payload_field(variant, 0), wrapped)],
                        )
                    }
                    Candidate::ContainerUnit { kind, variant } => {
                        let container = match svc.infer_with_fallback(expr, pos) {
                            Ok(ty) => ty,
                            Err(err) => {
                                failure = Some(err);
                                return;
                            }
                        };
                        let GoType::Named(mono_name) = &container else {
                            failure = Some(Error::TypeInference {
                                pos,
                                expr: render_expr(expr),
                            });
                            return;
                        };
                        if !monos.contains(mono_name) {
                            failure = Some(Error::TypeInference {
                                pos,
                                expr: render_expr(expr),
                            });
                            return;
                        }
                        build_composite(
                            ids,
                            mono_name.clone(),
                            tag_const(kind.name(), variant),
                            Vec::new(),
                        )
                    }
                    Candidate::UserCall { enum_name, variant } => {
                        let payload_types: Vec<GoType> = enums
                            .get(enum_name)
                            .and_then(|def| def.variant(variant))
                            .map(|v| v.payload.iter().map(GoType::named).collect())
                            .unwrap_or_default();
                        let ExprKind::Call(call) = &mut expr.kind else {
                            return;
                        };
                        let args: Vec<Expr> = call.args.drain(..).collect();
                        let mut fields = Vec::new();
                        for (i, (arg, ty)) in
                            args.into_iter().zip(payload_types.iter()).enumerate()
                        {
                            let wrapped = address_of(arg, ty, temps, ids);
                            fields.push((payload_field(variant, i), wrapped));
                        }
                        build_composite(
                            ids,
                            enum_name.clone(),
                            tag_const(enum_name, variant),
                            fields,
                        )
                    }
                    Candidate::UserUnit { enum_name, variant } => build_composite(
                        ids,
                        enum_name.clone(),
                        tag_const(enum_name, variant),
                        Vec::new(),
                    ),
                };

                expr.kind = rewritten;
            });
        }

        ctx.attach_types(types);
        ctx.attach_parents(parents);

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn inject(&mut self, file: &mut File, ctx: &mut FileContext) -> Result<()> {
        let names = ctx.monos.take_unemitted();
        for name in names {
            let Some(mono) = ctx.monos.lookup(&name).cloned() else {
                continue;
            };
            if ctx.monos.claim_tag_enum(mono.kind) {
                file.decls
                    .extend(inject::build_tag_enum(mono.kind, &mut ctx.ids));
            }
            file.decls.push(inject::build_mono_struct(&mono, &mut ctx.ids));
            file.decls.extend(inject::build_helpers(&mono, &mut ctx.ids));
        }
        Ok(())
    }
}

fn build_composite(
    ids: &mut crate::ast::IdGen,
    type_name: String,
    tag: String,
    payload_fields: Vec<(String, Expr)>,
) -> ExprKind {
    let mut fields = vec![(
        Some("tag".to_string()),
        Expr::ident(ids, tag),
    )];
    for (name, value) in payload_fields {
        fields.push((Some(name), value));
    }
    ExprKind::Composite(ExprComposite {
        ty: GoType::Named(type_name),
        fields,
    })
}

/// Names the user declared; a declaration always wins over a constructor
/// reading of the same identifier.
fn shadowed_names(file: &File) -> HashSet<String> {
    let mut names = HashSet::new();
    for decl in &file.decls {
        match &decl.kind {
            DeclKind::Func(func) => {
                names.insert(func.name.clone());
                for param in &func.params {
                    names.insert(param.name.clone());
                }
            }
            DeclKind::Const(c) => {
                for spec in &c.specs {
                    names.extend(spec.names.iter().cloned());
                }
            }
            DeclKind::Var(v) => {
                for spec in &v.specs {
                    names.extend(spec.names.iter().cloned());
                }
            }
            _ => {}
        }
    }
    // Local defines shadow too.
    for decl in &file.decls {
        if let DeclKind::Func(func) = &decl.kind {
            collect_defines(&func.body, &mut names);
        }
    }
    names
}

fn collect_defines(block: &crate::ast::Block, names: &mut HashSet<String>) {
    for stmt in &block.stmts {
        collect_defines_stmt(stmt, names);
    }
}

fn collect_defines_stmt(stmt: &crate::ast::Stmt, names: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::Define(define) => {
            names.extend(define.names.iter().cloned());
        }
        StmtKind::Var(decl) => {
            for spec in &decl.specs {
                names.extend(spec.names.iter().cloned());
            }
        }
        StmtKind::Const(decl) => {
            for spec in &decl.specs {
                names.extend(spec.names.iter().cloned());
            }
        }
        StmtKind::If(stmt_if) => {
            collect_defines(&stmt_if.then, names);
            let mut else_branch = stmt_if.else_branch.as_ref();
            while let Some(branch) = else_branch {
                match branch {
                    crate::ast::ElseBranch::If(nested) => {
                        collect_defines(&nested.then, names);
                        else_branch = nested.else_branch.as_ref();
                    }
                    crate::ast::ElseBranch::Block(block) => {
                        collect_defines(block, names);
                        else_branch = None;
                    }
                }
            }
        }
        StmtKind::Switch(switch) => {
            for case in &switch.cases {
                for stmt in &case.body {
                    collect_defines_stmt(stmt, names);
                }
            }
        }
        StmtKind::For(stmt_for) => {
            if let Some(init) = &stmt_for.init {
                collect_defines_stmt(init, names);
            }
            collect_defines(&stmt_for.body, names);
        }
        StmtKind::Block(block) => collect_defines(block, names),
        _ => {}
    }
}
