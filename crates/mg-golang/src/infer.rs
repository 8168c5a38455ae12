//! Type inference service.
//!
//! Wraps the host type-checker collaborator with a prioritized strategy
//! chain: (a) the checker's per-node table, filtering sentinel results,
//! (b) AST-context inference through the parent index (enclosing return,
//! declared variable type, call parameter slot), (c) literal-syntax
//! heuristics. When every strategy fails the caller gets an explicit
//! `TypeInference` error — never a silent `any`.

use std::collections::HashMap;

use mg_core::error::{Error, Result};
use mg_core::span::{Pos, Span};
use tracing::{debug, warn};

use crate::ast::{
    Block, DeclKind, ElseBranch, Expr, ExprKind, File, GoType, Lit, LitKind, NodeId, Stmt,
    StmtKind,
};
use crate::pipeline::{ExprContext, ParentIndex};
use crate::printer::render_expr;
use crate::types::{payload_field, EnumRegistry, MonoRegistry};

/// Per-node type table produced by the host type-checker collaborator.
#[derive(Debug, Default)]
pub struct TypeTable {
    map: HashMap<NodeId, GoType>,
}

impl TypeTable {
    pub fn new() -> TypeTable {
        TypeTable::default()
    }

    /// Sentinel "invalid"/"unknown" results are dropped here rather than
    /// trusted downstream.
    pub fn insert(&mut self, id: NodeId, ty: GoType) {
        if ty.is_sentinel() {
            debug!("dropping sentinel type for node {id}");
            return;
        }
        self.map.insert(id, ty);
    }

    pub fn get(&self, id: NodeId) -> Option<&GoType> {
        self.map.get(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// What a checker run produced: the table plus the non-fatal conditions
/// it hit along the way.
pub struct CheckOutcome {
    pub table: TypeTable,
    pub warnings: Vec<(Span, String)>,
}

/// The "run the type checker, log but never fail" collaborator.
///
/// A best-effort walk over the parsed file: function signatures seed
/// parameter scopes, statements thread declared and inferred variable
/// types forward, and every expression that can be typed lands in the
/// table. Anything it cannot understand is logged and skipped — the
/// inference chain's later strategies pick up the slack.
pub struct HostTypeChecker<'a> {
    enums: &'a EnumRegistry,
    monos: &'a MonoRegistry,
    func_results: HashMap<String, Vec<GoType>>,
    struct_fields: HashMap<String, HashMap<String, GoType>>,
    warnings: Vec<(Span, String)>,
}

impl<'a> HostTypeChecker<'a> {
    pub fn new(enums: &'a EnumRegistry, monos: &'a MonoRegistry) -> HostTypeChecker<'a> {
        HostTypeChecker {
            enums,
            monos,
            func_results: HashMap::new(),
            struct_fields: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn check(mut self, file: &File) -> CheckOutcome {
        for decl in &file.decls {
            match &decl.kind {
                DeclKind::Func(func) => {
                    self.func_results
                        .insert(func.name.clone(), func.results.clone());
                }
                DeclKind::Type(def) => {
                    if let crate::ast::TypeDef::Struct(fields) = &def.def {
                        let map = fields
                            .iter()
                            .map(|field| (field.name.clone(), field.ty.clone()))
                            .collect();
                        self.struct_fields.insert(def.name.clone(), map);
                    }
                }
                _ => {}
            }
        }

        let mut table = TypeTable::new();
        for decl in &file.decls {
            if let DeclKind::Func(func) = &decl.kind {
                let mut scope: HashMap<String, GoType> = HashMap::new();
                if let Some(receiver) = &func.receiver {
                    scope.insert(receiver.name.clone(), receiver.ty.clone());
                }
                for param in &func.params {
                    scope.insert(param.name.clone(), param.ty.clone());
                }
                self.check_block(&func.body, &mut scope, &mut table);
            }
        }
        CheckOutcome {
            table,
            warnings: self.warnings,
        }
    }

    fn check_block(
        &mut self,
        block: &Block,
        scope: &mut HashMap<String, GoType>,
        table: &mut TypeTable,
    ) {
        for stmt in &block.stmts {
            self.check_stmt(stmt, scope, table);
        }
    }

    fn check_stmt(
        &mut self,
        stmt: &Stmt,
        scope: &mut HashMap<String, GoType>,
        table: &mut TypeTable,
    ) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.type_expr(expr, scope, table);
            }
            StmtKind::Define(define) => {
                for value in &define.values {
                    self.type_expr(value, scope, table);
                }
                if define.names.len() == define.values.len() {
                    for (name, value) in define.names.iter().zip(&define.values) {
                        if let Some(ty) = table.get(value.id).cloned() {
                            scope.insert(name.clone(), ty);
                        } else {
                            debug!("type checker could not resolve `{name}`");
                        }
                    }
                }
            }
            StmtKind::Assign(assign) => {
                for expr in assign.lhs.iter().chain(&assign.rhs) {
                    self.type_expr(expr, scope, table);
                }
            }
            StmtKind::Return(values) => {
                for value in values {
                    self.type_expr(value, scope, table);
                }
            }
            StmtKind::If(stmt_if) => {
                self.type_expr(&stmt_if.cond, scope, table);
                self.check_block(&stmt_if.then, scope, table);
                let mut else_branch = stmt_if.else_branch.as_ref();
                while let Some(branch) = else_branch {
                    match branch {
                        ElseBranch::If(nested) => {
                            self.type_expr(&nested.cond, scope, table);
                            self.check_block(&nested.then, scope, table);
                            else_branch = nested.else_branch.as_ref();
                        }
                        ElseBranch::Block(block) => {
                            self.check_block(block, scope, table);
                            else_branch = None;
                        }
                    }
                }
            }
            StmtKind::Switch(switch) => {
                if let Some(tag) = &switch.tag {
                    self.type_expr(tag, scope, table);
                }
                for case in &switch.cases {
                    for value in &case.values {
                        self.type_expr(value, scope, table);
                    }
                    for stmt in &case.body {
                        self.check_stmt(stmt, scope, table);
                    }
                }
            }
            StmtKind::For(stmt_for) => {
                if let Some(init) = &stmt_for.init {
                    self.check_stmt(init, scope, table);
                }
                if let Some(cond) = &stmt_for.cond {
                    self.type_expr(cond, scope, table);
                }
                if let Some(post) = &stmt_for.post {
                    self.check_stmt(post, scope, table);
                }
                if let Some(range) = &stmt_for.range {
                    self.type_expr(&range.expr, scope, table);
                }
                self.check_block(&stmt_for.body, scope, table);
            }
            StmtKind::IncDec(incdec) => {
                self.type_expr(&incdec.target, scope, table);
            }
            StmtKind::Block(block) => self.check_block(block, scope, table),
            StmtKind::Var(decl) => {
                for spec in &decl.specs {
                    for value in &spec.values {
                        self.type_expr(value, scope, table);
                    }
                    if let Some(ty) = &spec.ty {
                        for name in &spec.names {
                            scope.insert(name.clone(), ty.clone());
                        }
                    }
                }
            }
            StmtKind::Const(decl) => {
                for spec in &decl.specs {
                    for value in &spec.values {
                        self.type_expr(value, scope, table);
                    }
                    if let Some(ty) = &spec.ty {
                        for name in &spec.names {
                            scope.insert(name.clone(), ty.clone());
                        }
                    }
                }
            }
            StmtKind::Branch(_) => {}
            StmtKind::Raw(text) => {
                warn!("type checker skipping opaque statement: {}", text.trim());
                self.warnings.push((
                    stmt.span,
                    "type checker skipped a statement it does not model".to_string(),
                ));
            }
        }
    }

    /// Type one expression tree bottom-up, recording every success.
    fn type_expr(
        &self,
        expr: &Expr,
        scope: &HashMap<String, GoType>,
        table: &mut TypeTable,
    ) -> Option<GoType> {
        let ty = match &expr.kind {
            ExprKind::Ident(name) => scope.get(name).cloned(),
            ExprKind::Lit(lit) => literal_type(lit),
            ExprKind::Paren(inner) => self.type_expr(inner, scope, table),
            ExprKind::Unary(unary) => {
                let operand = self.type_expr(&unary.operand, scope, table);
                match unary.op.as_str() {
                    "&" => operand.map(GoType::pointer),
                    "*" => match operand {
                        Some(GoType::Pointer(inner)) => Some(*inner),
                        _ => None,
                    },
                    "!" => Some(GoType::named("bool")),
                    _ => operand,
                }
            }
            ExprKind::Binary(binary) => {
                let lhs = self.type_expr(&binary.lhs, scope, table);
                let rhs = self.type_expr(&binary.rhs, scope, table);
                match binary.op.as_str() {
                    "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => {
                        Some(GoType::named("bool"))
                    }
                    _ => lhs.or(rhs),
                }
            }
            ExprKind::Call(call) => {
                for arg in &call.args {
                    self.type_expr(arg, scope, table);
                }
                self.type_call(call, scope, table)
            }
            ExprKind::Selector(sel) => {
                let base = self.type_expr(&sel.base, scope, table);
                base.and_then(|base| self.selector_type(&base, &sel.field))
            }
            ExprKind::Index(index) => {
                self.type_expr(&index.index, scope, table);
                match self.type_expr(&index.base, scope, table) {
                    Some(GoType::Slice(elem)) => Some(*elem),
                    Some(GoType::Map(_, value)) => Some(*value),
                    _ => None,
                }
            }
            ExprKind::Composite(lit) => {
                for (_, value) in &lit.fields {
                    self.type_expr(value, scope, table);
                }
                Some(lit.ty.clone())
            }
            ExprKind::FuncLit(_) | ExprKind::Raw(_) => None,
        };
        if let Some(ty) = &ty {
            table.insert(expr.id, ty.clone());
        }
        ty
    }

    fn type_call(
        &self,
        call: &crate::ast::ExprCall,
        _scope: &HashMap<String, GoType>,
        _table: &mut TypeTable,
    ) -> Option<GoType> {
        let name = call.target.ident_name()?;
        if let Some(results) = self.func_results.get(name) {
            return match results.as_slice() {
                [single] => Some(single.clone()),
                _ => None,
            };
        }
        match name {
            // Conversions and the few builtins whose result type is fixed.
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "float32" | "float64" | "string" | "bool" | "rune"
            | "byte" => Some(GoType::named(name)),
            "len" | "cap" => Some(GoType::named("int")),
            _ => None,
        }
    }

    /// Field access on tagged structs (monomorphized containers and user
    /// enums) and on plain declared structs.
    fn selector_type(&self, base: &GoType, field: &str) -> Option<GoType> {
        let name = match base {
            GoType::Named(name) => name.clone(),
            GoType::Pointer(inner) => match inner.as_ref() {
                GoType::Named(name) => name.clone(),
                _ => return None,
            },
            _ => return None,
        };

        if let Some(mono) = self.monos.lookup(&name) {
            if field == "tag" {
                return Some(GoType::named(mono.kind.tag_enum()));
            }
            for (variant, arg_index) in mono.kind.variants() {
                if field == payload_field(variant, 0) {
                    return mono
                        .args
                        .get(*arg_index)
                        .map(|arg| GoType::pointer(GoType::named(arg)));
                }
            }
            return None;
        }

        if let Some(def) = self.enums.get(&name) {
            if !self.enums.is_builtin(&name) {
                if field == "tag" {
                    return Some(GoType::named(format!("{}Tag", name)));
                }
                for variant in &def.variants {
                    for (index, payload) in variant.payload.iter().enumerate() {
                        if field == payload_field(&variant.name, index) {
                            return Some(GoType::pointer(GoType::named(payload)));
                        }
                    }
                }
                return None;
            }
        }

        self.struct_fields.get(&name)?.get(field).cloned()
    }
}

fn literal_type(lit: &Lit) -> Option<GoType> {
    match lit.kind {
        LitKind::Int => Some(GoType::named("int")),
        LitKind::Float => Some(GoType::named("float64")),
        LitKind::Str => Some(GoType::named("string")),
        LitKind::Char => Some(GoType::named("rune")),
        LitKind::Bool => Some(GoType::named("bool")),
        LitKind::Nil => None,
    }
}

/// The prioritized strategy chain over the checker table, the parent
/// index, and literal syntax. Results are memoized per node.
pub struct InferenceService<'a> {
    table: &'a TypeTable,
    parents: &'a ParentIndex,
    monos: &'a MonoRegistry,
    enums: &'a EnumRegistry,
    memo: HashMap<NodeId, Option<GoType>>,
}

impl<'a> InferenceService<'a> {
    pub fn new(
        table: &'a TypeTable,
        parents: &'a ParentIndex,
        monos: &'a MonoRegistry,
        enums: &'a EnumRegistry,
    ) -> InferenceService<'a> {
        InferenceService {
            table,
            parents,
            monos,
            enums,
            memo: HashMap::new(),
        }
    }

    pub fn infer(&mut self, expr: &Expr) -> Option<GoType> {
        if let Some(cached) = self.memo.get(&expr.id) {
            return cached.clone();
        }
        let ty = self.infer_uncached(expr);
        self.memo.insert(expr.id, ty.clone());
        ty
    }

    fn infer_uncached(&self, expr: &Expr) -> Option<GoType> {
        // (a) the host checker's table; sentinels never made it in.
        if let Some(ty) = self.table.get(expr.id) {
            return Some(ty.clone());
        }

        // (b) the context the expression sits in.
        if let Some(ty) = self.infer_by_context(expr.id, 0) {
            return Some(ty);
        }

        // (c) literal syntax.
        if let ExprKind::Lit(lit) = &expr.kind {
            return literal_type(lit);
        }
        None
    }

    /// Context chain by node id alone, so a constructor argument can be
    /// typed from the payload slot of its (not yet rewritten) enclosing
    /// constructor. Depth-bounded against degenerate cycles.
    fn infer_by_context(&self, id: NodeId, depth: usize) -> Option<GoType> {
        if depth > 8 {
            return None;
        }
        if depth > 0 {
            if let Some(ty) = self.table.get(id) {
                return Some(ty.clone());
            }
        }
        match self.parents.context_of(id)? {
            ExprContext::ReturnValue { results, index } => results.get(*index).cloned(),
            ExprContext::VarInit { ty } => Some(ty.clone()),
            ExprContext::AssignTo { lhs } => self.table.get(*lhs).cloned(),
            ExprContext::DefineRhs { .. } => None,
            ExprContext::CallArg {
                callee,
                call,
                index,
                param,
            } => {
                if let Some(param) = param {
                    return Some(param.clone());
                }
                self.constructor_payload(callee, *call, *index, depth)
            }
        }
    }

    /// Payload type of argument `index` when `callee` is a constructor.
    fn constructor_payload(
        &self,
        callee: &str,
        call: NodeId,
        index: usize,
        depth: usize,
    ) -> Option<GoType> {
        if index == 0 && matches!(callee, "Ok" | "Err" | "Some") {
            let container = self.infer_by_context(call, depth + 1)?;
            let GoType::Named(name) = container else {
                return None;
            };
            let mono = self.monos.lookup(&name)?;
            return mono.payload_type(callee).map(GoType::named);
        }
        let def = self.enums.enum_of_variant(callee)?;
        if self.enums.is_builtin(&def.name) {
            return None;
        }
        def.variant(callee)
            .and_then(|variant| variant.payload.get(index))
            .map(GoType::named)
    }

    /// All strategies, or an explicit error naming the expression. Callers
    /// surface this as a compile error suggesting a type annotation; it is
    /// never converted into an untyped container.
    pub fn infer_with_fallback(&mut self, expr: &Expr, pos: Pos) -> Result<GoType> {
        self.infer(expr).ok_or_else(|| Error::TypeInference {
            pos,
            expr: render_expr(expr),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        Block, Decl, DeclFunc, DeclKind, Expr, ExprCall, ExprKind, File, IdGen, Lit, LitKind,
        Stmt, StmtKind,
    };
    use crate::types::{ContainerKind, EnumRegistry, MonoRegistry};
    use pretty_assertions::assert_eq;

    /// `func f() Result_int_error { return Ok(42) }`, built by hand.
    fn sample() -> (File, Expr, Expr) {
        let mut ids = IdGen::new();
        let target = Expr::ident(&mut ids, "Ok");
        let arg = Expr::synthesized(
            &mut ids,
            ExprKind::Lit(Lit {
                kind: LitKind::Int,
                text: "42".to_string(),
            }),
        );
        let arg_clone = arg.clone();
        let call = Expr::synthesized(
            &mut ids,
            ExprKind::Call(ExprCall {
                target: Box::new(target),
                args: vec![arg],
            }),
        );
        let call_clone = call.clone();
        let ret = Stmt::synthesized(&mut ids, StmtKind::Return(vec![call]));
        let func = DeclFunc {
            name: "f".to_string(),
            receiver: None,
            params: Vec::new(),
            results: vec![GoType::named("Result_int_error")],
            body: Block { stmts: vec![ret] },
        };
        let file = File {
            package: "main".to_string(),
            imports: Vec::new(),
            decls: vec![Decl::synthesized(&mut ids, DeclKind::Func(func))],
        };
        (file, call_clone, arg_clone)
    }

    fn registries() -> (MonoRegistry, EnumRegistry) {
        let mut monos = MonoRegistry::new();
        monos.request(
            ContainerKind::Result,
            vec!["int".to_string(), "error".to_string()],
        );
        (monos, EnumRegistry::new())
    }

    #[test]
    fn sentinel_results_are_filtered_not_trusted() {
        let mut table = TypeTable::new();
        table.insert(7, GoType::named("invalid"));
        table.insert(8, GoType::named("any"));
        table.insert(9, GoType::named("int"));
        assert!(table.get(7).is_none());
        assert!(table.get(8).is_none());
        assert_eq!(table.get(9), Some(&GoType::named("int")));
    }

    #[test]
    fn context_inference_resolves_return_position() {
        let (file, call, _) = sample();
        let (monos, enums) = registries();
        let parents = crate::pipeline::ParentIndex::build(&file);
        let table = TypeTable::new();
        let mut svc = InferenceService::new(&table, &parents, &monos, &enums);
        assert_eq!(svc.infer(&call), Some(GoType::named("Result_int_error")));
    }

    #[test]
    fn table_takes_priority_over_context() {
        let (file, call, _) = sample();
        let (monos, enums) = registries();
        let parents = crate::pipeline::ParentIndex::build(&file);
        let mut table = TypeTable::new();
        table.insert(call.id, GoType::named("Result_string_error"));
        let mut svc = InferenceService::new(&table, &parents, &monos, &enums);
        assert_eq!(
            svc.infer(&call),
            Some(GoType::named("Result_string_error"))
        );
    }

    #[test]
    fn constructor_argument_resolves_through_payload_slot() {
        let (file, _, arg) = sample();
        let (monos, enums) = registries();
        let parents = crate::pipeline::ParentIndex::build(&file);
        let table = TypeTable::new();
        let mut svc = InferenceService::new(&table, &parents, &monos, &enums);
        // The argument's own context chain: CallArg of `Ok` → payload slot
        // of Result_int_error → int (ahead of the literal heuristic).
        assert_eq!(svc.infer(&arg), Some(GoType::named("int")));
    }

    #[test]
    fn exhausted_chain_is_an_explicit_error() {
        let (file, _, _) = sample();
        let (monos, enums) = registries();
        let parents = crate::pipeline::ParentIndex::build(&file);
        let table = TypeTable::new();
        let mut svc = InferenceService::new(&table, &parents, &monos, &enums);

        let mut ids = IdGen::new();
        let orphan = Expr::ident(&mut ids, "mystery");
        let err = svc
            .infer_with_fallback(&orphan, Pos::new(3, 9))
            .unwrap_err();
        match err {
            Error::TypeInference { expr, pos } => {
                assert_eq!(expr, "mystery");
                assert_eq!(pos, Pos::new(3, 9));
            }
            other => panic!("expected type inference error, got: {other}"),
        }
    }
}
