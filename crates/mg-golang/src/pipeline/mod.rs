//! AST plugin pipeline: Discovery → Transform → Inject over the parsed
//! host AST.
//!
//! Plugins take every dependency — parent index, type table, temp counter,
//! registries, match records — from the shared per-file context. A plugin
//! whose dependency was never attached fails loudly at the access site
//! instead of silently skipping work.

pub mod constructors;
pub mod inject;
pub mod match_check;

use std::collections::HashMap;

use mg_core::error::Result;

use crate::ast::{Block, DeclKind, ElseBranch, Expr, ExprKind, File, GoType, NodeId, Stmt, StmtKind};
use crate::context::FileContext;

/// Three-phase contract. Discovery is a read-only scan that builds
/// indices; Transform replaces matched subtrees; Inject appends
/// declarations exactly once per key.
pub trait Plugin {
    fn name(&self) -> &'static str;

    fn discover(&mut self, file: &File, ctx: &mut FileContext) -> Result<()>;

    fn transform(&mut self, file: &mut File, ctx: &mut FileContext) -> Result<()>;

    fn inject(&mut self, file: &mut File, ctx: &mut FileContext) -> Result<()>;
}

/// Run every plugin through the three phases, one phase at a time.
pub fn run_plugins(
    plugins: &mut [Box<dyn Plugin>],
    file: &mut File,
    ctx: &mut FileContext,
) -> Result<()> {
    for plugin in plugins.iter_mut() {
        tracing::debug!("plugin {}: discovery", plugin.name());
        plugin.discover(file, ctx)?;
    }
    for plugin in plugins.iter_mut() {
        tracing::debug!("plugin {}: transform", plugin.name());
        plugin.transform(file, ctx)?;
    }
    for plugin in plugins.iter_mut() {
        tracing::debug!("plugin {}: inject", plugin.name());
        plugin.inject(file, ctx)?;
    }
    Ok(())
}

/// The syntactic slot an expression occupies, precomputed so later phases
/// can answer "what does the enclosing statement expect here?" without
/// chasing pointers through the tree.
#[derive(Debug, Clone)]
pub enum ExprContext {
    /// `return <expr>` at result position `index` of a function declaring
    /// `results`.
    ReturnValue { results: Vec<GoType>, index: usize },
    /// `var x T = <expr>`.
    VarInit { ty: GoType },
    /// Argument `index` of a call to `callee`; `param` is the declared
    /// parameter type when the callee is a function declared in this file.
    /// The call's own node id lets inference resolve constructor payloads.
    CallArg {
        callee: String,
        call: NodeId,
        index: usize,
        param: Option<GoType>,
    },
    /// `lhs = <expr>`; the target's type lives in the checker table.
    AssignTo { lhs: NodeId },
    /// `name := <expr>`.
    DefineRhs { name: String },
}

/// Parent-pointer map flattened into per-expression context entries.
#[derive(Debug, Default)]
pub struct ParentIndex {
    ctx_of: HashMap<NodeId, ExprContext>,
}

impl ParentIndex {
    pub fn build(file: &File) -> ParentIndex {
        let mut func_params: HashMap<String, Vec<GoType>> = HashMap::new();
        for decl in &file.decls {
            if let DeclKind::Func(func) = &decl.kind {
                func_params.insert(
                    func.name.clone(),
                    func.params.iter().map(|param| param.ty.clone()).collect(),
                );
            }
        }

        let mut index = ParentIndex::default();
        for decl in &file.decls {
            if let DeclKind::Func(func) = &decl.kind {
                index_block(&func.body, &func.results, &func_params, &mut index);
            }
        }
        index
    }

    fn set(&mut self, id: NodeId, context: ExprContext) {
        self.ctx_of.entry(id).or_insert(context);
    }

    pub fn context_of(&self, id: NodeId) -> Option<&ExprContext> {
        self.ctx_of.get(&id)
    }

    pub fn len(&self) -> usize {
        self.ctx_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctx_of.is_empty()
    }
}

fn index_block(
    block: &Block,
    results: &[GoType],
    func_params: &HashMap<String, Vec<GoType>>,
    index: &mut ParentIndex,
) {
    for stmt in &block.stmts {
        index_stmt(stmt, results, func_params, index);
    }
}

fn index_stmt(
    stmt: &Stmt,
    results: &[GoType],
    func_params: &HashMap<String, Vec<GoType>>,
    index: &mut ParentIndex,
) {
    match &stmt.kind {
        StmtKind::Return(values) => {
            for (i, value) in values.iter().enumerate() {
                index.set(
                    value.id,
                    ExprContext::ReturnValue {
                        results: results.to_vec(),
                        index: i,
                    },
                );
                index_call_args(value, func_params, index);
            }
        }
        StmtKind::Define(define) => {
            if define.names.len() == define.values.len() {
                for (name, value) in define.names.iter().zip(&define.values) {
                    index.set(
                        value.id,
                        ExprContext::DefineRhs {
                            name: name.clone(),
                        },
                    );
                }
            }
            for value in &define.values {
                index_call_args(value, func_params, index);
            }
        }
        StmtKind::Assign(assign) => {
            if assign.lhs.len() == assign.rhs.len() {
                for (lhs, rhs) in assign.lhs.iter().zip(&assign.rhs) {
                    index.set(rhs.id, ExprContext::AssignTo { lhs: lhs.id });
                }
            }
            for expr in assign.lhs.iter().chain(&assign.rhs) {
                index_call_args(expr, func_params, index);
            }
        }
        StmtKind::Expr(expr) => index_call_args(expr, func_params, index),
        StmtKind::If(stmt_if) => {
            index_call_args(&stmt_if.cond, func_params, index);
            index_block(&stmt_if.then, results, func_params, index);
            let mut else_branch = stmt_if.else_branch.as_ref();
            while let Some(branch) = else_branch {
                match branch {
                    ElseBranch::If(nested) => {
                        index_call_args(&nested.cond, func_params, index);
                        index_block(&nested.then, results, func_params, index);
                        else_branch = nested.else_branch.as_ref();
                    }
                    ElseBranch::Block(block) => {
                        index_block(block, results, func_params, index);
                        else_branch = None;
                    }
                }
            }
        }
        StmtKind::Switch(switch) => {
            if let Some(tag) = &switch.tag {
                index_call_args(tag, func_params, index);
            }
            for case in &switch.cases {
                for stmt in &case.body {
                    index_stmt(stmt, results, func_params, index);
                }
            }
        }
        StmtKind::For(stmt_for) => {
            if let Some(init) = &stmt_for.init {
                index_stmt(init, results, func_params, index);
            }
            if let Some(cond) = &stmt_for.cond {
                index_call_args(cond, func_params, index);
            }
            if let Some(post) = &stmt_for.post {
                index_stmt(post, results, func_params, index);
            }
            index_block(&stmt_for.body, results, func_params, index);
        }
        StmtKind::Block(block) => index_block(block, results, func_params, index),
        StmtKind::IncDec(_) | StmtKind::Branch(_) | StmtKind::Raw(_) => {}
        StmtKind::Var(_) | StmtKind::Const(_) => {}
    }

    // Local declarations with an explicit type give their initializers a
    // context.
    let specs = match &stmt.kind {
        StmtKind::Var(decl) => Some(&decl.specs),
        StmtKind::Const(decl) => Some(&decl.specs),
        _ => None,
    };
    if let Some(specs) = specs {
        for spec in specs {
            for value in &spec.values {
                if let Some(ty) = &spec.ty {
                    index.set(value.id, ExprContext::VarInit { ty: ty.clone() });
                }
                index_call_args(value, func_params, index);
            }
        }
    }
}

/// Give every call argument in the expression tree its parameter-slot
/// context.
fn index_call_args(
    expr: &Expr,
    func_params: &HashMap<String, Vec<GoType>>,
    index: &mut ParentIndex,
) {
    if let ExprKind::Call(call) = &expr.kind {
        if let Some(name) = call.target.ident_name() {
            for (i, arg) in call.args.iter().enumerate() {
                let param = func_params
                    .get(name)
                    .and_then(|params| params.get(i))
                    .cloned();
                index.set(
                    arg.id,
                    ExprContext::CallArg {
                        callee: name.to_string(),
                        call: expr.id,
                        index: i,
                        param,
                    },
                );
            }
        }
    }
    match &expr.kind {
        ExprKind::Call(call) => {
            index_call_args(&call.target, func_params, index);
            for arg in &call.args {
                index_call_args(arg, func_params, index);
            }
        }
        ExprKind::Selector(sel) => index_call_args(&sel.base, func_params, index),
        ExprKind::Unary(unary) => index_call_args(&unary.operand, func_params, index),
        ExprKind::Binary(binary) => {
            index_call_args(&binary.lhs, func_params, index);
            index_call_args(&binary.rhs, func_params, index);
        }
        ExprKind::Index(idx) => {
            index_call_args(&idx.base, func_params, index);
            index_call_args(&idx.index, func_params, index);
        }
        ExprKind::Paren(inner) => index_call_args(inner, func_params, index),
        ExprKind::Composite(lit) => {
            for (_, value) in &lit.fields {
                index_call_args(value, func_params, index);
            }
        }
        ExprKind::FuncLit(func) => {
            for stmt in &func.body.stmts {
                index_stmt(stmt, &func.results, func_params, index);
            }
        }
        ExprKind::Ident(_) | ExprKind::Lit(_) | ExprKind::Raw(_) => {}
    }
}
