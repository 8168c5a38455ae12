//! Compact Go AST the pipeline rewrites.
//!
//! This models the subset of Go the plugin pipeline needs to understand:
//! declarations, the statement forms the preprocessor generates, and the
//! expression forms constructor rewriting touches. Everything outside the
//! subset round-trips through `Raw` nodes carrying verbatim source text, so
//! unmodeled constructs are preserved instead of dropped.

use mg_core::span::Span;

pub type NodeId = u32;
pub type BExpr = Box<Expr>;

/// Hands out node ids, continuing across parse and synthesis so the type
/// table and parent index never see a collision.
#[derive(Debug, Clone)]
pub struct IdGen {
    next: NodeId,
}

impl Default for IdGen {
    fn default() -> Self {
        IdGen::new()
    }
}

impl IdGen {
    pub fn new() -> IdGen {
        // Id 0 is reserved for "no node".
        IdGen { next: 1 }
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Default)]
pub struct File {
    pub package: String,
    pub imports: Vec<String>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub span: Span,
    pub kind: DeclKind,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Func(DeclFunc),
    Type(DeclType),
    Const(DeclConst),
    Var(DeclVar),
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct DeclFunc {
    pub name: String,
    pub receiver: Option<Param>,
    pub params: Vec<Param>,
    pub results: Vec<GoType>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: GoType,
}

#[derive(Debug, Clone)]
pub struct DeclType {
    pub name: String,
    pub def: TypeDef,
}

#[derive(Debug, Clone)]
pub enum TypeDef {
    Struct(Vec<Field>),
    Alias(GoType),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: GoType,
}

#[derive(Debug, Clone)]
pub struct DeclConst {
    pub specs: Vec<ValueSpec>,
}

#[derive(Debug, Clone)]
pub struct DeclVar {
    pub specs: Vec<ValueSpec>,
}

/// One `name [Type] [= value]` spec of a const/var declaration.
#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<GoType>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    /// `names := values`
    Define(StmtDefine),
    /// `lhs <op>= rhs`
    Assign(StmtAssign),
    Return(Vec<Expr>),
    If(StmtIf),
    Switch(StmtSwitch),
    For(StmtFor),
    IncDec(StmtIncDec),
    Branch(StmtBranch),
    Block(Block),
    Var(DeclVar),
    Const(DeclConst),
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct StmtDefine {
    pub names: Vec<String>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct StmtAssign {
    pub lhs: Vec<Expr>,
    /// The assignment operator token, e.g. `=` or `+=`.
    pub op: String,
    pub rhs: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct StmtIf {
    pub cond: Expr,
    pub then: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone)]
pub enum ElseBranch {
    If(Box<StmtIf>),
    Block(Block),
}

#[derive(Debug, Clone)]
pub struct StmtSwitch {
    pub tag: Option<Expr>,
    pub cases: Vec<SwitchCase>,
}

/// An empty `values` list is the `default` case.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct StmtFor {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    /// `for k, v := range x` when set; init/cond/post are empty then.
    pub range: Option<RangeClause>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct RangeClause {
    pub key: Option<String>,
    pub value: Option<String>,
    pub expr: BExpr,
}

#[derive(Debug, Clone)]
pub struct StmtIncDec {
    pub target: Expr,
    pub inc: bool,
}

#[derive(Debug, Clone)]
pub struct StmtBranch {
    pub keyword: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(String),
    Lit(Lit),
    Selector(ExprSelector),
    Call(ExprCall),
    Composite(ExprComposite),
    Unary(ExprUnary),
    Binary(ExprBinary),
    Index(ExprIndex),
    Paren(BExpr),
    FuncLit(ExprFuncLit),
    Raw(String),
}

/// Literal token, kept verbatim so printing is lossless.
#[derive(Debug, Clone)]
pub struct Lit {
    pub kind: LitKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Str,
    Char,
    Nil,
    Bool,
}

#[derive(Debug, Clone)]
pub struct ExprSelector {
    pub base: BExpr,
    pub field: String,
}

#[derive(Debug, Clone)]
pub struct ExprCall {
    pub target: BExpr,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct ExprComposite {
    pub ty: GoType,
    pub fields: Vec<(Option<String>, Expr)>,
}

#[derive(Debug, Clone)]
pub struct ExprUnary {
    /// Operator token, e.g. `&`, `*`, `-`, `!`.
    pub op: String,
    pub operand: BExpr,
}

#[derive(Debug, Clone)]
pub struct ExprBinary {
    pub op: String,
    pub lhs: BExpr,
    pub rhs: BExpr,
}

#[derive(Debug, Clone)]
pub struct ExprIndex {
    pub base: BExpr,
    pub index: BExpr,
}

#[derive(Debug, Clone)]
pub struct ExprFuncLit {
    pub params: Vec<Param>,
    pub results: Vec<GoType>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GoType {
    Named(String),
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    Map(Box<GoType>, Box<GoType>),
    Raw(String),
}

impl GoType {
    pub fn named(name: impl Into<String>) -> GoType {
        GoType::Named(name.into())
    }

    pub fn pointer(inner: GoType) -> GoType {
        GoType::Pointer(Box::new(inner))
    }

    /// The sentinel results a degraded type check can produce. These are
    /// filtered rather than trusted by the inference chain.
    pub fn is_sentinel(&self) -> bool {
        matches!(
            self,
            GoType::Named(name) if name == "invalid" || name == "unknown" || name == "any"
        )
    }
}

impl std::fmt::Display for GoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoType::Named(name) => write!(f, "{}", name),
            GoType::Pointer(inner) => write!(f, "*{}", inner),
            GoType::Slice(elem) => write!(f, "[]{}", elem),
            GoType::Map(key, value) => write!(f, "map[{}]{}", key, value),
            GoType::Raw(text) => write!(f, "{}", text),
        }
    }
}

impl Expr {
    pub fn new(id: NodeId, span: Span, kind: ExprKind) -> Expr {
        Expr { id, span, kind }
    }

    pub fn synthesized(ids: &mut IdGen, kind: ExprKind) -> Expr {
        Expr {
            id: ids.fresh(),
            span: Span::null(),
            kind,
        }
    }

    pub fn ident(ids: &mut IdGen, name: impl Into<String>) -> Expr {
        Expr::synthesized(ids, ExprKind::Ident(name.into()))
    }

    pub fn ident_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

impl Stmt {
    pub fn synthesized(ids: &mut IdGen, kind: StmtKind) -> Stmt {
        Stmt {
            id: ids.fresh(),
            span: Span::null(),
            kind,
        }
    }
}

impl Decl {
    pub fn synthesized(ids: &mut IdGen, kind: DeclKind) -> Decl {
        Decl {
            id: ids.fresh(),
            span: Span::null(),
            kind,
        }
    }
}

/// Apply `visit` to every expression in the file, innermost first,
/// read-only.
pub fn visit_exprs(file: &File, visit: &mut dyn FnMut(&Expr)) {
    for decl in &file.decls {
        visit_decl_exprs(decl, visit);
    }
}

fn visit_decl_exprs(decl: &Decl, visit: &mut dyn FnMut(&Expr)) {
    match &decl.kind {
        DeclKind::Func(func) => visit_block_exprs(&func.body, visit),
        DeclKind::Const(c) => {
            for spec in &c.specs {
                for value in &spec.values {
                    visit_expr(value, visit);
                }
            }
        }
        DeclKind::Var(v) => {
            for spec in &v.specs {
                for value in &spec.values {
                    visit_expr(value, visit);
                }
            }
        }
        DeclKind::Type(_) | DeclKind::Raw(_) => {}
    }
}

pub fn visit_block_exprs(block: &Block, visit: &mut dyn FnMut(&Expr)) {
    for stmt in &block.stmts {
        visit_stmt_exprs(stmt, visit);
    }
}

fn visit_stmt_exprs(stmt: &Stmt, visit: &mut dyn FnMut(&Expr)) {
    match &stmt.kind {
        StmtKind::Expr(expr) => visit_expr(expr, visit),
        StmtKind::Define(define) => {
            for value in &define.values {
                visit_expr(value, visit);
            }
        }
        StmtKind::Assign(assign) => {
            for expr in assign.lhs.iter().chain(assign.rhs.iter()) {
                visit_expr(expr, visit);
            }
        }
        StmtKind::Return(values) => {
            for value in values {
                visit_expr(value, visit);
            }
        }
        StmtKind::If(stmt_if) => visit_if_exprs(stmt_if, visit),
        StmtKind::Switch(switch) => {
            if let Some(tag) = &switch.tag {
                visit_expr(tag, visit);
            }
            for case in &switch.cases {
                for value in &case.values {
                    visit_expr(value, visit);
                }
                for stmt in &case.body {
                    visit_stmt_exprs(stmt, visit);
                }
            }
        }
        StmtKind::For(stmt_for) => {
            if let Some(init) = &stmt_for.init {
                visit_stmt_exprs(init, visit);
            }
            if let Some(cond) = &stmt_for.cond {
                visit_expr(cond, visit);
            }
            if let Some(post) = &stmt_for.post {
                visit_stmt_exprs(post, visit);
            }
            if let Some(range) = &stmt_for.range {
                visit_expr(&range.expr, visit);
            }
            visit_block_exprs(&stmt_for.body, visit);
        }
        StmtKind::IncDec(incdec) => visit_expr(&incdec.target, visit),
        StmtKind::Block(block) => visit_block_exprs(block, visit),
        StmtKind::Var(decl) => visit_spec_exprs(&decl.specs, visit),
        StmtKind::Const(decl) => visit_spec_exprs(&decl.specs, visit),
        StmtKind::Branch(_) | StmtKind::Raw(_) => {}
    }
}

fn visit_spec_exprs(specs: &[ValueSpec], visit: &mut dyn FnMut(&Expr)) {
    for spec in specs {
        for value in &spec.values {
            visit_expr(value, visit);
        }
    }
}

fn visit_if_exprs(stmt_if: &StmtIf, visit: &mut dyn FnMut(&Expr)) {
    visit_expr(&stmt_if.cond, visit);
    visit_block_exprs(&stmt_if.then, visit);
    match &stmt_if.else_branch {
        Some(ElseBranch::If(nested)) => visit_if_exprs(nested, visit),
        Some(ElseBranch::Block(block)) => visit_block_exprs(block, visit),
        None => {}
    }
}

pub fn visit_expr(expr: &Expr, visit: &mut dyn FnMut(&Expr)) {
    match &expr.kind {
        ExprKind::Selector(sel) => visit_expr(&sel.base, visit),
        ExprKind::Call(call) => {
            visit_expr(&call.target, visit);
            for arg in &call.args {
                visit_expr(arg, visit);
            }
        }
        ExprKind::Composite(lit) => {
            for (_, value) in &lit.fields {
                visit_expr(value, visit);
            }
        }
        ExprKind::Unary(unary) => visit_expr(&unary.operand, visit),
        ExprKind::Binary(binary) => {
            visit_expr(&binary.lhs, visit);
            visit_expr(&binary.rhs, visit);
        }
        ExprKind::Index(index) => {
            visit_expr(&index.base, visit);
            visit_expr(&index.index, visit);
        }
        ExprKind::Paren(inner) => visit_expr(inner, visit),
        ExprKind::FuncLit(func) => visit_block_exprs(&func.body, visit),
        ExprKind::Ident(_) | ExprKind::Lit(_) | ExprKind::Raw(_) => {}
    }
    visit(expr);
}

/// Apply `visit` to every expression in the file, innermost first, allowing
/// wholesale replacement of matched nodes.
pub fn visit_exprs_mut(file: &mut File, visit: &mut dyn FnMut(&mut Expr)) {
    for decl in &mut file.decls {
        visit_decl_exprs_mut(decl, visit);
    }
}

fn visit_decl_exprs_mut(decl: &mut Decl, visit: &mut dyn FnMut(&mut Expr)) {
    match &mut decl.kind {
        DeclKind::Func(func) => visit_block_exprs_mut(&mut func.body, visit),
        DeclKind::Const(c) => {
            for spec in &mut c.specs {
                for value in &mut spec.values {
                    visit_expr_mut(value, visit);
                }
            }
        }
        DeclKind::Var(v) => {
            for spec in &mut v.specs {
                for value in &mut spec.values {
                    visit_expr_mut(value, visit);
                }
            }
        }
        DeclKind::Type(_) | DeclKind::Raw(_) => {}
    }
}

pub fn visit_block_exprs_mut(block: &mut Block, visit: &mut dyn FnMut(&mut Expr)) {
    for stmt in &mut block.stmts {
        visit_stmt_exprs_mut(stmt, visit);
    }
}

fn visit_stmt_exprs_mut(stmt: &mut Stmt, visit: &mut dyn FnMut(&mut Expr)) {
    match &mut stmt.kind {
        StmtKind::Expr(expr) => visit_expr_mut(expr, visit),
        StmtKind::Define(define) => {
            for value in &mut define.values {
                visit_expr_mut(value, visit);
            }
        }
        StmtKind::Assign(assign) => {
            for expr in assign.lhs.iter_mut().chain(assign.rhs.iter_mut()) {
                visit_expr_mut(expr, visit);
            }
        }
        StmtKind::Return(values) => {
            for value in values {
                visit_expr_mut(value, visit);
            }
        }
        StmtKind::If(stmt_if) => visit_if_exprs_mut(stmt_if, visit),
        StmtKind::Switch(switch) => {
            if let Some(tag) = &mut switch.tag {
                visit_expr_mut(tag, visit);
            }
            for case in &mut switch.cases {
                for value in &mut case.values {
                    visit_expr_mut(value, visit);
                }
                for stmt in &mut case.body {
                    visit_stmt_exprs_mut(stmt, visit);
                }
            }
        }
        StmtKind::For(stmt_for) => {
            if let Some(init) = &mut stmt_for.init {
                visit_stmt_exprs_mut(init, visit);
            }
            if let Some(cond) = &mut stmt_for.cond {
                visit_expr_mut(cond, visit);
            }
            if let Some(post) = &mut stmt_for.post {
                visit_stmt_exprs_mut(post, visit);
            }
            if let Some(range) = &mut stmt_for.range {
                visit_expr_mut(&mut range.expr, visit);
            }
            visit_block_exprs_mut(&mut stmt_for.body, visit);
        }
        StmtKind::IncDec(incdec) => visit_expr_mut(&mut incdec.target, visit),
        StmtKind::Block(block) => visit_block_exprs_mut(block, visit),
        StmtKind::Var(decl) => {
            for spec in &mut decl.specs {
                for value in &mut spec.values {
                    visit_expr_mut(value, visit);
                }
            }
        }
        StmtKind::Const(decl) => {
            for spec in &mut decl.specs {
                for value in &mut spec.values {
                    visit_expr_mut(value, visit);
                }
            }
        }
        StmtKind::Branch(_) | StmtKind::Raw(_) => {}
    }
}

fn visit_if_exprs_mut(stmt_if: &mut StmtIf, visit: &mut dyn FnMut(&mut Expr)) {
    visit_expr_mut(&mut stmt_if.cond, visit);
    visit_block_exprs_mut(&mut stmt_if.then, visit);
    match &mut stmt_if.else_branch {
        Some(ElseBranch::If(nested)) => visit_if_exprs_mut(nested, visit),
        Some(ElseBranch::Block(block)) => visit_block_exprs_mut(block, visit),
        None => {}
    }
}

pub fn visit_expr_mut(expr: &mut Expr, visit: &mut dyn FnMut(&mut Expr)) {
    match &mut expr.kind {
        ExprKind::Selector(sel) => visit_expr_mut(&mut sel.base, visit),
        ExprKind::Call(call) => {
            visit_expr_mut(&mut call.target, visit);
            for arg in &mut call.args {
                visit_expr_mut(arg, visit);
            }
        }
        ExprKind::Composite(lit) => {
            for (_, value) in &mut lit.fields {
                visit_expr_mut(value, visit);
            }
        }
        ExprKind::Unary(unary) => visit_expr_mut(&mut unary.operand, visit),
        ExprKind::Binary(binary) => {
            visit_expr_mut(&mut binary.lhs, visit);
            visit_expr_mut(&mut binary.rhs, visit);
        }
        ExprKind::Index(index) => {
            visit_expr_mut(&mut index.base, visit);
            visit_expr_mut(&mut index.index, visit);
        }
        ExprKind::Paren(inner) => visit_expr_mut(inner, visit),
        ExprKind::FuncLit(func) => visit_block_exprs_mut(&mut func.body, visit),
        ExprKind::Ident(_) | ExprKind::Lit(_) | ExprKind::Raw(_) => {}
    }
    visit(expr);
}
