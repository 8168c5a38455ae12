//! Go parser built on top of `tree-sitter-go`.
//!
//! The host grammar is a black box: preprocessed (plain Go) text goes in,
//! the pipeline's AST comes out. Constructs the pipeline never rewrites are
//! mapped to `Raw` nodes carrying their verbatim source text.

use eyre::{eyre, Result};
use mg_core::span::{FileId, Span};
use tracing::warn;
use tree_sitter::{Node as TsNode, Parser as TsParser};

use crate::ast::{
    Block, Decl, DeclConst, DeclFunc, DeclKind, DeclType, DeclVar, ElseBranch, Expr, ExprBinary,
    ExprCall, ExprComposite, ExprFuncLit, ExprIndex, ExprKind, ExprSelector, ExprUnary, Field,
    File, GoType, IdGen, Lit, LitKind, Param, RangeClause, Stmt, StmtAssign, StmtBranch,
    StmtDefine, StmtFor, StmtIf, StmtIncDec, StmtKind, StmtSwitch, SwitchCase, TypeDef, ValueSpec,
};

/// High-level parser that owns a tree-sitter instance for Go.
pub struct GoParser {
    parser: TsParser,
}

impl GoParser {
    /// Create a new parser instance with the Go grammar loaded.
    pub fn new() -> Result<Self> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|err| eyre!("Failed to load tree-sitter Go grammar: {err}"))?;
        Ok(Self { parser })
    }

    /// Parse Go source into the pipeline AST.
    pub fn parse_file(&mut self, source: &str, file: FileId, ids: &mut IdGen) -> Result<File> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| eyre!("failed to parse Go source"))?;
        let mut ctx = Ctx { source, file, ids };
        parse_file(tree.root_node(), &mut ctx)
    }

    /// Validate that `source` is grammatical Go, reporting the first syntax
    /// error's position. Used by import injection to reject its own output.
    pub fn check_syntax(&mut self, source: &str) -> std::result::Result<(), String> {
        let Some(tree) = self.parser.parse(source, None) else {
            return Err("host parser produced no tree".to_string());
        };
        let root = tree.root_node();
        if !root.has_error() {
            return Ok(());
        }
        match find_error_node(root) {
            Some(node) => {
                let pos = node.start_position();
                Err(format!(
                    "syntax error near line {}, column {}",
                    pos.row + 1,
                    pos.column + 1
                ))
            }
            None => Err("syntax error at unknown position".to_string()),
        }
    }
}

fn find_error_node(node: TsNode) -> Option<TsNode> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = find_error_node(child) {
                return Some(found);
            }
        }
    }
    None
}

struct Ctx<'a> {
    source: &'a str,
    file: FileId,
    ids: &'a mut IdGen,
}

impl Ctx<'_> {
    fn text(&self, node: TsNode) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or_default()
            .to_string()
    }

    fn span(&self, node: TsNode) -> Span {
        Span::new(self.file, node.start_byte() as u32, node.end_byte() as u32)
    }

    fn expr(&mut self, node: TsNode, kind: ExprKind) -> Expr {
        Expr {
            id: self.ids.fresh(),
            span: self.span(node),
            kind,
        }
    }

    fn stmt(&mut self, node: TsNode, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.ids.fresh(),
            span: self.span(node),
            kind,
        }
    }

    fn raw_expr(&mut self, node: TsNode) -> Expr {
        let text = self.text(node);
        self.expr(node, ExprKind::Raw(text))
    }

    fn raw_stmt(&mut self, node: TsNode) -> Stmt {
        let text = self.text(node);
        self.stmt(node, StmtKind::Raw(text))
    }
}

fn parse_file(root: TsNode, ctx: &mut Ctx) -> Result<File> {
    let mut file = File::default();
    let mut cursor = root.walk();

    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_clause" => {
                if let Some(name) = parse_package_clause(child, ctx) {
                    file.package = name;
                }
            }
            "import_declaration" => {
                file.imports.extend(parse_import_declaration(child, ctx));
            }
            "function_declaration" | "method_declaration" => {
                file.decls.push(parse_function(child, ctx)?);
            }
            "type_declaration" => {
                file.decls.extend(parse_type_declaration(child, ctx)?);
            }
            "const_declaration" => {
                let decl = parse_value_declaration(child, ctx)?;
                let span = ctx.span(child);
                file.decls.push(Decl {
                    id: ctx.ids.fresh(),
                    span,
                    kind: DeclKind::Const(DeclConst { specs: decl }),
                });
            }
            "var_declaration" => {
                let decl = parse_value_declaration(child, ctx)?;
                let span = ctx.span(child);
                file.decls.push(Decl {
                    id: ctx.ids.fresh(),
                    span,
                    kind: DeclKind::Var(DeclVar { specs: decl }),
                });
            }
            "comment" => {}
            kind => {
                warn!("unsupported go top-level node: {kind:?}");
                let text = ctx.text(child);
                let span = ctx.span(child);
                file.decls.push(Decl {
                    id: ctx.ids.fresh(),
                    span,
                    kind: DeclKind::Raw(text),
                });
            }
        }
    }

    if file.package.is_empty() {
        return Err(eyre!("source file missing package clause"));
    }
    Ok(file)
}

fn parse_package_clause(node: TsNode, ctx: &Ctx) -> Option<String> {
    if let Some(name_node) = node.child_by_field_name("name") {
        return Some(ctx.text(name_node));
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "identifier" || child.kind() == "package_identifier" {
            return Some(ctx.text(child));
        }
    }
    warn!("package clause missing name");
    None
}

fn parse_import_declaration(node: TsNode, ctx: &Ctx) -> Vec<String> {
    let mut imports = Vec::new();
    collect_import_specs(node, ctx, &mut imports);
    imports
}

fn collect_import_specs(node: TsNode, ctx: &Ctx, imports: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => {
                if let Some(path_node) = child.child_by_field_name("path") {
                    imports.push(unquote(&ctx.text(path_node)));
                }
            }
            "import_spec_list" => collect_import_specs(child, ctx, imports),
            _ => {}
        }
    }
}

fn unquote(text: &str) -> String {
    text.trim_matches('"').trim_matches('`').to_string()
}

fn parse_function(node: TsNode, ctx: &mut Ctx) -> Result<Decl> {
    let name_node = node
        .child_by_field_name("name")
        .ok_or_else(|| eyre!("function declaration missing name"))?;
    let name = ctx.text(name_node);

    let receiver = node
        .child_by_field_name("receiver")
        .and_then(|list| first_param(list, ctx));

    let params = node
        .child_by_field_name("parameters")
        .map(|list| parse_parameter_list(list, ctx))
        .unwrap_or_default();

    let results = node
        .child_by_field_name("result")
        .map(|result| parse_result(result, ctx))
        .unwrap_or_default();

    let body = node
        .child_by_field_name("body")
        .map(|body| parse_block(body, ctx))
        .transpose()?
        .unwrap_or_default();

    let span = ctx.span(node);
    Ok(Decl {
        id: ctx.ids.fresh(),
        span,
        kind: DeclKind::Func(DeclFunc {
            name,
            receiver,
            params,
            results,
            body,
        }),
    })
}

fn first_param(list: TsNode, ctx: &Ctx) -> Option<Param> {
    let mut cursor = list.walk();
    for child in list.named_children(&mut cursor) {
        if child.kind() == "parameter_declaration" {
            let params = parse_parameter_declaration(child, ctx);
            return params.into_iter().next();
        }
    }
    None
}

fn parse_parameter_list(list: TsNode, ctx: &Ctx) -> Vec<Param> {
    let mut params = Vec::new();
    let mut cursor = list.walk();
    for child in list.named_children(&mut cursor) {
        if child.kind() == "parameter_declaration"
            || child.kind() == "variadic_parameter_declaration"
        {
            params.extend(parse_parameter_declaration(child, ctx));
        }
    }
    params
}

fn parse_parameter_declaration(node: TsNode, ctx: &Ctx) -> Vec<Param> {
    let Some(ty_node) = node.child_by_field_name("type") else {
        return Vec::new();
    };
    let ty = parse_type_node(ty_node, ctx);

    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.id() == ty_node.id() {
            continue;
        }
        if child.kind() == "identifier" {
            names.push(ctx.text(child));
        }
    }

    if names.is_empty() {
        // Unnamed parameter (type only).
        return vec![Param {
            name: "_".to_string(),
            ty,
        }];
    }

    names
        .into_iter()
        .map(|name| Param {
            name,
            ty: ty.clone(),
        })
        .collect()
}

fn parse_result(node: TsNode, ctx: &Ctx) -> Vec<GoType> {
    if node.kind() == "parameter_list" {
        let mut results = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "parameter_declaration" {
                if let Some(ty_node) = child.child_by_field_name("type") {
                    results.push(parse_type_node(ty_node, ctx));
                }
            }
        }
        results
    } else {
        vec![parse_type_node(node, ctx)]
    }
}

fn parse_type_declaration(node: TsNode, ctx: &mut Ctx) -> Result<Vec<Decl>> {
    let mut decls = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "type_spec" && child.kind() != "type_alias" {
            continue;
        }
        let name_node = child
            .child_by_field_name("name")
            .ok_or_else(|| eyre!("type spec missing name"))?;
        let name = ctx.text(name_node);
        let ty_node = child
            .child_by_field_name("type")
            .ok_or_else(|| eyre!("type spec missing type"))?;

        let def = match ty_node.kind() {
            "struct_type" => TypeDef::Struct(parse_struct_fields(ty_node, ctx)),
            _ => TypeDef::Alias(parse_type_node(ty_node, ctx)),
        };
        let span = ctx.span(child);
        decls.push(Decl {
            id: ctx.ids.fresh(),
            span,
            kind: DeclKind::Type(DeclType { name, def }),
        });
    }
    Ok(decls)
}

fn parse_struct_fields(node: TsNode, ctx: &Ctx) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut cursor = node.walk();
    for list in node.named_children(&mut cursor) {
        if list.kind() != "field_declaration_list" {
            continue;
        }
        let mut list_cursor = list.walk();
        for field in list.named_children(&mut list_cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(ty_node) = field.child_by_field_name("type") else {
                warn!("skipping anonymous field declaration");
                continue;
            };
            let ty = parse_type_node(ty_node, ctx);
            let mut field_cursor = field.walk();
            for name in field.named_children(&mut field_cursor) {
                if name.kind() == "field_identifier" {
                    fields.push(Field {
                        name: ctx.text(name),
                        ty: ty.clone(),
                    });
                }
            }
        }
    }
    fields
}

fn parse_value_declaration(node: TsNode, ctx: &mut Ctx) -> Result<Vec<ValueSpec>> {
    let mut specs = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "const_spec" && child.kind() != "var_spec" {
            continue;
        }
        let mut names = Vec::new();
        let mut ty = None;
        let mut values = Vec::new();
        let mut spec_cursor = child.walk();
        for part in child.named_children(&mut spec_cursor) {
            match part.kind() {
                "identifier" => names.push(ctx.text(part)),
                "expression_list" => values = parse_expression_list(part, ctx)?,
                _ => ty = Some(parse_type_node(part, ctx)),
            }
        }
        specs.push(ValueSpec { names, ty, values });
    }
    Ok(specs)
}

fn parse_block(node: TsNode, ctx: &mut Ctx) -> Result<Block> {
    let mut stmts = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "comment" {
            continue;
        }
        stmts.push(parse_statement(child, ctx)?);
    }
    Ok(Block { stmts })
}

fn parse_statement(node: TsNode, ctx: &mut Ctx) -> Result<Stmt> {
    let stmt = match node.kind() {
        "expression_statement" => {
            let inner = node
                .named_child(0)
                .ok_or_else(|| eyre!("empty expression statement"))?;
            let expr = parse_expression(inner, ctx)?;
            ctx.stmt(node, StmtKind::Expr(expr))
        }
        "short_var_declaration" => {
            let left = node
                .child_by_field_name("left")
                .ok_or_else(|| eyre!("short var declaration missing left side"))?;
            let right = node
                .child_by_field_name("right")
                .ok_or_else(|| eyre!("short var declaration missing right side"))?;
            let names = parse_expression_list(left, ctx)?
                .into_iter()
                .map(|expr| expr.ident_name().unwrap_or("_").to_string())
                .collect();
            let values = parse_expression_list(right, ctx)?;
            ctx.stmt(node, StmtKind::Define(StmtDefine { names, values }))
        }
        "assignment_statement" => {
            let lhs = node
                .child_by_field_name("left")
                .map(|n| parse_expression_list(n, ctx))
                .transpose()?
                .unwrap_or_default();
            let rhs = node
                .child_by_field_name("right")
                .map(|n| parse_expression_list(n, ctx))
                .transpose()?
                .unwrap_or_default();
            let op = node
                .child_by_field_name("operator")
                .map(|n| ctx.text(n))
                .unwrap_or_else(|| "=".to_string());
            ctx.stmt(node, StmtKind::Assign(StmtAssign { lhs, op, rhs }))
        }
        "return_statement" => {
            let values = node
                .named_child(0)
                .filter(|child| child.kind() == "expression_list")
                .map(|child| parse_expression_list(child, ctx))
                .transpose()?
                .unwrap_or_default();
            ctx.stmt(node, StmtKind::Return(values))
        }
        "if_statement" => {
            let parsed = parse_if(node, ctx)?;
            ctx.stmt(node, StmtKind::If(parsed))
        }
        "expression_switch_statement" => {
            let tag = node
                .child_by_field_name("value")
                .map(|value| parse_expression(value, ctx))
                .transpose()?;
            let mut cases = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "expression_case" => {
                        let values = child
                            .named_child(0)
                            .filter(|c| c.kind() == "expression_list")
                            .map(|c| parse_expression_list(c, ctx))
                            .transpose()?
                            .unwrap_or_default();
                        let body = parse_case_body(child, ctx, 1)?;
                        cases.push(SwitchCase { values, body });
                    }
                    "default_case" => {
                        let body = parse_case_body(child, ctx, 0)?;
                        cases.push(SwitchCase {
                            values: Vec::new(),
                            body,
                        });
                    }
                    _ => {}
                }
            }
            ctx.stmt(node, StmtKind::Switch(StmtSwitch { tag, cases }))
        }
        "for_statement" => {
            let parsed = parse_for(node, ctx)?;
            ctx.stmt(node, StmtKind::For(parsed))
        }
        "inc_statement" | "dec_statement" => {
            let target = node
                .named_child(0)
                .ok_or_else(|| eyre!("inc/dec statement missing target"))?;
            let target = parse_expression(target, ctx)?;
            let inc = node.kind() == "inc_statement";
            ctx.stmt(node, StmtKind::IncDec(StmtIncDec { target, inc }))
        }
        "break_statement" | "continue_statement" => {
            let keyword = if node.kind() == "break_statement" {
                "break"
            } else {
                "continue"
            };
            let label = node.named_child(0).map(|child| ctx.text(child));
            ctx.stmt(
                node,
                StmtKind::Branch(StmtBranch {
                    keyword: keyword.to_string(),
                    label,
                }),
            )
        }
        "block" => {
            let block = parse_block(node, ctx)?;
            ctx.stmt(node, StmtKind::Block(block))
        }
        "var_declaration" => {
            let specs = parse_value_declaration(node, ctx)?;
            ctx.stmt(node, StmtKind::Var(DeclVar { specs }))
        }
        "const_declaration" => {
            let specs = parse_value_declaration(node, ctx)?;
            ctx.stmt(node, StmtKind::Const(DeclConst { specs }))
        }
        kind => {
            warn!("passing through go statement verbatim: {kind:?}");
            ctx.raw_stmt(node)
        }
    };
    Ok(stmt)
}

fn parse_case_body(node: TsNode, ctx: &mut Ctx, skip: usize) -> Result<Vec<Stmt>> {
    let mut body = Vec::new();
    let mut cursor = node.walk();
    for (index, child) in node.named_children(&mut cursor).enumerate() {
        if index < skip || child.kind() == "comment" {
            continue;
        }
        body.push(parse_statement(child, ctx)?);
    }
    Ok(body)
}

fn parse_if(node: TsNode, ctx: &mut Ctx) -> Result<StmtIf> {
    let cond = node
        .child_by_field_name("condition")
        .ok_or_else(|| eyre!("if statement missing condition"))?;
    let cond = parse_expression(cond, ctx)?;
    let then = node
        .child_by_field_name("consequence")
        .map(|body| parse_block(body, ctx))
        .transpose()?
        .unwrap_or_default();
    let else_branch = match node.child_by_field_name("alternative") {
        Some(alt) if alt.kind() == "if_statement" => {
            Some(ElseBranch::If(Box::new(parse_if(alt, ctx)?)))
        }
        Some(alt) if alt.kind() == "block" => Some(ElseBranch::Block(parse_block(alt, ctx)?)),
        Some(_) | None => None,
    };
    Ok(StmtIf {
        cond,
        then,
        else_branch,
    })
}

fn parse_for(node: TsNode, ctx: &mut Ctx) -> Result<StmtFor> {
    let body = node
        .child_by_field_name("body")
        .map(|body| parse_block(body, ctx))
        .transpose()?
        .unwrap_or_default();

    let mut stmt = StmtFor {
        init: None,
        cond: None,
        post: None,
        range: None,
        body,
    };

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "for_clause" => {
                stmt.init = child
                    .child_by_field_name("initializer")
                    .map(|n| parse_statement(n, ctx))
                    .transpose()?
                    .map(Box::new);
                stmt.cond = child
                    .child_by_field_name("condition")
                    .map(|n| parse_expression(n, ctx))
                    .transpose()?;
                stmt.post = child
                    .child_by_field_name("update")
                    .map(|n| parse_statement(n, ctx))
                    .transpose()?
                    .map(Box::new);
            }
            "range_clause" => {
                let names: Vec<String> = child
                    .child_by_field_name("left")
                    .map(|left| {
                        let mut names = Vec::new();
                        let mut left_cursor = left.walk();
                        for name in left.named_children(&mut left_cursor) {
                            names.push(ctx.text(name));
                        }
                        names
                    })
                    .unwrap_or_default();
                let expr = child
                    .child_by_field_name("right")
                    .ok_or_else(|| eyre!("range clause missing operand"))?;
                let expr = parse_expression(expr, ctx)?;
                stmt.range = Some(RangeClause {
                    key: names.first().cloned(),
                    value: names.get(1).cloned(),
                    expr: Box::new(expr),
                });
            }
            kind if kind != "block" && kind != "comment" => {
                // Condition-only loop: `for cond { ... }`.
                stmt.cond = Some(parse_expression(child, ctx)?);
            }
            _ => {}
        }
    }
    Ok(stmt)
}

fn parse_expression_list(node: TsNode, ctx: &mut Ctx) -> Result<Vec<Expr>> {
    let mut exprs = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        exprs.push(parse_expression(child, ctx)?);
    }
    Ok(exprs)
}

fn parse_expression(node: TsNode, ctx: &mut Ctx) -> Result<Expr> {
    let expr = match node.kind() {
        "identifier" | "field_identifier" | "package_identifier" | "type_identifier" | "iota"
        | "blank_identifier" => {
            let name = ctx.text(node);
            ctx.expr(node, ExprKind::Ident(name))
        }
        "true" | "false" => {
            let text = ctx.text(node);
            ctx.expr(
                node,
                ExprKind::Lit(Lit {
                    kind: LitKind::Bool,
                    text,
                }),
            )
        }
        "nil" => ctx.expr(
            node,
            ExprKind::Lit(Lit {
                kind: LitKind::Nil,
                text: "nil".to_string(),
            }),
        ),
        "int_literal" => lit(node, ctx, LitKind::Int),
        "float_literal" => lit(node, ctx, LitKind::Float),
        "interpreted_string_literal" | "raw_string_literal" => lit(node, ctx, LitKind::Str),
        "rune_literal" => lit(node, ctx, LitKind::Char),
        "selector_expression" => {
            let base = node
                .child_by_field_name("operand")
                .ok_or_else(|| eyre!("selector missing operand"))?;
            let field = node
                .child_by_field_name("field")
                .ok_or_else(|| eyre!("selector missing field"))?;
            let base = parse_expression(base, ctx)?;
            let field = ctx.text(field);
            ctx.expr(
                node,
                ExprKind::Selector(ExprSelector {
                    base: Box::new(base),
                    field,
                }),
            )
        }
        "call_expression" => {
            let target = node
                .child_by_field_name("function")
                .ok_or_else(|| eyre!("call missing function"))?;
            let target = parse_expression(target, ctx)?;
            let mut args = Vec::new();
            if let Some(list) = node.child_by_field_name("arguments") {
                let mut cursor = list.walk();
                for child in list.named_children(&mut cursor) {
                    if child.kind() == "comment" {
                        continue;
                    }
                    args.push(parse_expression(child, ctx)?);
                }
            }
            ctx.expr(
                node,
                ExprKind::Call(ExprCall {
                    target: Box::new(target),
                    args,
                }),
            )
        }
        "index_expression" => {
            let base = node
                .child_by_field_name("operand")
                .ok_or_else(|| eyre!("index missing operand"))?;
            let index = node
                .child_by_field_name("index")
                .ok_or_else(|| eyre!("index missing index"))?;
            let base = parse_expression(base, ctx)?;
            let index = parse_expression(index, ctx)?;
            ctx.expr(
                node,
                ExprKind::Index(ExprIndex {
                    base: Box::new(base),
                    index: Box::new(index),
                }),
            )
        }
        "binary_expression" => {
            let lhs = node
                .child_by_field_name("left")
                .ok_or_else(|| eyre!("binary expression missing left side"))?;
            let rhs = node
                .child_by_field_name("right")
                .ok_or_else(|| eyre!("binary expression missing right side"))?;
            let op = node
                .child_by_field_name("operator")
                .map(|n| ctx.text(n))
                .unwrap_or_default();
            let lhs = parse_expression(lhs, ctx)?;
            let rhs = parse_expression(rhs, ctx)?;
            ctx.expr(
                node,
                ExprKind::Binary(ExprBinary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }),
            )
        }
        "unary_expression" => {
            let operand = node
                .child_by_field_name("operand")
                .ok_or_else(|| eyre!("unary expression missing operand"))?;
            let op = node
                .child_by_field_name("operator")
                .map(|n| ctx.text(n))
                .unwrap_or_default();
            let operand = parse_expression(operand, ctx)?;
            ctx.expr(
                node,
                ExprKind::Unary(ExprUnary {
                    op,
                    operand: Box::new(operand),
                }),
            )
        }
        "parenthesized_expression" => {
            let inner = node
                .named_child(0)
                .ok_or_else(|| eyre!("empty parenthesized expression"))?;
            let inner = parse_expression(inner, ctx)?;
            ctx.expr(node, ExprKind::Paren(Box::new(inner)))
        }
        "composite_literal" => {
            let ty = node
                .child_by_field_name("type")
                .map(|n| parse_type_node(n, ctx))
                .unwrap_or(GoType::Raw(String::new()));
            let mut fields = Vec::new();
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for element in body.named_children(&mut cursor) {
                    match element.kind() {
                        "keyed_element" => {
                            let mut parts = Vec::new();
                            let mut element_cursor = element.walk();
                            for part in element.named_children(&mut element_cursor) {
                                parts.push(part);
                            }
                            if parts.len() == 2 {
                                let key = ctx.text(element_value(parts[0]));
                                let value = parse_expression(element_value(parts[1]), ctx)?;
                                fields.push((Some(key), value));
                            }
                        }
                        "literal_element" => {
                            let value = parse_expression(element_value(element), ctx)?;
                            fields.push((None, value));
                        }
                        _ => {}
                    }
                }
            }
            ctx.expr(node, ExprKind::Composite(ExprComposite { ty, fields }))
        }
        "func_literal" => {
            let params = node
                .child_by_field_name("parameters")
                .map(|list| parse_parameter_list(list, ctx))
                .unwrap_or_default();
            let results = node
                .child_by_field_name("result")
                .map(|result| parse_result(result, ctx))
                .unwrap_or_default();
            let body = node
                .child_by_field_name("body")
                .map(|body| parse_block(body, ctx))
                .transpose()?
                .unwrap_or_default();
            ctx.expr(
                node,
                ExprKind::FuncLit(ExprFuncLit {
                    params,
                    results,
                    body,
                }),
            )
        }
        kind => {
            warn!("passing through go expression verbatim: {kind:?}");
            ctx.raw_expr(node)
        }
    };
    Ok(expr)
}

/// A `literal_element` wraps the actual expression; unwrap one level.
fn element_value(node: TsNode) -> TsNode {
    if node.kind() == "literal_element" {
        node.named_child(0).unwrap_or(node)
    } else {
        node
    }
}

fn lit(node: TsNode, ctx: &mut Ctx, kind: LitKind) -> Expr {
    let text = ctx.text(node);
    ctx.expr(node, ExprKind::Lit(Lit { kind, text }))
}

fn parse_type_node(node: TsNode, ctx: &Ctx) -> GoType {
    match node.kind() {
        "type_identifier" => GoType::Named(ctx.text(node)),
        "qualified_type" => GoType::Named(ctx.text(node)),
        "pointer_type" => {
            let inner = node
                .named_child(0)
                .map(|n| parse_type_node(n, ctx))
                .unwrap_or(GoType::Raw(ctx.text(node)));
            GoType::Pointer(Box::new(inner))
        }
        "slice_type" => {
            let elem = node
                .child_by_field_name("element")
                .map(|n| parse_type_node(n, ctx))
                .unwrap_or(GoType::Raw(ctx.text(node)));
            GoType::Slice(Box::new(elem))
        }
        "map_type" => {
            let key = node
                .child_by_field_name("key")
                .map(|n| parse_type_node(n, ctx))
                .unwrap_or(GoType::Raw(String::new()));
            let value = node
                .child_by_field_name("value")
                .map(|n| parse_type_node(n, ctx))
                .unwrap_or(GoType::Raw(String::new()));
            GoType::Map(Box::new(key), Box::new(value))
        }
        _ => GoType::Raw(ctx.text(node)),
    }
}
