//! Go source printer for the transpiler AST.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::ast::{
    Block, Decl, DeclFunc, DeclKind, DeclType, ElseBranch, Expr, ExprKind, File, GoType, Stmt,
    StmtFor, StmtIf, StmtKind, TypeDef, ValueSpec,
};

/// Public entry point: prints a transformed [`File`] back to Go text.
#[derive(Clone, Debug, Default)]
pub struct GoPrinter;

impl GoPrinter {
    pub fn new() -> GoPrinter {
        GoPrinter
    }

    pub fn print(&self, file: &File) -> String {
        let mut emitter = Emitter::new();
        emitter.emit_file(file);
        emitter.finish()
    }
}

/// Render a single expression as one line of Go, used both by the printer
/// and by error messages naming an offending expression.
pub fn render_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

struct Emitter {
    code: String,
    indent: usize,
}

impl Emitter {
    fn new() -> Emitter {
        Emitter {
            code: String::new(),
            indent: 0,
        }
    }

    fn finish(mut self) -> String {
        if !self.code.ends_with('\n') {
            self.code.push('\n');
        }
        let trimmed = self.code.trim_end().to_string();
        format!("{}\n", trimmed)
    }

    fn emit_file(&mut self, file: &File) {
        self.push_line(&format!("package {}", file.package));
        self.push_blank_line();
        self.emit_imports(&file.imports);
        for decl in &file.decls {
            self.emit_decl(decl);
        }
    }

    fn emit_imports(&mut self, imports: &[String]) {
        if imports.is_empty() {
            return;
        }
        // BTreeSet both dedupes and orders the block.
        let imports: BTreeSet<&String> = imports.iter().collect();
        if imports.len() == 1 {
            let value = imports.iter().next().unwrap();
            self.push_line(&format!("import \"{}\"", value));
            self.push_blank_line();
            return;
        }

        self.push_line("import (");
        self.indent += 1;
        for import in imports {
            self.push_line(&format!("\"{}\"", import));
        }
        self.indent -= 1;
        self.push_line(")");
        self.push_blank_line();
    }

    fn emit_decl(&mut self, decl: &Decl) {
        match &decl.kind {
            DeclKind::Func(func) => self.emit_func(func),
            DeclKind::Type(def) => self.emit_type(def),
            DeclKind::Const(c) => self.emit_values("const", &c.specs),
            DeclKind::Var(v) => self.emit_values("var", &v.specs),
            DeclKind::Raw(text) => {
                for line in text.lines() {
                    self.push_line(line);
                }
                self.push_blank_line();
            }
        }
    }

    fn emit_func(&mut self, func: &DeclFunc) {
        let receiver = func
            .receiver
            .as_ref()
            .map(|param| format!("({} {}) ", param.name, param.ty))
            .unwrap_or_default();
        let params = func
            .params
            .iter()
            .map(|param| format!("{} {}", param.name, param.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let results = render_results(&func.results);
        self.push_line(&format!(
            "func {}{}({}){} {{",
            receiver, func.name, params, results
        ));
        self.indent += 1;
        self.emit_block_stmts(&func.body);
        self.indent -= 1;
        self.push_line("}");
        self.push_blank_line();
    }

    fn emit_type(&mut self, def: &DeclType) {
        match &def.def {
            TypeDef::Struct(fields) => {
                self.push_line(&format!("type {} struct {{", def.name));
                self.indent += 1;
                for field in fields {
                    self.push_line(&format!("{} {}", field.name, field.ty));
                }
                self.indent -= 1;
                self.push_line("}");
            }
            TypeDef::Alias(ty) => {
                self.push_line(&format!("type {} {}", def.name, ty));
            }
        }
        self.push_blank_line();
    }

    fn emit_values(&mut self, keyword: &str, specs: &[ValueSpec]) {
        if specs.len() == 1 {
            self.push_line(&format!("{} {}", keyword, render_spec(&specs[0])));
        } else {
            self.push_line(&format!("{} (", keyword));
            self.indent += 1;
            for spec in specs {
                self.push_line(&render_spec(spec));
            }
            self.indent -= 1;
            self.push_line(")");
        }
        self.push_blank_line();
    }

    fn emit_block_stmts(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.emit_stmt(stmt);
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                let rendered = render_expr(expr);
                self.push_line(&rendered);
            }
            StmtKind::Define(define) => {
                let names = define.names.join(", ");
                let values = render_expr_list(&define.values);
                self.push_line(&format!("{} := {}", names, values));
            }
            StmtKind::Assign(assign) => {
                let lhs = render_expr_list(&assign.lhs);
                let rhs = render_expr_list(&assign.rhs);
                self.push_line(&format!("{} {} {}", lhs, assign.op, rhs));
            }
            StmtKind::Return(values) => {
                if values.is_empty() {
                    self.push_line("return");
                } else {
                    self.push_line(&format!("return {}", render_expr_list(values)));
                }
            }
            StmtKind::If(stmt_if) => self.emit_if(stmt_if),
            StmtKind::Switch(switch) => {
                let tag = switch
                    .tag
                    .as_ref()
                    .map(|tag| format!(" {}", render_expr(tag)))
                    .unwrap_or_default();
                self.push_line(&format!("switch{} {{", tag));
                for case in &switch.cases {
                    if case.values.is_empty() {
                        self.push_line("default:");
                    } else {
                        self.push_line(&format!("case {}:", render_expr_list(&case.values)));
                    }
                    self.indent += 1;
                    for stmt in &case.body {
                        self.emit_stmt(stmt);
                    }
                    self.indent -= 1;
                }
                self.push_line("}");
            }
            StmtKind::For(stmt_for) => self.emit_for(stmt_for),
            StmtKind::IncDec(incdec) => {
                let op = if incdec.inc { "++" } else { "--" };
                self.push_line(&format!("{}{}", render_expr(&incdec.target), op));
            }
            StmtKind::Branch(branch) => match &branch.label {
                Some(label) => self.push_line(&format!("{} {}", branch.keyword, label)),
                None => self.push_line(&branch.keyword.clone()),
            },
            StmtKind::Block(block) => {
                self.push_line("{");
                self.indent += 1;
                self.emit_block_stmts(block);
                self.indent -= 1;
                self.push_line("}");
            }
            StmtKind::Var(decl) => self.emit_value_stmt("var", &decl.specs),
            StmtKind::Const(decl) => self.emit_value_stmt("const", &decl.specs),
            StmtKind::Raw(text) => {
                for line in text.lines() {
                    self.push_line(line.trim_start());
                }
            }
        }
    }

    /// Local const/var declaration, without the blank line a top-level
    /// declaration gets.
    fn emit_value_stmt(&mut self, keyword: &str, specs: &[ValueSpec]) {
        if specs.len() == 1 {
            self.push_line(&format!("{} {}", keyword, render_spec(&specs[0])));
        } else {
            self.push_line(&format!("{} (", keyword));
            self.indent += 1;
            for spec in specs {
                self.push_line(&render_spec(spec));
            }
            self.indent -= 1;
            self.push_line(")");
        }
    }

    fn emit_if(&mut self, stmt_if: &StmtIf) {
        self.push_line(&format!("if {} {{", render_expr(&stmt_if.cond)));
        self.emit_if_tail(stmt_if);
    }

    fn emit_if_tail(&mut self, stmt_if: &StmtIf) {
        self.indent += 1;
        self.emit_block_stmts(&stmt_if.then);
        self.indent -= 1;
        match &stmt_if.else_branch {
            Some(ElseBranch::If(nested)) => {
                self.push_line(&format!("}} else if {} {{", render_expr(&nested.cond)));
                self.emit_if_tail(nested);
            }
            Some(ElseBranch::Block(block)) => {
                self.push_line("} else {");
                self.indent += 1;
                self.emit_block_stmts(block);
                self.indent -= 1;
                self.push_line("}");
            }
            None => self.push_line("}"),
        }
    }

    fn emit_for(&mut self, stmt_for: &StmtFor) {
        let header = if let Some(range) = &stmt_for.range {
            let mut vars = Vec::new();
            if let Some(key) = &range.key {
                vars.push(key.clone());
            }
            if let Some(value) = &range.value {
                vars.push(value.clone());
            }
            if vars.is_empty() {
                format!("for range {}", render_expr(&range.expr))
            } else {
                format!(
                    "for {} := range {}",
                    vars.join(", "),
                    render_expr(&range.expr)
                )
            }
        } else {
            let init = stmt_for.init.as_ref().map(|s| render_simple_stmt(s));
            let cond = stmt_for.cond.as_ref().map(render_expr);
            let post = stmt_for.post.as_ref().map(|s| render_simple_stmt(s));
            match (init, &cond, post) {
                (None, Some(cond), None) => format!("for {}", cond),
                (None, None, None) => "for".to_string(),
                (init, cond, post) => format!(
                    "for {}; {}; {}",
                    init.unwrap_or_default(),
                    cond.clone().unwrap_or_default(),
                    post.unwrap_or_default()
                ),
            }
        };
        self.push_line(&format!("{} {{", header));
        self.indent += 1;
        self.emit_block_stmts(&stmt_for.body);
        self.indent -= 1;
        self.push_line("}");
    }

    fn push_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.code.push_str("    ");
        }
        self.code.push_str(line);
        self.code.push('\n');
    }

    fn push_blank_line(&mut self) {
        if self.code.ends_with("\n\n") || self.code.is_empty() {
            return;
        }
        if !self.code.ends_with('\n') {
            self.code.push('\n');
        }
        self.code.push('\n');
    }
}

fn render_spec(spec: &ValueSpec) -> String {
    let mut out = spec.names.join(", ");
    if let Some(ty) = &spec.ty {
        out.push(' ');
        out.push_str(&ty.to_string());
    }
    if !spec.values.is_empty() {
        out.push_str(" = ");
        out.push_str(&render_expr_list(&spec.values));
    }
    out
}

fn render_results(results: &[GoType]) -> String {
    match results {
        [] => String::new(),
        [single] => format!(" {}", single),
        many => format!(" ({})", many.iter().map(|ty| ty.to_string()).join(", ")),
    }
}

fn render_expr_list(exprs: &[Expr]) -> String {
    exprs.iter().map(render_expr).join(", ")
}

/// Single-line rendering for statements usable inside a `for` header.
fn render_simple_stmt(stmt: &Stmt) -> String {
    match &stmt.kind {
        StmtKind::Define(define) => format!(
            "{} := {}",
            define.names.join(", "),
            render_expr_list(&define.values)
        ),
        StmtKind::Assign(assign) => format!(
            "{} {} {}",
            render_expr_list(&assign.lhs),
            assign.op,
            render_expr_list(&assign.rhs)
        ),
        StmtKind::IncDec(incdec) => {
            let op = if incdec.inc { "++" } else { "--" };
            format!("{}{}", render_expr(&incdec.target), op)
        }
        StmtKind::Expr(expr) => render_expr(expr),
        StmtKind::Raw(text) => text.trim().to_string(),
        _ => String::new(),
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Ident(name) => out.push_str(name),
        ExprKind::Lit(lit) => out.push_str(&lit.text),
        ExprKind::Selector(sel) => {
            write_expr(out, &sel.base);
            out.push('.');
            out.push_str(&sel.field);
        }
        ExprKind::Call(call) => {
            write_expr(out, &call.target);
            out.push('(');
            for (i, arg) in call.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            out.push(')');
        }
        ExprKind::Composite(lit) => {
            out.push_str(&lit.ty.to_string());
            out.push('{');
            for (i, (key, value)) in lit.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(key) = key {
                    out.push_str(key);
                    out.push_str(": ");
                }
                write_expr(out, value);
            }
            out.push('}');
        }
        ExprKind::Unary(unary) => {
            out.push_str(&unary.op);
            write_expr(out, &unary.operand);
        }
        ExprKind::Binary(binary) => {
            write_expr(out, &binary.lhs);
            out.push(' ');
            out.push_str(&binary.op);
            out.push(' ');
            write_expr(out, &binary.rhs);
        }
        ExprKind::Index(index) => {
            write_expr(out, &index.base);
            out.push('[');
            write_expr(out, &index.index);
            out.push(']');
        }
        ExprKind::Paren(inner) => {
            out.push('(');
            write_expr(out, inner);
            out.push(')');
        }
        ExprKind::FuncLit(func) => {
            // Function literals print on a single line so expression-local
            // rewrites never change the line structure of the output.
            out.push_str("func(");
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format!("{} {}", param.name, param.ty));
            }
            out.push(')');
            out.push_str(&render_results(&func.results));
            out.push_str(" { ");
            let rendered: Vec<String> = func.body.stmts.iter().map(render_simple_line).collect();
            out.push_str(&rendered.join("; "));
            out.push_str(" }");
        }
        ExprKind::Raw(text) => out.push_str(text.trim()),
    }
}

/// Render one statement of an inline function literal body.
fn render_simple_line(stmt: &Stmt) -> String {
    match &stmt.kind {
        StmtKind::Return(values) => {
            if values.is_empty() {
                "return".to_string()
            } else {
                format!("return {}", render_expr_list(values))
            }
        }
        _ => render_simple_stmt(stmt),
    }
}
