//! Addressability classification and temporary-variable hygiene.
//!
//! Variant payloads are stored as pointers, so constructor rewriting must
//! take the address of each payload expression. Go only permits `&x` on
//! addressable expressions; everything else detours through a uniquely
//! named temporary inside an immediately-invoked function literal.

use crate::ast::{
    Block, Expr, ExprCall, ExprFuncLit, ExprKind, ExprUnary, GoType, IdGen, Stmt, StmtDefine,
    StmtKind,
};

/// Monotonically increasing counter for `__tmpN` names. File-scoped and
/// shared by the preprocessor and the plugin pipeline; never reset within
/// a file so generated names cannot shadow each other.
#[derive(Debug, Default, Clone)]
pub struct TempVarCounter {
    next: u32,
}

impl TempVarCounter {
    pub fn new() -> TempVarCounter {
        TempVarCounter::default()
    }

    pub fn fresh(&mut self) -> String {
        let name = format!("__tmp{}", self.next);
        self.next += 1;
        name
    }

    pub fn count(&self) -> u32 {
        self.next
    }
}

/// Whether Go permits taking the address of this expression directly.
///
/// Identifiers, index expressions, selectors, and pointer dereferences are
/// addressable; literals, composite literals, calls, and operator
/// expressions are not.
pub fn is_addressable(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) => true,
        ExprKind::Index(_) => true,
        ExprKind::Selector(_) => true,
        ExprKind::Unary(unary) => unary.op == "*",
        ExprKind::Paren(inner) => is_addressable(inner),
        ExprKind::Lit(_)
        | ExprKind::Composite(_)
        | ExprKind::Call(_)
        | ExprKind::Binary(_)
        | ExprKind::FuncLit(_)
        | ExprKind::Raw(_) => false,
    }
}

/// Produce an expression evaluating to `&expr`.
///
/// Addressable expressions take the direct form with no temporary.
/// Non-addressable expressions are wrapped as
/// `func() *T { __tmpN := <expr>; return &__tmpN }()`, which never changes
/// the value produced, only its addressability.
pub fn address_of(expr: Expr, ty: &GoType, temps: &mut TempVarCounter, ids: &mut IdGen) -> Expr {
    if is_addressable(&expr) {
        return Expr::synthesized(
            ids,
            ExprKind::Unary(ExprUnary {
                op: "&".to_string(),
                operand: Box::new(expr),
            }),
        );
    }
    wrap_in_temporary(expr, ty, temps, ids)
}

/// Bind `expr` to a fresh temporary and return a pointer to it, valid in
/// expression position.
pub fn wrap_in_temporary(
    expr: Expr,
    ty: &GoType,
    temps: &mut TempVarCounter,
    ids: &mut IdGen,
) -> Expr {
    let temp = temps.fresh();

    let define = Stmt::synthesized(
        ids,
        StmtKind::Define(StmtDefine {
            names: vec![temp.clone()],
            values: vec![expr],
        }),
    );
    let temp_ref = Expr::ident(ids, temp);
    let ret_value = Expr::synthesized(
        ids,
        ExprKind::Unary(ExprUnary {
            op: "&".to_string(),
            operand: Box::new(temp_ref),
        }),
    );
    let ret = Stmt::synthesized(ids, StmtKind::Return(vec![ret_value]));

    let func = Expr::synthesized(
        ids,
        ExprKind::FuncLit(ExprFuncLit {
            params: Vec::new(),
            results: vec![GoType::pointer(ty.clone())],
            body: Block {
                stmts: vec![define, ret],
            },
        }),
    );
    Expr::synthesized(
        ids,
        ExprKind::Call(ExprCall {
            target: Box::new(func),
            args: Vec::new(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Lit, LitKind};
    use crate::printer::render_expr;
    use pretty_assertions::assert_eq;

    fn int_lit(ids: &mut IdGen, text: &str) -> Expr {
        Expr::synthesized(
            ids,
            ExprKind::Lit(Lit {
                kind: LitKind::Int,
                text: text.to_string(),
            }),
        )
    }

    #[test]
    fn classifies_addressability() {
        let mut ids = IdGen::new();
        assert!(is_addressable(&Expr::ident(&mut ids, "x")));
        assert!(!is_addressable(&int_lit(&mut ids, "42")));

        let call_target = Expr::ident(&mut ids, "f");
        let call = Expr::synthesized(
            &mut ids,
            ExprKind::Call(ExprCall {
                target: Box::new(call_target),
                args: Vec::new(),
            }),
        );
        assert!(!is_addressable(&call));

        let deref_operand = Expr::ident(&mut ids, "p");
        let deref = Expr::synthesized(
            &mut ids,
            ExprKind::Unary(ExprUnary {
                op: "*".to_string(),
                operand: Box::new(deref_operand),
            }),
        );
        assert!(is_addressable(&deref));
    }

    #[test]
    fn identifiers_take_direct_address() {
        let mut ids = IdGen::new();
        let mut temps = TempVarCounter::new();
        let wrapped = address_of(
            Expr::ident(&mut ids, "x"),
            &GoType::named("int"),
            &mut temps,
            &mut ids,
        );
        assert_eq!(render_expr(&wrapped), "&x");
        assert_eq!(temps.count(), 0);
    }

    #[test]
    fn literals_are_wrapped_in_unique_temporaries() {
        let mut ids = IdGen::new();
        let mut temps = TempVarCounter::new();

        let lit = int_lit(&mut ids, "42");
        let first = address_of(lit, &GoType::named("int"), &mut temps, &mut ids);
        assert_eq!(
            render_expr(&first),
            "func() *int { __tmp0 := 42; return &__tmp0 }()"
        );

        let lit = int_lit(&mut ids, "7");
        let second = address_of(lit, &GoType::named("int"), &mut temps, &mut ids);
        assert_eq!(
            render_expr(&second),
            "func() *int { __tmp1 := 7; return &__tmp1 }()"
        );
    }
}
