//! Type checker (C7): identifier resolution, call validation, operator
//! compatibility, and condition enforcement. Walks the AST produced by the
//! parser in place, filling in every [`Expr::ty`] so C8 never has to ask
//! "what type is this" again.

use std::collections::HashMap;

use crate::ast::{BinaryOperator, Expr, ExprKind, FunctionDefinition, Program, SourceLocation, Stmt, StmtKind};
use crate::error::CompileError;
use crate::types::{BaseType, TypeIdentifier};

/// Two types may stand in for one another: identical types always match;
/// otherwise both sides must be non-pointer integers (or `char`), which
/// promote to I64 per [`TypeIdentifier::promote_for_arith`].
fn types_compatible(a: TypeIdentifier, b: TypeIdentifier) -> bool {
    a == b || (!a.is_pointer() && !b.is_pointer() && a.base.is_integer() && b.base.is_integer())
}

fn arith_compatible(a: TypeIdentifier, b: TypeIdentifier) -> bool {
    a.promote_for_arith() == b.promote_for_arith()
}

fn ty_err(loc: &SourceLocation, message: impl Into<String>) -> CompileError {
    CompileError::ty(loc.path.to_path_buf(), loc.line, loc.col, message)
}

fn global_name_and_type(stmt: &Stmt) -> Option<(String, TypeIdentifier)> {
    match &stmt.kind {
        StmtKind::VarDeclaration { name, ty, .. } => Some((name.clone(), *ty)),
        StmtKind::VarDeclAssign { name, ty, .. } => Some((name.clone(), *ty)),
        _ => None,
    }
}

struct TypeChecker<'a> {
    globals: &'a HashMap<String, TypeIdentifier>,
    fn_sigs: &'a HashMap<String, (Vec<TypeIdentifier>, TypeIdentifier)>,
    scopes: Vec<HashMap<String, TypeIdentifier>>,
    current_return_type: TypeIdentifier,
}

impl<'a> TypeChecker<'a> {
    fn new(
        globals: &'a HashMap<String, TypeIdentifier>,
        fn_sigs: &'a HashMap<String, (Vec<TypeIdentifier>, TypeIdentifier)>,
    ) -> Self {
        TypeChecker {
            globals,
            fn_sigs,
            scopes: vec![HashMap::new()],
            current_return_type: TypeIdentifier::direct(BaseType::Void),
        }
    }

    fn declare(&mut self, name: &str, ty: TypeIdentifier) {
        self.scopes.last_mut().expect("type checker scope underflow").insert(name.to_string(), ty);
    }

    fn lookup(&self, name: &str) -> Option<TypeIdentifier> {
        for frame in self.scopes.iter().rev() {
            if let Some(ty) = frame.get(name) {
                return Some(*ty);
            }
        }
        self.globals.get(name).copied()
    }

    fn check_function(&mut self, f: &mut FunctionDefinition) -> Result<(), CompileError> {
        self.current_return_type = f.return_type;
        self.scopes = vec![HashMap::new()];
        for p in &f.params {
            self.declare(&p.name, p.ty);
        }
        self.check_stmts(&mut f.body)
    }

    fn check_stmts(&mut self, stmts: &mut [Stmt]) -> Result<(), CompileError> {
        for s in stmts {
            self.check_stmt(s)?;
        }
        Ok(())
    }

    fn require_bool(&self, cond: &Expr) -> Result<(), CompileError> {
        if cond.ty() != TypeIdentifier::bool_() {
            return Err(ty_err(
                &cond.loc,
                format!("condition must be bool, found '{}'", cond.ty()),
            ));
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> Result<(), CompileError> {
        match &mut stmt.kind {
            StmtKind::Compound(inner) => {
                self.scopes.push(HashMap::new());
                let result = self.check_stmts(inner);
                self.scopes.pop();
                result?;
            }
            StmtKind::EndCompound => {}
            StmtKind::If { cond, body } => {
                self.check_expr(cond)?;
                self.require_bool(cond)?;
                self.check_stmt(body)?;
            }
            StmtKind::IfElse { cond, if_body, else_body } => {
                self.check_expr(cond)?;
                self.require_bool(cond)?;
                self.check_stmt(if_body)?;
                self.check_stmt(else_body)?;
            }
            StmtKind::While { cond, body } => {
                self.check_expr(cond)?;
                self.require_bool(cond)?;
                self.check_stmt(body)?;
            }
            StmtKind::Return(value) => match value {
                Some(expr) => {
                    self.check_expr(expr)?;
                    if !types_compatible(expr.ty(), self.current_return_type) {
                        return Err(ty_err(
                            &expr.loc,
                            format!(
                                "cannot return '{}' from a function declared to return '{}'",
                                expr.ty(),
                                self.current_return_type
                            ),
                        ));
                    }
                }
                None => {
                    if self.current_return_type != TypeIdentifier::direct(BaseType::Void) {
                        return Err(ty_err(
                            &stmt.loc,
                            format!("missing return value of type '{}'", self.current_return_type),
                        ));
                    }
                }
            },
            StmtKind::CallStatement { name, args } => {
                self.check_call(name, args, &stmt.loc)?;
            }
            StmtKind::VarAssignment { lhs, rhs } => {
                self.check_expr(lhs)?;
                self.check_expr(rhs)?;
                if !types_compatible(rhs.ty(), lhs.ty()) {
                    return Err(ty_err(
                        &rhs.loc,
                        format!("cannot assign '{}' to a variable of type '{}'", rhs.ty(), lhs.ty()),
                    ));
                }
            }
            StmtKind::VarDeclaration { name, ty, .. } => {
                self.declare(name, *ty);
            }
            StmtKind::VarDeclAssign { name, ty, value, .. } => {
                self.check_expr(value)?;
                if !types_compatible(value.ty(), *ty) {
                    return Err(ty_err(
                        &value.loc,
                        format!("cannot initialize '{name}' of type '{ty}' with value of type '{}'", value.ty()),
                    ));
                }
                self.declare(name, *ty);
            }
        }
        Ok(())
    }

    fn check_expr(&mut self, expr: &mut Expr) -> Result<(), CompileError> {
        let bare = match &mut expr.kind {
            ExprKind::IntLit(_) => TypeIdentifier::i64(),
            ExprKind::CharLit(_) => TypeIdentifier::direct(BaseType::Char),
            ExprKind::StringLit(_) => TypeIdentifier::new(BaseType::Char, 1),
            ExprKind::IdExpression { name, index } => {
                let var_ty = self
                    .lookup(name)
                    .ok_or_else(|| ty_err(&expr.loc, format!("undefined identifier '{name}'")))?;
                match index {
                    Some(idx) => {
                        self.check_expr(idx)?;
                        if !idx.ty().arithmetic_eligible() {
                            return Err(ty_err(&idx.loc, "array index must be an integer type"));
                        }
                        if !var_ty.is_pointer() {
                            return Err(ty_err(&expr.loc, format!("cannot index non-pointer type '{var_ty}'")));
                        }
                        var_ty.deref_one()
                    }
                    None => var_ty,
                }
            }
            ExprKind::BinaryExpression { op, left, right } => {
                self.check_expr(left)?;
                self.check_expr(right)?;
                self.check_binary(*op, left.ty(), right.ty(), &expr.loc)?
            }
            ExprKind::CallExpression { name, args } => {
                let name = name.clone();
                self.check_call(&name, args, &expr.loc)?
            }
        };

        let mut final_ty = bare;
        for _ in 0..expr.deref_depth {
            if !final_ty.is_pointer() {
                return Err(ty_err(&expr.loc, format!("cannot dereference non-pointer type '{final_ty}'")));
            }
            final_ty = final_ty.deref_one();
        }
        expr.ty = Some(final_ty);
        Ok(())
    }

    fn check_binary(
        &mut self,
        op: BinaryOperator,
        left: TypeIdentifier,
        right: TypeIdentifier,
        loc: &SourceLocation,
    ) -> Result<TypeIdentifier, CompileError> {
        if op.is_relational() {
            if !arith_compatible(left, right) {
                return Err(ty_err(loc, format!("incompatible operand types '{left}' and '{right}' for comparison")));
            }
            return Ok(TypeIdentifier::bool_());
        }

        if op.is_bitwise() || op.is_div_or_mod() || op == BinaryOperator::Star {
            if !left.arithmetic_eligible() || !right.arithmetic_eligible() {
                return Err(ty_err(
                    loc,
                    format!("operator requires integer operands, found '{left}' and '{right}'"),
                ));
            }
            return Ok(TypeIdentifier::i64());
        }

        // Plus / Minus: plain integer arithmetic, or pointer +/- integer offset.
        if left.is_pointer() && !right.is_pointer() {
            if !right.arithmetic_eligible() {
                return Err(ty_err(loc, format!("pointer offset must be an integer, found '{right}'")));
            }
            return Ok(left);
        }
        if right.is_pointer() && !left.is_pointer() && op == BinaryOperator::Plus {
            if !left.arithmetic_eligible() {
                return Err(ty_err(loc, format!("pointer offset must be an integer, found '{left}'")));
            }
            return Ok(right);
        }
        if !arith_compatible(left, right) {
            return Err(ty_err(loc, format!("incompatible operand types '{left}' and '{right}'")));
        }
        Ok(left.promote_for_arith())
    }

    fn check_call(&mut self, name: &str, args: &mut [Expr], loc: &SourceLocation) -> Result<TypeIdentifier, CompileError> {
        if name == "syscall" {
            for a in args.iter_mut() {
                self.check_expr(a)?;
            }
            return Ok(TypeIdentifier::i64());
        }

        let (params, ret) = self
            .fn_sigs
            .get(name)
            .cloned()
            .ok_or_else(|| ty_err(loc, format!("call to undefined function '{name}'")))?;

        if params.len() != args.len() {
            return Err(ty_err(
                loc,
                format!("function '{name}' expects {} argument(s) but {} were given", params.len(), args.len()),
            ));
        }

        for (arg, expected) in args.iter_mut().zip(params.iter()) {
            self.check_expr(arg)?;
            if !types_compatible(arg.ty(), *expected) {
                return Err(ty_err(
                    &arg.loc,
                    format!("argument type '{}' does not match parameter type '{expected}'", arg.ty()),
                ));
            }
        }
        Ok(ret)
    }
}

/// Type-check an entire [`Program`] in place.
pub fn check_program(program: &mut Program) -> Result<(), CompileError> {
    let mut globals: HashMap<String, TypeIdentifier> = HashMap::new();
    for g in &program.globals {
        if let Some((name, ty)) = global_name_and_type(g) {
            globals.insert(name, ty);
        }
    }
    for (name, ty) in &program.extern_var_types {
        globals.insert(name.clone(), *ty);
    }

    let mut fn_sigs: HashMap<String, (Vec<TypeIdentifier>, TypeIdentifier)> = HashMap::new();
    for f in &program.functions {
        fn_sigs.insert(f.name.clone(), (f.params.iter().map(|p| p.ty).collect(), f.return_type));
    }
    for (name, sig) in &program.extern_fns {
        fn_sigs.entry(name.clone()).or_insert_with(|| (sig.params.clone(), sig.return_type));
    }

    for g in &mut program.globals {
        if let StmtKind::VarDeclAssign { name, ty, value, .. } = &mut g.kind {
            let mut checker = TypeChecker::new(&globals, &fn_sigs);
            checker.check_expr(value)?;
            if !types_compatible(value.ty(), *ty) {
                return Err(ty_err(
                    &value.loc,
                    format!("cannot initialize '{name}' of type '{ty}' with value of type '{}'", value.ty()),
                ));
            }
        }
    }

    for f in &mut program.functions {
        let mut checker = TypeChecker::new(&globals, &fn_sigs);
        checker.check_function(f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use std::path::Path;

    fn checked(src: &str) -> Result<Program, CompileError> {
        let mut resolver = Resolver::new();
        let mut program =
            crate::parser::parse_tokens_into_program(Path::new("t.glang"), src, &mut resolver, None, false)?;
        check_program(&mut program)?;
        Ok(program)
    }

    #[test]
    fn resolves_param_and_annotates_return_expr() {
        let p = checked("fn id(x: i64) -> i64 { return x; }").unwrap();
        let f = p.find_function("id").unwrap();
        match &f.body[0].kind {
            StmtKind::Return(Some(expr)) => assert_eq!(expr.ty(), TypeIdentifier::i64()),
            _ => panic!("expected return"),
        }
    }

    #[test]
    fn undefined_identifier_is_a_type_error() {
        let err = checked("fn f() -> i64 { return y; }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn comparison_produces_bool() {
        let p = checked("fn f(a: i64, b: i64) -> bool { return a == b; }").unwrap();
        let f = p.find_function("f").unwrap();
        match &f.body[0].kind {
            StmtKind::Return(Some(expr)) => assert_eq!(expr.ty(), TypeIdentifier::bool_()),
            _ => panic!("expected return"),
        }
    }

    #[test]
    fn while_condition_must_be_bool() {
        let err = checked("fn f(a: i64) -> i64 { while (a) { a = a - 1; } return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn call_arity_mismatch_is_rejected() {
        let err = checked("fn g(a: i64) -> i64 { return a; } fn f() -> i64 { return g(1, 2); }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn indexing_a_non_pointer_is_rejected() {
        let err = checked("fn f(a: i64) -> i64 { return a[0]; }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn pointer_plus_integer_keeps_pointer_type() {
        let p = checked("fn f(p: i64*) -> i64* { return p + 1; }").unwrap();
        let f = p.find_function("f").unwrap();
        match &f.body[0].kind {
            StmtKind::Return(Some(expr)) => assert_eq!(expr.ty(), TypeIdentifier::new(BaseType::I64, 1)),
            _ => panic!("expected return"),
        }
    }

    #[test]
    fn syscall_is_exempt_from_arity_checking() {
        checked("fn f() -> i64 { return syscall(60, 0); }").unwrap();
    }

    #[test]
    fn implicit_void_return_requires_no_value() {
        checked("fn f() -> void { }").unwrap();
    }
}
