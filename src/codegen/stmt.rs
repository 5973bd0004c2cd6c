//! Statement emission (extends C8).
//!
//! Every function here walks one [`Stmt`] against the enclosing function's
//! [`CodeGen`]. `Compound`/`EndCompound` bracket a [`ScopeChain`](crate::scope::ScopeChain)
//! frame exactly the way the parser bracketed it syntactically: a `Compound`
//! pushes a frame and recurses, and the `EndCompound` the parser appended to
//! *every* compound (including the implicit one closing a function body)
//! pops it and discards its slots. That uniform treatment means the
//! function body's own trailing `EndCompound` pops the same root frame
//! [`crate::scope::ScopeChain::new`] opened — it never runs at runtime
//! (the preceding `Return` already emitted `ret`), so the discard-pops it
//! emits are dead code, not a bug.

use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::error::CompileError;
use crate::opcode::Opcode;
use crate::scratch::{Reg, Width, RAX};
use crate::types::TypeIdentifier;

use super::state::CodeGen;

/// Register clobbered to discard a popped stack slot whose value nothing
/// needs. Never `rax`: a `Return`'s value already lives there when this
/// runs.
const DISCARD_REG: &str = "rdx";

impl<'a> CodeGen<'a> {
    pub(super) fn gen_stmts(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        for s in stmts {
            self.gen_stmt(s)?;
        }
        Ok(())
    }

    pub(super) fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::Compound(inner) => {
                self.push_scope();
                self.gen_stmts(inner)
            }
            StmtKind::EndCompound => {
                let count = self.pop_scope();
                for _ in 0..count {
                    self.emit(Opcode::Pop(DISCARD_REG.to_string()));
                }
                Ok(())
            }
            StmtKind::If { cond, body } => self.gen_if(cond, body),
            StmtKind::IfElse { cond, if_body, else_body } => self.gen_if_else(cond, if_body, else_body),
            StmtKind::While { cond, body } => self.gen_while(cond, body),
            StmtKind::Return(value) => self.gen_return(value.as_ref()),
            StmtKind::CallStatement { name, args } => super::calls::gen_call_statement(self, name, args),
            StmtKind::VarAssignment { lhs, rhs } => self.gen_var_assignment(lhs, rhs),
            StmtKind::VarDeclaration { name, ty, size } => self.gen_local_var_declaration(stmt, name, *ty, *size),
            StmtKind::VarDeclAssign { name, ty, value, .. } => self.gen_local_var_decl_assign(name, *ty, value),
        }
    }

    fn gen_if(&mut self, cond: &Expr, body: &Stmt) -> Result<(), CompileError> {
        let (_, end_label) = self.next_if_labels();
        self.gen_branch_test(cond, &end_label)?;
        self.gen_stmt(body)?;
        self.emit(Opcode::Label(end_label));
        Ok(())
    }

    fn gen_if_else(&mut self, cond: &Expr, if_body: &Stmt, else_body: &Stmt) -> Result<(), CompileError> {
        let (else_label, end_label) = self.next_if_labels();
        self.gen_branch_test(cond, &else_label)?;
        self.gen_stmt(if_body)?;
        self.emit(Opcode::Jmp(end_label.clone()));
        self.emit(Opcode::Label(else_label));
        self.gen_stmt(else_body)?;
        self.emit(Opcode::Label(end_label));
        Ok(())
    }

    fn gen_while(&mut self, cond: &Expr, body: &Stmt) -> Result<(), CompileError> {
        let (start_label, end_label) = self.next_while_labels();
        self.emit(Opcode::Label(start_label.clone()));
        self.gen_branch_test(cond, &end_label)?;
        self.gen_stmt(body)?;
        self.emit(Opcode::Jmp(start_label));
        self.emit(Opcode::Label(end_label));
        Ok(())
    }

    /// Evaluate `cond` and jump to `false_label` if it's zero (false).
    fn gen_branch_test(&mut self, cond: &Expr, false_label: &str) -> Result<(), CompileError> {
        let r = self.alloc_scratch(cond)?;
        self.gen_expr(cond, r)?;
        self.emit(Opcode::Cmp { left: r.name64().to_string(), right: "0".to_string() });
        self.scratch.free(r);
        self.emit(Opcode::Je(false_label.to_string()));
        Ok(())
    }

    /// `self.offset / 8` slots are currently live (params plus every local
    /// declared in every scope still open at this point, whether or not
    /// its `EndCompound` has run yet) and must be popped before the
    /// callee-saved registers so the epilogue's `mov rsp, rbp` lands on a
    /// stack depth consistent with `push rbp` regardless of which nested
    /// block this `return` sits inside.
    fn gen_return(&mut self, value: Option<&Expr>) -> Result<(), CompileError> {
        if let Some(v) = value {
            self.gen_expr(v, RAX)?;
        }
        let pop_count = self.offset / 8;
        for _ in 0..pop_count {
            self.emit(Opcode::Pop(DISCARD_REG.to_string()));
        }
        for r in self.scratch.ever_used_callee_preserved().iter().rev() {
            self.emit(Opcode::Pop(r.name64().to_string()));
        }
        self.emit(Opcode::Ret);
        Ok(())
    }

    fn gen_local_var_declaration(
        &mut self,
        stmt: &Stmt,
        name: &str,
        ty: TypeIdentifier,
        size: Option<i64>,
    ) -> Result<(), CompileError> {
        if size.is_some() {
            return Err(CompileError::codegen(
                stmt.loc.path.to_path_buf(),
                stmt.loc.line,
                stmt.loc.col,
                "sized array declarations are only supported for global variables",
            ));
        }
        self.emit(Opcode::Push("0".to_string()));
        self.declare_local(name, ty);
        Ok(())
    }

    /// Push the initializer's full 64-bit result regardless of `ty`'s
    /// declared width: every later read of this local goes through
    /// [`CodeGen::gen_mem_load`], which narrows to `ty`'s width at read
    /// time, so whatever garbage sits in the unused upper bits of the
    /// pushed qword never becomes observable.
    fn gen_local_var_decl_assign(&mut self, name: &str, ty: TypeIdentifier, value: &Expr) -> Result<(), CompileError> {
        let r = self.alloc_scratch(value)?;
        self.gen_expr(value, r)?;
        self.emit(Opcode::Push(r.name64().to_string()));
        self.scratch.free(r);
        self.declare_local(name, ty);
        Ok(())
    }

    fn gen_var_assignment(&mut self, lhs: &Expr, rhs: &Expr) -> Result<(), CompileError> {
        let (name, index) = match &lhs.kind {
            ExprKind::IdExpression { name, index } => (name.as_str(), index.as_deref()),
            _ => {
                return Err(CompileError::codegen(
                    lhs.loc.path.to_path_buf(),
                    lhs.loc.line,
                    lhs.loc.col,
                    "assignment target must be a variable, optionally indexed and/or dereferenced",
                ))
            }
        };

        if index.is_none() && lhs.deref_depth == 0 {
            let resolved = self.resolve(name).ok_or_else(|| {
                CompileError::codegen(
                    lhs.loc.path.to_path_buf(),
                    lhs.loc.line,
                    lhs.loc.col,
                    format!("undefined identifier '{name}' reached codegen"),
                )
            })?;
            let operand = self.memory_operand(name, resolved);
            let r = self.alloc_scratch(rhs)?;
            self.gen_expr(rhs, r)?;
            self.gen_mem_store(operand, r, lhs.ty());
            self.scratch.free(r);
            return Ok(());
        }

        let addr = self.alloc_scratch(lhs)?;
        let operand = self.gen_lvalue_address(lhs, name, index, addr)?;
        let r = self.alloc_scratch(rhs)?;
        self.gen_expr(rhs, r)?;
        self.gen_mem_store(operand, r, lhs.ty());
        self.scratch.free(r);
        self.scratch.free(addr);
        Ok(())
    }

    /// Store `reg` (truncated to `ty`'s declared width) into `operand`.
    fn gen_mem_store(&mut self, operand: String, reg: Reg, ty: TypeIdentifier) {
        let width = Width::from_size(ty.size());
        self.emit(Opcode::Mov { dst: operand, src: reg.name(width).to_string() });
    }

    /// Compute the address an indexed and/or dereferenced assignment
    /// target should store into, leaving it in `addr_reg` and returning
    /// the NASM memory operand to store through. Runs the identical chain
    /// [`CodeGen::gen_identifier`] walks for a read, but stops one load
    /// short of the final dereference — that final load is exactly the
    /// store this assignment performs, so it's never actually issued.
    fn gen_lvalue_address(
        &mut self,
        expr: &Expr,
        name: &str,
        index: Option<&Expr>,
        addr_reg: Reg,
    ) -> Result<String, CompileError> {
        let resolved = self.resolve(name).ok_or_else(|| {
            CompileError::codegen(
                expr.loc.path.to_path_buf(),
                expr.loc.line,
                expr.loc.col,
                format!("undefined identifier '{name}' reached codegen"),
            )
        })?;
        let var_ty = match resolved {
            super::state::Resolved::Local(v) => v.ty,
            super::state::Resolved::Global(ty) => ty,
        };
        let operand = self.memory_operand(name, resolved);

        let Some(idx) = index else {
            // No index: the variable's own slot already holds the pointer
            // that `deref_depth` walks, so load it and chase all but the
            // last indirection.
            self.gen_mem_load(addr_reg, operand, var_ty);
            let mut cur_ty = var_ty;
            for _ in 0..expr.deref_depth.saturating_sub(1) {
                cur_ty = cur_ty.deref_one();
                self.gen_mem_load(addr_reg, format!("[{}]", addr_reg.name64()), cur_ty);
            }
            return Ok(format!("[{}]", addr_reg.name64()));
        };

        self.gen_mem_load(addr_reg, operand, var_ty);
        let scratch = self.alloc_scratch(expr)?;
        self.gen_expr(idx, scratch)?;
        let elem_ty = var_ty.deref_one();
        if elem_ty.size() != 1 {
            self.emit(Opcode::Imul { dst: scratch.name64().to_string(), src: elem_ty.size().to_string() });
        }
        self.emit(Opcode::Add { dst: addr_reg.name64().to_string(), src: scratch.name64().to_string() });
        self.scratch.free(scratch);

        if expr.deref_depth == 0 {
            return Ok(format!("[{}]", addr_reg.name64()));
        }

        // A read would load the indexed element now and chase `deref_depth`
        // more indirections; an address computation does the same but
        // stops one load short, i.e. only `deref_depth` loads here.
        let mut cur_ty = elem_ty;
        self.gen_mem_load(addr_reg, format!("[{}]", addr_reg.name64()), cur_ty);
        for _ in 0..expr.deref_depth.saturating_sub(1) {
            cur_ty = cur_ty.deref_one();
            self.gen_mem_load(addr_reg, format!("[{}]", addr_reg.name64()), cur_ty);
        }
        Ok(format!("[{}]", addr_reg.name64()))
    }
}
