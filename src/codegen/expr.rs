//! Expression emission (extends C8).
//!
//! Every function here evaluates an [`Expr`] into a caller-chosen register.
//! Intermediate values always travel in a full 64-bit scratch register;
//! narrower widths only matter at the two boundaries where a value actually
//! crosses into memory: loading from a slot/global (`LoadSized`, chosen per
//! the variable's declared width) and storing to one (`stmt::gen_var_assignment`
//! picks the right sub-register name for the store). This is a direct
//! simplification of the original prototype's `deref()`/`makeType()` split,
//! which performed the same two steps (blind 64-bit intermediate loads, a
//! final width-coercing load) as two separate passes over the same chain.

use crate::ast::{BinaryOperator, Expr, ExprKind};
use crate::error::CompileError;
use crate::opcode::{Cc, Opcode};
use crate::scratch::{Reg, Width};
use crate::types::TypeIdentifier;

use super::state::{CodeGen, Resolved};

impl<'a> CodeGen<'a> {
    pub(super) fn gen_expr(&mut self, expr: &Expr, target: Reg) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::IntLit(v) => {
                self.emit(Opcode::Mov { dst: target.name64().to_string(), src: v.to_string() });
                Ok(())
            }
            ExprKind::CharLit(c) => {
                self.emit(Opcode::Xor { dst: target.name64().to_string(), src: target.name64().to_string() });
                self.emit(Opcode::Mov { dst: target.name(Width::W8).to_string(), src: c.to_string() });
                Ok(())
            }
            ExprKind::StringLit(bytes) => {
                let label = self.next_string_label();
                self.data.push(Opcode::DefineString { label: label.clone(), bytes: bytes.clone() });
                self.emit(Opcode::Mov { dst: target.name64().to_string(), src: label });
                Ok(())
            }
            // IdExpression applies its own leading `*` run inline, since it
            // already walks a chain of typed memory loads for `[index]`.
            ExprKind::IdExpression { name, index } => self.gen_identifier(expr, name, index.as_deref(), target),
            ExprKind::BinaryExpression { op, left, right } => {
                self.gen_binary(expr, *op, left, right, target)?;
                self.gen_leading_derefs(expr, target)
            }
            ExprKind::CallExpression { name, args } => {
                super::calls::gen_call(self, name, args, target)?;
                self.gen_leading_derefs(expr, target)
            }
        }
    }

    /// Apply `expr.deref_depth` leading `*` indirections to a value already
    /// sitting in `target`, for any expression kind other than
    /// `IdExpression` (which folds this into its own load chain). The type
    /// before any deref is reconstructed by adding `deref_depth` pointer
    /// levels back onto `expr.ty()`, the type checker's already-fully-
    /// dereferenced result.
    fn gen_leading_derefs(&mut self, expr: &Expr, target: Reg) -> Result<(), CompileError> {
        if expr.deref_depth == 0 {
            return Ok(());
        }
        let final_ty = expr.ty();
        let mut cur_ty = TypeIdentifier::new(final_ty.base, final_ty.ptr_depth + expr.deref_depth);
        for _ in 0..expr.deref_depth {
            cur_ty = cur_ty.deref_one();
            self.gen_mem_load(target, format!("[{}]", target.name64()), cur_ty);
        }
        Ok(())
    }

    /// Load `operand` of type `ty` into `reg`, selecting the load width for
    /// `ty`'s declared size (pointers are always 8 bytes, so this also
    /// covers every blind pointer-value load in a deref chain).
    pub(super) fn gen_mem_load(&mut self, reg: Reg, operand: String, ty: TypeIdentifier) {
        self.emit(Opcode::LoadSized {
            dst: reg,
            src: operand,
            size: ty.size(),
            signed: !ty.is_pointer() && ty.base.is_signed(),
        });
    }

    fn gen_identifier(
        &mut self,
        expr: &Expr,
        name: &str,
        index: Option<&Expr>,
        target: Reg,
    ) -> Result<(), CompileError> {
        let resolved = self
            .resolve(name)
            .ok_or_else(|| CompileError::codegen(expr.loc.path.to_path_buf(), expr.loc.line, expr.loc.col, format!("undefined identifier '{name}' reached codegen")))?;
        let var_ty = match resolved {
            Resolved::Local(v) => v.ty,
            Resolved::Global(ty) => ty,
        };
        let operand = self.memory_operand(name, resolved);

        let mut cur_ty = var_ty;
        self.gen_mem_load(target, operand, cur_ty);

        if let Some(idx) = index {
            let scratch = self.alloc_scratch(expr)?;
            self.gen_expr(idx, scratch)?;
            let elem_ty = cur_ty.deref_one();
            if elem_ty.size() != 1 {
                self.emit(Opcode::Imul { dst: scratch.name64().to_string(), src: elem_ty.size().to_string() });
            }
            self.emit(Opcode::Add { dst: target.name64().to_string(), src: scratch.name64().to_string() });
            self.scratch.free(scratch);
            cur_ty = elem_ty;
            self.gen_mem_load(target, format!("[{}]", target.name64()), cur_ty);
        }

        for _ in 0..expr.deref_depth {
            cur_ty = cur_ty.deref_one();
            self.gen_mem_load(target, format!("[{}]", target.name64()), cur_ty);
        }

        Ok(())
    }

    pub(super) fn alloc_scratch(&mut self, expr: &Expr) -> Result<Reg, CompileError> {
        self.scratch.allocate().ok_or_else(|| {
            CompileError::codegen(
                expr.loc.path.to_path_buf(),
                expr.loc.line,
                expr.loc.col,
                "scratch register pool exhausted",
            )
        })
    }

    fn gen_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        target: Reg,
    ) -> Result<(), CompileError> {
        if op.is_relational() {
            return self.gen_comparison(expr, op, left, right, target);
        }
        if op.is_bitwise() {
            self.gen_expr(left, target)?;
            let r = self.alloc_scratch(expr)?;
            self.gen_expr(right, r)?;
            self.emit(match op {
                BinaryOperator::BitOr => Opcode::Or { dst: target.name64().to_string(), src: r.name64().to_string() },
                BinaryOperator::BitAnd => Opcode::And { dst: target.name64().to_string(), src: r.name64().to_string() },
                _ => unreachable!(),
            });
            self.scratch.free(r);
            return Ok(());
        }
        if op.is_div_or_mod() {
            return self.gen_div_or_mod(expr, op, left, right, target);
        }
        if op == BinaryOperator::Star {
            return self.gen_multiply(expr, left, right, target);
        }
        // Plus / Minus: plain add/sub, pointer arithmetic included (raw
        // byte offsets — indexing already applies element scaling).
        self.gen_expr(left, target)?;
        let r = self.alloc_scratch(expr)?;
        self.gen_expr(right, r)?;
        self.emit(match op {
            BinaryOperator::Plus => Opcode::Add { dst: target.name64().to_string(), src: r.name64().to_string() },
            BinaryOperator::Minus => Opcode::Sub { dst: target.name64().to_string(), src: r.name64().to_string() },
            _ => unreachable!(),
        });
        self.scratch.free(r);
        Ok(())
    }

    fn gen_comparison(
        &mut self,
        expr: &Expr,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        target: Reg,
    ) -> Result<(), CompileError> {
        let l = self.alloc_scratch(expr)?;
        self.gen_expr(left, l)?;
        let r = self.alloc_scratch(expr)?;
        self.gen_expr(right, r)?;
        let one_reg = self.alloc_scratch(expr)?;
        self.emit(Opcode::CmpSet {
            cc: Cc::from_relational(op, Self::is_signed_operation(left)),
            target: target.name64().to_string(),
            one_reg: one_reg.name64().to_string(),
            left: l.name64().to_string(),
            right: r.name64().to_string(),
        });
        self.scratch.free(l);
        self.scratch.free(r);
        self.scratch.free(one_reg);
        Ok(())
    }

    /// Signedness for a division-family, multiply, or ordering-comparison
    /// operator is driven by the left operand's own declared type (its
    /// type pre-promotion — the binary expression's own `.ty()` is always
    /// I64 (or, for comparisons, BOOL) once the type checker has promoted
    /// it, per [`TypeIdentifier::promote_for_arith`], so the left
    /// sub-expression's type is the only place this survives). Pointer
    /// operands fall through `BaseType::is_signed` to `false`, which is
    /// correct: addresses order as unsigned quantities.
    fn is_signed_operation(left: &Expr) -> bool {
        left.ty().base.is_signed()
    }

    fn gen_multiply(&mut self, expr: &Expr, left: &Expr, right: &Expr, target: Reg) -> Result<(), CompileError> {
        if Self::is_signed_operation(left) {
            self.gen_expr(left, target)?;
            let r = self.alloc_scratch(expr)?;
            self.gen_expr(right, r)?;
            self.emit(Opcode::Imul { dst: target.name64().to_string(), src: r.name64().to_string() });
            self.scratch.free(r);
            Ok(())
        } else {
            self.gen_rax_retargeted(expr, left, right, target, |cg, r| {
                cg.emit(Opcode::Mul { operand: r.name64().to_string() });
            })
        }
    }

    fn gen_div_or_mod(
        &mut self,
        expr: &Expr,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        target: Reg,
    ) -> Result<(), CompileError> {
        let signed = Self::is_signed_operation(left);
        let is_mod = op == BinaryOperator::Mod;
        self.gen_rax_retargeted(expr, left, right, target, move |cg, r| {
            if signed {
                cg.emit(Opcode::Cqo);
                cg.emit(Opcode::Idiv { operand: r.name64().to_string() });
            } else {
                cg.emit(Opcode::Xor { dst: "rdx".to_string(), src: "rdx".to_string() });
                cg.emit(Opcode::Div { operand: r.name64().to_string() });
            }
            if is_mod {
                cg.emit(Opcode::Mov { dst: "rax".to_string(), src: "rdx".to_string() });
            }
        })
    }

    /// Evaluate `left`/`right`, retarget the operation through `rax` (as
    /// `idiv`/`div`/`mul` require), spilling `rax`/`rdx` around it if either
    /// is currently live, then move the result into `target` if it isn't
    /// already `rax`.
    fn gen_rax_retargeted(
        &mut self,
        expr: &Expr,
        left: &Expr,
        right: &Expr,
        target: Reg,
        op: impl FnOnce(&mut Self, Reg),
    ) -> Result<(), CompileError> {
        use crate::scratch::RAX;

        let spill_rax = target != RAX;
        if spill_rax {
            self.spill_push("rax".to_string());
        }
        self.spill_push("rdx".to_string());

        self.gen_expr(left, RAX)?;
        let r = self.alloc_scratch(expr)?;
        self.gen_expr(right, r)?;
        op(self, r);
        self.scratch.free(r);

        if target != RAX {
            self.emit(Opcode::Mov { dst: target.name64().to_string(), src: "rax".to_string() });
        }

        self.spill_pop("rdx".to_string());
        if spill_rax {
            self.spill_pop("rax".to_string());
        }
        Ok(())
    }
}
