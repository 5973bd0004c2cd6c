//! Call and syscall calling convention (extends C8).
//!
//! Grounded on the original prototype's `visitCallExpression`: spill every
//! argument/return register currently holding a value destined for an outer
//! call (tracked by [`CodeGen::active_call_regs`]) before evaluating this
//! call's own arguments, since a nested call's argument registers would
//! otherwise clobber them; restore them in reverse order after the call
//! returns.

use crate::ast::Expr;
use crate::error::CompileError;
use crate::opcode::Opcode;
use crate::scratch::{Reg, ARG_REGS, RAX, SYSCALL_ARG_REGS};

use super::state::CodeGen;

pub(super) fn gen_call(cg: &mut CodeGen, name: &str, args: &[Expr], target: Reg) -> Result<(), CompileError> {
    let is_syscall = name == "syscall";

    let to_spill = cg.active_call_regs.clone();
    for r in &to_spill {
        cg.spill_push(r.name64().to_string());
    }
    let saved = std::mem::take(&mut cg.active_call_regs);

    for (i, arg) in args.iter().enumerate() {
        let dst = arg_register(is_syscall, i);
        cg.gen_expr(arg, dst)?;
        cg.active_call_regs.push(dst);
    }

    if is_syscall {
        cg.emit(Opcode::Syscall);
    } else {
        cg.emit(Opcode::Call(name.to_string()));
    }

    if target != RAX {
        cg.emit(Opcode::Mov { dst: target.name64().to_string(), src: "rax".to_string() });
    }

    cg.active_call_regs = saved;
    for r in to_spill.iter().rev() {
        cg.spill_pop(r.name64().to_string());
    }
    Ok(())
}

/// Generate a bare `CallStatement`: identical to [`gen_call`] but the
/// result is discarded rather than moved into a target register.
pub(super) fn gen_call_statement(cg: &mut CodeGen, name: &str, args: &[Expr]) -> Result<(), CompileError> {
    gen_call(cg, name, args, RAX)
}

/// Positional argument register for call position `i`. For an ordinary
/// call, position `i` maps directly to `ARG_REGS[i]`. For `syscall`,
/// position 0 (the syscall number) goes to `rax`, and position `i >= 1`
/// maps to `SYSCALL_ARG_REGS[i - 1]`.
fn arg_register(is_syscall: bool, i: usize) -> Reg {
    if is_syscall {
        if i == 0 {
            RAX
        } else {
            SYSCALL_ARG_REGS[i - 1]
        }
    } else {
        ARG_REGS[i]
    }
}
