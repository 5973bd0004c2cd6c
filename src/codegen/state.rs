//! [`CodeGen`]: the mutable state one function body's emission needs.
//!
//! Grounded on the teacher's `codegen::state::CodeGen` (one struct owning
//! every piece of mutable emission state, constructed fresh per unit of
//! work) generalized from the teacher's LLVM-IR string buffer to glang's
//! four opcode lists. A fresh instance is built for every
//! [`crate::ast::FunctionDefinition`] so register and scope usage never
//! leaks between functions; [`super::program`] splices each instance's
//! `text`/`data`/`bss`/`rodata` back into the program-wide output after the
//! nested call returns.

use std::collections::HashMap;

use crate::opcode::Opcode;
use crate::scope::{ScopeChain, Var};
use crate::scratch::{Reg, ScratchAllocator};
use crate::types::TypeIdentifier;

/// What an identifier resolved to: a local/parameter slot addressed off
/// `rsp`, or a global addressed by its bare symbol name.
#[derive(Debug, Clone, Copy)]
pub enum Resolved {
    Local(Var),
    Global(TypeIdentifier),
}

pub struct CodeGen<'a> {
    /// Global variable types, shared read-only across every function's
    /// generator (own globals plus extern var types merged by
    /// [`super::program`]).
    pub(super) globals: &'a HashMap<String, TypeIdentifier>,
    pub(super) return_type: TypeIdentifier,

    pub(super) scopes: ScopeChain,
    /// Bytes currently pushed for params and live locals, relative to the
    /// point right after the callee-saved register pushes. Grows on every
    /// param bind and `VarDeclaration`/`VarDeclAssign`, shrinks when a
    /// compound's scope closes.
    pub(super) offset: i64,
    pub(super) scratch: ScratchAllocator,

    pub(super) text: Vec<Opcode>,
    pub(super) data: Vec<Opcode>,
    pub(super) bss: Vec<Opcode>,
    pub(super) rodata: Vec<Opcode>,

    /// Next free `string_<n>` label, threaded in from the outer driver so
    /// labels stay unique across every function's string literals.
    pub(super) next_string_id: usize,

    if_index: usize,
    while_index: usize,

    /// Argument/return registers (`rax` plus the six arg registers) that
    /// currently hold a value destined for an outer, not-yet-emitted call —
    /// spilled and restored around any call made while evaluating a nested
    /// call's own arguments. Reset empty at the start of each statement.
    pub(super) active_call_regs: Vec<Reg>,
}

impl<'a> CodeGen<'a> {
    pub fn new(globals: &'a HashMap<String, TypeIdentifier>, return_type: TypeIdentifier, next_string_id: usize) -> Self {
        CodeGen {
            globals,
            return_type,
            scopes: ScopeChain::new(),
            offset: 0,
            scratch: ScratchAllocator::new(),
            text: Vec::new(),
            data: Vec::new(),
            bss: Vec::new(),
            rodata: Vec::new(),
            next_string_id,
            if_index: 0,
            while_index: 0,
            active_call_regs: Vec::new(),
        }
    }

    pub(super) fn emit(&mut self, op: Opcode) {
        self.text.push(op);
    }

    /// Push a value that is not a declared local (a caller-saved spill
    /// ahead of a call, or `rax`/`rdx` around a retargeted `idiv`/`mul`).
    /// Every local's memory operand is computed as `[rsp + (offset -
    /// var.offset)]`, so any push that moves `rsp` without moving `offset`
    /// along with it would point every in-flight local reference at the
    /// wrong slot for as long as the spill is live — this keeps the two in
    /// lockstep the same way [`CodeGen::declare_local`] does for locals.
    pub(super) fn spill_push(&mut self, operand: String) {
        self.emit(Opcode::Push(operand));
        self.offset += 8;
    }

    /// Undo [`CodeGen::spill_push`]: pop the value back off and shrink
    /// `offset` by the same 8 bytes.
    pub(super) fn spill_pop(&mut self, operand: String) {
        self.emit(Opcode::Pop(operand));
        self.offset -= 8;
    }

    /// Bind `name` to a fresh local slot at the current offset (after
    /// growing it by this type's slot size) and return the slot.
    pub(super) fn declare_local(&mut self, name: &str, ty: TypeIdentifier) -> Var {
        self.offset += 8; // every local/param occupies one qword slot, regardless of its declared width
        let var = Var { offset: self.offset, ty };
        self.scopes.declare(name, var);
        var
    }

    /// Bind a parameter already pushed (by the caller, via its own
    /// register push) to a fresh local slot, exactly like
    /// [`CodeGen::declare_local`] — parameters and locals share one
    /// offset-addressed slot space.
    pub(super) fn bind_param(&mut self, name: &str, ty: TypeIdentifier) -> Var {
        self.declare_local(name, ty)
    }

    pub(super) fn resolve(&self, name: &str) -> Option<Resolved> {
        if let Some(v) = self.scopes.lookup(name) {
            return Some(Resolved::Local(v));
        }
        self.globals.get(name).map(|ty| Resolved::Global(*ty))
    }

    /// The NASM memory operand for a resolved variable: `[rsp + n]` for a
    /// local (offset relative to the current stack depth), or `[name]` for
    /// a global.
    pub(super) fn memory_operand(&self, name: &str, resolved: Resolved) -> String {
        match resolved {
            Resolved::Local(var) => format!("[rsp + {}]", self.offset - var.offset),
            Resolved::Global(_) => format!("[{name}]"),
        }
    }

    pub(super) fn push_scope(&mut self) {
        self.scopes.push();
    }

    /// Close the innermost scope: restore `offset` to what it was before
    /// that scope opened and return how many variable slots it held (the
    /// caller emits that many discard-pops at the point it's safe to do so).
    pub(super) fn pop_scope(&mut self) -> usize {
        let count = self.scopes.pop();
        self.offset -= 8 * count as i64;
        count
    }

    pub(super) fn next_if_labels(&mut self) -> (String, String) {
        let n = self.if_index;
        self.if_index += 1;
        (format!(".If{n}_Else"), format!(".If{n}_End"))
    }

    pub(super) fn next_while_labels(&mut self) -> (String, String) {
        let n = self.while_index;
        self.while_index += 1;
        (format!(".while{n}_start"), format!(".while{n}_end"))
    }

    pub(super) fn next_string_label(&mut self) -> String {
        let label = format!("string_{}", self.next_string_id);
        self.next_string_id += 1;
        label
    }
}
