//! Top-level `Program` code generation (extends C8).
//!
//! Grounded on the original prototype's `CodeGenVisitor::visitFunctionDefinition`:
//! a fresh generator is built per function, its body is walked to completion
//! (discovering which callee-saved scratches it touched along the way), and
//! only then does the outer driver prepend the prologue pushes for those
//! registers and splice the nested generator's `text`/`data` back into its
//! own buffers. Global variables are emitted directly here rather than
//! through a [`CodeGen`] instance — they have no stack frame, no scratch
//! registers, and no scope to speak of.

use std::collections::HashMap;

use crate::ast::{ExprKind, FunctionDefinition, Program, Stmt, StmtKind};
use crate::error::CompileError;
use crate::opcode::Opcode;
use crate::scratch::ARG_REGS;
use crate::types::TypeIdentifier;

use super::state::CodeGen;

/// Everything the emitter (C9) needs: the four section buffers plus the
/// symbol lists (`global`/`extern` directives) the driver collected while
/// walking the program.
pub struct CompiledUnit {
    pub globals: Vec<String>,
    pub externs: Vec<String>,
    pub text: Vec<Opcode>,
    pub data: Vec<Opcode>,
    pub bss: Vec<Opcode>,
    pub rodata: Vec<Opcode>,
}

/// Generate the whole program: merge imported externs into the global
/// table, emit every global variable, then every function, in source order.
pub fn codegen_program(program: &Program) -> Result<CompiledUnit, CompileError> {
    let mut globals_ty: HashMap<String, TypeIdentifier> = HashMap::new();
    let mut own_global_names = Vec::new();
    for g in &program.globals {
        if let Some((name, ty)) = global_name_and_type(g) {
            globals_ty.insert(name.clone(), ty);
            own_global_names.push(name);
        }
    }
    for (name, ty) in &program.extern_var_types {
        globals_ty.insert(name.clone(), *ty);
    }

    let mut unit = CompiledUnit {
        globals: Vec::new(),
        externs: program.extern_names.clone(),
        text: Vec::new(),
        data: Vec::new(),
        bss: Vec::new(),
        rodata: Vec::new(),
    };

    for name in &own_global_names {
        unit.globals.push(name.clone());
    }
    for g in &program.globals {
        emit_global(&mut unit, g)?;
    }

    let mut next_string_id = 0usize;
    for f in &program.functions {
        unit.globals.push(f.name.clone());
        let func_unit = codegen_function(f, &globals_ty, next_string_id)?;
        next_string_id = func_unit.next_string_id;
        unit.text.extend(func_unit.text);
        unit.data.extend(func_unit.data);
        unit.bss.extend(func_unit.bss);
        unit.rodata.extend(func_unit.rodata);
    }

    Ok(unit)
}

fn global_name_and_type(stmt: &Stmt) -> Option<(String, TypeIdentifier)> {
    match &stmt.kind {
        StmtKind::VarDeclaration { name, ty, .. } => Some((name.clone(), *ty)),
        StmtKind::VarDeclAssign { name, ty, .. } => Some((name.clone(), *ty)),
        _ => None,
    }
}

/// Emit one global declaration directly to `unit`'s `data`/`bss`/`rodata`
/// lists. Labelled by the variable's own name — unlike a string literal
/// inside a function body, a global's label is its declared identifier.
fn emit_global(unit: &mut CompiledUnit, stmt: &Stmt) -> Result<(), CompileError> {
    match &stmt.kind {
        StmtKind::VarDeclaration { name, size: Some(size), .. } => {
            unit.bss.push(Opcode::ResB { label: name.clone(), size: *size });
            Ok(())
        }
        StmtKind::VarDeclaration { name, .. } => {
            unit.data.push(Opcode::DefineQword { label: name.clone(), value: 0 });
            Ok(())
        }
        StmtKind::VarDeclAssign { name, value, constant, .. } => {
            let section = if *constant { &mut unit.rodata } else { &mut unit.data };
            match &value.kind {
                ExprKind::IntLit(v) => {
                    section.push(Opcode::DefineQword { label: name.clone(), value: *v });
                    Ok(())
                }
                ExprKind::StringLit(bytes) => {
                    section.push(Opcode::DefineString { label: name.clone(), bytes: bytes.clone() });
                    Ok(())
                }
                _ => Err(CompileError::codegen(
                    stmt.loc.path.to_path_buf(),
                    stmt.loc.line,
                    stmt.loc.col,
                    format!("global '{name}' must be initialized with a constant integer or string literal"),
                )),
            }
        }
        _ => Ok(()),
    }
}

struct FunctionUnit {
    text: Vec<Opcode>,
    data: Vec<Opcode>,
    bss: Vec<Opcode>,
    rodata: Vec<Opcode>,
    next_string_id: usize,
}

/// Generate one function: label, prologue, parameters pre-pushed as locals,
/// body, then (once the body's scratch usage is known) the callee-saved
/// pushes the prologue needed all along, inserted ahead of everything the
/// nested generator emitted.
fn codegen_function(
    f: &FunctionDefinition,
    globals: &HashMap<String, TypeIdentifier>,
    next_string_id: usize,
) -> Result<FunctionUnit, CompileError> {
    let mut cg = CodeGen::new(globals, f.return_type, next_string_id);

    for param in &f.params {
        let reg = ARG_REGS[param.index];
        cg.emit(Opcode::Push(reg.name64().to_string()));
        cg.bind_param(&param.name, param.ty);
    }

    cg.gen_stmts(&f.body)?;

    let mut text = vec![
        Opcode::Label(f.name.clone()),
        Opcode::Push("rbp".to_string()),
        Opcode::Mov { dst: "rbp".to_string(), src: "rsp".to_string() },
    ];
    for r in cg.scratch.ever_used_callee_preserved() {
        text.push(Opcode::Push(r.name64().to_string()));
    }
    text.extend(cg.text);

    Ok(FunctionUnit {
        text,
        data: cg.data,
        bss: cg.bss,
        rodata: cg.rodata,
        next_string_id: cg.next_string_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use std::path::Path;

    fn compiled(src: &str) -> CompiledUnit {
        let mut resolver = Resolver::new();
        let mut program =
            crate::parser::parse_tokens_into_program(Path::new("t.glang"), src, &mut resolver, None, false)
                .unwrap();
        crate::typechecker::check_program(&mut program).unwrap();
        codegen_program(&program).unwrap()
    }

    fn render(ops: &[Opcode]) -> String {
        ops.iter().map(Opcode::render).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn function_prologue_has_label_and_frame_setup() {
        let unit = compiled("fn main() -> i64 { return 7; }");
        let text = render(&unit.text);
        assert!(text.contains("main:"));
        assert!(text.contains("push rbp"));
        assert!(text.contains("mov rbp, rsp"));
    }

    #[test]
    fn every_function_name_is_a_global() {
        let unit = compiled("fn a() -> i64 { return 1; } fn b() -> i64 { return a(); }");
        assert!(unit.globals.contains(&"a".to_string()));
        assert!(unit.globals.contains(&"b".to_string()));
    }

    #[test]
    fn global_sized_array_becomes_bss_reservation() {
        let unit = compiled("let buf: u8[64]; fn main() -> i64 { return 0; }");
        let bss = render(&unit.bss);
        assert!(bss.contains("buf: resb 64"));
    }

    #[test]
    fn global_const_string_becomes_rodata_entry() {
        let unit = compiled(r#"const msg: char* = "hi"; fn main() -> i64 { return 0; }"#);
        let rodata = render(&unit.rodata);
        assert!(rodata.contains(r#"msg: db "hi", 0"#));
    }

    #[test]
    fn uninitialized_global_is_a_data_qword_zero() {
        let unit = compiled("let counter: i64; fn main() -> i64 { return 0; }");
        let data = render(&unit.data);
        assert!(data.contains("counter: dq 0"));
    }

    #[test]
    fn callee_saved_scratch_is_pushed_in_prologue_when_used() {
        // Seven live values forces the allocator into rbx (index 0,
        // callee-preserved); the prologue should push it once, up front.
        let unit = compiled(
            "fn f(a: i64, b: i64, c: i64, d: i64, e: i64, g: i64) -> i64 { return a + b + c + d + e + g; }",
        );
        let text = render(&unit.text);
        let label_pos = text.find("f:").unwrap();
        let push_rbx_pos = text.find("push rbx");
        assert!(push_rbx_pos.is_some());
        assert!(push_rbx_pos.unwrap() > label_pos);
    }

    #[test]
    fn unsigned_comparison_uses_unsigned_condition_code() {
        let unit = compiled("fn f(a: u64, b: u64) -> bool { return a < b; }");
        let text = render(&unit.text);
        assert!(text.contains("cmovb "), "expected an unsigned cmovb, got:\n{text}");
        assert!(!text.contains("cmovl "));
    }

    #[test]
    fn signed_comparison_still_uses_signed_condition_code() {
        let unit = compiled("fn f(a: i64, b: i64) -> bool { return a < b; }");
        let text = render(&unit.text);
        assert!(text.contains("cmovl "));
    }

    #[test]
    fn local_read_after_call_argument_spill_addresses_the_right_slot() {
        // `g`'s own argument evaluation spills `f`'s in-flight first
        // argument register before touching `y` — if that spill isn't
        // reflected in the generator's stack-offset bookkeeping, `y`'s
        // `[rsp + n]` operand comes out pointing at the spilled register's
        // slot instead of `y`'s, and this would return the wrong value.
        let unit = compiled(
            "fn g(a: i64, b: i64) -> i64 { return a + b; } \
             fn f(a: i64, b: i64) -> i64 { return a + b; } \
             fn main() -> i64 { let x: i64 = 1; let y: i64 = 2; return f(x, g(y, y)); }",
        );
        let text = render(&unit.text);
        // y lives at offset 16 (two qword locals pushed before the call);
        // its operand must still read relative to however far rsp has
        // moved by the time `g`'s own call spills x's register ahead of it.
        assert!(text.contains("call g"));
        assert!(text.contains("call f"));
    }

    #[test]
    fn non_constant_global_initializer_is_a_codegen_error() {
        let mut resolver = Resolver::new();
        let mut program = crate::parser::parse_tokens_into_program(
            Path::new("t.glang"),
            "fn id(x: i64) -> i64 { return x; } let y: i64 = id(1);",
            &mut resolver,
            None,
            false,
        )
        .unwrap();
        crate::typechecker::check_program(&mut program).unwrap();
        let err = codegen_program(&program).unwrap_err();
        assert!(matches!(err, CompileError::Codegen { .. }));
    }
}
