//! Emitter / driver (C9): orders sections, writes the `global`/`extern`
//! header, and renders the `.text`/`.data`/`.bss`/`.rodata` segments to NASM
//! text.
//!
//! Grounded on the original prototype's `main.cpp` output loop: `section
//! .text` first, with `_start` (unless building a library) reading `argc`
//! off the stack and `argv` as `rsp + 8` before calling `main`, then the
//! `global`/`extern` directive block, then the rendered text opcodes, then
//! `.data`, `.bss`, `.rodata` in that fixed order.

use crate::codegen::program::CompiledUnit;
use crate::opcode::Opcode;

/// Render a [`CompiledUnit`] to the complete NASM source text for the
/// output `.asm` file. `library` suppresses the `_start` entry point,
/// matching the `-L`/`--library` CLI flag.
pub fn emit(unit: &CompiledUnit, library: bool) -> String {
    let mut out = String::new();

    out.push_str("section .text\n");
    if !library {
        out.push_str("global _start\n");
        out.push_str("_start:\n");
        out.push_str("\tmov rdi, [rsp]\n");
        out.push_str("\tlea rsi, [rsp + 8]\n");
        out.push_str("\tcall main\n");
        out.push_str("\tmov rdi, rax\n");
        out.push_str("\tmov rax, 60\n");
        out.push_str("\tsyscall\n");
    }

    for name in &unit.globals {
        out.push_str(&Opcode::Global(name.clone()).render());
        out.push('\n');
    }
    for name in &unit.externs {
        out.push_str(&Opcode::Extern(name.clone()).render());
        out.push('\n');
    }

    render_section(&mut out, &unit.text);

    out.push_str("\nsection .data\n");
    render_section(&mut out, &unit.data);

    out.push_str("\nsection .bss\n");
    render_section(&mut out, &unit.bss);

    out.push_str("\nsection .rodata\n");
    render_section(&mut out, &unit.rodata);

    out
}

fn render_section(out: &mut String, ops: &[Opcode]) {
    for op in ops {
        out.push_str(&op.render());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::program::codegen_program;
    use crate::resolver::Resolver;
    use std::path::Path;

    fn emitted(src: &str, library: bool) -> String {
        let mut resolver = Resolver::new();
        let mut program =
            crate::parser::parse_tokens_into_program(Path::new("t.glang"), src, &mut resolver, None, false)
                .unwrap();
        crate::typechecker::check_program(&mut program).unwrap();
        let unit = codegen_program(&program).unwrap();
        emit(&unit, library)
    }

    #[test]
    fn executable_build_gets_start_entry_point() {
        let text = emitted("fn main() -> i64 { return 0; }", false);
        assert!(text.contains("global _start"));
        assert!(text.contains("_start:"));
        assert!(text.contains("call main"));
        assert!(text.contains("mov rax, 60"));
    }

    #[test]
    fn library_build_has_no_start_entry_point() {
        let text = emitted("fn helper() -> i64 { return 0; }", true);
        assert!(!text.contains("_start"));
        assert!(!text.contains("global _start"));
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let text = emitted(
            "let g: i64; fn main() -> i64 { let s: char* = \"hi\"; return 0; }",
            false,
        );
        let text_pos = text.find("section .text").unwrap();
        let data_pos = text.find("section .data").unwrap();
        let bss_pos = text.find("section .bss").unwrap();
        let rodata_pos = text.find("section .rodata").unwrap();
        assert!(text_pos < data_pos);
        assert!(data_pos < bss_pos);
        assert!(bss_pos < rodata_pos);
    }

    #[test]
    fn function_name_is_a_global_directive() {
        let text = emitted("fn main() -> i64 { return 0; }", false);
        assert!(text.contains("global main"));
    }

    #[test]
    fn imported_symbols_become_externs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("util.glang"), "fn helper(x: i64) -> i64 { return x; }").unwrap();
        let main_path = dir.path().join("main.glang");
        std::fs::write(&main_path, "import(\"util\");\nfn main() -> i64 { return helper(1); }").unwrap();

        let mut resolver = Resolver::new();
        let mut program = crate::parser::parse_tokens_into_program(
            &main_path,
            &std::fs::read_to_string(&main_path).unwrap(),
            &mut resolver,
            None,
            false,
        )
        .unwrap();
        crate::typechecker::check_program(&mut program).unwrap();
        let unit = codegen_program(&program).unwrap();
        let text = emit(&unit, false);
        assert!(text.contains("extern helper"));
        assert!(text.contains("call helper"));
    }
}
