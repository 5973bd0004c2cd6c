//! Opcode model (C5): one variant per emitted NASM instruction, each
//! knowing how to render itself. Code generation is purely a matter of
//! appending to the text/data/bss/rodata lists; rendering has no branches
//! over emit-time context — everything an opcode needs to print itself is
//! baked into its fields when it's constructed.

use std::fmt::Write as _;

use crate::scratch::{Reg, Width};

/// Condition code for the comparison trio (`BinaryExpression` relational
/// operators). Maps 1:1 to a `cmovcc` mnemonic suffix. Ordering operators
/// (everything but `E`/`Ne`) come in a signed and an unsigned flavor:
/// comparing two operands whose declared type is unsigned (or a pointer —
/// addresses order as unsigned) with a signed condition code gives the
/// wrong answer whenever the high bit is set, the same class of bug the
/// spec calls out by name for `idiv`/`div` signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cc {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
    B,
    Be,
    A,
    Ae,
}

impl Cc {
    fn suffix(self) -> &'static str {
        match self {
            Cc::E => "e",
            Cc::Ne => "ne",
            Cc::L => "l",
            Cc::Le => "le",
            Cc::G => "g",
            Cc::Ge => "ge",
            Cc::B => "b",
            Cc::Be => "be",
            Cc::A => "a",
            Cc::Ae => "ae",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    Label(String),
    Push(String),
    Pop(String),
    Mov { dst: String, src: String },
    Lea { dst: String, src: String },
    Add { dst: String, src: String },
    Sub { dst: String, src: String },
    /// Two-operand signed multiply: `imul dst, src`.
    Imul { dst: String, src: String },
    /// One-operand unsigned multiply: `mul operand` (result in `rdx:rax`).
    Mul { operand: String },
    /// One-operand signed divide: `idiv operand` (quotient `rax`, remainder `rdx`).
    Idiv { operand: String },
    /// One-operand unsigned divide: `div operand`.
    Div { operand: String },
    /// Sign-extend `rax` into `rdx:rax`, required before a signed `idiv`.
    Cqo,
    Or { dst: String, src: String },
    And { dst: String, src: String },
    Xor { dst: String, src: String },
    Cmp { left: String, right: String },
    /// The "zero/one + cmp + cmovcc" trio that produces a BOOL result.
    CmpSet {
        cc: Cc,
        target: String,
        one_reg: String,
        left: String,
        right: String,
    },
    /// Load a sub-64-bit memory operand into a register: `mov` targeting the
    /// full 64-bit name for 8 bytes, `movsx`/`movzx` targeting the full
    /// 64-bit name (chosen by `signed`) with an explicit `byte`/`word`
    /// operand size for 1/2 bytes, and — the one case that cannot target the
    /// 64-bit name — a plain `mov` into the 32-bit sub-register for an
    /// unsigned 4-byte load, since x86-64 has no `r64, r/m32` move encoding;
    /// writing the 32-bit name zero-extends the upper 32 bits for free.
    /// Memory has no inherent width, so a load narrower than 64 bits always
    /// needs one of these, never a bare `mov` against the 64-bit name.
    LoadSized { dst: Reg, src: String, size: u32, signed: bool },
    Je(String),
    Jmp(String),
    Call(String),
    Syscall,
    /// `mov rsp, rbp; pop rbp; ret` — the common function epilogue tail.
    Ret,
    Global(String),
    Extern(String),
    Section(&'static str),
    /// A labelled entry in `.data`/`.rodata`: `label: db "bytes", 0`.
    /// Backslash-n sequences in `bytes` are expanded into `", 0xA, "`
    /// fragments at render time, and a trailing NUL is always appended.
    DefineString { label: String, bytes: Vec<u8> },
    /// A labelled 8-byte integer: `label: dq value`.
    DefineQword { label: String, value: i64 },
    /// A labelled zero-filled reservation: `label: resb n`.
    ResB { label: String, size: i64 },
}

impl Cc {
    /// `signed` selects between the signed (`l/le/g/ge`) and unsigned
    /// (`b/be/a/ae`) flavor of an ordering comparison; ignored for
    /// `Eq`/`NEq`, which mean the same thing either way.
    pub fn from_relational(op: crate::ast::BinaryOperator, signed: bool) -> Cc {
        use crate::ast::BinaryOperator as B;
        match (op, signed) {
            (B::Eq, _) => Cc::E,
            (B::NEq, _) => Cc::Ne,
            (B::Lt, true) => Cc::L,
            (B::Lt, false) => Cc::B,
            (B::Le, true) => Cc::Le,
            (B::Le, false) => Cc::Be,
            (B::Gt, true) => Cc::G,
            (B::Gt, false) => Cc::A,
            (B::Ge, true) => Cc::Ge,
            (B::Ge, false) => Cc::Ae,
            _ => unreachable!("Cc::from_relational called on a non-relational operator"),
        }
    }
}

impl Opcode {
    /// Render this opcode to its NASM text. Most opcodes render to a
    /// single tab-indented line; `Label`, section headers, and data
    /// directives render without a leading tab; `CmpSet` renders its
    /// four-instruction trio joined by newlines.
    pub fn render(&self) -> String {
        match self {
            Opcode::Label(name) => format!("{name}:"),
            Opcode::Push(r) => format!("\tpush {r}"),
            Opcode::Pop(r) => format!("\tpop {r}"),
            Opcode::Mov { dst, src } => format!("\tmov {dst}, {src}"),
            Opcode::Lea { dst, src } => format!("\tlea {dst}, {src}"),
            Opcode::Add { dst, src } => format!("\tadd {dst}, {src}"),
            Opcode::Sub { dst, src } => format!("\tsub {dst}, {src}"),
            Opcode::Imul { dst, src } => format!("\timul {dst}, {src}"),
            Opcode::Mul { operand } => format!("\tmul {operand}"),
            Opcode::Idiv { operand } => format!("\tidiv {operand}"),
            Opcode::Div { operand } => format!("\tdiv {operand}"),
            Opcode::Cqo => "\tcqo".to_string(),
            Opcode::Or { dst, src } => format!("\tor {dst}, {src}"),
            Opcode::And { dst, src } => format!("\tand {dst}, {src}"),
            Opcode::Xor { dst, src } => format!("\txor {dst}, {src}"),
            Opcode::Cmp { left, right } => format!("\tcmp {left}, {right}"),
            Opcode::CmpSet {
                cc,
                target,
                one_reg,
                left,
                right,
            } => {
                let mut out = String::new();
                let _ = writeln!(out, "\txor {target}, {target}");
                let _ = writeln!(out, "\tmov {one_reg}, 1");
                let _ = writeln!(out, "\tcmp {left}, {right}");
                let _ = write!(out, "\tcmov{} {target}, {one_reg}", cc.suffix());
                out
            }
            Opcode::LoadSized { dst, src, size, signed } => {
                let dst64 = dst.name64();
                match size {
                    8 => format!("\tmov {dst64}, {src}"),
                    // No `r64, r/m32` move exists; `movsxd` handles the signed
                    // case, and an unsigned load just targets the 32-bit name
                    // directly — the CPU zero-extends the top half itself.
                    4 if *signed => format!("\tmovsx {dst64}, dword {src}"),
                    4 => format!("\tmov {}, dword {src}", dst.name(Width::W32)),
                    2 => format!("\t{} {dst64}, word {src}", if *signed { "movsx" } else { "movzx" }),
                    1 => format!("\t{} {dst64}, byte {src}", if *signed { "movsx" } else { "movzx" }),
                    other => unreachable!("unsupported load width {other}"),
                }
            }
            Opcode::Je(label) => format!("\tje {label}"),
            Opcode::Jmp(label) => format!("\tjmp {label}"),
            Opcode::Call(name) => format!("\tcall {name}"),
            Opcode::Syscall => "\tsyscall".to_string(),
            Opcode::Ret => "\tmov rsp, rbp\n\tpop rbp\n\tret".to_string(),
            Opcode::Global(name) => format!("global {name}"),
            Opcode::Extern(name) => format!("extern {name}"),
            Opcode::Section(name) => format!("section {name}"),
            Opcode::DefineString { label, bytes } => {
                let raw = String::from_utf8_lossy(bytes).replace("\\n", "\", 0xA, \"");
                format!("\t{label}: db \"{raw}\", 0")
            }
            Opcode::DefineQword { label, value } => format!("\t{label}: dq {value}"),
            Opcode::ResB { label, size } => format!("\t{label}: resb {size}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOperator;

    #[test]
    fn label_has_no_tab_and_trailing_colon() {
        assert_eq!(Opcode::Label("main".into()).render(), "main:");
    }

    #[test]
    fn simple_ops_are_tab_indented() {
        assert_eq!(
            Opcode::Mov {
                dst: "rax".into(),
                src: "5".into()
            }
            .render(),
            "\tmov rax, 5"
        );
    }

    #[test]
    fn cmp_set_renders_four_line_trio() {
        let out = Opcode::CmpSet {
            cc: Cc::from_relational(BinaryOperator::Eq, true),
            target: "rax".into(),
            one_reg: "r10".into(),
            left: "rax".into(),
            right: "r10".into(),
        }
        .render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "\txor rax, rax");
        assert_eq!(lines[3], "\tcmove rax, r10");
    }

    #[test]
    fn string_define_expands_newline_escapes_and_adds_trailing_nul() {
        let out = Opcode::DefineString {
            label: "string_0".into(),
            bytes: b"hi\\nthere".to_vec(),
        }
        .render();
        assert_eq!(out, "\tstring_0: db \"hi\", 0xA, \"there\", 0");
    }

    #[test]
    fn resb_renders_reservation() {
        assert_eq!(
            Opcode::ResB {
                label: "buf".into(),
                size: 64
            }
            .render(),
            "\tbuf: resb 64"
        );
    }

    #[test]
    fn epilogue_is_three_lines() {
        let out = Opcode::Ret.render();
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn unsigned_four_byte_load_targets_32_bit_register_name() {
        // No `mov r64, r/m32` encoding exists; the 32-bit destination name
        // zero-extends the top half on its own.
        let out = Opcode::LoadSized {
            dst: crate::scratch::RAX,
            src: "[rsp + 0]".into(),
            size: 4,
            signed: false,
        }
        .render();
        assert_eq!(out, "\tmov eax, dword [rsp + 0]");
    }

    #[test]
    fn signed_four_byte_load_still_sign_extends_into_64_bit_name() {
        let out = Opcode::LoadSized {
            dst: crate::scratch::RAX,
            src: "[rsp + 0]".into(),
            size: 4,
            signed: true,
        }
        .render();
        assert_eq!(out, "\tmovsx rax, dword [rsp + 0]");
    }

    #[test]
    fn unsigned_ordering_picks_unsigned_condition_codes() {
        assert_eq!(Cc::from_relational(BinaryOperator::Lt, false).suffix(), "b");
        assert_eq!(Cc::from_relational(BinaryOperator::Le, false).suffix(), "be");
        assert_eq!(Cc::from_relational(BinaryOperator::Gt, false).suffix(), "a");
        assert_eq!(Cc::from_relational(BinaryOperator::Ge, false).suffix(), "ae");
        assert_eq!(Cc::from_relational(BinaryOperator::Lt, true).suffix(), "l");
    }
}
