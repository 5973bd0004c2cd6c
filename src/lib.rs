//! glangc: a single-pass compiler from glang source to x86-64 NASM text.
//!
//! The pipeline is exactly the one `spec.md` describes: lex, parse (which
//! recursively lexes/parses any `import`ed files), type-check, generate
//! opcodes, then render them to NASM text. [`compile_source`] and
//! [`compile_file`] are the two library entry points `main.rs` drives; both
//! return a [`CompileError`] rather than printing or exiting, so embedding
//! code (tests, or another tool linking this crate) can handle failure on
//! its own terms.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod emitter;
pub mod error;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod resolver;
pub mod scope;
pub mod scratch;
pub mod token;
pub mod typechecker;
pub mod types;

pub use ast::Program;
pub use codegen::program::{codegen_program, CompiledUnit};
pub use config::CompilerConfig;
pub use error::CompileError;

use std::fs;
use std::path::Path;

/// Compile in-memory source text to NASM assembly text, without touching
/// the filesystem for anything but `import` resolution (which still reads
/// other `.glang` files from disk, per `spec.md` §4.2).
///
/// `path` is used only to seed diagnostics and to anchor relative
/// `import(...)` paths; it need not exist if `source` has no imports.
pub fn compile_source(path: &Path, source: &str, config: &CompilerConfig) -> Result<String, CompileError> {
    let mut resolver = resolver::Resolver::new();
    let stdlib_dir = resolver::find_stdlib(path, config);
    let mut program = parser::parse_tokens_into_program(
        path,
        source,
        &mut resolver,
        stdlib_dir.as_deref(),
        !config.no_core,
    )?;
    typechecker::check_program(&mut program)?;
    let unit = codegen_program(&program)?;
    Ok(emitter::emit(&unit, config.library))
}

/// Compile a `.glang` file on disk and write the resulting NASM text to
/// `output`. Returns the rendered text as well, so callers that already
/// have it open (tests, `main.rs`'s success message) don't have to re-read
/// the file they just wrote.
pub fn compile_file(input: &Path, output: &Path, config: &CompilerConfig) -> Result<String, CompileError> {
    let source = fs::read_to_string(input).map_err(|e| CompileError::io(input, e.to_string()))?;
    let text = compile_source(input, &source, config)?;
    fs::write(output, &text).map_err(|e| CompileError::io(output, e.to_string()))?;
    Ok(text)
}

/// The output path for a given input: `.glang` replaced by `.asm`, in
/// place, matching `spec.md` §6's "output file name is the input name with
/// `.glang` replaced by `.asm`".
pub fn default_output_path(input: &Path) -> std::path::PathBuf {
    input.with_extension("asm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_arithmetic_scenario() {
        let config = CompilerConfig { no_core: true, ..CompilerConfig::default() };
        let text = compile_source(
            Path::new("t.glang"),
            "fn main() -> i64 { return 1 + 2 * 3; }",
            &config,
        )
        .unwrap();
        assert!(text.contains("main:"));
        assert!(text.contains("global _start"));
    }

    #[test]
    fn default_output_path_swaps_extension() {
        assert_eq!(default_output_path(Path::new("foo/bar.glang")), Path::new("foo/bar.asm"));
    }

    #[test]
    fn library_mode_suppresses_start() {
        let config = CompilerConfig { no_core: true, library: true, ..CompilerConfig::default() };
        let text = compile_source(Path::new("t.glang"), "fn helper() -> i64 { return 1; }", &config).unwrap();
        assert!(!text.contains("_start"));
    }

    #[test]
    fn propagates_lex_errors_through_the_public_api() {
        let config = CompilerConfig { no_core: true, ..CompilerConfig::default() };
        let err = compile_source(Path::new("t.glang"), "fn f() -> i64 { a ! b; }", &config).unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }
}
