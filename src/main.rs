//! glangc CLI.
//!
//! Thin driver: parse arguments, load the CLI into a [`glangc::CompilerConfig`],
//! call the library entry point, and map any [`glangc::CompileError`] to the
//! fixed `path:line:col: message` diagnostic on stderr with a non-zero exit
//! code. No logic lives here beyond argument wiring and process exit —
//! matching the teacher's `main.rs`, which keeps every actual compilation
//! step inside the library crate so it stays usable without going through
//! `std::env::args()`.

use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;

use glangc::{compile_file, default_output_path, CompilerConfig};

#[derive(ClapParser)]
#[command(name = "glangc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "glang compiler - translate .glang source to x86-64 NASM assembly", long_about = None)]
struct Cli {
    /// Input .glang source file.
    input: PathBuf,

    /// Emit a library object (no `_start` entry point).
    #[arg(short = 'L', long)]
    library: bool,

    /// Suppress the implicit `stdlib/core.glang` import.
    #[arg(long)]
    no_core: bool,

    /// Output path (defaults to the input path with `.glang` replaced by `.asm`).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory to search for `stdlib/` instead of the built-in lookup chain.
    #[arg(long)]
    stdlib_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let output = cli.output.clone().unwrap_or_else(|| default_output_path(&cli.input));
    let config = CompilerConfig {
        no_core: cli.no_core,
        library: cli.library,
        extra_stdlib_dir: cli.stdlib_dir.clone(),
    };

    match compile_file(&cli.input, &output, &config) {
        Ok(_) => {
            println!("Compiled {} -> {}", cli.input.display(), output.display());
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
