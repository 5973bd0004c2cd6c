//! Compiler error types.
//!
//! Every fallible operation in the pipeline returns a [`CompileError`]. All
//! variants carry enough to render the fixed diagnostic shape the driver
//! prints on failure: `path:line:col: message`. `line`/`col` are stored
//! 0-indexed and rendered 1-indexed, matching how source locations are
//! tracked through the rest of the crate.

use std::fmt;
use std::path::PathBuf;

/// A single fatal compiler diagnostic.
///
/// There is no warning level and no error collection: the first error any
/// pass encounters is returned immediately and the pipeline stops.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Source file could not be read, or output file could not be written.
    Io { path: PathBuf, message: String },
    /// Unknown character, unterminated literal, bad escape sequence.
    Lex {
        path: PathBuf,
        line: usize,
        col: usize,
        message: String,
    },
    /// Unexpected token, missing expected token, malformed top-level form.
    Parse {
        path: PathBuf,
        line: usize,
        col: usize,
        message: String,
    },
    /// Undefined identifier, arity mismatch, type mismatch, unsupported type.
    Type {
        path: PathBuf,
        line: usize,
        col: usize,
        message: String,
    },
    /// Non-constant array size, unsupported global initializer shape.
    Codegen {
        path: PathBuf,
        line: usize,
        col: usize,
        message: String,
    },
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CompileError::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn lex(path: impl Into<PathBuf>, line: usize, col: usize, message: impl Into<String>) -> Self {
        CompileError::Lex {
            path: path.into(),
            line,
            col,
            message: message.into(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, col: usize, message: impl Into<String>) -> Self {
        CompileError::Parse {
            path: path.into(),
            line,
            col,
            message: message.into(),
        }
    }

    pub fn ty(path: impl Into<PathBuf>, line: usize, col: usize, message: impl Into<String>) -> Self {
        CompileError::Type {
            path: path.into(),
            line,
            col,
            message: message.into(),
        }
    }

    pub fn codegen(path: impl Into<PathBuf>, line: usize, col: usize, message: impl Into<String>) -> Self {
        CompileError::Codegen {
            path: path.into(),
            line,
            col,
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            CompileError::Lex { path, line, col, message }
            | CompileError::Parse { path, line, col, message }
            | CompileError::Type { path, line, col, message }
            | CompileError::Codegen { path, line, col, message } => {
                write!(f, "{}:{}:{}: {}", path.display(), line + 1, col + 1, message)
            }
        }
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_based_line_col() {
        let e = CompileError::parse("foo.glang", 4, 9, "expected ';' but found '}'");
        assert_eq!(format!("{e}"), "foo.glang:5:10: expected ';' but found '}'");
    }

    #[test]
    fn io_error_has_no_position() {
        let e = CompileError::io("missing.glang", "No such file or directory");
        assert_eq!(format!("{e}"), "missing.glang: No such file or directory");
    }
}
