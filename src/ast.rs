//! Abstract syntax tree for glang (C3).
//!
//! The AST is built bottom-up by the parser; parent nodes own their
//! children. Every expression and statement node is stamped with a
//! [`SourceLocation`] at parse time so later passes can emit well-located
//! diagnostics without re-walking source text.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::types::TypeIdentifier;

/// `(path, line, col)` attached to every AST node. `line`/`col` are
/// 0-indexed; `CompileError` renders them 1-indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub path: Rc<Path>,
    pub line: usize,
    pub col: usize,
}

impl SourceLocation {
    pub fn new(path: Rc<Path>, line: usize, col: usize) -> Self {
        SourceLocation { path, line, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Star,
    Slash,
    Mod,
    BitOr,
    BitAnd,
    Eq,
    NEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NEq
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOperator::BitOr | BinaryOperator::BitAnd)
    }

    pub fn is_div_or_mod(self) -> bool {
        matches!(self, BinaryOperator::Slash | BinaryOperator::Mod)
    }
}

/// One expression variant. Wrapped by [`Expr`], which carries the shared
/// fields every expression has regardless of variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLit(i64),
    CharLit(u8),
    StringLit(Vec<u8>),
    IdExpression {
        name: String,
        index: Option<Box<Expr>>,
    },
    BinaryExpression {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    CallExpression {
        name: String,
        args: Vec<Expr>,
    },
}

/// An expression node: variant payload plus the location, leading-`*`
/// deref count, and type-checker-filled type every expression carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLocation,
    pub deref_depth: u32,
    pub ty: Option<TypeIdentifier>,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: SourceLocation) -> Self {
        Expr {
            kind,
            loc,
            deref_depth: 0,
            ty: None,
        }
    }

    pub fn with_deref(mut self, deref_depth: u32) -> Self {
        self.deref_depth = deref_depth;
        self
    }

    /// Type computed by the type checker. Panics if called before type
    /// checking has run over this node; every pass after C7 may rely on it.
    pub fn ty(&self) -> TypeIdentifier {
        self.ty.expect("expression type not yet resolved by type checker")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// A brace-delimited block. The parser appends a synthetic
    /// `EndCompound` marker after the last statement of every compound so
    /// later passes can detect scope exit without re-examining braces.
    Compound(Vec<Stmt>),
    EndCompound,
    If {
        cond: Expr,
        body: Box<Stmt>,
    },
    IfElse {
        cond: Expr,
        if_body: Box<Stmt>,
        else_body: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    CallStatement {
        name: String,
        args: Vec<Expr>,
    },
    VarAssignment {
        lhs: Expr,
        rhs: Expr,
    },
    VarDeclaration {
        name: String,
        ty: TypeIdentifier,
        /// Constant array size, for a sized (bss or globally sized) global.
        size: Option<i64>,
    },
    VarDeclAssign {
        name: String,
        ty: TypeIdentifier,
        value: Expr,
        constant: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLocation,
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: SourceLocation) -> Self {
        Stmt { kind, loc }
    }
}

/// One function parameter: name, declared type, and positional index
/// (0-based), which determines its calling-convention register slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeIdentifier,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeIdentifier,
    pub body: Vec<Stmt>,
    pub loc: SourceLocation,
}

/// Signature of an externally declared function, populated from imports.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternFnSig {
    pub params: Vec<TypeIdentifier>,
    pub return_type: TypeIdentifier,
}

/// The whole compiled unit: globals, functions, and the externs pulled in
/// by `import` statements.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Global `VarDeclaration`/`VarDeclAssign` statements, in source order.
    pub globals: Vec<Stmt>,
    pub functions: Vec<FunctionDefinition>,
    /// Names of externally declared (imported) functions and variables.
    pub extern_names: Vec<String>,
    /// Types of externally declared variables, keyed by name.
    pub extern_var_types: std::collections::HashMap<String, TypeIdentifier>,
    /// Signatures of externally declared functions, keyed by name.
    pub extern_fns: std::collections::HashMap<String, ExternFnSig>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Convenience for constructing an `Rc<Path>` from any path-like value;
/// every [`SourceLocation`] in a single file shares the same `Rc` so
/// stamping a node is a refcount bump, not an allocation.
pub fn path_rc(path: impl AsRef<Path>) -> Rc<Path> {
    Rc::from(PathBuf::from(path.as_ref()))
}
