//! Parser (C4): recursive descent over the token vector into an [`Program`].
//!
//! Expression precedence is organized as a chain of bands, loosest to
//! tightest: bitwise or/and, additive, multiplicative (absorbing a leading
//! run of `*` as a deref count), relational/equality, call-or-parenthesised,
//! atom. Each band is a small `while`-loop over its own operator set that
//! recurses into the next tighter band for its operands, which produces the
//! same left-associative trees as a rightmost-operator scan would, without
//! needing to re-scan a token window per call.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::{
    path_rc, BinaryOperator, Expr, ExprKind, ExternFnSig, FunctionDefinition, Param, Program,
    SourceLocation, Stmt, StmtKind,
};
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::lexer::lex_source;
use crate::resolver::Resolver;
use crate::token::{Token, TokenKind};
use crate::types::{BaseType, TypeIdentifier};

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    path: Rc<Path>,
    dir: PathBuf,
    resolver: &'a mut Resolver,
    stdlib_dir: Option<PathBuf>,
}

impl<'a> Parser<'a> {
    fn new(
        tokens: Vec<Token>,
        path: &Path,
        resolver: &'a mut Resolver,
        stdlib_dir: Option<PathBuf>,
    ) -> Self {
        Parser {
            tokens,
            pos: 0,
            path: path_rc(path),
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            resolver,
            stdlib_dir,
        }
    }

    // -- token cursor helpers -------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn check_ident(&self, text: &str) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::Identifier && t.text() == text)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Location of the current token, or of the end of the stream if we've
    /// run out (used to report a sensible position for "unexpected EOF").
    fn loc(&self) -> SourceLocation {
        match self.peek() {
            Some(t) => SourceLocation::new(self.path.clone(), t.line, t.col),
            None => {
                let (line, col) = self
                    .tokens
                    .last()
                    .map(|t| (t.line, t.col + 1))
                    .unwrap_or((0, 0));
                SourceLocation::new(self.path.clone(), line, col)
            }
        }
    }

    fn err_here(&self, message: impl Into<String>) -> CompileError {
        let loc = self.loc();
        CompileError::parse(loc.path.to_path_buf(), loc.line, loc.col, message)
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(t) => format!("{:?}", t.kind),
            None => "end of file".to_string(),
        }
    }

    fn expect_kind(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.peek_kind() == Some(kind) {
            Ok(self.advance().unwrap())
        } else {
            let found = self.describe_current();
            Err(self.err_here(format!("expected {kind:?} but found {found}")))
        }
    }

    fn expect_ident_text(&mut self) -> Result<String, CompileError> {
        let tok = self.expect_kind(TokenKind::Identifier)?;
        Ok(tok.text().to_string())
    }

    fn expect_ident_keyword(&mut self, text: &str) -> Result<(), CompileError> {
        if self.check_ident(text) {
            self.advance();
            Ok(())
        } else {
            let found = self.describe_current();
            Err(self.err_here(format!("expected '{text}' but found {found}")))
        }
    }

    // -- top level --------------------------------------------------------

    fn parse_program(&mut self, implicit_core: bool) -> Result<Program, CompileError> {
        let mut program = Program::new();

        if implicit_core {
            if let Some(dir) = self.stdlib_dir.clone() {
                let core_path = dir.join("core.glang");
                if core_path.is_file() {
                    let names =
                        self.resolver
                            .resolve_import(&dir, "core", Some(&dir), &self.path, 0, 0)?;
                    merge_imported_names(&mut program, names);
                }
            }
        }

        while self.peek().is_some() {
            self.parse_top_level_item(&mut program)?;
        }

        Ok(program)
    }

    fn parse_top_level_item(&mut self, program: &mut Program) -> Result<(), CompileError> {
        if self.check_ident("fn") {
            let func = self.parse_function()?;
            program.functions.push(func);
            Ok(())
        } else if self.check_ident("let") {
            let stmt = self.parse_global_let()?;
            program.globals.push(stmt);
            Ok(())
        } else if self.check_ident("const") {
            let stmt = self.parse_global_const()?;
            program.globals.push(stmt);
            Ok(())
        } else if self.check_ident("import") {
            let (text, loc) = self.parse_import_text()?;
            let names = self.resolver.resolve_import(
                &self.dir,
                &text,
                self.stdlib_dir.as_deref(),
                &loc.path,
                loc.line,
                loc.col,
            )?;
            merge_imported_names(program, names);
            Ok(())
        } else {
            let found = self.describe_current();
            Err(self.err_here(format!("expected a top-level declaration but found {found}")))
        }
    }

    fn parse_import_text(&mut self) -> Result<(String, SourceLocation), CompileError> {
        let loc = self.loc();
        self.expect_ident_keyword("import")?;
        self.expect_kind(TokenKind::LParen)?;
        let tok = self.expect_kind(TokenKind::StringLiteral)?;
        self.expect_kind(TokenKind::RParen)?;
        self.expect_kind(TokenKind::Semi)?;
        Ok((tok.string_value.unwrap_or_default(), loc))
    }

    fn parse_function(&mut self) -> Result<FunctionDefinition, CompileError> {
        let loc = self.loc();
        self.expect_ident_keyword("fn")?;
        let name = self.expect_ident_text()?;
        self.expect_kind(TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect_kind(TokenKind::RParen)?;
        self.expect_kind(TokenKind::RArrow)?;
        let return_type = self.parse_type()?;

        let mut body = self.parse_stmt_sequence_until_rcurly()?;
        if !matches!(body.last().map(|s| &s.kind), Some(StmtKind::Return(_))) {
            body.push(Stmt::new(StmtKind::Return(None), loc.clone()));
        }
        body.push(Stmt::new(StmtKind::EndCompound, loc.clone()));

        Ok(FunctionDefinition {
            name,
            params,
            return_type,
            body,
            loc,
        })
    }

    fn parse_param_list(&mut self) -> Result<Vec<Param>, CompileError> {
        let mut params = Vec::new();
        if self.peek_kind() == Some(TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let name = self.expect_ident_text()?;
            self.expect_kind(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param { name, ty, index: params.len() });
            if self.peek_kind() == Some(TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(params)
    }

    fn parse_type(&mut self) -> Result<TypeIdentifier, CompileError> {
        let name = self.expect_ident_text()?;
        let base = BaseType::from_name(&name)
            .ok_or_else(|| self.err_here(format!("'{name}' is not a known type")))?;
        let mut ptr_depth = 0u32;
        while self.peek_kind() == Some(TokenKind::Star) {
            self.advance();
            ptr_depth += 1;
        }
        Ok(TypeIdentifier::new(base, ptr_depth))
    }

    fn parse_global_let(&mut self) -> Result<Stmt, CompileError> {
        self.parse_let_decl()
    }

    fn parse_global_const(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.expect_ident_keyword("const")?;
        let name = self.expect_ident_text()?;
        self.expect_kind(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        self.expect_kind(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.expect_kind(TokenKind::Semi)?;
        Ok(Stmt::new(StmtKind::VarDeclAssign { name, ty, value, constant: true }, loc))
    }

    // -- statements --------------------------------------------------------

    /// Parse statements up to (and consuming) the closing `}`, appending the
    /// synthetic `EndCompound` marker. Used for both compounds and function
    /// bodies, which share the same brace-delimited-sequence shape.
    fn parse_stmt_sequence_until_rcurly(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect_kind(TokenKind::LCurly)?;
        let mut stmts = Vec::new();
        while self.peek_kind() != Some(TokenKind::RCurly) {
            if self.peek().is_none() {
                return Err(self.err_here("unexpected end of file, expected '}'"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect_kind(TokenKind::RCurly)?;
        Ok(stmts)
    }

    fn parse_compound(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        let mut stmts = self.parse_stmt_sequence_until_rcurly()?;
        stmts.push(Stmt::new(StmtKind::EndCompound, loc.clone()));
        Ok(Stmt::new(StmtKind::Compound(stmts), loc))
    }

    fn parse_statement(&mut self) -> Result<Stmt, CompileError> {
        if self.peek_kind() == Some(TokenKind::LCurly) {
            return self.parse_compound();
        }
        if self.check_ident("return") {
            return self.parse_return();
        }
        if self.check_ident("let") {
            return self.parse_local_let();
        }
        if self.check_ident("while") {
            return self.parse_while();
        }
        if self.check_ident("if") {
            return self.parse_if();
        }
        if self.peek_kind() == Some(TokenKind::Identifier)
            && self.peek_nth_kind(1) == Some(TokenKind::LParen)
        {
            return self.parse_call_statement();
        }
        self.parse_assignment()
    }

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.expect_ident_keyword("return")?;
        let value = if self.peek_kind() == Some(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_kind(TokenKind::Semi)?;
        Ok(Stmt::new(StmtKind::Return(value), loc))
    }

    fn parse_local_let(&mut self) -> Result<Stmt, CompileError> {
        self.parse_let_decl()
    }

    /// `let name : type ;`, `let name : type [ size ] ;`, or
    /// `let name : type = expr ;` — shared by global and local declarations.
    fn parse_let_decl(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.expect_ident_keyword("let")?;
        let name = self.expect_ident_text()?;
        self.expect_kind(TokenKind::Colon)?;
        let ty = self.parse_type()?;

        if self.peek_kind() == Some(TokenKind::LBrace) {
            self.advance();
            let size_tok = self.expect_kind(TokenKind::IntLit)?;
            let size = size_tok.int_value.unwrap_or(0);
            self.expect_kind(TokenKind::RBrace)?;
            self.expect_kind(TokenKind::Semi)?;
            return Ok(Stmt::new(StmtKind::VarDeclaration { name, ty, size: Some(size) }, loc));
        }

        if self.peek_kind() == Some(TokenKind::Assign) {
            self.advance();
            let value = self.parse_expr()?;
            self.expect_kind(TokenKind::Semi)?;
            return Ok(Stmt::new(
                StmtKind::VarDeclAssign { name, ty, value, constant: false },
                loc,
            ));
        }

        self.expect_kind(TokenKind::Semi)?;
        Ok(Stmt::new(StmtKind::VarDeclaration { name, ty, size: None }, loc))
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.expect_ident_keyword("while")?;
        self.expect_kind(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect_kind(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::new(StmtKind::While { cond, body }, loc))
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.expect_ident_keyword("if")?;
        self.expect_kind(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect_kind(TokenKind::RParen)?;
        let if_body = Box::new(self.parse_statement()?);
        if self.check_ident("else") {
            self.advance();
            let else_body = Box::new(self.parse_statement()?);
            return Ok(Stmt::new(StmtKind::IfElse { cond, if_body, else_body }, loc));
        }
        Ok(Stmt::new(StmtKind::If { cond, body: if_body }, loc))
    }

    fn parse_call_statement(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        let name = self.expect_ident_text()?;
        self.expect_kind(TokenKind::LParen)?;
        let args = self.parse_arg_list()?;
        self.expect_kind(TokenKind::RParen)?;
        self.expect_kind(TokenKind::Semi)?;
        Ok(Stmt::new(StmtKind::CallStatement { name, args }, loc))
    }

    fn parse_assignment(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        let lhs = self.parse_expr()?;
        self.expect_kind(TokenKind::Assign)?;
        let rhs = self.parse_expr()?;
        self.expect_kind(TokenKind::Semi)?;
        Ok(Stmt::new(StmtKind::VarAssignment { lhs, rhs }, loc))
    }

    // -- expressions, loosest to tightest precedence band -----------------

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_bitwise()
    }

    fn parse_bitwise(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::BitOr) => BinaryOperator::BitOr,
                Some(TokenKind::BitAnd) => BinaryOperator::BitAnd,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::new(
                ExprKind::BinaryExpression { op, left: Box::new(left), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOperator::Plus,
                Some(TokenKind::Minus) => BinaryOperator::Minus,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_mul()?;
            left = Expr::new(
                ExprKind::BinaryExpression { op, left: Box::new(left), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_mul_operand()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOperator::Star,
                Some(TokenKind::FSlash) => BinaryOperator::Slash,
                Some(TokenKind::Mod) => BinaryOperator::Mod,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_mul_operand()?;
            left = Expr::new(
                ExprKind::BinaryExpression { op, left: Box::new(left), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    /// A leading run of `*` before a term is a deref count, not multiplication.
    fn parse_mul_operand(&mut self) -> Result<Expr, CompileError> {
        let mut deref_depth = 0u32;
        while self.peek_kind() == Some(TokenKind::Star) {
            self.advance();
            deref_depth += 1;
        }
        let expr = self.parse_relational()?;
        Ok(expr.with_deref(deref_depth))
    }

    fn parse_relational(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_call_or_paren()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Equals) => BinaryOperator::Eq,
                Some(TokenKind::NEquals) => BinaryOperator::NEq,
                Some(TokenKind::Less) => BinaryOperator::Lt,
                Some(TokenKind::LEquals) => BinaryOperator::Le,
                Some(TokenKind::Greater) => BinaryOperator::Gt,
                Some(TokenKind::GEquals) => BinaryOperator::Ge,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_call_or_paren()?;
            left = Expr::new(
                ExprKind::BinaryExpression { op, left: Box::new(left), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_call_or_paren(&mut self) -> Result<Expr, CompileError> {
        if self.peek_kind() == Some(TokenKind::LParen) {
            self.advance();
            let inner = self.parse_expr()?;
            self.expect_kind(TokenKind::RParen)?;
            return Ok(inner);
        }
        if self.peek_kind() == Some(TokenKind::Identifier)
            && self.peek_nth_kind(1) == Some(TokenKind::LParen)
        {
            let loc = self.loc();
            let name = self.expect_ident_text()?;
            self.expect_kind(TokenKind::LParen)?;
            let args = self.parse_arg_list()?;
            self.expect_kind(TokenKind::RParen)?;
            return Ok(Expr::new(ExprKind::CallExpression { name, args }, loc));
        }
        self.parse_atom()
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.peek_kind() == Some(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.peek_kind() == Some(TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_atom(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.advance();
                let tok = self.expect_kind(TokenKind::IntLit)?;
                let value = tok.int_value.unwrap_or(0);
                Ok(Expr::new(ExprKind::IntLit(-value), loc))
            }
            Some(TokenKind::IntLit) => {
                let tok = self.advance().unwrap();
                Ok(Expr::new(ExprKind::IntLit(tok.int_value.unwrap_or(0)), loc))
            }
            Some(TokenKind::CharLiteral) => {
                let tok = self.advance().unwrap();
                Ok(Expr::new(ExprKind::CharLit(tok.char_value.unwrap_or(0)), loc))
            }
            Some(TokenKind::StringLiteral) => {
                let tok = self.advance().unwrap();
                let bytes = tok.string_value.unwrap_or_default().into_bytes();
                Ok(Expr::new(ExprKind::StringLit(bytes), loc))
            }
            Some(TokenKind::Identifier) => {
                let tok = self.advance().unwrap();
                let name = tok.text().to_string();
                if self.peek_kind() == Some(TokenKind::LBrace) {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect_kind(TokenKind::RBrace)?;
                    Ok(Expr::new(
                        ExprKind::IdExpression { name, index: Some(Box::new(index)) },
                        loc,
                    ))
                } else {
                    Ok(Expr::new(ExprKind::IdExpression { name, index: None }, loc))
                }
            }
            _ => {
                let found = self.describe_current();
                Err(self.err_here(format!("expected an expression but found {found}")))
            }
        }
    }
}

fn merge_imported_names(program: &mut Program, names: crate::resolver::ImportedNames) {
    for (name, sig) in names.functions {
        if !program.extern_names.contains(&name) {
            program.extern_names.push(name.clone());
        }
        program.extern_fns.insert(name, sig);
    }
    for (name, ty) in names.vars {
        if !program.extern_names.contains(&name) {
            program.extern_names.push(name.clone());
        }
        program.extern_var_types.insert(name, ty);
    }
}

/// Lex `source` and parse it into a [`Program`], resolving any `import`
/// statements it contains via `resolver`. Used both for the main
/// translation unit and, recursively, for every imported file.
pub fn parse_tokens_into_program(
    path: &Path,
    source: &str,
    resolver: &mut Resolver,
    stdlib_dir: Option<&Path>,
    implicit_core: bool,
) -> Result<Program, CompileError> {
    let tokens = lex_source(path, source)?;
    let mut parser = Parser::new(tokens, path, resolver, stdlib_dir.map(Path::to_path_buf));
    parser.parse_program(implicit_core)
}

/// Top-level entry point: read `path` from disk and parse it, using
/// `config` to decide whether to pre-import `stdlib/core.glang` and where
/// to look for it.
pub fn parse_file(path: &Path, config: &CompilerConfig) -> Result<Program, CompileError> {
    let source = fs::read_to_string(path).map_err(|e| CompileError::io(path, e.to_string()))?;
    let mut resolver = Resolver::new();
    let stdlib_dir = crate::resolver::find_stdlib(path, config);
    parse_tokens_into_program(path, &source, &mut resolver, stdlib_dir.as_deref(), !config.no_core)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        let mut resolver = Resolver::new();
        parse_tokens_into_program(Path::new("t.glang"), src, &mut resolver, None, false).unwrap()
    }

    #[test]
    fn parses_function_with_implicit_return() {
        let p = parse("fn main() -> i64 { let x: i64 = 1; }");
        let f = p.find_function("main").unwrap();
        assert!(matches!(f.body.last().unwrap().kind, StmtKind::EndCompound));
        let return_stmt = &f.body[f.body.len() - 2];
        assert!(matches!(return_stmt.kind, StmtKind::Return(None)));
    }

    #[test]
    fn explicit_return_is_not_duplicated() {
        let p = parse("fn f() -> i64 { return 5; }");
        let f = p.find_function("f").unwrap();
        let returns = f.body.iter().filter(|s| matches!(s.kind, StmtKind::Return(_))).count();
        assert_eq!(returns, 1);
    }

    #[test]
    fn multiplicative_is_left_associative() {
        let p = parse("fn f() -> i64 { return 10 - 3 - 2; }");
        let f = p.find_function("f").unwrap();
        match &f.body[0].kind {
            StmtKind::Return(Some(expr)) => match &expr.kind {
                ExprKind::BinaryExpression { op, left, .. } => {
                    assert_eq!(*op, BinaryOperator::Minus);
                    assert!(matches!(left.kind, ExprKind::BinaryExpression { .. }));
                }
                _ => panic!("expected a binary expression"),
            },
            _ => panic!("expected a return statement"),
        }
    }

    #[test]
    fn leading_star_run_becomes_deref_depth() {
        let p = parse("fn f(p: i64**) -> i64 { return **p; }");
        let f = p.find_function("f").unwrap();
        match &f.body[0].kind {
            StmtKind::Return(Some(expr)) => assert_eq!(expr.deref_depth, 2),
            _ => panic!("expected a return statement"),
        }
    }

    #[test]
    fn indexing_and_calls_parse() {
        let p = parse("fn f(a: i64*) -> i64 { return a[0] + g(1, 2); }");
        let f = p.find_function("f").unwrap();
        match &f.body[0].kind {
            StmtKind::Return(Some(expr)) => match &expr.kind {
                ExprKind::BinaryExpression { left, right, .. } => {
                    assert!(matches!(left.kind, ExprKind::IdExpression { index: Some(_), .. }));
                    assert!(matches!(right.kind, ExprKind::CallExpression { .. }));
                }
                _ => panic!("expected a binary expression"),
            },
            _ => panic!("expected a return statement"),
        }
    }

    #[test]
    fn negative_int_literal_parses_as_atom() {
        let p = parse("fn f() -> i64 { return -5; }");
        let f = p.find_function("f").unwrap();
        match &f.body[0].kind {
            StmtKind::Return(Some(expr)) => assert_eq!(expr.kind, ExprKind::IntLit(-5)),
            _ => panic!("expected a return statement"),
        }
    }

    #[test]
    fn if_else_and_while_parse() {
        let p = parse(
            "fn f(x: i64) -> i64 { while (x < 10) { if (x == 5) { return x; } else { x = x + 1; } } return 0; }",
        );
        let f = p.find_function("f").unwrap();
        assert!(matches!(f.body[0].kind, StmtKind::While { .. }));
    }

    #[test]
    fn global_sized_array_and_const_parse() {
        let p = parse("let buf: u8[64]; const limit: i64 = 10;");
        assert_eq!(p.globals.len(), 2);
        assert!(matches!(p.globals[0].kind, StmtKind::VarDeclaration { size: Some(64), .. }));
        match &p.globals[1].kind {
            StmtKind::VarDeclAssign { constant, .. } => assert!(constant),
            _ => panic!("expected a const declaration"),
        }
    }

    #[test]
    fn unexpected_token_is_a_parse_error_with_location() {
        let err = {
            let mut resolver = Resolver::new();
            parse_tokens_into_program(
                Path::new("t.glang"),
                "fn f() -> i64 { return }",
                &mut resolver,
                None,
                false,
            )
            .unwrap_err()
        };
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
