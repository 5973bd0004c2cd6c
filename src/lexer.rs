//! Lexer (C2): character stream to token sequence.
//!
//! Fed one source line at a time along with its (1-based, per the external
//! contract) line number; tokens accumulate in an internal vector. End of
//! file is implicit — the caller simply stops feeding lines. [`lex_source`]
//! drives this contract for callers that already have the whole file in
//! memory (the parser, and every test in this module).

use std::path::Path;
use std::rc::Rc;

use crate::ast::path_rc;
use crate::error::CompileError;
use crate::token::{Token, TokenKind};

pub struct Lexer {
    path: Rc<Path>,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Lexer {
            path: path_rc(path),
            tokens: Vec::new(),
        }
    }

    /// Feed one line of source, 1-indexed per the lexer's external
    /// contract. Internally tokens store 0-indexed lines, matching every
    /// other source location in the crate.
    pub fn feed_line(&mut self, line: &str, line_number_one_based: usize) -> Result<(), CompileError> {
        let line_idx = line_number_one_based.saturating_sub(1);
        let bytes = line.as_bytes();
        let mut i = 0usize;

        while i < bytes.len() {
            let c = bytes[i] as char;

            if c == ' ' || c == '\t' || c == '\r' {
                i += 1;
                continue;
            }

            if c == '/' && i + 1 < bytes.len() && bytes[i + 1] as char == '/' {
                break; // line comment: rest of the line is skipped
            }

            let col = i;

            if c.is_ascii_alphabetic() {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    let cc = bytes[i] as char;
                    if cc.is_ascii_alphanumeric() || cc == '_' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text = line[start..i].to_string();
                self.tokens
                    .push(Token::with_string(TokenKind::Identifier, line_idx, col, text));
                continue;
            }

            if c.is_ascii_digit() {
                let start = i;
                i += 1;
                while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                    i += 1;
                }
                let text = &line[start..i];
                let value: i64 = text
                    .parse()
                    .map_err(|_| self.err(line_idx, col, format!("invalid integer literal '{text}'")))?;
                self.tokens
                    .push(Token::with_int(TokenKind::IntLit, line_idx, col, value));
                continue;
            }

            if c == '"' {
                let start = i + 1;
                i += 1;
                while i < bytes.len() && bytes[i] as char != '"' {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(self.err(line_idx, col, "unterminated string literal"));
                }
                let text = line[start..i].as_bytes().to_vec();
                i += 1; // consume closing quote
                self.tokens.push(Token::with_string(
                    TokenKind::StringLiteral,
                    line_idx,
                    col,
                    String::from_utf8_lossy(&text).into_owned(),
                ));
                continue;
            }

            if c == '\'' {
                i += 1;
                if i >= bytes.len() {
                    return Err(self.err(line_idx, col, "unterminated character literal"));
                }
                let value: u8;
                if bytes[i] as char == '\\' {
                    i += 1;
                    if i >= bytes.len() {
                        return Err(self.err(line_idx, col, "unterminated character literal"));
                    }
                    value = match bytes[i] as char {
                        'n' => b'\n',
                        't' => b'\t',
                        '0' => 0u8,
                        '\\' => b'\\',
                        other => {
                            return Err(self.err(
                                line_idx,
                                col,
                                format!("unsupported escape sequence '\\{other}' in character literal"),
                            ));
                        }
                    };
                    i += 1;
                } else {
                    value = bytes[i];
                    i += 1;
                }
                if i >= bytes.len() || bytes[i] as char != '\'' {
                    return Err(self.err(line_idx, col, "unterminated character literal"));
                }
                i += 1; // consume closing quote
                self.tokens
                    .push(Token::with_char(TokenKind::CharLiteral, line_idx, col, value));
                continue;
            }

            let two = if i + 1 < bytes.len() {
                Some([bytes[i] as char, bytes[i + 1] as char])
            } else {
                None
            };

            let (kind, width) = match (c, two) {
                ('-', Some(['-', '>'])) => (TokenKind::RArrow, 2),
                ('=', Some(['=', '='])) => (TokenKind::Equals, 2),
                ('!', Some(['!', '='])) => (TokenKind::NEquals, 2),
                ('<', Some(['<', '='])) => (TokenKind::LEquals, 2),
                ('>', Some(['>', '='])) => (TokenKind::GEquals, 2),
                ('|', Some(['|', '|'])) => (TokenKind::LogicOr, 2),
                ('&', Some(['&', '&'])) => (TokenKind::LogicAnd, 2),
                ('+', _) => (TokenKind::Plus, 1),
                ('-', _) => (TokenKind::Minus, 1),
                ('*', _) => (TokenKind::Star, 1),
                ('/', _) => (TokenKind::FSlash, 1),
                ('%', _) => (TokenKind::Mod, 1),
                (';', _) => (TokenKind::Semi, 1),
                ('(', _) => (TokenKind::LParen, 1),
                (')', _) => (TokenKind::RParen, 1),
                ('{', _) => (TokenKind::LCurly, 1),
                ('}', _) => (TokenKind::RCurly, 1),
                ('[', _) => (TokenKind::LBrace, 1),
                (']', _) => (TokenKind::RBrace, 1),
                (',', _) => (TokenKind::Comma, 1),
                ('=', _) => (TokenKind::Assign, 1),
                (':', _) => (TokenKind::Colon, 1),
                ('<', _) => (TokenKind::Less, 1),
                ('>', _) => (TokenKind::Greater, 1),
                ('|', _) => (TokenKind::BitOr, 1),
                ('&', _) => (TokenKind::BitAnd, 1),
                ('!', _) => {
                    return Err(self.err(line_idx, col, "unexpected '!' (expected '!=')"));
                }
                (other, _) => {
                    return Err(self.err(line_idx, col, format!("unexpected character '{other}'")));
                }
            };

            self.tokens.push(Token::new(kind, line_idx, col));
            i += width;
        }

        Ok(())
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    fn err(&self, line: usize, col: usize, message: impl Into<String>) -> CompileError {
        CompileError::lex(self.path.to_path_buf(), line, col, message)
    }
}

/// Lex a whole in-memory source string, driving [`Lexer::feed_line`] one
/// line at a time.
pub fn lex_source(path: impl AsRef<Path>, source: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer::new(path);
    for (idx, line) in source.lines().enumerate() {
        lexer.feed_line(line, idx + 1)?;
    }
    Ok(lexer.into_tokens())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex_source("t.glang", src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_function_signature() {
        let k = kinds("fn main() -> i64 {");
        assert_eq!(
            k,
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::RArrow,
                TokenKind::Identifier,
                TokenKind::LCurly,
            ]
        );
    }

    #[test]
    fn skips_line_comments() {
        let toks = lex_source("t.glang", "let x: i64 = 1; // trailing comment\nlet y: i64 = 2;").unwrap();
        assert_eq!(toks.iter().filter(|t| t.kind == TokenKind::IntLit).count(), 2);
    }

    #[test]
    fn multi_char_operators_win_over_single_char() {
        let k = kinds("a <= b != c >= d == e");
        assert!(k.contains(&TokenKind::LEquals));
        assert!(k.contains(&TokenKind::NEquals));
        assert!(k.contains(&TokenKind::GEquals));
        assert!(k.contains(&TokenKind::Equals));
    }

    #[test]
    fn char_literal_escapes() {
        let toks = lex_source("t.glang", "'\\n' '\\t' '\\0' '\\\\' 'a'").unwrap();
        let values: Vec<u8> = toks.iter().filter_map(|t| t.char_value).collect();
        assert_eq!(values, vec![b'\n', b'\t', 0, b'\\', b'a']);
    }

    #[test]
    fn bad_char_escape_is_fatal() {
        let err = lex_source("t.glang", "'\\q'").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }

    #[test]
    fn lone_bang_is_fatal() {
        let err = lex_source("t.glang", "a ! b").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
        assert!(format!("{err}").contains("!="));
    }

    #[test]
    fn string_literal_keeps_raw_bytes_unescaped() {
        let toks = lex_source("t.glang", r#""hi\nthere""#).unwrap();
        assert_eq!(toks[0].string_value.as_deref(), Some("hi\\nthere"));
    }

    #[test]
    fn reports_accurate_line_and_column() {
        let toks = lex_source("t.glang", "let x: i64 = 1;\n  foo();").unwrap();
        let foo = toks.iter().find(|t| t.text() == "foo").unwrap();
        assert_eq!(foo.line, 1);
        assert_eq!(foo.col, 2);
    }
}
