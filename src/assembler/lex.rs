//! Line tokenizer.
//!
//! Tokens are produced lazily, one at a time, from a single source line.
//! Every [`Lexeme`] keeps its byte span so callers can copy the text between
//! tokens verbatim, which the preprocessor relies on when splicing expansions.

use std::fmt;
use std::ops::Range;

use logos::Logos;

use super::ascii;
use crate::diagnostic::{Diagnostic, ErrorKind};

/// Longest accepted source line, in bytes.
pub const LINE_MAX: usize = 4096;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LexError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexError)]
#[logos(skip r"\s+")]
pub enum RawToken {
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    #[regex(r#""([^"\\]|\\.)*\\?"#)]
    UnterminatedStr,

    #[regex(r"'([^'\\]|\\.)*'")]
    Char,
    #[regex(r"'([^'\\]|\\.)*\\?")]
    UnterminatedChar,

    #[regex(r"[+\-*/~|&%()\[\],\\^=!<>]")]
    Punct,

    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<<")]
    #[token(">>")]
    Op,

    /// `$0` through `$N`.
    #[regex(r"\$[0-9]+")]
    Param,
    /// `$$`
    #[token("$$")]
    Unique,
    /// A lone `$`, the current address.
    #[token("$")]
    Dollar,

    /// Always the last token of a line.
    #[token(";")]
    Comment,

    #[regex(r#"[^\s+\-*/~|&%()\[\],\\;^=!<>"'$]+"#)]
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Le,
    Ge,
    Shl,
    Shr,
}

impl Op {
    fn from_str(s: &str) -> Option<Op> {
        match s {
            "==" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            "<=" => Some(Op::Le),
            ">=" => Some(Op::Ge),
            "<<" => Some(Op::Shl),
            ">>" => Some(Op::Shr),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::Shl => "<<",
            Op::Shr => ">>",
        })
    }
}

/// A classified token, ready for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Punct(char),
    Op(Op),
    Int(i32),
    Str(Vec<u8>),
    Symbol(String),
    CurrentAddress,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Punct(c) => write!(f, "`{c}`"),
            Token::Op(op) => write!(f, "`{op}`"),
            Token::Int(value) => write!(f, "`{value}`"),
            Token::Str(s) => write!(f, "`\"{}\"`", String::from_utf8_lossy(s)),
            Token::Symbol(name) => write!(f, "`{name}`"),
            Token::CurrentAddress => f.write_str("`$`"),
        }
    }
}

/// A raw token and the slice of the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: RawToken,
    pub text: &'a str,
    pub span: Range<usize>,
}

impl<'a> Lexeme<'a> {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == RawToken::Punct && self.text.starts_with(c)
    }

    pub fn is_comment(&self) -> bool {
        self.kind == RawToken::Comment
    }

    pub fn token(&self) -> Result<Token, Diagnostic> {
        match self.kind {
            RawToken::Word => {
                if self.text.starts_with(|c: char| c.is_ascii_digit()) {
                    parse_int(self.text).map(Token::Int)
                } else {
                    Ok(Token::Symbol(self.text.to_owned()))
                }
            }
            RawToken::Str => Ok(Token::Str(ascii::unquote(self.text)?)),
            RawToken::Char => {
                let bytes = ascii::unquote(self.text)?;
                match bytes.as_slice() {
                    [byte] => Ok(Token::Int(*byte as i32)),
                    _ => Err(ErrorKind::InvalidLiteral(self.text.to_owned()).into()),
                }
            }
            RawToken::UnterminatedStr | RawToken::UnterminatedChar => {
                Err(ErrorKind::UnterminatedStringOrChar.into())
            }
            RawToken::Punct => self
                .text
                .chars()
                .next()
                .map(Token::Punct)
                .ok_or_else(|| Diagnostic::bug("empty punctuation token")),
            RawToken::Op => Op::from_str(self.text)
                .map(Token::Op)
                .ok_or_else(|| Diagnostic::bug(format!("unknown operator `{}`", self.text))),
            RawToken::Dollar => Ok(Token::CurrentAddress),
            // placeholders left outside of a macro body
            RawToken::Param | RawToken::Unique => {
                Err(ErrorKind::InvalidSymbolName(self.text.to_owned()).into())
            }
            RawToken::Comment => Err(ErrorKind::ExpectedExpression.into()),
        }
    }
}

/// Parses a decimal, `0x` hexadecimal or `0b` binary literal.
///
/// Values up to `0xFFFF_FFFF` are accepted and wrap into `i32`.
pub fn parse_int(text: &str) -> Result<i32, Diagnostic> {
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = text
        .strip_prefix("0b")
        .or_else(|| text.strip_prefix("0B"))
    {
        (bin, 2)
    } else {
        (text, 10)
    };

    u32::from_str_radix(digits, radix)
        .map(|value| value as i32)
        .map_err(|_| ErrorKind::InvalidLiteral(text.to_owned()).into())
}

/// Reads the next token of `line` starting at byte `offset`.
///
/// Returns the token and the number of bytes consumed from `offset`, leading
/// whitespace included, or `None` at the end of the line. A comment token
/// swallows the rest of the line.
pub fn next_token(line: &str, offset: usize) -> Result<Option<(Lexeme<'_>, usize)>, Diagnostic> {
    let rest = line
        .get(offset..)
        .ok_or_else(|| Diagnostic::bug(format!("line offset {offset} is out of bounds")))?;
    let mut lexer = RawToken::lexer(rest);

    let kind = match lexer.next() {
        None => return Ok(None),
        Some(Ok(kind)) => kind,
        Some(Err(LexError)) => return Err(ErrorKind::TokenizeFault.into()),
    };

    let span = lexer.span();
    let end = match kind {
        RawToken::Comment => rest.len(),
        _ => span.end,
    };
    let lexeme = Lexeme {
        kind,
        text: &rest[span.start..end],
        span: offset + span.start..offset + end,
    };

    Ok(Some((lexeme, end)))
}

/// Walks the tokens of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(line: &'a str) -> Cursor<'a> {
        Cursor { line, pos: 0 }
    }

    pub fn at(line: &'a str, pos: usize) -> Cursor<'a> {
        Cursor { line, pos }
    }

    pub fn next(&mut self) -> Result<Option<Lexeme<'a>>, Diagnostic> {
        match next_token(self.line, self.pos)? {
            Some((lexeme, consumed)) => {
                self.pos += consumed;
                Ok(Some(lexeme))
            }
            None => {
                self.pos = self.line.len();
                Ok(None)
            }
        }
    }

    pub fn peek(&self) -> Result<Option<Lexeme<'a>>, Diagnostic> {
        Ok(next_token(self.line, self.pos)?.map(|(lexeme, _)| lexeme))
    }

    /// Next token, classified.
    pub fn next_token(&mut self) -> Result<Option<Token>, Diagnostic> {
        match self.next()? {
            Some(lexeme) if !lexeme.is_comment() => lexeme.token().map(Some),
            _ => Ok(None),
        }
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Unconsumed text, leading whitespace included.
    pub fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    /// Whether only whitespace or a comment remains.
    pub fn at_end(&self) -> Result<bool, Diagnostic> {
        Ok(self.peek()?.map_or(true, |lexeme| lexeme.is_comment()))
    }

    /// Fails with [`ErrorKind::TrailingTokens`] unless the line is exhausted.
    pub fn expect_end(&self) -> Result<(), Diagnostic> {
        if self.at_end()? {
            Ok(())
        } else {
            Err(ErrorKind::TrailingTokens(self.rest().trim().to_owned()).into())
        }
    }

    /// Consumes the punctuation `c`.
    pub fn expect_punct(&mut self, c: char) -> Result<(), Diagnostic> {
        match self.next()? {
            Some(lexeme) if lexeme.is_punct(c) => Ok(()),
            Some(lexeme) => Err(ErrorKind::expected(format!("`{c}`"), format!("`{}`", lexeme.text)).into()),
            None => Err(ErrorKind::expected(format!("`{c}`"), "end of line").into()),
        }
    }

    /// Consumes a plain word.
    pub fn expect_word(&mut self, what: &str) -> Result<&'a str, Diagnostic> {
        match self.next()? {
            Some(lexeme) if lexeme.kind == RawToken::Word => Ok(lexeme.text),
            Some(lexeme) => Err(ErrorKind::expected(what, format!("`{}`", lexeme.text)).into()),
            None => Err(ErrorKind::expected(what, "end of line").into()),
        }
    }
}

/// Fails with [`ErrorKind::LineTooLong`] for oversized lines.
pub fn check_length(line: &str) -> Result<(), Diagnostic> {
    if line.len() > LINE_MAX {
        Err(ErrorKind::LineTooLong(LINE_MAX).into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<(RawToken, &str)> {
        let mut cursor = Cursor::new(line);
        let mut out = Vec::new();
        while let Some(lexeme) = cursor.next().unwrap() {
            out.push((lexeme.kind, lexeme.text));
        }
        out
    }

    #[test]
    fn words_and_punctuation() {
        assert_eq!(
            kinds("ld [hl+], a"),
            vec![
                (RawToken::Word, "ld"),
                (RawToken::Punct, "["),
                (RawToken::Word, "hl"),
                (RawToken::Punct, "+"),
                (RawToken::Punct, "]"),
                (RawToken::Punct, ","),
                (RawToken::Word, "a"),
            ]
        );
        assert_eq!(
            kinds("@loop: .db 1"),
            vec![
                (RawToken::Word, "@loop:"),
                (RawToken::Word, ".db"),
                (RawToken::Word, "1")
            ]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("1<<2 >= 3 != 4 < 5"),
            vec![
                (RawToken::Word, "1"),
                (RawToken::Op, "<<"),
                (RawToken::Word, "2"),
                (RawToken::Op, ">="),
                (RawToken::Word, "3"),
                (RawToken::Op, "!="),
                (RawToken::Word, "4"),
                (RawToken::Punct, "<"),
                (RawToken::Word, "5"),
            ]
        );
    }

    #[test]
    fn strings_keep_escaped_quotes() {
        assert_eq!(
            kinds(r#".db "a\"b", 'c'"#),
            vec![
                (RawToken::Word, ".db"),
                (RawToken::Str, r#""a\"b""#),
                (RawToken::Punct, ","),
                (RawToken::Char, "'c'"),
            ]
        );
        assert_eq!(kinds(r#""open"#), vec![(RawToken::UnterminatedStr, r#""open"#)]);
    }

    #[test]
    fn placeholders() {
        assert_eq!(
            kinds("l$$: $1, $"),
            vec![
                (RawToken::Word, "l"),
                (RawToken::Unique, "$$"),
                (RawToken::Word, ":"),
                (RawToken::Param, "$1"),
                (RawToken::Punct, ","),
                (RawToken::Dollar, "$"),
            ]
        );
    }

    #[test]
    fn comment_ends_line() {
        assert_eq!(
            kinds("nop ; \"unterminated"),
            vec![(RawToken::Word, "nop"), (RawToken::Comment, "; \"unterminated")]
        );
    }

    #[test]
    fn spans_cover_source() {
        let line = "  add a,  b";
        let (first, consumed) = next_token(line, 0).unwrap().unwrap();
        assert_eq!(first.span, 2..5);
        assert_eq!(consumed, 5);
        assert_eq!(&line[first.span], "add");
    }

    #[test]
    fn literals() {
        assert_eq!(parse_int("0x10").unwrap(), 16);
        assert_eq!(parse_int("0b101").unwrap(), 5);
        assert_eq!(parse_int("0xFFFFFFFF").unwrap(), -1);
        assert!(parse_int("12ab").is_err());

        let mut cursor = Cursor::new(r"'\n' 'ab'");
        assert_eq!(cursor.next_token().unwrap(), Some(Token::Int(10)));
        assert!(cursor.next_token().is_err());
    }
}
