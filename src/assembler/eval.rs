//! Expression evaluation.
//!
//! An expression is scanned from the line up to the next `,`, `]`, `=` or
//! comment, parsed into a flat arena of nodes addressed by index and then
//! evaluated. Binding, loosest first:
//!
//! | level          | operators          |
//! |----------------|--------------------|
//! | bitwise        | `\|` `&` `^`       |
//! | equality       | `==` `!=`          |
//! | comparison     | `<` `>` `<=` `>=`  |
//! | shift          | `<<` `>>`          |
//! | additive       | `+` `-`            |
//! | multiplicative | `*` `/` `%`        |
//! | unary          | `!` `-` `+` `~`    |
//!
//! All arithmetic wraps on 32-bit signed integers.

use std::cell::RefCell;

use super::lex::{Cursor, Op, Token};
use super::symbol::Value;
use crate::diagnostic::{Diagnostic, ErrorKind};

/// What an expression can observe.
pub trait Env {
    /// Current value of `name`, if defined.
    fn symbol(&self, name: &str) -> Option<Value>;

    /// The address cursor.
    fn address(&self) -> u32;

    /// Whether unresolved symbols and zero divisors are errors.
    ///
    /// Otherwise they evaluate to `0`, so sizes can be computed before every
    /// label is known.
    fn strict(&self) -> bool;
}

/// Evaluates strictly regardless of the pass.
pub struct Forced<'a, E: Env + ?Sized>(pub &'a E);

impl<E: Env + ?Sized> Env for Forced<'_, E> {
    fn symbol(&self, name: &str) -> Option<Value> {
        self.0.symbol(name)
    }

    fn address(&self) -> u32 {
        self.0.address()
    }

    fn strict(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Xor,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

const LEVELS: &[&[BinOp]] = &[
    &[BinOp::Or, BinOp::And, BinOp::Xor],
    &[BinOp::Eq, BinOp::Ne],
    &[BinOp::Lt, BinOp::Gt, BinOp::Le, BinOp::Ge],
    &[BinOp::Shl, BinOp::Shr],
    &[BinOp::Add, BinOp::Sub],
    &[BinOp::Mul, BinOp::Div, BinOp::Rem],
];

impl BinOp {
    fn from_token(token: &Token) -> Option<BinOp> {
        Some(match token {
            Token::Punct('|') => BinOp::Or,
            Token::Punct('&') => BinOp::And,
            Token::Punct('^') => BinOp::Xor,
            Token::Op(Op::Eq) => BinOp::Eq,
            Token::Op(Op::Ne) => BinOp::Ne,
            Token::Punct('<') => BinOp::Lt,
            Token::Punct('>') => BinOp::Gt,
            Token::Op(Op::Le) => BinOp::Le,
            Token::Op(Op::Ge) => BinOp::Ge,
            Token::Op(Op::Shl) => BinOp::Shl,
            Token::Op(Op::Shr) => BinOp::Shr,
            Token::Punct('+') => BinOp::Add,
            Token::Punct('-') => BinOp::Sub,
            Token::Punct('*') => BinOp::Mul,
            Token::Punct('/') => BinOp::Div,
            Token::Punct('%') => BinOp::Rem,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnOp {
    Not,
    Neg,
    Plus,
    Invert,
}

impl UnOp {
    fn from_token(token: &Token) -> Option<UnOp> {
        match token {
            Token::Punct('!') => Some(UnOp::Not),
            Token::Punct('-') => Some(UnOp::Neg),
            Token::Punct('+') => Some(UnOp::Plus),
            Token::Punct('~') => Some(UnOp::Invert),
            _ => None,
        }
    }
}

/// Arena node; children are indices into the same arena, primaries index
/// the token buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expr {
    Binary { op: BinOp, left: usize, right: usize },
    Unary { op: UnOp, operand: usize },
    Primary(usize),
    Group(usize),
}

struct Parser<'l> {
    line: &'l str,
    tokens: Vec<Token>,
    /// Byte offset of each token in `line`.
    starts: Vec<usize>,
    end: usize,
    pos: usize,
    arena: Vec<Expr>,
}

impl<'l> Parser<'l> {
    /// Consumes the tokens of one expression from `cursor`, leaving the
    /// terminator in place.
    fn scan(cursor: &mut Cursor<'l>) -> Result<Parser<'l>, Diagnostic> {
        let mut tokens = Vec::new();
        let mut starts = Vec::new();
        let mut end = cursor.pos();

        while let Some(lexeme) = cursor.peek()? {
            if lexeme.is_comment() || lexeme.is_punct(',') || lexeme.is_punct(']') || lexeme.is_punct('=') {
                break;
            }
            cursor.next()?;
            starts.push(lexeme.span.start);
            end = lexeme.span.end;
            tokens.push(lexeme.token()?);
        }

        Ok(Parser {
            line: cursor.line(),
            tokens,
            starts,
            end,
            pos: 0,
            arena: Vec::new(),
        })
    }

    fn is_lone_symbol(&self, mut index: usize) -> bool {
        loop {
            match self.arena.get(index) {
                Some(&Expr::Group(inner)) => index = inner,
                Some(&Expr::Primary(token)) => return matches!(self.tokens.get(token), Some(Token::Symbol(_))),
                _ => return false,
            }
        }
    }

    fn push(&mut self, expr: Expr) -> usize {
        self.arena.push(expr);
        self.arena.len() - 1
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn parse(&mut self) -> Result<usize, Diagnostic> {
        if self.tokens.is_empty() {
            return Err(ErrorKind::ExpectedExpression.into());
        }

        let root = self.binary(0)?;
        if self.pos < self.tokens.len() {
            let start = self.starts[self.pos];
            return Err(ErrorKind::TrailingTokens(self.line[start..self.end].trim().to_owned()).into());
        }
        Ok(root)
    }

    fn binary(&mut self, level: usize) -> Result<usize, Diagnostic> {
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };

        let mut left = self.binary(level + 1)?;
        while let Some(op) = self
            .peek()
            .and_then(BinOp::from_token)
            .filter(|op| ops.contains(op))
        {
            self.pos += 1;
            let right = self.binary(level + 1)?;
            left = self.push(Expr::Binary { op, left, right });
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<usize, Diagnostic> {
        match self.peek().and_then(UnOp::from_token) {
            Some(op) => {
                self.pos += 1;
                let operand = self.unary()?;
                Ok(self.push(Expr::Unary { op, operand }))
            }
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<usize, Diagnostic> {
        match self.peek() {
            Some(Token::Int(_) | Token::Str(_) | Token::Symbol(_) | Token::CurrentAddress) => {
                let index = self.pos;
                self.pos += 1;
                Ok(self.push(Expr::Primary(index)))
            }
            Some(Token::Punct('(')) => {
                self.pos += 1;
                let inner = self.binary(0)?;
                match self.peek() {
                    Some(Token::Punct(')')) => {
                        self.pos += 1;
                        Ok(self.push(Expr::Group(inner)))
                    }
                    Some(token) => Err(ErrorKind::expected("`)`", token.to_string()).into()),
                    None => Err(ErrorKind::expected("`)`", "end of expression").into()),
                }
            }
            Some(token) => Err(ErrorKind::expected("expression", token.to_string()).into()),
            None => Err(ErrorKind::ExpectedExpression.into()),
        }
    }
}

struct Evaluator<'p, 'e, E: Env + ?Sized> {
    parser: &'p Parser<'p>,
    env: &'e E,
    /// First unknown symbol that was replaced with `0`.
    unresolved: RefCell<Option<String>>,
}

impl<E: Env + ?Sized> Evaluator<'_, '_, E> {
    fn node(&self, index: usize) -> Result<Expr, Diagnostic> {
        self.parser
            .arena
            .get(index)
            .copied()
            .ok_or_else(|| Diagnostic::bug(format!("expression node {index} out of range")))
    }

    fn eval(&self, index: usize) -> Result<Value, Diagnostic> {
        match self.node(index)? {
            Expr::Primary(token) => self.primary(token),
            Expr::Group(inner) => self.eval(inner),
            Expr::Unary { op, operand } => {
                let value = self.int(operand)?;
                Ok(Value::Int(match op {
                    UnOp::Not => (value == 0) as i32,
                    UnOp::Neg => value.wrapping_neg(),
                    UnOp::Plus => value,
                    UnOp::Invert => !value,
                }))
            }
            Expr::Binary { op, left, right } => {
                let lhs = self.int(left)?;
                let rhs = self.int(right)?;
                self.binary(op, lhs, rhs).map(Value::Int)
            }
        }
    }

    fn int(&self, index: usize) -> Result<i32, Diagnostic> {
        match self.eval(index)? {
            Value::Int(value) => Ok(value),
            Value::Str(_) => Err(ErrorKind::ExpectedInteger.into()),
        }
    }

    fn primary(&self, index: usize) -> Result<Value, Diagnostic> {
        let token = self
            .parser
            .tokens
            .get(index)
            .ok_or_else(|| Diagnostic::bug(format!("token {index} out of range")))?;

        match token {
            Token::Int(value) => Ok(Value::Int(*value)),
            Token::Str(s) => Ok(Value::Str(s.clone())),
            Token::CurrentAddress => Ok(Value::Int(self.env.address() as i32)),
            Token::Symbol(name) => match self.env.symbol(name) {
                Some(value) => Ok(value),
                None if self.env.strict() => Err(ErrorKind::UnresolvedSymbol(name.clone()).into()),
                None => {
                    self.unresolved.borrow_mut().get_or_insert_with(|| name.clone());
                    Ok(Value::Int(0))
                }
            },
            other => Err(Diagnostic::bug(format!("{other} is not a primary expression"))),
        }
    }

    fn binary(&self, op: BinOp, lhs: i32, rhs: i32) -> Result<i32, Diagnostic> {
        Ok(match op {
            BinOp::Or => lhs | rhs,
            BinOp::And => lhs & rhs,
            BinOp::Xor => lhs ^ rhs,
            BinOp::Eq => (lhs == rhs) as i32,
            BinOp::Ne => (lhs != rhs) as i32,
            BinOp::Lt => (lhs < rhs) as i32,
            BinOp::Gt => (lhs > rhs) as i32,
            BinOp::Le => (lhs <= rhs) as i32,
            BinOp::Ge => (lhs >= rhs) as i32,
            BinOp::Shl => u32::try_from(rhs)
                .ok()
                .and_then(|rhs| lhs.checked_shl(rhs))
                .unwrap_or(0),
            BinOp::Shr => u32::try_from(rhs)
                .ok()
                .and_then(|rhs| lhs.checked_shr(rhs))
                .unwrap_or(if lhs < 0 { -1 } else { 0 }),
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::Mul => lhs.wrapping_mul(rhs),
            BinOp::Div | BinOp::Rem if rhs == 0 => {
                if self.env.strict() {
                    return Err(match op {
                        BinOp::Div => ErrorKind::DivideByZero,
                        _ => ErrorKind::ModuloByZero,
                    }
                    .into());
                }
                0
            }
            BinOp::Div => lhs.wrapping_div(rhs),
            BinOp::Rem => lhs.wrapping_rem(rhs),
        })
    }
}

struct Evaluated {
    value: Value,
    unresolved: Option<String>,
    /// The expression is a single symbol, possibly parenthesized.
    lone_symbol: bool,
}

fn evaluate<E: Env + ?Sized>(cursor: &mut Cursor<'_>, env: &E) -> Result<Evaluated, Diagnostic> {
    let mut parser = Parser::scan(cursor)?;
    let root = parser.parse()?;

    let evaluator = Evaluator {
        parser: &parser,
        env,
        unresolved: RefCell::new(None),
    };
    let value = evaluator.eval(root)?;
    Ok(Evaluated {
        value,
        unresolved: evaluator.unresolved.into_inner(),
        lone_symbol: parser.is_lone_symbol(root),
    })
}

fn r#unsized(name: String) -> Diagnostic {
    Diagnostic::error(ErrorKind::UnresolvedSymbol(name))
        .with_help("a string must be defined before it is used")
}

/// Evaluates the next expression on `cursor`.
pub fn value<E: Env + ?Sized>(cursor: &mut Cursor<'_>, env: &E) -> Result<Value, Diagnostic> {
    evaluate(cursor, env).map(|evaluated| evaluated.value)
}

/// Evaluates the next item of a data list.
///
/// A lone symbol that is not known yet may name a string of any length, so it
/// is an error even outside strict evaluation.
pub fn data<E: Env + ?Sized>(cursor: &mut Cursor<'_>, env: &E) -> Result<Value, Diagnostic> {
    let evaluated = evaluate(cursor, env)?;
    match evaluated.unresolved {
        Some(name) if evaluated.lone_symbol => Err(r#unsized(name)),
        _ => Ok(evaluated.value),
    }
}

/// Evaluates the next expression on `cursor` as an integer.
pub fn int<E: Env + ?Sized>(cursor: &mut Cursor<'_>, env: &E) -> Result<i32, Diagnostic> {
    match value(cursor, env)? {
        Value::Int(value) => Ok(value),
        Value::Str(_) => Err(ErrorKind::ExpectedInteger.into()),
    }
}

/// Evaluates the next expression on `cursor` as a string. Unknown symbols are
/// errors in every pass.
pub fn string<E: Env + ?Sized>(cursor: &mut Cursor<'_>, env: &E) -> Result<Vec<u8>, Diagnostic> {
    let evaluated = evaluate(cursor, env)?;
    match (evaluated.value, evaluated.unresolved) {
        (_, Some(name)) => Err(r#unsized(name)),
        (Value::Str(s), None) => Ok(s),
        (Value::Int(_), None) => Err(ErrorKind::ExpectedString.into()),
    }
}

/// Evaluates all of `text` as one expression.
pub fn eval_str<E: Env + ?Sized>(text: &str, env: &E) -> Result<Value, Diagnostic> {
    let mut cursor = Cursor::new(text);
    let value = value(&mut cursor, env)?;
    cursor.expect_end()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Vars {
        symbols: HashMap<&'static str, Value>,
        address: u32,
        strict: bool,
    }

    impl Env for Vars {
        fn symbol(&self, name: &str) -> Option<Value> {
            self.symbols.get(name).cloned()
        }

        fn address(&self) -> u32 {
            self.address
        }

        fn strict(&self) -> bool {
            self.strict
        }
    }

    fn strict() -> Vars {
        Vars {
            strict: true,
            ..Vars::default()
        }
    }

    fn eval<E: Env>(text: &str, env: &E) -> Result<i32, Diagnostic> {
        let mut cursor = Cursor::new(text);
        let value = int(&mut cursor, env)?;
        cursor.expect_end()?;
        Ok(value)
    }

    #[test]
    fn precedence() {
        let env = strict();
        assert_eq!(eval("2 + 3 * 5", &env).unwrap(), 17);
        assert_eq!(eval("(2 + 3) * 5", &env).unwrap(), 25);
        assert_eq!(eval("--1", &env).unwrap(), 1);
        assert_eq!(eval("1 - -1", &env).unwrap(), 2);
        assert_eq!(eval("1 + 2 == 3", &env).unwrap(), 1);
        assert_eq!(eval("1 << 4 + 1", &env).unwrap(), 32);
        assert_eq!(eval("6 & 3 == 3", &env).unwrap(), 0);
        assert_eq!(eval("~0 ^ 0xF0", &env).unwrap(), !0xF0);
        assert_eq!(eval("!5 | !0", &env).unwrap(), 1);
        assert_eq!(eval("-7 % 3", &env).unwrap(), -1);
        assert_eq!(eval("-16 >> 2", &env).unwrap(), -4);
    }

    #[test]
    fn wrapping() {
        let env = strict();
        assert_eq!(eval("0x7FFFFFFF + 1", &env).unwrap(), i32::MIN);
        assert_eq!(eval("1 << 40", &env).unwrap(), 0);
    }

    #[test]
    fn division_by_zero_only_when_strict() {
        let lenient = Vars::default();
        assert_eq!(eval("8 / 0", &lenient).unwrap(), 0);
        assert_eq!(eval("8 % 0", &lenient).unwrap(), 0);

        let env = strict();
        assert_eq!(
            eval("8 / 0", &env).unwrap_err().kind(),
            &ErrorKind::DivideByZero
        );
        assert_eq!(
            eval("8 % 0", &env).unwrap_err().kind(),
            &ErrorKind::ModuloByZero
        );
        assert_eq!(
            eval("8 / 0", &Forced(&lenient)).unwrap_err().kind(),
            &ErrorKind::DivideByZero
        );
    }

    #[test]
    fn symbols() {
        let mut env = Vars::default();
        env.symbols.insert("base", Value::Int(0x100));
        env.address = 0x150;

        assert_eq!(eval("base + 2", &env).unwrap(), 0x102);
        assert_eq!(eval("$ - base", &env).unwrap(), 0x50);
        assert_eq!(eval("later + 1", &env).unwrap(), 1);

        env.strict = true;
        assert_eq!(
            eval("later + 1", &env).unwrap_err().kind(),
            &ErrorKind::UnresolvedSymbol("later".to_owned())
        );
    }

    #[test]
    fn unknown_lone_symbols_cannot_be_sized() {
        let mut env = Vars::default();
        env.symbols.insert("known", Value::Str(b"hi".to_vec()));
        let item = |text: &str, env: &Vars| data(&mut Cursor::new(text), env);

        assert_eq!(item("known", &env).unwrap(), Value::Str(b"hi".to_vec()));
        assert_eq!(item("later + 1", &env).unwrap(), Value::Int(1));
        assert_eq!(
            item("later", &env).unwrap_err().kind(),
            &ErrorKind::UnresolvedSymbol("later".to_owned())
        );
        assert_eq!(
            item("((later))", &env).unwrap_err().kind(),
            &ErrorKind::UnresolvedSymbol("later".to_owned())
        );
    }

    #[test]
    fn stops_at_terminators() {
        let env = strict();
        let mut cursor = Cursor::new("1 + 2, 3");
        assert_eq!(int(&mut cursor, &env).unwrap(), 3);
        cursor.expect_punct(',').unwrap();
        assert_eq!(int(&mut cursor, &env).unwrap(), 3);

        let mut cursor = Cursor::new("0xFF00 + 4] ; io");
        assert_eq!(int(&mut cursor, &env).unwrap(), 0xFF04);
        cursor.expect_punct(']').unwrap();
        assert!(cursor.at_end().unwrap());
    }

    #[test]
    fn malformed() {
        let env = strict();
        assert_eq!(
            eval("1 2", &env).unwrap_err().kind(),
            &ErrorKind::TrailingTokens("2".to_owned())
        );
        assert_eq!(
            eval("", &env).unwrap_err().kind(),
            &ErrorKind::ExpectedExpression
        );
        assert!(eval("(1 + 2", &env).is_err());
        assert!(eval("1 +", &env).is_err());
    }

    #[test]
    fn strings_only_stand_alone() {
        let env = strict();
        let mut cursor = Cursor::new(r#""abc""#);
        assert_eq!(string(&mut cursor, &env).unwrap(), b"abc");

        assert_eq!(
            eval(r#""abc" + 1"#, &env).unwrap_err().kind(),
            &ErrorKind::ExpectedInteger
        );

        let lenient = Vars::default();
        let mut cursor = Cursor::new("path");
        assert_eq!(
            string(&mut cursor, &lenient).unwrap_err().kind(),
            &ErrorKind::UnresolvedSymbol("path".to_owned())
        );

        let mut cursor = Cursor::new("1");
        assert_eq!(
            string(&mut cursor, &lenient).unwrap_err().kind(),
            &ErrorKind::ExpectedString
        );
    }

    #[test]
    fn chars_are_ints() {
        let env = strict();
        assert_eq!(eval("'A' + 1", &env).unwrap(), 66);
    }
}
