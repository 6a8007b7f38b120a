//! Assembler directives (`.org`, `.db`, ...).
//!
//! Directives that move the address cursor or decide how many bytes are
//! emitted always evaluate strictly, so both passes agree on every address.

use phf::{phf_map, Map};

use super::assemble::{self, Emitted};
use super::context::Context;
use super::eval::{self, Forced};
use super::lex::{Cursor, RawToken};
use super::symbol::{self, Value};
use crate::arch::Imm;
use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AsmDirective {
    Org,
    Set,
    Def,
    Db,
    Str,
    Fill,
    Pad,
    Incbin,
    Chksm,
    Adv,
    Se,
    De,
    Scc,
    Chr,
    Rep,
}

static DIRECTIVES: Map<&'static str, AsmDirective> = phf_map! {
    ".org" => AsmDirective::Org,
    ".set" => AsmDirective::Set,
    ".def" => AsmDirective::Def,
    ".db" => AsmDirective::Db,
    ".str" => AsmDirective::Str,
    ".fill" => AsmDirective::Fill,
    ".pad" => AsmDirective::Pad,
    ".incbin" => AsmDirective::Incbin,
    ".chksm" => AsmDirective::Chksm,
    ".adv" => AsmDirective::Adv,
    ".se" => AsmDirective::Se,
    ".de" => AsmDirective::De,
    ".scc" => AsmDirective::Scc,
    ".chr" => AsmDirective::Chr,
    ".rep" => AsmDirective::Rep,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Type {
    Int,
    Str,
}

fn parse_type(word: &str) -> Result<Type, Diagnostic> {
    match word {
        "int" => Ok(Type::Int),
        "str" => Ok(Type::Str),
        other => Err(ErrorKind::InvalidType(other.to_owned()).into()),
    }
}

/// Runs the directive `name` with its arguments on `cursor`.
pub fn run(ctx: &mut Context, name: &str, mut cursor: Cursor<'_>, out: &mut Emitted) -> Result<(), Diagnostic> {
    let directive = DIRECTIVES
        .get(name)
        .copied()
        .ok_or_else(|| ErrorKind::UnknownDirective(name.to_owned()))?;

    match directive {
        AsmDirective::Org => {
            let address = forced(&mut cursor, ctx)?;
            ctx.state.address = address as u32;
        }
        AsmDirective::Set => set(ctx, &mut cursor, out, false)?,
        AsmDirective::Def => set(ctx, &mut cursor, out, true)?,
        AsmDirective::Db => loop {
            match eval::data(&mut cursor, &*ctx)? {
                Value::Int(value) => {
                    assemble::check_overflow(ctx, Imm::E8, value);
                    out.push(ctx, &[value as u8]);
                }
                Value::Str(s) => out.push(ctx, &s),
            }
            if !next_item(&mut cursor)? {
                break;
            }
        },
        AsmDirective::Str => loop {
            let s = eval::string(&mut cursor, &*ctx)?;
            let mapped: Vec<u8> = s.iter().map(|&b| ctx.state.remap(b)).collect();
            out.push(ctx, &mapped);
            if !next_item(&mut cursor)? {
                break;
            }
        },
        AsmDirective::Fill => {
            let value = eval::int(&mut cursor, &*ctx)?;
            cursor.expect_punct(',')?;
            let count = count(forced(&mut cursor, ctx)?)?;
            out.push(ctx, &vec![value as u8; run_length(ctx, count)?]);
        }
        AsmDirective::Pad => {
            let value = eval::int(&mut cursor, &*ctx)?;
            cursor.expect_punct(',')?;
            let target = forced(&mut cursor, ctx)? as u32;
            let count = target.checked_sub(ctx.state.address).ok_or_else(|| {
                error!(
                    "cannot pad backwards from {:#x} to {target:#x}",
                    ctx.state.address
                )
            })?;
            out.push(ctx, &vec![value as u8; run_length(ctx, count as usize)?]);
        }
        AsmDirective::Incbin => {
            let path = eval::string(&mut cursor, &Forced(&*ctx))?;
            let path = String::from_utf8_lossy(&path).into_owned();
            let data = ctx.resolver.read(&path).map_err(|err| {
                Diagnostic::error(ErrorKind::IncludeOpenFailure(path.clone())).with_help(err.to_string())
            })?;
            log::debug!("including {} bytes from `{path}`", data.len());
            out.push(ctx, &data);
        }
        AsmDirective::Chksm => {
            let checksum = ctx.state.checksum;
            out.push(ctx, &[checksum]);
        }
        AsmDirective::Adv => {
            let count = forced(&mut cursor, ctx)?;
            ctx.state.skip(count as u32);
        }
        AsmDirective::Se => {
            ctx.state.enum_counter = forced(&mut cursor, ctx)?;
        }
        AsmDirective::De => {
            let name = cursor.expect_word("symbol name")?;
            let size = match cursor.peek()? {
                Some(lexeme) if lexeme.is_punct(',') => {
                    cursor.next()?;
                    forced(&mut cursor, ctx)?
                }
                _ => 1,
            };
            let value = ctx.state.enum_counter;
            define(ctx, name, Value::Int(value), true, out)?;
            ctx.state.enum_counter = value.wrapping_add(size);
        }
        AsmDirective::Scc => {
            let from = forced(&mut cursor, ctx)?;
            cursor.expect_punct('=')?;
            let to = forced(&mut cursor, ctx)?;
            ctx.state.charcodes[from as u8 as usize] = to as u8;
        }
        AsmDirective::Chr => {
            let bits = match cursor.next()? {
                Some(lexeme) if lexeme.kind == RawToken::Word => lexeme.text,
                Some(lexeme) => return Err(ErrorKind::InvalidChr(lexeme.text.to_owned()).into()),
                None => return Err(ErrorKind::InvalidChr(String::new()).into()),
            };
            let tile = chr(bits)?;
            out.push(ctx, &tile);
        }
        AsmDirective::Rep => return rep(ctx, cursor, out),
    }

    cursor.expect_end()
}

/// Consumes the `,` between list items; `false` at the end of the list.
fn next_item(cursor: &mut Cursor<'_>) -> Result<bool, Diagnostic> {
    match cursor.peek()? {
        Some(lexeme) if lexeme.is_punct(',') => {
            cursor.next()?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn forced(cursor: &mut Cursor<'_>, ctx: &Context) -> Result<i32, Diagnostic> {
    eval::int(cursor, &Forced(ctx))
}

fn count(value: i32) -> Result<usize, Diagnostic> {
    usize::try_from(value).map_err(|_| error!("count must not be negative, found {value}"))
}

/// Largest run `.fill` and `.pad` emit at once, the size of the biggest
/// cartridge ROM.
const MAX_RUN: usize = 0x80_0000;

/// Checks that `count` bytes fit the address space from the cursor on.
fn run_length(ctx: &Context, count: usize) -> Result<usize, Diagnostic> {
    let end = u64::from(ctx.state.address) + count as u64;
    if count > MAX_RUN || end > u64::from(u32::MAX) + 1 {
        return Err(
            error!("cannot emit {count:#x} bytes at {:#x}", ctx.state.address)
                .with_help(format!("a single run is limited to {MAX_RUN:#x} bytes")),
        );
    }
    Ok(count)
}

fn define(ctx: &mut Context, name: &str, value: Value, constant: bool, out: &mut Emitted) -> Result<(), Diagnostic> {
    let scope = symbol::scope_for(name, ctx.state.scope);
    let pass = ctx.pass();
    let symbol = ctx.symbols.define(name, scope, value, constant, pass)?;
    if constant {
        out.symbols.push(symbol.clone());
    }
    Ok(())
}

/// `.set [TYPE] NAME = EXPR` and `.def TYPE NAME = EXPR`.
fn set(ctx: &mut Context, cursor: &mut Cursor<'_>, out: &mut Emitted, constant: bool) -> Result<(), Diagnostic> {
    let first = cursor.expect_word("symbol name")?;
    let (ty, name) = match cursor.peek()? {
        Some(lexeme) if lexeme.kind == RawToken::Word => {
            cursor.next()?;
            (Some(parse_type(first)?), lexeme.text)
        }
        _ if constant => return Err(ErrorKind::InvalidType(first.to_owned()).into()),
        _ => (None, first),
    };
    cursor.expect_punct('=')?;

    let value = match ty {
        Some(Type::Int) => Value::Int(eval::int(cursor, &*ctx)?),
        Some(Type::Str) => Value::Str(eval::string(cursor, &*ctx)?),
        None => eval::value(cursor, &*ctx)?,
    };
    define(ctx, name, value, constant, out)
}

/// Encodes one 8-pixel row of 2-bit pixels, leftmost pixel in bit 7, as the
/// low bit plane followed by the high bit plane.
fn chr(bits: &str) -> Result<[u8; 2], Diagnostic> {
    let invalid = || Diagnostic::from(ErrorKind::InvalidChr(bits.to_owned()));
    if bits.is_empty() || bits.len() > 8 {
        return Err(invalid());
    }

    let mut planes = [0u8; 2];
    for (i, c) in bits.chars().enumerate() {
        let pixel = c.to_digit(4).ok_or_else(invalid)? as u8;
        let bit = 7 - i;
        planes[0] |= (pixel & 1) << bit;
        planes[1] |= ((pixel >> 1) & 1) << bit;
    }
    Ok(planes)
}

/// `.rep NAME, COUNT, STEP, LINE` assembles LINE COUNT times with NAME set
/// to `i * STEP`.
fn rep(ctx: &mut Context, mut cursor: Cursor<'_>, out: &mut Emitted) -> Result<(), Diagnostic> {
    let name = cursor.expect_word("counter name")?;
    cursor.expect_punct(',')?;
    let times = count(forced(&mut cursor, ctx)?)?;
    cursor.expect_punct(',')?;
    let step = forced(&mut cursor, ctx)?;
    cursor.expect_punct(',')?;
    let body = cursor.rest();

    for i in 0..times {
        define(ctx, name, Value::Int((i as i32).wrapping_mul(step)), false, out)?;
        assemble::assemble_into(ctx, body, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble::line;
    use crate::assembler::context::Pass;
    use crate::assembler::include::MemoryFiles;
    use crate::config::Config;

    fn context() -> Context {
        let files = MemoryFiles::new().with("tiles.bin", vec![1u8, 2, 3]);
        let mut ctx = Context::new(Config::default(), Box::new(files));
        ctx.begin(Pass::Final);
        ctx
    }

    fn run_lines(ctx: &mut Context, lines: &[&str]) -> Vec<u8> {
        lines
            .iter()
            .flat_map(|text| line(ctx, text).unwrap().bytes)
            .collect()
    }

    #[test]
    fn data() {
        let mut ctx = context();
        assert_eq!(
            run_lines(&mut ctx, &[".db 1, 2 + 3, \"ab\"", ".fill 0xAA, 3"]),
            vec![1, 5, b'a', b'b', 0xAA, 0xAA, 0xAA]
        );
        assert_eq!(ctx.state.address, 7);
        assert_eq!(run_lines(&mut ctx, &[".pad 0, 10"]), vec![0, 0, 0]);
        assert!(line(&mut ctx, ".pad 0, 2").is_err());
    }

    #[test]
    fn runs_are_bounded() {
        let mut ctx = context();
        assert!(line(&mut ctx, ".fill 0xFF, 0x7FFFFFFF").is_err());
        assert!(line(&mut ctx, ".pad 0, 0x7FFFFFFF").is_err());
        assert_eq!(ctx.state.address, 0);

        run_lines(&mut ctx, &[".org 0xFFFFFFFF"]);
        assert!(line(&mut ctx, ".fill 0, 2").is_err());
        assert_eq!(run_lines(&mut ctx, &[".fill 0, 1"]), vec![0]);
    }

    #[test]
    fn charcode_remap() {
        let mut ctx = context();
        assert_eq!(
            run_lines(&mut ctx, &[".scc 'a' = 0x80", ".str \"abc\", \"a\""]),
            vec![0x80, b'b', b'c', 0x80]
        );
    }

    #[test]
    fn origin_and_advance() {
        let mut ctx = context();
        run_lines(&mut ctx, &[".org 0x150", ".adv 0x10"]);
        assert_eq!(ctx.state.address, 0x160);
    }

    #[test]
    fn definitions() {
        let mut ctx = context();
        let out = line(&mut ctx, ".def int WIDTH = 20").unwrap();
        assert_eq!(out.symbols.len(), 1);
        line(&mut ctx, ".def str NAME = \"ulas\"").unwrap();
        line(&mut ctx, ".set counter = 1").unwrap();
        line(&mut ctx, ".set int counter = counter + 1").unwrap();

        assert_eq!(ctx.symbols.lookup("WIDTH", 1).unwrap().value, Value::Int(20));
        assert_eq!(
            ctx.symbols.lookup("NAME", 1).unwrap().value,
            Value::Str(b"ulas".to_vec())
        );
        assert_eq!(ctx.symbols.lookup("counter", 1).unwrap().value, Value::Int(2));

        assert_eq!(
            line(&mut ctx, ".def WIDTH = 3").unwrap_err().kind(),
            &ErrorKind::InvalidType("WIDTH".to_owned())
        );
        assert_eq!(
            line(&mut ctx, ".def int WIDTH = 3").unwrap_err().kind(),
            &ErrorKind::RedefinedConstantSymbol("WIDTH".to_owned())
        );
        assert_eq!(
            line(&mut ctx, ".def float X = 3").unwrap_err().kind(),
            &ErrorKind::InvalidType("float".to_owned())
        );
    }

    #[test]
    fn enums() {
        let mut ctx = context();
        run_lines(&mut ctx, &[".se 4", ".de A", ".de B, 2", ".de C"]);
        assert_eq!(ctx.symbols.lookup("A", 1).unwrap().value, Value::Int(4));
        assert_eq!(ctx.symbols.lookup("B", 1).unwrap().value, Value::Int(5));
        assert_eq!(ctx.symbols.lookup("C", 1).unwrap().value, Value::Int(7));
        assert_eq!(ctx.state.enum_counter, 8);
    }

    #[test]
    fn tiles() {
        assert_eq!(chr("01230123").unwrap(), [0b0101_0101, 0b0011_0011]);
        assert_eq!(chr("3").unwrap(), [0x80, 0x80]);
        assert!(chr("4").is_err());
        assert!(chr("000000000").is_err());

        let mut ctx = context();
        assert_eq!(run_lines(&mut ctx, &[".chr 33333333"]), vec![0xFF, 0xFF]);
    }

    #[test]
    fn repeat() {
        let mut ctx = context();
        assert_eq!(
            run_lines(&mut ctx, &[".rep i, 3, 2, .db i + 1"]),
            vec![1, 3, 5]
        );
    }

    #[test]
    fn incbin_and_checksum() {
        let mut ctx = context();
        assert_eq!(run_lines(&mut ctx, &[".incbin \"tiles.bin\""]), vec![1, 2, 3]);
        assert!(line(&mut ctx, ".incbin \"missing.bin\"").is_err());

        let mut ctx = context();
        let header = run_lines(&mut ctx, &[".org 0x134", ".fill 0, 0x19", ".chksm"]);
        assert_eq!(header.last(), Some(&0u8.wrapping_sub(0x19)));
    }

    #[test]
    fn trailing_tokens() {
        let mut ctx = context();
        assert_eq!(
            line(&mut ctx, ".chksm 1").unwrap_err().kind(),
            &ErrorKind::TrailingTokens("1".to_owned())
        );
        assert_eq!(
            line(&mut ctx, ".bogus").unwrap_err().kind(),
            &ErrorKind::UnknownDirective(".bogus".to_owned())
        );
        line(&mut ctx, ".org 0x100 ; entry").unwrap();
    }
}
