//! Turns expanded source lines into bytes.

use super::context::{Context, Pass};
use super::directive;
use super::eval;
use super::lex::{Cursor, Lexeme, RawToken};
use super::symbol::{self, Symbol, Value, GLOBAL};
use crate::arch::{Code, Imm, Instr, Operand};
use crate::config::Warnings;
use crate::diagnostic::{Diagnostic, ErrorKind};

/// Output of one source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emitted {
    /// Address cursor when the line started.
    pub address: u32,
    pub bytes: Vec<u8>,
    /// Constants defined by the line.
    pub symbols: Vec<Symbol>,
}

impl Emitted {
    /// Appends `bytes` and moves the address cursor past them.
    pub fn push(&mut self, ctx: &mut Context, bytes: &[u8]) {
        ctx.state.advance(bytes);
        self.bytes.extend_from_slice(bytes);
    }
}

/// Assembles one expanded line.
pub fn line(ctx: &mut Context, text: &str) -> Result<Emitted, Diagnostic> {
    let mut out = Emitted {
        address: ctx.state.address,
        ..Emitted::default()
    };
    assemble_into(ctx, text, &mut out)?;
    Ok(out)
}

/// Assembles `text`, appending to `out`.
pub fn assemble_into(ctx: &mut Context, text: &str, out: &mut Emitted) -> Result<(), Diagnostic> {
    let mut cursor = Cursor::new(text);

    let first = loop {
        match cursor.next()? {
            None => return Ok(()),
            Some(lexeme) if lexeme.is_comment() => return Ok(()),
            Some(lexeme) if is_label(&lexeme) => {
                label(ctx, &lexeme.text[..lexeme.text.len() - 1], out)?;
            }
            Some(lexeme) => break lexeme,
        }
    };

    if first.kind != RawToken::Word {
        return Err(ErrorKind::InvalidInstruction(text.trim().to_owned()).into());
    }

    if first.text.starts_with('.') {
        directive::run(ctx, first.text, cursor, out)
    } else {
        instruction(ctx, first.text, cursor, out)
    }
}

fn is_label(lexeme: &Lexeme<'_>) -> bool {
    lexeme.kind == RawToken::Word && lexeme.text.len() > 1 && lexeme.text.ends_with(':')
}

/// Binds `name` to the address cursor. A global label opens a new scope for
/// the local labels that follow it.
fn label(ctx: &mut Context, name: &str, out: &mut Emitted) -> Result<(), Diagnostic> {
    let scope = if symbol::is_local(name) {
        ctx.state.scope
    } else {
        ctx.state.scope += 1;
        GLOBAL
    };

    let address = ctx.state.address as i32;
    let pass = ctx.pass();
    if ctx.is_final() {
        check_unmoved(ctx, name, scope, address)?;
    }
    let symbol = ctx
        .symbols
        .define(name, scope, Value::Int(address), true, pass)?
        .clone();
    out.symbols.push(symbol);
    Ok(())
}

/// Forward references were encoded with the address the resolve pass
/// recorded, so a label must land on the same address in the final pass.
fn check_unmoved(ctx: &Context, name: &str, scope: u32, address: i32) -> Result<(), Diagnostic> {
    match ctx.symbols.resolve(name, scope) {
        Some(Symbol {
            value: Value::Int(resolved),
            pass: Pass::Resolve,
            constant: true,
            ..
        }) if *resolved != address => Err(Diagnostic::error(ErrorKind::LabelMoved {
            name: name.to_owned(),
            resolved: *resolved,
            address,
        })
        .with_help("the size of an earlier line depends on a value that was not known in the first pass")),
        _ => Ok(()),
    }
}

/// Encodes the first table entry for `mnemonic` whose operands match the
/// rest of the line.
pub fn instruction(
    ctx: &mut Context,
    mnemonic: &str,
    cursor: Cursor<'_>,
    out: &mut Emitted,
) -> Result<(), Diagnostic> {
    let arch = ctx.config.arch();
    let mnemonic = mnemonic.to_ascii_lowercase();
    let mut first_err = None;

    for instr in arch.candidates(&mnemonic) {
        match match_operands(ctx, instr, cursor.clone()) {
            Ok(Some(values)) => {
                log::trace!("matched `{}` with {values:?}", instr.name);
                let bytes = encode(ctx, instr, &values)?;
                out.push(ctx, &bytes);
                return Ok(());
            }
            Ok(None) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }

    Err(first_err.unwrap_or_else(|| {
        ErrorKind::InvalidInstruction(cursor.line().trim().to_owned()).into()
    }))
}

/// Walks the operand pattern of `instr`, returning the evaluated expression
/// slots on a match.
fn match_operands(
    ctx: &Context,
    instr: &Instr,
    mut cursor: Cursor<'_>,
) -> Result<Option<Vec<(Imm, i32)>>, Diagnostic> {
    let mut values = Vec::new();

    for operand in &instr.operands {
        match *operand {
            Operand::Char(c) => match cursor.next()? {
                Some(lexeme) if lexeme.text.len() == c.len_utf8() && lexeme.text.starts_with(c) => {}
                _ => return Ok(None),
            },
            Operand::Reg(name) => match cursor.next()? {
                Some(lexeme) if lexeme.kind == RawToken::Word && lexeme.text.eq_ignore_ascii_case(name) => {}
                _ => return Ok(None),
            },
            Operand::Imm(imm) => {
                if cursor.at_end()? {
                    return Ok(None);
                }
                values.push((imm, eval::int(&mut cursor, ctx)?));
            }
        }
    }

    if cursor.at_end()? {
        Ok(Some(values))
    } else {
        Ok(None)
    }
}

fn encode(ctx: &mut Context, instr: &Instr, values: &[(Imm, i32)]) -> Result<Vec<u8>, Diagnostic> {
    let endian = ctx.config.arch().endian;
    let mut values = values.iter();
    let mut bytes = Vec::with_capacity(instr.len());

    for code in &instr.code {
        match *code {
            Code::Byte(byte) => bytes.push(byte),
            Code::Imm(_) => {
                let &(imm, value) = values.next().ok_or_else(|| {
                    Diagnostic::bug(format!("`{}` encodes more values than it takes", instr.name))
                })?;
                check_overflow(ctx, imm, value);
                match imm.width() {
                    1 => bytes.push(value as u8),
                    _ => bytes.extend_from_slice(&endian.encode(value as u16)),
                }
            }
        }
    }

    Ok(bytes)
}

/// Warns when `value` does not fit the slot.
pub fn check_overflow(ctx: &mut Context, imm: Imm, value: i32) {
    if imm.warns() && !imm.fits(value) && ctx.config.warnings.contains(Warnings::OVERFLOW) {
        ctx.warn(Diagnostic::warning(ErrorKind::Overflow {
            value,
            bits: imm.bits(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::include::MemoryFiles;
    use crate::config::Config;

    fn context(pass: Pass) -> Context {
        let mut ctx = Context::new(Config::default(), Box::new(MemoryFiles::new()));
        ctx.begin(pass);
        ctx
    }

    fn bytes(text: &str) -> Vec<u8> {
        line(&mut context(Pass::Final), text).unwrap().bytes
    }

    #[test]
    fn encodings() {
        assert_eq!(bytes("nop"), vec![0x00]);
        assert_eq!(bytes("ld b, c"), vec![0x41]);
        assert_eq!(bytes("ld [hl], b"), vec![0x70]);
        assert_eq!(bytes("ld [hl], a"), vec![0x77]);
        assert_eq!(bytes("ld a, [hl]"), vec![0x7E]);
        assert_eq!(bytes("ld [hl], 5"), vec![0x36, 0x05]);
        assert_eq!(bytes("ld a, [hl+]"), vec![0x2A]);
        assert_eq!(bytes("ld sp, hl"), vec![0xF9]);
        assert_eq!(bytes("ld hl, sp + 2"), vec![0xF8, 0x02]);
        assert_eq!(bytes("ld bc, 0x1234"), vec![0x01, 0x34, 0x12]);
        assert_eq!(bytes("ld [0xC000], a"), vec![0xEA, 0x00, 0xC0]);
        assert_eq!(bytes("jp hl"), vec![0xE9]);
        assert_eq!(bytes("jr c, 4"), vec![0x38, 0x04]);
        assert_eq!(bytes("rst 0x38"), vec![0xFF]);
        assert_eq!(bytes("bit 7, [hl]"), vec![0xCB, 0x7E]);
        assert_eq!(bytes("rla"), vec![0x17]);
        assert_eq!(bytes("sbc a, 1"), vec![0xDE, 0x01]);
        assert_eq!(bytes("sla b"), vec![0xCB, 0x20]);
        assert_eq!(bytes("sra b"), vec![0xCB, 0x28]);
        assert_eq!(bytes("stop"), vec![0x10, 0x00]);
        assert_eq!(bytes("LD A, B ; upper case"), vec![0x78]);
    }

    #[test]
    fn ldh_truncates_silently() {
        let mut ctx = context(Pass::Final);
        let out = line(&mut ctx, "ldh [0xFF40], a").unwrap();
        assert_eq!(out.bytes, vec![0xE0, 0x40]);
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn overflow_warns() {
        let mut ctx = context(Pass::Final);
        let out = line(&mut ctx, "ld a, 0x1FF").unwrap();
        assert_eq!(out.bytes, vec![0x3E, 0xFF]);
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(
            ctx.warnings[0].kind(),
            &ErrorKind::Overflow {
                value: 0x1FF,
                bits: 8
            }
        );

        let mut quiet = context(Pass::Final);
        quiet.config.warnings = Warnings::empty();
        line(&mut quiet, "ld a, 0x1FF").unwrap();
        assert!(quiet.warnings.is_empty());
    }

    #[test]
    fn labels_and_scopes() {
        let mut ctx = context(Pass::Final);
        let out = line(&mut ctx, "main: @loop: nop").unwrap();
        assert_eq!(out.bytes, vec![0x00]);
        assert_eq!(out.symbols.len(), 2);
        assert_eq!(ctx.state.scope, 2);
        assert_eq!(ctx.symbols.resolve("main", GLOBAL).unwrap().value, Value::Int(0));
        assert_eq!(ctx.symbols.resolve("@loop", 2).unwrap().value, Value::Int(0));

        line(&mut ctx, "@loop: nop").unwrap_err();
        line(&mut ctx, "next:").unwrap();
        line(&mut ctx, "@loop: nop").unwrap();
        assert_eq!(ctx.symbols.resolve("@loop", 3).unwrap().value, Value::Int(1));
    }

    #[test]
    fn labels_stay_put_between_passes() {
        let mut ctx = context(Pass::Resolve);
        line(&mut ctx, "here: nop").unwrap();

        ctx.begin(Pass::Final);
        line(&mut ctx, "nop").unwrap();
        assert_eq!(
            line(&mut ctx, "here:").unwrap_err().kind(),
            &ErrorKind::LabelMoved {
                name: "here".to_owned(),
                resolved: 0,
                address: 1
            }
        );

        ctx.begin(Pass::Final);
        line(&mut ctx, "here: nop").unwrap();
    }

    #[test]
    fn errors() {
        let mut ctx = context(Pass::Final);
        assert_eq!(
            line(&mut ctx, "ld a, missing").unwrap_err().kind(),
            &ErrorKind::UnresolvedSymbol("missing".to_owned())
        );
        assert_eq!(
            line(&mut ctx, "ld q, a").unwrap_err().kind(),
            &ErrorKind::InvalidInstruction("ld q, a".to_owned())
        );
        assert_eq!(
            line(&mut ctx, "frobnicate").unwrap_err().kind(),
            &ErrorKind::InvalidInstruction("frobnicate".to_owned())
        );
        assert!(line(&mut ctx, "nop nop").is_err());
    }

    #[test]
    fn resolve_pass_sizes_unknown_symbols() {
        let mut ctx = context(Pass::Resolve);
        let out = line(&mut ctx, "jp later").unwrap();
        assert_eq!(out.bytes, vec![0xC3, 0x00, 0x00]);
        assert_eq!(ctx.state.address, 3);
    }
}
