//! Turns machine code back into source text using the same instruction table
//! the assembler encodes with.

use std::fmt::Write as _;
use std::io::{Read, Write};

use clap::Args;
use clio::{Input, Output};

use crate::arch::{Arch, Code, Imm, Instr, Operand};
use crate::assembler::parse_address;
use crate::config::Target;
use crate::diagnostic::Diagnostic;
use crate::error;

#[derive(Debug, Args)]
pub struct DisassemblerArgs {
    /// Binary file, `-` for stdin.
    #[clap(value_parser, default_value = "-")]
    input: Input,
    #[clap(short, long, value_parser, default_value = "-")]
    output: Output,

    /// Address of the first byte.
    #[clap(short = 'a', long, value_parser = parse_address, default_value = "0")]
    origin: u32,

    /// Prefix every line with its address.
    #[clap(short, long)]
    print_addresses: bool,

    #[clap(short, long, value_enum, default_value_t)]
    target: Target,
}

/// A decoded instruction and the values of its expression slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<'a> {
    pub instr: &'a Instr,
    pub values: Vec<u32>,
    pub len: usize,
}

impl Decoded<'_> {
    /// Source text, e.g. `ld a, [0xc000]`.
    pub fn render(&self) -> String {
        let mut text = self.instr.name.to_owned();
        let mut values = self.values.iter();

        if !self.instr.operands.is_empty() {
            text.push(' ');
        }
        for operand in &self.instr.operands {
            match operand {
                Operand::Char(',') => text.push_str(", "),
                Operand::Char(c) => text.push(*c),
                Operand::Reg(name) => text.push_str(name),
                Operand::Imm(_) => {
                    let _ = write!(text, "0x{:x}", values.next().copied().unwrap_or_default());
                }
            }
        }

        text
    }
}

/// Matches the encoding of `instr` against the start of `window`.
fn match_code<'a>(arch: &Arch, instr: &'a Instr, window: &[u8]) -> Option<Decoded<'a>> {
    let mut pos = 0;
    let mut values = Vec::new();

    for code in &instr.code {
        match *code {
            Code::Byte(byte) => {
                if window.get(pos) != Some(&byte) {
                    return None;
                }
                pos += 1;
            }
            Code::Imm(imm) => {
                let bytes = window.get(pos..pos + imm.width())?;
                values.push(match imm {
                    Imm::E8 | Imm::A8 => bytes[0] as u32,
                    Imm::E16 | Imm::A16 => arch.endian.decode([bytes[0], bytes[1]]) as u32,
                });
                pos += imm.width();
            }
        }
    }

    Some(Decoded {
        instr,
        values,
        len: pos,
    })
}

/// First table entry encoded at the start of `window`.
pub fn decode<'a>(arch: &'a Arch, window: &[u8]) -> Option<Decoded<'a>> {
    arch.instrs
        .iter()
        .find_map(|instr| match_code(arch, instr, window))
}

pub struct Disassembler {
    arch: &'static Arch,
    /// Bytes examined per decode step.
    window: usize,
    origin: u32,
    print_addresses: bool,
}

impl Disassembler {
    pub fn new(arch: &'static Arch, origin: u32, print_addresses: bool) -> Disassembler {
        Disassembler {
            arch,
            window: arch.max_len(),
            origin,
            print_addresses,
        }
    }

    fn prefix(&self, address: u32) -> String {
        if self.print_addresses {
            format!("{address:08x} ")
        } else {
            String::new()
        }
    }

    /// Writes `code` as source text. Bytes that start no known instruction
    /// are written as `.db` and decoding resumes at the next byte.
    pub fn disassemble(&self, code: &[u8], out: &mut dyn Write) -> std::io::Result<()> {
        let mut address = self.origin;
        writeln!(out, "{}.org 0x{address:x}", self.prefix(address))?;

        let mut pos = 0;
        while pos < code.len() {
            let window = &code[pos..code.len().min(pos + self.window)];
            let len = match decode(self.arch, window) {
                Some(decoded) => {
                    writeln!(out, "{}  {}", self.prefix(address), decoded.render())?;
                    decoded.len
                }
                None => {
                    writeln!(out, "{}.db 0x{:x}", self.prefix(address), window[0])?;
                    1
                }
            };
            pos += len;
            address = address.wrapping_add(len as u32);
        }

        Ok(())
    }
}

pub fn disassemble(mut args: DisassemblerArgs) -> Result<(), Diagnostic> {
    let mut code = Vec::new();
    args.input
        .read_to_end(&mut code)
        .map_err(|err| error!("failed to read `{}`: {err}", args.input))?;
    let arch = args.target.arch();
    log::debug!("disassembling {} bytes of {} code", code.len(), arch.name);

    let disassembler = Disassembler::new(arch, args.origin, args.print_addresses);
    let mut text = Vec::new();
    disassembler.disassemble(&code, &mut text)?;

    crate::assembler::finish(args.output, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sm83::SM83;

    fn text(code: &[u8], print_addresses: bool) -> String {
        let mut out = Vec::new();
        Disassembler::new(&SM83, 0x150, print_addresses)
            .disassemble(code, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn listing() {
        assert_eq!(
            text(&[0x00, 0x41, 0xFA, 0x00, 0xC0, 0xCB, 0x7E], false),
            ".org 0x150\n  nop\n  ld b, c\n  ld a, [0xc000]\n  bit 7, [hl]\n"
        );
    }

    #[test]
    fn addresses() {
        assert_eq!(
            text(&[0x3E, 0x01, 0x76], true),
            "00000150 .org 0x150\n00000150   ld a, 0x1\n00000152   halt\n"
        );
    }

    #[test]
    fn unknown_bytes_resynchronize() {
        // 0x10 without its 0x00 is not `stop`, and `ld bc` runs out of bytes
        assert_eq!(
            text(&[0xD3, 0x10, 0x01, 0xC9], false),
            ".org 0x150\n.db 0xd3\n.db 0x10\n.db 0x1\n  ret\n"
        );
    }

    #[test]
    fn truncated_operands() {
        // `jp` needs two more bytes than are left
        assert_eq!(text(&[0xC3, 0x00], false), ".org 0x150\n.db 0xc3\n  nop\n");
    }
}
