//! Declarative instruction tables.
//!
//! Every [`Instr`] pairs the operand tokens expected in source text with the
//! bytes it encodes to. The same entry drives both directions: the assembler
//! walks `operands` to match text and `code` to emit bytes, the disassembler
//! walks `code` to match bytes and `operands` to print text.

pub mod sm83;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn encode(self, value: u16) -> [u8; 2] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    pub fn decode(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        }
    }
}

/// A slot filled by an evaluated expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imm {
    /// 8-bit value.
    E8,
    /// 16-bit value.
    E16,
    /// 8-bit value that never warns on overflow, used where a 16-bit
    /// address is routinely truncated (`ldh`).
    A8,
    /// 16-bit value that never warns on overflow.
    A16,
}

impl Imm {
    /// Encoded size in bytes.
    pub fn width(self) -> usize {
        match self {
            Imm::E8 | Imm::A8 => 1,
            Imm::E16 | Imm::A16 => 2,
        }
    }

    pub fn bits(self) -> u8 {
        (self.width() * 8) as u8
    }

    pub fn warns(self) -> bool {
        matches!(self, Imm::E8 | Imm::E16)
    }

    /// Whether `value` is representable, either signed or unsigned.
    pub fn fits(self, value: i32) -> bool {
        match self.width() {
            1 => (-0x80..=0xFF).contains(&value),
            _ => (-0x8000..=0xFFFF).contains(&value),
        }
    }
}

/// One expected source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Literal punctuation or digit, e.g. `,`, `[`, or the `3` of `bit 3, a`.
    Char(char),
    /// Register or condition name, matched textually.
    Reg(&'static str),
    Imm(Imm),
}

/// One encoded element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Byte(u8),
    /// The next evaluated operand, in the target's endianness.
    Imm(Imm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub name: &'static str,
    pub operands: Vec<Operand>,
    pub code: Vec<Code>,
}

impl Instr {
    pub fn new(name: &'static str, operands: &[Operand], code: &[Code]) -> Instr {
        Instr {
            name,
            operands: operands.to_vec(),
            code: code.to_vec(),
        }
    }

    /// Number of bytes this instruction encodes to.
    pub fn len(&self) -> usize {
        self.code
            .iter()
            .map(|code| match code {
                Code::Byte(_) => 1,
                Code::Imm(imm) => imm.width(),
            })
            .sum()
    }
}

#[derive(Debug)]
pub struct Arch {
    pub name: &'static str,
    pub endian: Endian,
    pub instrs: Vec<Instr>,
}

impl Arch {
    /// Table entries for `mnemonic`, in priority order.
    pub fn candidates<'a>(&'a self, mnemonic: &'a str) -> impl Iterator<Item = &'a Instr> + 'a {
        self.instrs.iter().filter(move |instr| instr.name == mnemonic)
    }

    /// Largest encoded instruction length.
    pub fn max_len(&self) -> usize {
        self.instrs.iter().map(Instr::len).max().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness() {
        assert_eq!(Endian::Little.encode(0x1234), [0x34, 0x12]);
        assert_eq!(Endian::Big.encode(0x1234), [0x12, 0x34]);
        assert_eq!(Endian::Little.decode([0x34, 0x12]), 0x1234);
    }

    #[test]
    fn imm_ranges() {
        assert!(Imm::E8.fits(-128));
        assert!(Imm::E8.fits(255));
        assert!(!Imm::E8.fits(256));
        assert!(Imm::E16.fits(0xFFFF));
        assert!(!Imm::E16.fits(0x10000));
        assert!(!Imm::A8.warns());
    }
}
