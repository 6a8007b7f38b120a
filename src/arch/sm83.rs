//! Sharp SM83 (Game Boy CPU) instruction table.
//!
//! Entries sharing a mnemonic are tried in order, so forms with literal
//! register operands must come before forms taking an expression in the
//! same position.

use once_cell::sync::Lazy;

use super::{Arch, Code, Endian, Imm, Instr, Operand};

/// Registers, conditions and restart vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
    Bc,
    De,
    Hl,
    Af,
    Sp,
    NotZero,
    Zero,
    NotCarry,
    Carry,
    Vec00,
    Vec08,
    Vec10,
    Vec18,
    Vec20,
    Vec28,
    Vec30,
    Vec38,
}

impl Reg {
    pub const fn name(self) -> &'static str {
        match self {
            Reg::B => "b",
            Reg::C => "c",
            Reg::D => "d",
            Reg::E => "e",
            Reg::H => "h",
            Reg::L => "l",
            Reg::A => "a",
            Reg::Bc => "bc",
            Reg::De => "de",
            Reg::Hl => "hl",
            Reg::Af => "af",
            Reg::Sp => "sp",
            Reg::NotZero => "nz",
            Reg::Zero => "z",
            Reg::NotCarry => "nc",
            // shares its spelling with register C
            Reg::Carry => "c",
            Reg::Vec00 => "0x00",
            Reg::Vec08 => "0x08",
            Reg::Vec10 => "0x10",
            Reg::Vec18 => "0x18",
            Reg::Vec20 => "0x20",
            Reg::Vec28 => "0x28",
            Reg::Vec30 => "0x30",
            Reg::Vec38 => "0x38",
        }
    }

    const fn op(self) -> Operand {
        Operand::Reg(self.name())
    }
}

const COMMA: Operand = Operand::Char(',');
const OPEN: Operand = Operand::Char('[');
const CLOSE: Operand = Operand::Char(']');
const E8: Operand = Operand::Imm(Imm::E8);
const E16: Operand = Operand::Imm(Imm::E16);
const A8: Operand = Operand::Imm(Imm::A8);

const fn byte(op: u8) -> Code {
    Code::Byte(op)
}

const fn imm(imm: Imm) -> Code {
    Code::Imm(imm)
}

/// The eight r8 operands in opcode order; index 6 is `[hl]`.
fn r8(index: u8) -> Vec<Operand> {
    match index {
        0 => vec![Reg::B.op()],
        1 => vec![Reg::C.op()],
        2 => vec![Reg::D.op()],
        3 => vec![Reg::E.op()],
        4 => vec![Reg::H.op()],
        5 => vec![Reg::L.op()],
        6 => vec![OPEN, Reg::Hl.op(), CLOSE],
        _ => vec![Reg::A.op()],
    }
}

/// `name left, r8` for each r8 in `indices`, opcode `base + index`.
fn r8_row(table: &mut Vec<Instr>, name: &'static str, base: u8, left: &[Operand], indices: &[u8]) {
    for &i in indices {
        let mut operands = left.to_vec();
        operands.push(COMMA);
        operands.extend(r8(i));
        table.push(Instr::new(name, &operands, &[byte(base + i)]));
    }
}

/// `name r8` behind the `0xCB` prefix.
fn prefixed_row(table: &mut Vec<Instr>, name: &'static str, base: u8) {
    for i in 0..8 {
        table.push(Instr::new(name, &r8(i), &[byte(0xCB), byte(base + i)]));
    }
}

/// `name bit, r8` behind the `0xCB` prefix, for bits 0 through 7.
fn bit_rows(table: &mut Vec<Instr>, name: &'static str, base: u8) {
    for bit in 0..8u8 {
        let digit = char::from(b'0' + bit);
        for i in 0..8 {
            let mut operands = vec![Operand::Char(digit), COMMA];
            operands.extend(r8(i));
            table.push(Instr::new(
                name,
                &operands,
                &[byte(0xCB), byte(base + bit * 8 + i)],
            ));
        }
    }
}

fn single(name: &'static str, operand: Reg, op: u8) -> Instr {
    Instr::new(name, &[operand.op()], &[byte(op)])
}

fn reg_e8(name: &'static str, left: Reg, op: u8) -> Instr {
    Instr::new(name, &[left.op(), COMMA, E8], &[byte(op), imm(Imm::E8)])
}

fn reg_e16(name: &'static str, left: Reg, op: u8) -> Instr {
    Instr::new(name, &[left.op(), COMMA, E16], &[byte(op), imm(Imm::E16)])
}

const ALL: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

fn table() -> Vec<Instr> {
    use Reg::*;

    let mut t = Vec::with_capacity(512);

    // control
    t.push(Instr::new("nop", &[], &[byte(0x00)]));
    t.push(Instr::new("halt", &[], &[byte(0x76)]));
    t.push(Instr::new("stop", &[], &[byte(0x10), byte(0x00)]));
    t.push(Instr::new("di", &[], &[byte(0xF3)]));
    t.push(Instr::new("ei", &[], &[byte(0xFB)]));

    // misc
    t.push(Instr::new("daa", &[], &[byte(0x27)]));
    t.push(Instr::new("scf", &[], &[byte(0x37)]));
    t.push(Instr::new("cpl", &[], &[byte(0x2F)]));
    t.push(Instr::new("ccf", &[], &[byte(0x3F)]));

    // accumulator rotates
    t.push(Instr::new("rlca", &[], &[byte(0x07)]));
    t.push(Instr::new("rla", &[], &[byte(0x17)]));
    t.push(Instr::new("rrca", &[], &[byte(0x0F)]));
    t.push(Instr::new("rra", &[], &[byte(0x1F)]));

    // ld r8, r8
    for (reg, base) in [(B, 0x40), (C, 0x48), (D, 0x50), (E, 0x58), (H, 0x60), (L, 0x68), (A, 0x78)] {
        r8_row(&mut t, "ld", base, &[reg.op()], &ALL);
    }

    // ld [r16], a
    t.push(Instr::new("ld", &[OPEN, Bc.op(), CLOSE, COMMA, A.op()], &[byte(0x02)]));
    t.push(Instr::new("ld", &[OPEN, De.op(), CLOSE, COMMA, A.op()], &[byte(0x12)]));
    t.push(Instr::new("ld", &[OPEN, Hl.op(), CLOSE, COMMA, A.op()], &[byte(0x77)]));
    t.push(Instr::new(
        "ld",
        &[OPEN, Hl.op(), Operand::Char('+'), CLOSE, COMMA, A.op()],
        &[byte(0x22)],
    ));
    t.push(Instr::new(
        "ld",
        &[OPEN, Hl.op(), Operand::Char('-'), CLOSE, COMMA, A.op()],
        &[byte(0x32)],
    ));

    // ld [hl], r8 (0x76 is halt, 0x77 is above)
    r8_row(&mut t, "ld", 0x70, &[OPEN, Hl.op(), CLOSE], &[0, 1, 2, 3, 4, 5]);
    t.push(Instr::new(
        "ld",
        &[OPEN, Hl.op(), CLOSE, COMMA, E8],
        &[byte(0x36), imm(Imm::E8)],
    ));

    // ld a, [r16]
    t.push(Instr::new("ld", &[A.op(), COMMA, OPEN, Bc.op(), CLOSE], &[byte(0x0A)]));
    t.push(Instr::new("ld", &[A.op(), COMMA, OPEN, De.op(), CLOSE], &[byte(0x1A)]));
    t.push(Instr::new(
        "ld",
        &[A.op(), COMMA, OPEN, Hl.op(), Operand::Char('+'), CLOSE],
        &[byte(0x2A)],
    ));
    t.push(Instr::new(
        "ld",
        &[A.op(), COMMA, OPEN, Hl.op(), Operand::Char('-'), CLOSE],
        &[byte(0x3A)],
    ));

    t.push(Instr::new(
        "ld",
        &[OPEN, E16, CLOSE, COMMA, Sp.op()],
        &[byte(0x08), imm(Imm::E16)],
    ));
    t.push(Instr::new(
        "ld",
        &[OPEN, E16, CLOSE, COMMA, A.op()],
        &[byte(0xEA), imm(Imm::E16)],
    ));
    t.push(Instr::new(
        "ld",
        &[A.op(), COMMA, OPEN, E16, CLOSE],
        &[byte(0xFA), imm(Imm::E16)],
    ));

    t.push(Instr::new(
        "ld",
        &[Hl.op(), COMMA, Sp.op(), Operand::Char('+'), E8],
        &[byte(0xF8), imm(Imm::E8)],
    ));
    t.push(Instr::new("ld", &[Sp.op(), COMMA, Hl.op()], &[byte(0xF9)]));

    t.push(Instr::new("ldh", &[OPEN, C.op(), CLOSE, COMMA, A.op()], &[byte(0xE2)]));
    t.push(Instr::new("ldh", &[A.op(), COMMA, OPEN, C.op(), CLOSE], &[byte(0xF2)]));
    t.push(Instr::new(
        "ldh",
        &[OPEN, A8, CLOSE, COMMA, A.op()],
        &[byte(0xE0), imm(Imm::A8)],
    ));
    t.push(Instr::new(
        "ldh",
        &[A.op(), COMMA, OPEN, A8, CLOSE],
        &[byte(0xF0), imm(Imm::A8)],
    ));

    // ld r8, e8
    for (reg, op) in [(B, 0x06), (D, 0x16), (H, 0x26), (C, 0x0E), (E, 0x1E), (L, 0x2E), (A, 0x3E)] {
        t.push(reg_e8("ld", reg, op));
    }

    // ld r16, e16
    for (reg, op) in [(Bc, 0x01), (De, 0x11), (Hl, 0x21), (Sp, 0x31)] {
        t.push(reg_e16("ld", reg, op));
    }

    // jr
    for (cond, op) in [(NotZero, 0x20), (NotCarry, 0x30), (Zero, 0x28), (Carry, 0x38)] {
        t.push(reg_e8("jr", cond, op));
    }
    t.push(Instr::new("jr", &[E8], &[byte(0x18), imm(Imm::E8)]));

    // ret
    for (cond, op) in [(NotZero, 0xC0), (NotCarry, 0xD0), (Zero, 0xC8), (Carry, 0xD8)] {
        t.push(single("ret", cond, op));
    }
    t.push(Instr::new("ret", &[], &[byte(0xC9)]));
    t.push(Instr::new("reti", &[], &[byte(0xD9)]));

    // jp
    for (cond, op) in [(NotZero, 0xC2), (NotCarry, 0xD2), (Zero, 0xCA), (Carry, 0xDA)] {
        t.push(reg_e16("jp", cond, op));
    }
    t.push(single("jp", Hl, 0xE9));
    t.push(Instr::new("jp", &[E16], &[byte(0xC3), imm(Imm::E16)]));

    // call
    for (cond, op) in [(NotZero, 0xC4), (NotCarry, 0xD4), (Zero, 0xCC), (Carry, 0xDC)] {
        t.push(reg_e16("call", cond, op));
    }
    t.push(Instr::new("call", &[E16], &[byte(0xCD), imm(Imm::E16)]));

    // rst
    for (vec, op) in [
        (Vec00, 0xC7),
        (Vec10, 0xD7),
        (Vec20, 0xE7),
        (Vec30, 0xF7),
        (Vec08, 0xCF),
        (Vec18, 0xDF),
        (Vec28, 0xEF),
        (Vec38, 0xFF),
    ] {
        t.push(single("rst", vec, op));
    }

    // inc / dec
    for (reg, op) in [(Bc, 0x03), (De, 0x13), (Hl, 0x23), (Sp, 0x33)] {
        t.push(single("inc", reg, op));
    }
    for (reg, op) in [(B, 0x04), (D, 0x14), (H, 0x24), (C, 0x0C), (E, 0x1C), (L, 0x2C), (A, 0x3C)] {
        t.push(single("inc", reg, op));
    }
    t.push(Instr::new("inc", &[OPEN, Hl.op(), CLOSE], &[byte(0x34)]));

    for (reg, op) in [(B, 0x05), (D, 0x15), (H, 0x25), (C, 0x0D), (E, 0x1D), (L, 0x2D), (A, 0x3D)] {
        t.push(single("dec", reg, op));
    }
    t.push(Instr::new("dec", &[OPEN, Hl.op(), CLOSE], &[byte(0x35)]));
    for (reg, op) in [(Bc, 0x0B), (De, 0x1B), (Hl, 0x2B), (Sp, 0x3B)] {
        t.push(single("dec", reg, op));
    }

    // alu a, r8
    for (name, base) in [
        ("add", 0x80),
        ("adc", 0x88),
        ("sub", 0x90),
        ("sbc", 0x98),
        ("and", 0xA0),
        ("xor", 0xA8),
        ("or", 0xB0),
        ("cp", 0xB8),
    ] {
        r8_row(&mut t, name, base, &[A.op()], &ALL);
    }

    // alu a, e8
    for (name, op) in [
        ("add", 0xC6),
        ("adc", 0xCE),
        ("sub", 0xD6),
        ("sbc", 0xDE),
        ("and", 0xE6),
        ("xor", 0xEE),
        ("or", 0xF6),
        ("cp", 0xFE),
    ] {
        t.push(reg_e8(name, A, op));
    }
    t.push(reg_e8("add", Sp, 0xE8));

    // add hl, r16
    for (reg, op) in [(Bc, 0x09), (De, 0x19), (Hl, 0x29), (Sp, 0x39)] {
        t.push(Instr::new("add", &[Hl.op(), COMMA, reg.op()], &[byte(op)]));
    }

    for (reg, op) in [(Bc, 0xC1), (De, 0xD1), (Hl, 0xE1), (Af, 0xF1)] {
        t.push(single("pop", reg, op));
    }
    for (reg, op) in [(Bc, 0xC5), (De, 0xD5), (Hl, 0xE5), (Af, 0xF5)] {
        t.push(single("push", reg, op));
    }

    // 0xCB prefixed
    for (name, base) in [
        ("rlc", 0x00),
        ("rrc", 0x08),
        ("rl", 0x10),
        ("rr", 0x18),
        ("sla", 0x20),
        ("sra", 0x28),
        ("swap", 0x30),
        ("srl", 0x38),
    ] {
        prefixed_row(&mut t, name, base);
    }
    bit_rows(&mut t, "bit", 0x40);
    bit_rows(&mut t, "res", 0x80);
    bit_rows(&mut t, "set", 0xC0);

    t
}

pub static SM83: Lazy<Arch> = Lazy::new(|| Arch {
    name: "sm83",
    endian: Endian::Little,
    instrs: table(),
});
