//! Macro assembler and disassembler for the SM83.

pub mod arch;
pub mod assembler;
pub mod config;
pub mod diagnostic;
pub mod disassembler;
