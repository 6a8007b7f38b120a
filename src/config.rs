//! Run-wide settings shared, read-only, by every pass.

use bitflags::bitflags;
use once_cell::sync::Lazy;

use crate::arch::{self, Arch};

bitflags! {
    /// Warning classes that may be reported.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Warnings: u32 {
        /// An expression does not fit into its instruction slot.
        const OVERFLOW = 1 << 0;
        const ALL = 0x7FFF_FFFF;
    }
}

impl Default for Warnings {
    fn default() -> Self {
        Warnings::OVERFLOW
    }
}

impl Warnings {
    /// Maps a `-w` flag character to the warnings it toggles.
    pub fn from_flag(flag: char) -> Option<Warnings> {
        match flag {
            'a' => Some(Warnings::ALL),
            'o' => Some(Warnings::OVERFLOW),
            _ => None,
        }
    }
}

/// Instruction set the codec uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Target {
    /// Sharp SM83 (Game Boy).
    #[default]
    Sm83,
}

impl Target {
    pub fn arch(self) -> &'static Arch {
        match self {
            Target::Sm83 => Lazy::force(&arch::sm83::SM83),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name reported for the top-level source.
    pub input_name: String,
    /// Address cursor value at the start of every pass.
    pub origin: u32,
    pub warnings: Warnings,
    /// Stop after macro expansion and emit text.
    pub preprocess_only: bool,
    pub target: Target,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_name: "-".to_owned(),
            origin: 0,
            warnings: Warnings::default(),
            preprocess_only: false,
            target: Target::default(),
        }
    }
}

impl Config {
    pub fn arch(&self) -> &'static Arch {
        self.target.arch()
    }
}
