//! State threaded through every stage of a run.

use std::fmt;
use std::ops::RangeInclusive;

use super::eval::Env;
use super::include::Resolve;
use super::symbol::{SymbolTable, Value};
use crate::config::Config;
use crate::diagnostic::{Diagnostic, Location};

/// Header bytes covered by the SM83 header checksum.
pub const CHECKSUM_RANGE: RangeInclusive<u32> = 0x134..=0x14C;

/// Scope of the first global label of a pass.
pub const FIRST_SCOPE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pass {
    /// Sizes every line and records label addresses.
    Resolve,
    /// Evaluates everything and writes output.
    Final,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::Resolve => "resolve",
            Pass::Final => "final",
        })
    }
}

/// Everything that starts over at the beginning of a pass.
#[derive(Debug, Clone)]
pub struct PassState {
    pub pass: Pass,
    pub address: u32,
    /// Scope opened by the most recent global label.
    pub scope: u32,
    /// Line within `file`.
    pub line: usize,
    pub file: String,
    /// Source of `$$` ids.
    pub unique: u32,
    pub enum_counter: i32,
    /// Byte remap applied by `.str`.
    pub charcodes: [u8; 256],
    pub checksum: u8,
}

impl PassState {
    pub fn new(pass: Pass, config: &Config) -> PassState {
        let mut charcodes = [0u8; 256];
        for (i, code) in charcodes.iter_mut().enumerate() {
            *code = i as u8;
        }

        PassState {
            pass,
            address: config.origin,
            scope: FIRST_SCOPE,
            line: 0,
            file: config.input_name.clone(),
            unique: 0,
            enum_counter: 0,
            charcodes,
            checksum: 0,
        }
    }

    /// Moves the address cursor over emitted `bytes`.
    pub fn advance(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if CHECKSUM_RANGE.contains(&self.address) {
                self.checksum = self.checksum.wrapping_sub(byte).wrapping_sub(1);
            }
            self.address = self.address.wrapping_add(1);
        }
    }

    /// Moves the address cursor without emitting anything.
    pub fn skip(&mut self, count: u32) {
        self.address = self.address.wrapping_add(count);
    }

    pub fn next_unique(&mut self) -> u32 {
        let id = self.unique;
        self.unique = self.unique.wrapping_add(1);
        id
    }

    pub fn remap(&self, byte: u8) -> u8 {
        self.charcodes[byte as usize]
    }
}

/// The assembler context: run-wide configuration, the symbol table shared by
/// both passes, and the state of the current pass.
pub struct Context {
    pub config: Config,
    pub symbols: SymbolTable,
    pub state: PassState,
    pub resolver: Box<dyn Resolve>,
    /// Non-fatal diagnostics collected during the final pass.
    pub warnings: Vec<Diagnostic>,
}

impl Context {
    pub fn new(config: Config, resolver: Box<dyn Resolve>) -> Context {
        let state = PassState::new(Pass::Resolve, &config);
        Context {
            config,
            symbols: SymbolTable::new(),
            state,
            resolver,
            warnings: Vec::new(),
        }
    }

    /// Starts `pass` from a fresh [`PassState`].
    pub fn begin(&mut self, pass: Pass) {
        log::debug!("starting {pass} pass");
        self.state = PassState::new(pass, &self.config);
    }

    pub fn pass(&self) -> Pass {
        self.state.pass
    }

    pub fn is_final(&self) -> bool {
        self.state.pass == Pass::Final
    }

    pub fn location(&self) -> Location {
        Location {
            file: self.state.file.clone(),
            line: self.state.line,
        }
    }

    /// Records a warning with the current location, final pass only.
    pub fn warn(&mut self, warning: Diagnostic) {
        if self.is_final() {
            let location = self.location();
            self.warnings.push(warning.at(location));
        }
    }
}

impl Env for Context {
    fn symbol(&self, name: &str) -> Option<Value> {
        self.symbols
            .lookup(name, self.state.scope)
            .map(|symbol| symbol.value.clone())
    }

    fn address(&self) -> u32 {
        self.state.address
    }

    fn strict(&self) -> bool {
        self.is_final()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::include::MemoryFiles;

    #[test]
    fn header_checksum() {
        let config = Config {
            origin: 0x134,
            ..Config::default()
        };
        let mut state = PassState::new(Pass::Final, &config);
        state.advance(&[0u8; 0x19]);
        assert_eq!(state.checksum, 0u8.wrapping_sub(0x19));
        assert_eq!(state.address, 0x14D);

        // outside the header
        state.advance(&[0xFF]);
        assert_eq!(state.checksum, 0u8.wrapping_sub(0x19));
    }

    #[test]
    fn fresh_state_per_pass() {
        let mut ctx = Context::new(
            Config {
                origin: 0x100,
                ..Config::default()
            },
            Box::new(MemoryFiles::new()),
        );
        ctx.state.advance(&[1, 2, 3]);
        ctx.state.scope = 9;
        ctx.state.next_unique();
        ctx.state.charcodes[b'A' as usize] = 0x80;

        ctx.begin(Pass::Final);
        assert_eq!(ctx.state.address, 0x100);
        assert_eq!(ctx.state.scope, FIRST_SCOPE);
        assert_eq!(ctx.state.next_unique(), 0);
        assert_eq!(ctx.state.remap(b'A'), b'A');
        assert!(ctx.strict());
    }

    #[test]
    fn warnings_only_in_final_pass() {
        let mut ctx = Context::new(Config::default(), Box::new(MemoryFiles::new()));
        ctx.warn(Diagnostic::warning(crate::diagnostic::ErrorKind::Overflow {
            value: 300,
            bits: 8,
        }));
        assert!(ctx.warnings.is_empty());

        ctx.begin(Pass::Final);
        ctx.warn(Diagnostic::warning(crate::diagnostic::ErrorKind::Overflow {
            value: 300,
            bits: 8,
        }));
        assert_eq!(ctx.warnings.len(), 1);
    }
}
