//! Drives the preprocessor and the assembler over the source, once per pass.

use std::io::{self, BufRead, Seek, Write};

use super::assemble;
use super::context::{Context, Pass};
use super::include::Resolve;
use super::listing::Observer;
use super::preproc::{Preprocessor, Reader, Sink, Text};
use super::symbol::SymbolTable;
use crate::config::Config;
use crate::diagnostic::Diagnostic;

/// Assembles every expanded line; output is only written in the final pass.
struct Emitter<'o, 'a> {
    output: &'o mut dyn Write,
    observers: &'o mut [&'a mut dyn Observer],
}

impl Sink for Emitter<'_, '_> {
    fn emit(&mut self, ctx: &mut Context, line: &str) -> Result<(), Diagnostic> {
        let emitted = assemble::line(ctx, line)?;
        if !ctx.is_final() {
            return Ok(());
        }

        self.output.write_all(&emitted.bytes)?;
        for observer in self.observers.iter_mut() {
            observer.line(emitted.address, &emitted.bytes, line)?;
            for symbol in &emitted.symbols {
                observer.symbol(symbol)?;
            }
        }
        Ok(())
    }
}

pub struct Assembler {
    ctx: Context,
}

impl Assembler {
    pub fn new(config: Config, resolver: Box<dyn Resolve>) -> Assembler {
        Assembler {
            ctx: Context::new(config, resolver),
        }
    }

    /// Runs the resolve pass and then the final pass, rewinding `source` in
    /// between so forward references resolve.
    pub fn assemble<R: BufRead + Seek>(
        &mut self,
        mut source: R,
        output: &mut dyn Write,
        observers: &mut [&mut dyn Observer],
    ) -> Result<(), Diagnostic> {
        self.ctx.warnings.clear();
        self.pass(Pass::Resolve, &mut source, &mut io::sink(), &mut [])?;
        source.rewind()?;
        self.pass(Pass::Final, &mut source, output, observers)
    }

    /// Runs the final pass alone, for sources that cannot be rewound.
    /// Forward references are reported as unresolved symbols.
    pub fn assemble_stream<R: BufRead>(
        &mut self,
        source: R,
        output: &mut dyn Write,
        observers: &mut [&mut dyn Observer],
    ) -> Result<(), Diagnostic> {
        self.ctx.warnings.clear();
        self.pass(Pass::Final, source, output, observers)
    }

    /// Expands `source` and writes the resulting text instead of assembling.
    pub fn preprocess<R: BufRead>(&mut self, source: R, output: &mut dyn Write) -> Result<(), Diagnostic> {
        self.ctx.begin(Pass::Final);
        Preprocessor::new().run(&mut self.ctx, &mut Reader::new(source), &mut Text(output))
    }

    fn pass<R: BufRead>(
        &mut self,
        pass: Pass,
        source: R,
        output: &mut dyn Write,
        observers: &mut [&mut dyn Observer],
    ) -> Result<(), Diagnostic> {
        self.ctx.begin(pass);
        let mut emitter = Emitter { output, observers };
        Preprocessor::new().run(&mut self.ctx, &mut Reader::new(source), &mut emitter)?;
        log::debug!(
            "{pass} pass finished at {:#x} with {} symbols",
            self.ctx.state.address,
            self.ctx.symbols.len()
        );
        Ok(())
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.ctx.warnings
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.ctx.symbols
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }
}
