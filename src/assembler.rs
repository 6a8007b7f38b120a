//! Assembles the specified file.
//!
//! Source text goes through the [`preproc`] stage line by line, and every
//! expanded line is encoded by [`assemble`]. [`pass::Assembler`] runs this
//! pipeline twice, first to learn every label's address and then to emit.

mod ascii;
pub mod assemble;
pub mod context;
mod directive;
pub mod eval;
pub mod include;
pub mod lex;
pub mod listing;
pub mod pass;
pub mod preproc;
pub mod symbol;

pub use pass::Assembler;

use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use clio::{Input, Output};
use colored::Colorize;

use crate::config::{Config, Target, Warnings};
use crate::diagnostic::Diagnostic;
use crate::error;
use include::SearchPaths;
use listing::{Listing, Observer, SymbolList};

#[derive(Debug, Args)]
pub struct AssemblerArgs {
    /// Source file, `-` for stdin.
    #[clap(value_parser, default_value = "-")]
    input: Input,
    #[clap(short, long, value_parser, default_value = "-")]
    output: Output,

    /// Write a listing of addresses, bytes and source lines.
    #[clap(short, long, value_parser)]
    listing: Option<Output>,
    /// Write the address of every constant symbol.
    #[clap(short, long, value_parser)]
    symbols: Option<Output>,

    /// Directory searched by `#include` and `.incbin`. May be repeated.
    #[clap(short = 'i', long = "include")]
    include: Vec<PathBuf>,

    /// Address of the first emitted byte.
    #[clap(short = 'a', long, value_parser = parse_address, default_value = "0")]
    origin: u32,

    /// Only run the preprocessor and write the expanded source.
    #[clap(short, long)]
    preprocess: bool,

    /// Toggle a warning class: `a` for all, `o` for overflow.
    #[clap(short = 'w', long = "warn", value_parser = parse_warning)]
    warn: Vec<Warnings>,

    #[clap(short, long, value_enum, default_value_t)]
    target: Target,
}

/// Parses a decimal, `0x` hexadecimal or `0b` binary address.
pub fn parse_address(s: &str) -> Result<u32, String> {
    lex::parse_int(s)
        .map(|address| address as u32)
        .map_err(|err| err.kind().to_string())
}

fn parse_warning(s: &str) -> Result<Warnings, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(flag), None) => {
            Warnings::from_flag(flag).ok_or_else(|| format!("unknown warning class `{flag}`"))
        }
        _ => Err(format!("expected a single warning flag, found `{s}`")),
    }
}

impl AssemblerArgs {
    fn config(&self) -> Config {
        let warnings = self
            .warn
            .iter()
            .fold(Warnings::default(), |acc, &toggle| acc ^ toggle);

        Config {
            input_name: format!("{}", self.input).trim_matches('"').to_owned(),
            origin: self.origin,
            warnings,
            preprocess_only: self.preprocess,
            target: self.target,
        }
    }
}

pub fn assemble(mut args: AssemblerArgs) -> Result<(), Diagnostic> {
    let start = Instant::now();
    let config = args.config();
    let input = config.input_name.clone();

    let mut source = Vec::new();
    args.input
        .read_to_end(&mut source)
        .map_err(|err| error!("failed to read `{input}`: {err}"))?;

    let mut assembler = Assembler::new(config, Box::new(SearchPaths::new(args.include.clone())));
    let mut assembled = Vec::new();

    if assembler.config().preprocess_only {
        assembler.preprocess(Cursor::new(source), &mut assembled)?;
    } else {
        let mut listing = args.listing.as_ref().map(|_| Listing::new(Vec::new()));
        let mut symbols = args.symbols.as_ref().map(|_| SymbolList::new(Vec::new()));

        let mut observers: Vec<&mut dyn Observer> = Vec::new();
        if let Some(listing) = listing.as_mut() {
            observers.push(listing);
        }
        if let Some(symbols) = symbols.as_mut() {
            observers.push(symbols);
        }

        let result = assembler.assemble(Cursor::new(source), &mut assembled, &mut observers);
        for warning in assembler.warnings() {
            warning.emit();
        }
        result?;

        if let (Some(out), Some(listing)) = (args.listing.take(), listing) {
            finish(out, &listing.into_inner())?;
        }
        if let (Some(out), Some(symbols)) = (args.symbols.take(), symbols) {
            finish(out, &symbols.into_inner())?;
        }
    }

    finish(args.output, &assembled)?;

    let elapsed = start.elapsed().as_millis();
    let seconds = elapsed / 1000;
    let millis = elapsed % 1000;
    eprintln!(
        "    {} assembling `{input}` in {seconds}.{millis:03}s",
        "Finished".green().bold(),
    );

    Ok(())
}

/// Writes `data` to `out` and closes it.
pub(crate) fn finish(mut out: Output, data: &[u8]) -> Result<(), Diagnostic> {
    out.write_all(data)
        .map_err(|err| error!("failed to write to output: {err}"))?;
    out.finish()
        .map_err(|err| error!("failed to finalize output: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses() {
        assert_eq!(parse_address("0x150"), Ok(0x150));
        assert_eq!(parse_address("0b101"), Ok(5));
        assert_eq!(parse_address("336"), Ok(336));
        assert_eq!(parse_address("0xFFFFFFFF"), Ok(u32::MAX));
        assert!(parse_address("0xZZ").is_err());
        assert!(parse_address("").is_err());
    }
}
