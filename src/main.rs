use clap::{Parser, Subcommand};
use shadow_rs::shadow;
use thiserror::Error;

use ulas::assembler::{self, AssemblerArgs};
use ulas::diagnostic::Diagnostic;
use ulas::disassembler::{self, DisassemblerArgs};

shadow!(build);

/// Assembles and disassembles SM83 programs.
#[derive(Parser, Debug)]
#[command(name = "ulas", author, version = build::CLAP_LONG_VERSION, about)]
struct Args {
    #[clap(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::WarnLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Assemble(AssemblerArgs),
    Disassemble(DisassemblerArgs),
}

#[derive(Debug, Error)]
enum Error {
    #[error("assembly failed due to previous errors")]
    Assembler,
    #[error("disassembly failed due to previous errors")]
    Disassembler,
}

fn report(err: Diagnostic) {
    if err.is_fatal() {
        err.scream();
    }
    err.emit();
}

fn main() -> Result<(), Error> {
    let cli = Args::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    match cli.command {
        Command::Assemble(args) => assembler::assemble(args).map_err(|err| {
            report(err);
            Error::Assembler
        })?,
        Command::Disassemble(args) => disassembler::disassemble(args).map_err(|err| {
            report(err);
            Error::Disassembler
        })?,
    }

    Ok(())
}
