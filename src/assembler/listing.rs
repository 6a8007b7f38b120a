//! Listing and symbol file output.

use std::io::{self, Write};

use super::symbol::{Symbol, Value};

/// Notified of every assembled line and defined constant in the final pass.
pub trait Observer {
    fn line(&mut self, _address: u32, _bytes: &[u8], _source: &str) -> io::Result<()> {
        Ok(())
    }

    fn symbol(&mut self, _symbol: &Symbol) -> io::Result<()> {
        Ok(())
    }
}

/// Bytes shown per listing row.
const ROW: usize = 8;

/// Writes `AAAAAAAA  bb bb ..  source` rows. Lines emitting more than a row
/// of bytes continue on address-only rows.
pub struct Listing<W> {
    out: W,
}

impl<W: Write> Listing<W> {
    pub fn new(out: W) -> Listing<W> {
        Listing { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl<W: Write> Observer for Listing<W> {
    fn line(&mut self, address: u32, bytes: &[u8], source: &str) -> io::Result<()> {
        let mut rows = bytes.chunks(ROW);
        let first = rows.next().unwrap_or(&[]);
        writeln!(
            self.out,
            "{address:08x}  {:<width$}  {source}",
            hex(first),
            width = ROW * 3 - 1
        )?;

        let mut offset = first.len() as u32;
        for row in rows {
            writeln!(self.out, "{:08x}  {}", address.wrapping_add(offset), hex(row))?;
            offset += row.len() as u32;
        }
        Ok(())
    }
}

/// Writes one `AAAAAAAA name` row per constant; string constants are
/// written as `"text" name`.
pub struct SymbolList<W> {
    out: W,
}

impl<W: Write> SymbolList<W> {
    pub fn new(out: W) -> SymbolList<W> {
        SymbolList { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Observer for SymbolList<W> {
    fn symbol(&mut self, symbol: &Symbol) -> io::Result<()> {
        match &symbol.value {
            Value::Int(value) => writeln!(self.out, "{:08x} {}", *value as u32, symbol.name),
            value @ Value::Str(_) => writeln!(self.out, "{value} {}", symbol.name),
        }
    }
}
