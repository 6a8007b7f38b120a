//! Include path resolution.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Opens the files named by `#include` and `.incbin`.
pub trait Resolve {
    /// Opens `path`, returning the name it was found under and its reader.
    fn open(&self, path: &str) -> io::Result<(String, Box<dyn BufRead>)>;

    /// Reads the whole of `path`.
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let (_, mut reader) = self.open(path)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Looks up files as given, then relative to each include directory in order.
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new<I, P>(dirs: I) -> SearchPaths
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        SearchPaths {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    fn candidates<'a>(&'a self, path: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        std::iter::once(PathBuf::from(path)).chain(self.dirs.iter().map(move |dir| dir.join(path)))
    }
}

impl Resolve for SearchPaths {
    fn open(&self, path: &str) -> io::Result<(String, Box<dyn BufRead>)> {
        let mut last = io::Error::new(io::ErrorKind::NotFound, format!("`{path}` not found"));
        for candidate in self.candidates(path) {
            match File::open(&candidate) {
                Ok(file) => {
                    log::debug!("resolved `{path}` to `{}`", candidate.display());
                    return Ok((display(&candidate), Box::new(BufReader::new(file))));
                }
                Err(err) => last = err,
            }
        }
        Err(last)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// In-memory file set, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFiles {
    pub fn new() -> MemoryFiles {
        MemoryFiles::default()
    }

    pub fn with(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> MemoryFiles {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl Resolve for MemoryFiles {
    fn open(&self, path: &str) -> io::Result<(String, Box<dyn BufRead>)> {
        self.files
            .get(path)
            .map(|contents| {
                (
                    path.to_owned(),
                    Box::new(Cursor::new(contents.clone())) as Box<dyn BufRead>,
                )
            })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("`{path}` not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_files() {
        let files = MemoryFiles::new().with("a.inc", "nop\n");
        assert_eq!(files.read("a.inc").unwrap(), b"nop\n");
        assert!(files.open("b.inc").is_err());
    }

    #[test]
    fn missing_on_disk() {
        let paths = SearchPaths::new(["does/not/exist"]);
        assert!(paths.open("nothing-here.inc").is_err());
    }
}
