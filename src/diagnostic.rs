//! Error reporting shared by every stage of the toolchain.
//!
//! Stages return [`Diagnostic`]s instead of printing, the location of the
//! offending line is attached while the error unwinds through the
//! preprocessor, and the CLI decides how to present it.

use std::fmt;

use colored::Colorize;
use thiserror::Error;

/// Every way a run can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("unable to tokenize input")]
    TokenizeFault,
    #[error("unknown directive `{0}`")]
    UnknownDirective(String),
    #[error("unexpected `{0}` without a matching opening directive")]
    UnexpectedDirective(String),
    #[error("invalid define name `{0}`")]
    InvalidDefineName(String),
    #[error("unclosed macro `{0}`; expected `#endmacro`, found `eof`")]
    UnterminatedMacro(String),
    #[error("unclosed conditional; expected `#endif`, found `eof`")]
    UnterminatedConditional,
    #[error("unable to open `{0}`")]
    IncludeOpenFailure(String),
    #[error("constant symbol `{0}` is already defined")]
    RedefinedConstantSymbol(String),
    #[error("undefined symbol `{0}`")]
    UnresolvedSymbol(String),
    #[error("label `{name}` moved from {resolved:#x} to {address:#x} between passes")]
    LabelMoved {
        name: String,
        resolved: i32,
        address: i32,
    },
    #[error("attempted to divide by zero")]
    DivideByZero,
    #[error("attempted to calculate the remainder with a divisor of zero")]
    ModuloByZero,
    #[error("unexpected trailing tokens `{0}`")]
    TrailingTokens(String),
    #[error("invalid instruction `{0}`")]
    InvalidInstruction(String),
    #[error("unterminated string or char literal")]
    UnterminatedStringOrChar,
    #[error("invalid escape sequence `{0}`")]
    InvalidEscapeSequence(String),
    #[error("line exceeds the maximum length of {0} bytes")]
    LineTooLong(usize),
    #[error("invalid symbol name `{0}`")]
    InvalidSymbolName(String),
    #[error("invalid literal `{0}`")]
    InvalidLiteral(String),
    #[error("expected expression")]
    ExpectedExpression,
    #[error("expected integer expression")]
    ExpectedInteger,
    #[error("expected string expression")]
    ExpectedString,
    #[error("expected {expected}, found {found}")]
    ExpectedToken { expected: String, found: String },
    #[error("invalid type `{0}`; expected `int` or `str`")]
    InvalidType(String),
    #[error("invalid tile data `{0}`")]
    InvalidChr(String),
    #[error("expansion nested deeper than {0} levels")]
    RecursionLimit(usize),
    #[error("value {value} does not fit into {bits} bits")]
    Overflow { value: i32, bits: u8 },
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Internal(String),
}

impl ErrorKind {
    /// Shorthand for [`ErrorKind::ExpectedToken`].
    pub fn expected(expected: impl Into<String>, found: impl Into<String>) -> ErrorKind {
        ErrorKind::ExpectedToken {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    /// An internal invariant was violated.
    Bug,
}

/// Source file name and 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    level: Level,
    kind: ErrorKind,
    location: Option<Location>,
    help: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind) -> Diagnostic {
        Diagnostic {
            level: Level::Error,
            kind,
            location: None,
            help: None,
        }
    }

    pub fn warning(kind: ErrorKind) -> Diagnostic {
        Diagnostic {
            level: Level::Warning,
            ..Diagnostic::error(kind)
        }
    }

    /// Internal invariant violation.
    pub fn bug(message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(ErrorKind::Internal(message.into())).as_bug()
    }

    pub fn as_bug(mut self) -> Diagnostic {
        self.level = Level::Bug;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Diagnostic {
        self.help = Some(help.into());
        self
    }

    /// Attaches a location unless one was already attached further down.
    pub fn at(mut self, location: Location) -> Diagnostic {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn is_fatal(&self) -> bool {
        self.level == Level::Bug
    }

    /// Prints the diagnostic to stderr.
    pub fn emit(&self) {
        eprintln!("{self}");
    }

    /// Prints the diagnostic and terminates the process.
    pub fn scream(self) -> ! {
        self.emit();
        std::process::exit(match self.level {
            Level::Bug => 101,
            _ => 1,
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Error => "error".red().bold(),
            Level::Warning => "warning".yellow().bold(),
            Level::Bug => "internal error".red().bold(),
        };
        write!(f, "{level}{} {}", ":".bold(), self.kind.to_string().bold())?;

        if let Some(ref location) = self.location {
            write!(f, "\n {} {location}", "-->".blue().bold())?;
        }
        if let Some(ref help) = self.help {
            write!(f, "\n  {} {} {help}", "=".blue().bold(), "help:".bold())?;
        }
        if self.level == Level::Bug {
            write!(
                f,
                "\n  {} {} this is a bug in the assembler, not in your program",
                "=".blue().bold(),
                "note:".bold()
            )?;
        }

        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl From<ErrorKind> for Diagnostic {
    fn from(kind: ErrorKind) -> Self {
        Diagnostic::error(kind)
    }
}

impl From<std::io::Error> for Diagnostic {
    fn from(err: std::io::Error) -> Self {
        Diagnostic::error(ErrorKind::Io(err.to_string()))
    }
}

/// Creates an error [`Diagnostic`] from a format string.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::diagnostic::Diagnostic::error(
            $crate::diagnostic::ErrorKind::Message(format!($($arg)*))
        )
    };
}

/// Like [`error!`], with a [`Location`] attached.
#[macro_export]
macro_rules! spanned_error {
    ($location:expr, $($arg:tt)*) => {
        $crate::error!($($arg)*).at($location)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_location_wins() {
        let inner = Location {
            file: "inc.asm".to_owned(),
            line: 3,
        };
        let outer = Location {
            file: "main.asm".to_owned(),
            line: 10,
        };

        let diag = Diagnostic::error(ErrorKind::DivideByZero)
            .at(inner.clone())
            .at(outer);
        assert_eq!(diag.location(), Some(&inner));
    }

    #[test]
    fn bugs_are_fatal() {
        assert!(Diagnostic::bug("arena index out of range").is_fatal());
        assert!(!Diagnostic::error(ErrorKind::ExpectedExpression).is_fatal());
        assert!(!spanned_error!(
            Location {
                file: "a".to_owned(),
                line: 1
            },
            "oops {}",
            1
        )
        .is_fatal());
    }
}
