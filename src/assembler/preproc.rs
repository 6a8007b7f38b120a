//! Macro preprocessor.
//!
//! Lines are read one at a time from a [`LineSource`], definitions and macro
//! invocations are expanded, and every line that survives is handed to a
//! [`Sink`]. Macro bodies and conditional blocks are read through the same
//! source as ordinary lines, and expanded macro bodies are fed back through
//! [`Preprocessor::line`] from an in-memory source, so nested definitions,
//! conditionals and invocations inside a body behave exactly like source
//! lines.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::mem;

use phf::{phf_map, Map};

use super::context::Context;
use super::eval::{self, Forced};
use super::lex::{self, Cursor, RawToken};
use super::symbol::Value;
use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::error;

/// Deepest allowed nesting of includes and macro expansions.
pub const RECURSION_MAX: usize = 64;

/// Positional macro arguments; the rest are only reachable through `$0`.
pub const MACRO_ARGS_MAX: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Define,
    Undefine,
    Macro,
    EndMacro,
    IfDef,
    IfNDef,
    EndIf,
    Include,
}

static DIRECTIVES: Map<&'static str, Directive> = phf_map! {
    "#define" => Directive::Define,
    "#undefine" => Directive::Undefine,
    "#macro" => Directive::Macro,
    "#endmacro" => Directive::EndMacro,
    "#ifdef" => Directive::IfDef,
    "#ifndef" => Directive::IfNDef,
    "#endif" => Directive::EndIf,
    "#include" => Directive::Include,
};

/// The directive starting `line`, and the byte offset just past it.
fn directive_of(line: &str) -> Result<Option<(Directive, usize)>, Diagnostic> {
    let Some((lexeme, consumed)) = lex::next_token(line, 0)? else {
        return Ok(None);
    };
    if lexeme.kind != RawToken::Word {
        return Ok(None);
    }

    match DIRECTIVES.get(lexeme.text) {
        Some(&directive) => Ok(Some((directive, consumed))),
        None if lexeme.text.starts_with('#') => {
            Err(ErrorKind::UnknownDirective(lexeme.text.to_owned()).into())
        }
        None => Ok(None),
    }
}

/// Like [`directive_of`], but never fails; used while skipping raw lines.
fn raw_directive(line: &str) -> Option<Directive> {
    directive_of(line).ok().flatten().map(|(directive, _)| directive)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    /// Plain text substitution.
    Define,
    /// Multi-line body with `$N`, `$0` and `$$` placeholders.
    Macro,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub kind: DefKind,
    pub name: String,
    /// Replacement text, or the raw body lines joined by `\n`.
    pub value: String,
    pub removed: bool,
}

fn valid_name(name: &str) -> bool {
    name.chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Where raw lines come from.
pub trait LineSource {
    /// The next line without its terminator, `None` once exhausted.
    fn next_line(&mut self, ctx: &mut Context) -> Result<Option<String>, Diagnostic>;
}

/// Lines of a file, counted into the pass state.
pub struct Reader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Reader<R> {
    pub fn new(inner: R) -> Reader<R> {
        Reader {
            inner,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> LineSource for Reader<R> {
    fn next_line(&mut self, ctx: &mut Context) -> Result<Option<String>, Diagnostic> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        ctx.state.line += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        let line = String::from_utf8(mem::take(&mut self.buf)).map_err(|_| {
            error!(
                "encountered invalid data on line {} (likely not valid UTF-8)",
                ctx.state.line
            )
        })?;
        lex::check_length(&line)?;
        Ok(Some(line))
    }
}

/// Lines produced by a macro expansion; they do not advance the line count.
pub struct Lines {
    lines: std::vec::IntoIter<String>,
}

impl Lines {
    pub fn new(lines: Vec<String>) -> Lines {
        Lines {
            lines: lines.into_iter(),
        }
    }
}

impl LineSource for Lines {
    fn next_line(&mut self, _ctx: &mut Context) -> Result<Option<String>, Diagnostic> {
        Ok(self.lines.next())
    }
}

/// Receives fully expanded lines.
pub trait Sink {
    fn emit(&mut self, ctx: &mut Context, line: &str) -> Result<(), Diagnostic>;
}

impl Sink for Vec<String> {
    fn emit(&mut self, _ctx: &mut Context, line: &str) -> Result<(), Diagnostic> {
        self.push(line.to_owned());
        Ok(())
    }
}

/// Writes expanded lines as text.
pub struct Text<W>(pub W);

impl<W: Write> Sink for Text<W> {
    fn emit(&mut self, _ctx: &mut Context, line: &str) -> Result<(), Diagnostic> {
        writeln!(self.0, "{line}")?;
        Ok(())
    }
}

enum Expansion {
    Line(String),
    /// Substituted body of an invoked macro.
    Macro(Vec<String>),
}

/// Definition table and nesting depth of one pass.
#[derive(Debug, Default)]
pub struct Preprocessor {
    defs: Vec<Definition>,
    depth: usize,
}

impl Preprocessor {
    pub fn new() -> Preprocessor {
        Preprocessor::default()
    }

    /// Most recent live definition of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Definition> {
        self.defs
            .iter()
            .rev()
            .find(|def| !def.removed && def.name == name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Adds a definition, replacing a live one of the same name in place.
    pub fn define(&mut self, kind: DefKind, name: &str, value: String) -> Result<(), Diagnostic> {
        if !valid_name(name) {
            return Err(ErrorKind::InvalidDefineName(name.to_owned()).into());
        }
        log::debug!("defining {kind:?} `{name}`");

        match self
            .defs
            .iter_mut()
            .rev()
            .find(|def| !def.removed && def.name == name)
        {
            Some(def) => {
                def.kind = kind;
                def.value = value;
            }
            None => self.defs.push(Definition {
                kind,
                name: name.to_owned(),
                value,
                removed: false,
            }),
        }
        Ok(())
    }

    /// Flags every live definition of `name` as removed.
    pub fn undefine(&mut self, name: &str) {
        for def in self.defs.iter_mut().filter(|def| def.name == name) {
            def.removed = true;
        }
    }

    /// Preprocesses `source` to the end, attaching the current location to
    /// any error.
    pub fn run(
        &mut self,
        ctx: &mut Context,
        source: &mut dyn LineSource,
        sink: &mut dyn Sink,
    ) -> Result<(), Diagnostic> {
        loop {
            let line = match source.next_line(ctx).map_err(|err| err.at(ctx.location()))? {
                Some(line) => line,
                None => return Ok(()),
            };
            self.line(ctx, source, sink, &line)
                .map_err(|err| err.at(ctx.location()))?;
        }
    }

    /// Handles one raw line. Directives that span several lines read the
    /// rest of their block from `source`.
    pub fn line(
        &mut self,
        ctx: &mut Context,
        source: &mut dyn LineSource,
        sink: &mut dyn Sink,
        line: &str,
    ) -> Result<(), Diagnostic> {
        if let Some((directive, pos)) = directive_of(line)? {
            return self.directive(directive, ctx, source, sink, Cursor::at(line, pos));
        }

        match self.expand(ctx, line)? {
            Expansion::Line(expanded) => {
                if let Some((directive, pos)) = directive_of(&expanded)? {
                    return self.directive(directive, ctx, source, sink, Cursor::at(&expanded, pos));
                }
                log::trace!("{}:{}: {expanded}", ctx.state.file, ctx.state.line);
                sink.emit(ctx, &expanded)
            }
            Expansion::Macro(lines) => {
                self.nested(|pp| {
                    let mut body = Lines::new(lines);
                    while let Some(line) = body.next_line(ctx)? {
                        pp.line(ctx, &mut body, sink, &line)?;
                    }
                    Ok(())
                })
            }
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Preprocessor) -> Result<T, Diagnostic>,
    ) -> Result<T, Diagnostic> {
        if self.depth >= RECURSION_MAX {
            return Err(ErrorKind::RecursionLimit(RECURSION_MAX).into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn directive(
        &mut self,
        directive: Directive,
        ctx: &mut Context,
        source: &mut dyn LineSource,
        sink: &mut dyn Sink,
        mut args: Cursor<'_>,
    ) -> Result<(), Diagnostic> {
        match directive {
            Directive::Define => {
                let name = definition_name(&mut args)?;
                let value = until_comment(args.rest())?.trim().to_owned();
                self.define(DefKind::Define, name, value)
            }
            Directive::Undefine => {
                let name = definition_name(&mut args)?;
                args.expect_end()?;
                log::debug!("undefining `{name}`");
                self.undefine(name);
                Ok(())
            }
            Directive::Macro => {
                let name = definition_name(&mut args)?;
                args.expect_end()?;
                let body = collect_macro(ctx, source, name)?;
                self.define(DefKind::Macro, name, body)
            }
            Directive::IfDef | Directive::IfNDef => {
                let name = definition_name(&mut args)?;
                args.expect_end()?;
                let taken = self.is_defined(name) == (directive == Directive::IfDef);
                if taken {
                    self.conditional(ctx, source, sink)
                } else {
                    skip_conditional(ctx, source)
                }
            }
            Directive::EndMacro => Err(ErrorKind::UnexpectedDirective("#endmacro".to_owned()).into()),
            Directive::EndIf => Err(ErrorKind::UnexpectedDirective("#endif".to_owned()).into()),
            Directive::Include => self.include(ctx, sink, args.rest()),
        }
    }

    /// Processes the lines of a taken conditional up to its `#endif`.
    fn conditional(
        &mut self,
        ctx: &mut Context,
        source: &mut dyn LineSource,
        sink: &mut dyn Sink,
    ) -> Result<(), Diagnostic> {
        while let Some(line) = source.next_line(ctx)? {
            if raw_directive(&line) == Some(Directive::EndIf) {
                return Ok(());
            }
            self.line(ctx, source, sink, &line)?;
        }
        Err(ErrorKind::UnterminatedConditional.into())
    }

    fn include(&mut self, ctx: &mut Context, sink: &mut dyn Sink, args: &str) -> Result<(), Diagnostic> {
        let expr = self.expand_defines(until_comment(args)?, &mut Vec::new())?;
        let path = match eval::eval_str(&expr, &Forced(&*ctx))? {
            Value::Str(path) => String::from_utf8_lossy(&path).into_owned(),
            Value::Int(_) => return Err(ErrorKind::ExpectedString.into()),
        };

        let (name, reader) = ctx
            .resolver
            .open(&path)
            .map_err(|err| Diagnostic::error(ErrorKind::IncludeOpenFailure(path.clone())).with_help(err.to_string()))?;
        log::debug!("including `{name}`");

        let file = mem::replace(&mut ctx.state.file, name);
        let line = mem::replace(&mut ctx.state.line, 0);

        self.nested(|pp| pp.run(ctx, &mut Reader::new(reader), sink))?;

        ctx.state.file = file;
        ctx.state.line = line;
        Ok(())
    }

    /// Expands definitions and macro invocations in `line`, copying the text
    /// between tokens verbatim.
    fn expand(&self, ctx: &mut Context, line: &str) -> Result<Expansion, Diagnostic> {
        let mut out = String::with_capacity(line.len());
        let mut cursor = Cursor::new(line);
        let mut last = 0;

        while let Some(lexeme) = cursor.next()? {
            out.push_str(&line[last..lexeme.span.start]);
            last = lexeme.span.end;

            if lexeme.kind != RawToken::Word {
                out.push_str(lexeme.text);
                continue;
            }

            match self.lookup(lexeme.text) {
                Some(def) if def.kind == DefKind::Define => {
                    let mut active = vec![def.name.clone()];
                    out.push_str(&self.expand_defines(&def.value, &mut active)?);
                }
                Some(def) => {
                    let lines = invoke(ctx, def, cursor.rest(), out)?;
                    return Ok(Expansion::Macro(lines));
                }
                None => out.push_str(lexeme.text),
            }
        }

        out.push_str(&line[last..]);
        Ok(Expansion::Line(out))
    }

    /// Expands plain definitions in `text`, never re-entering a name listed
    /// in `active`.
    fn expand_defines(&self, text: &str, active: &mut Vec<String>) -> Result<String, Diagnostic> {
        if active.len() > RECURSION_MAX {
            return Err(ErrorKind::RecursionLimit(RECURSION_MAX).into());
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = Cursor::new(text);
        let mut last = 0;

        while let Some(lexeme) = cursor.next()? {
            out.push_str(&text[last..lexeme.span.start]);
            last = lexeme.span.end;

            match self.lookup(lexeme.text) {
                Some(def)
                    if lexeme.kind == RawToken::Word
                        && def.kind == DefKind::Define
                        && !active.contains(&def.name) =>
                {
                    active.push(def.name.clone());
                    let expanded = self.expand_defines(&def.value, active)?;
                    active.pop();
                    out.push_str(&expanded);
                }
                _ => out.push_str(lexeme.text),
            }
        }

        out.push_str(&text[last..]);
        Ok(out)
    }
}

fn definition_name<'a>(args: &mut Cursor<'a>) -> Result<&'a str, Diagnostic> {
    match args.next()? {
        Some(lexeme) if lexeme.kind == RawToken::Word && valid_name(lexeme.text) => Ok(lexeme.text),
        Some(lexeme) if !lexeme.is_comment() => {
            Err(ErrorKind::InvalidDefineName(lexeme.text.to_owned()).into())
        }
        _ => Err(ErrorKind::InvalidDefineName(String::new()).into()),
    }
}

/// `text` up to its comment, if any.
fn until_comment(text: &str) -> Result<&str, Diagnostic> {
    let mut cursor = Cursor::new(text);
    while let Some(lexeme) = cursor.next()? {
        if lexeme.is_comment() {
            return Ok(&text[..lexeme.span.start]);
        }
    }
    Ok(text)
}

/// Reads raw body lines up to the matching `#endmacro`.
fn collect_macro(ctx: &mut Context, source: &mut dyn LineSource, name: &str) -> Result<String, Diagnostic> {
    let mut body = Vec::new();
    let mut depth = 0usize;

    while let Some(line) = source.next_line(ctx)? {
        match raw_directive(&line) {
            Some(Directive::Macro) => depth += 1,
            Some(Directive::EndMacro) if depth == 0 => return Ok(body.join("\n")),
            Some(Directive::EndMacro) => depth -= 1,
            _ => {}
        }
        body.push(line);
    }

    Err(ErrorKind::UnterminatedMacro(name.to_owned()).into())
}

/// Discards raw lines up to the `#endif` closing an untaken conditional.
fn skip_conditional(ctx: &mut Context, source: &mut dyn LineSource) -> Result<(), Diagnostic> {
    let mut depth = 0usize;

    while let Some(line) = source.next_line(ctx)? {
        match raw_directive(&line) {
            Some(Directive::IfDef | Directive::IfNDef) => depth += 1,
            Some(Directive::EndIf) if depth == 0 => return Ok(()),
            Some(Directive::EndIf) => depth -= 1,
            _ => {}
        }
    }

    Err(ErrorKind::UnterminatedConditional.into())
}

/// Splits an invocation remainder into the trimmed whole (`$0`) and its
/// top-level comma separated arguments.
fn arguments(rest: &str) -> Result<(String, Vec<String>), Diagnostic> {
    let mut cursor = Cursor::new(rest);
    let mut args = Vec::new();
    let mut start = 0;
    let mut end = rest.len();
    let mut depth = 0usize;

    while let Some(lexeme) = cursor.next()? {
        if lexeme.is_comment() {
            end = lexeme.span.start;
            break;
        } else if lexeme.is_punct('(') {
            depth += 1;
        } else if lexeme.is_punct(')') {
            depth = depth.saturating_sub(1);
        } else if lexeme.is_punct(',') && depth == 0 {
            args.push(rest[start..lexeme.span.start].trim().to_owned());
            start = lexeme.span.end;
        }
    }

    let last = rest[start..end].trim();
    if !last.is_empty() || !args.is_empty() {
        args.push(last.to_owned());
    }
    args.truncate(MACRO_ARGS_MAX);

    Ok((rest[..end].trim().to_owned(), args))
}

/// Substitutes a macro body for one invocation. `prefix` is the expanded
/// text preceding the invocation and is joined to the first body line.
fn invoke(ctx: &mut Context, def: &Definition, rest: &str, prefix: String) -> Result<Vec<String>, Diagnostic> {
    let (all, args) = arguments(rest)?;
    let id = ctx.state.next_unique();
    log::trace!("expanding macro `{}` ({id:x}) with {} arguments", def.name, args.len());

    let mut lines = Vec::new();
    for (i, body) in def.value.lines().enumerate() {
        let line = substitute(body, &all, &args, id)?;
        if i == 0 {
            lines.push(format!("{prefix}{line}"));
        } else {
            lines.push(line);
        }
    }
    if lines.is_empty() && !prefix.trim().is_empty() {
        lines.push(prefix);
    }

    Ok(lines)
}

fn substitute(line: &str, all: &str, args: &[String], id: u32) -> Result<String, Diagnostic> {
    let mut out = String::with_capacity(line.len());
    let mut cursor = Cursor::new(line);
    let mut last = 0;

    while let Some(lexeme) = cursor.next()? {
        out.push_str(&line[last..lexeme.span.start]);
        last = lexeme.span.end;

        match lexeme.kind {
            RawToken::Param => match lexeme.text[1..].parse::<usize>() {
                Ok(0) => out.push_str(all),
                Ok(n) => out.push_str(args.get(n - 1).map_or("", String::as_str)),
                Err(_) => {}
            },
            RawToken::Unique => {
                let _ = write!(out, "{id:x}");
            }
            _ => out.push_str(lexeme.text),
        }
    }

    out.push_str(&line[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::include::MemoryFiles;
    use crate::config::Config;
    use crate::diagnostic::Location;

    fn context(files: MemoryFiles) -> Context {
        Context::new(Config::default(), Box::new(files))
    }

    fn preprocess(src: &str) -> Result<Vec<String>, Diagnostic> {
        let mut ctx = context(MemoryFiles::new());
        let mut out = Vec::new();
        Preprocessor::new().run(&mut ctx, &mut Reader::new(src.as_bytes()), &mut out)?;
        Ok(out)
    }

    fn kind(src: &str) -> ErrorKind {
        preprocess(src).unwrap_err().kind().clone()
    }

    #[test]
    fn define() {
        assert_eq!(preprocess("#define test 123\ntest").unwrap(), vec!["123"]);
        assert_eq!(
            preprocess("#define test\nthis is a test").unwrap(),
            vec!["this is a "]
        );
        assert_eq!(
            preprocess("#define reg a ; accumulator\nld reg, 1").unwrap(),
            vec!["ld a, 1"]
        );
    }

    #[test]
    fn undefine() {
        assert_eq!(
            preprocess("#define test 1\ntest\n#undefine test\ntest").unwrap(),
            vec!["1", "test"]
        );
    }

    #[test]
    fn redefine_replaces() {
        assert_eq!(
            preprocess("#define v 1\n#define v 2\nv\n#undefine v\nv").unwrap(),
            vec!["2", "v"]
        );
    }

    #[test]
    fn recursive_defines() {
        assert_eq!(
            preprocess("#define inner 4\n#define outer inner + inner\nouter").unwrap(),
            vec!["4 + 4"]
        );
        assert_eq!(preprocess("#define a a b\na").unwrap(), vec!["a b"]);
    }

    #[test]
    fn strings_are_not_expanded() {
        assert_eq!(
            preprocess("#define x 1\n.db \"x\", x").unwrap(),
            vec![".db \"x\", 1"]
        );
    }

    #[test]
    fn macro_parameters() {
        assert_eq!(
            preprocess(
                "#macro test\nabc $1 $2 $3 $$ $$ $0\n#endmacro\ntest p1, p2, p3\ntest a ; note"
            )
            .unwrap(),
            vec!["abc p1 p2 p3 0 0 p1, p2, p3", "abc a   1 1 a"]
        );
    }

    #[test]
    fn macro_arguments_respect_nesting() {
        assert_eq!(
            preprocess("#macro m\n$2 | $1\n#endmacro\nm (1, 2), \"a,b\"").unwrap(),
            vec!["\"a,b\" | (1, 2)"]
        );
    }

    #[test]
    fn macro_prefix_joins_first_line() {
        assert_eq!(
            preprocess("#macro m\nnop\nhalt\n#endmacro\nlabel: m").unwrap(),
            vec!["label: nop", "halt"]
        );
    }

    #[test]
    fn nested_macros() {
        let src = "#macro outer\n#macro inner\nnop $1\n#endmacro\ninner $1\n#endmacro\nouter 5\ninner";
        assert_eq!(preprocess(src).unwrap(), vec!["nop 5", "nop 5"]);
    }

    #[test]
    fn unique_ids_per_expansion() {
        let src = "#macro l\n@l$$:\n#endmacro\nl\nl";
        assert_eq!(preprocess(src).unwrap(), vec!["@l0:", "@l1:"]);
    }

    #[test]
    fn conditionals() {
        let src = "#define A\n#ifdef A\nyes\n#endif\n#ifndef A\nno\n#endif\n\
                   #ifdef B\n#ifdef A\nnested\n#endif\n#endif\n#ifndef B\nnot b\n#endif\nend";
        assert_eq!(preprocess(src).unwrap(), vec!["yes", "not b", "end"]);
    }

    #[test]
    fn unterminated_blocks() {
        assert_eq!(kind("#ifdef A\nnop"), ErrorKind::UnterminatedConditional);
        assert_eq!(kind("#ifndef A\nnop"), ErrorKind::UnterminatedConditional);
        assert_eq!(
            kind("#macro m\nnop"),
            ErrorKind::UnterminatedMacro("m".to_owned())
        );
        assert_eq!(
            kind("nop\n#endif"),
            ErrorKind::UnexpectedDirective("#endif".to_owned())
        );
    }

    #[test]
    fn bad_directives() {
        assert_eq!(kind("#bogus"), ErrorKind::UnknownDirective("#bogus".to_owned()));
        assert_eq!(
            kind("#define 1abc 2"),
            ErrorKind::InvalidDefineName("1abc".to_owned())
        );
        assert_eq!(kind("#define"), ErrorKind::InvalidDefineName(String::new()));
    }

    #[test]
    fn runaway_macro() {
        assert_eq!(
            kind("#macro r\nr\n#endmacro\nr"),
            ErrorKind::RecursionLimit(RECURSION_MAX)
        );
    }

    #[test]
    fn include() {
        let files = MemoryFiles::new().with("inc.asm", "#define X 7\nX\n");
        let mut ctx = context(files);
        let mut out = Vec::new();
        Preprocessor::new()
            .run(
                &mut ctx,
                &mut Reader::new("#define FILE \"inc.asm\"\n#include FILE\nX".as_bytes()),
                &mut out,
            )
            .unwrap();

        assert_eq!(out, vec!["7", "7"]);
        assert_eq!(ctx.state.file, "-");
        assert_eq!(ctx.state.line, 3);
    }

    #[test]
    fn include_errors_point_into_the_file() {
        let files = MemoryFiles::new().with("bad.asm", "nop\n#bogus\n");
        let mut ctx = context(files);
        let mut out = Vec::new();
        let err = Preprocessor::new()
            .run(
                &mut ctx,
                &mut Reader::new("\n#include \"bad.asm\"".as_bytes()),
                &mut out,
            )
            .unwrap_err();

        assert_eq!(
            err.location(),
            Some(&Location {
                file: "bad.asm".to_owned(),
                line: 2
            })
        );
    }

    #[test]
    fn missing_include() {
        assert_eq!(
            kind("#include \"nowhere.asm\""),
            ErrorKind::IncludeOpenFailure("nowhere.asm".to_owned())
        );
    }

    #[test]
    fn long_lines() {
        let src = "a".repeat(lex::LINE_MAX + 1);
        assert_eq!(kind(&src), ErrorKind::LineTooLong(lex::LINE_MAX));
    }
}
