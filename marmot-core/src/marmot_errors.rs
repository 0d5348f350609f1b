//! The diagnostic machinery shared by every analysis pass.

use crate::{
    context::Context,
    source::Span,
    util::FmtWith,
};
use std::{error::Error, fmt};

/// The main trait for language errors surfaced to the user. Implementations
/// are usually generated with `marmot_macros::Diagnostic`.
pub trait Diagnostic: std::fmt::Debug {
    fn level(&self) -> &DiagnosticLevel {
        &DiagnosticLevel::Error
    }

    /// The leading line of the error, warning, or lint message.
    fn message(&self, ctx: &Context) -> String;

    /// The span the message refers to.
    fn main_span(&self) -> SpanReport;

    /// Further spans referenced by the report.
    fn secondaries(&self) -> Vec<SpanReport> {
        Vec::new()
    }

    /// The error code.
    fn code(&self) -> &str;
}

/// Like `std::error::Error`, we often want automatic conversion to a boxed
/// trait object.
impl<'a, T: Diagnostic + 'a> From<T> for Box<dyn Diagnostic + 'a> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// The kinds of diagnostics that can be emitted.
pub enum DiagnosticLevel {
    /// Considered an error; will cause the run to fail.
    Error,
    /// Considered a warning or lint; will not end the run.
    Warn,
}

/// A message about a region of code.
pub struct SpanReport {
    pub span: Span,
    pub help: Option<&'static str>,
}

/// A placeholder error type to propagate "this pass failed" upward with `?`.
/// The actual report lives in the `ErrorBuf`; checking for failure then
/// happens once, at the end of a pass.
#[derive(Debug, PartialEq, Eq)]
pub struct MarmotError;

impl fmt::Display for MarmotError {
    /// Should never actually be called; the buffered diagnostics carry the
    /// printable reports.
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        panic!()
    }
}

impl Error for MarmotError {}

/// Simplify error propagation with a typedef, mimicking `io::Result`. Using a
/// name other than `Result` also saves spelling out `std::result::Result`
/// wherever a real error type appears.
pub type Maybe<T> = std::result::Result<T, MarmotError>;

#[derive(Debug)]
pub struct ErrorBuf(pub Vec<Box<dyn Diagnostic>>);

impl ErrorBuf {
    pub fn new() -> Self {
        Self(vec![])
    }

    /// Buffer a diagnostic, returning the placeholder error so call sites can
    /// write `return Err(errs.push(...))`.
    pub fn push<T: 'static + Diagnostic>(&mut self, err: T) -> MarmotError {
        self.0.push(Box::new(err));
        MarmotError
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Box<dyn Diagnostic>> {
        self.0.iter()
    }

    /// Append another ErrorBuf onto this one
    pub fn append(&mut self, other: &mut ErrorBuf) {
        self.0.append(&mut other.0)
    }
}

// ====== Display and formatting ======

impl<'c> FmtWith<Context<'c>> for ErrorBuf {
    fn fmt(&self, ctx: &Context, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().fold(true, |first, err| {
            if !first {
                // NOTE This is correct: can't return an `Err` from this
                // closure.
                let _ = f.write_str("\n");
            }
            let _ = write!(f, "{}", err.fmt_with(ctx));
            false
        });
        Ok(())
    }
}

impl<'c> FmtWith<Context<'c>> for Box<dyn Diagnostic> {
    fn fmt(&self, ctx: &Context, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error[{}]: {}", self.code(), self.message(ctx))?;

        let mut reports = vec![self.main_span()];
        reports.extend(self.secondaries());
        for report in reports {
            let span = report.span;
            let src = &ctx.srcs[span.src_id];
            let (line, col) = src.line_col(span.start);
            write!(f, "  --> {}:{}:{}", src, line, col)?;
            if let Some(help) = report.help {
                write!(f, ": {}", help)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
