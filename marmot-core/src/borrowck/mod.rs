//! The borrow-checking front half: collecting the input relations of a
//! Polonius-style Datalog engine from a lowered function.
//!
//! This module does not *solve* anything. It turns the control flow,
//! accesses, loans, and outlives constraints of one function into relational
//! tuples; deriving loan, move, and subset violations from them is the
//! engine's job, downstream of here.

use log::{debug, info};

use crate::{
    bir::Function,
    context::Context,
    marmot_errors::{ErrorBuf, Maybe},
    util::FmtWith,
};

pub mod collector;
pub mod facts;

pub use collector::FactCollector;
pub use facts::{Facts, Origin, Point, PointPosition};

/// Collect the fact relations of a single function.
///
/// Closures are reported and skipped with `Ok(None)`. Unsupported constructs
/// abort the function with `Err` after buffering a report; the local access
/// diagnostics are buffered without interrupting collection, so downstream
/// passes still see a best-effort fact set.
pub fn check_function(
    func: &Function,
    ctx: &Context,
    errs: &mut ErrorBuf,
) -> Maybe<Option<Facts>> {
    let name = &ctx.symbols[func.def_name];
    info!("collecting borrow facts for `{}`", name);

    if func.is_closure {
        errs.push(errors::ClosureNotSupported { span: func.span });
        return Ok(None);
    }

    if ctx.conf.debug {
        debug!("input function:\n{}", func.fmt_with(ctx));
    }

    let facts = FactCollector::collect(func, ctx, errs)?;

    if let Some(dir) = &ctx.conf.dump_facts {
        let fn_dir = dir.join(name);
        if let Err(err) = facts.dump_all(&fn_dir) {
            errs.push(errors::DumpFailed {
                span: func.span,
                reason: err.to_string(),
            });
        }
    }

    Ok(Some(facts))
}

mod errors {
    use crate::source::Span;
    use marmot_macros::Diagnostic;

    #[derive(Diagnostic)]
    #[msg = "closure borrow checking is not implemented yet"]
    pub struct ClosureNotSupported {
        #[span]
        pub span: Span,
    }

    #[derive(Diagnostic)]
    #[msg = "failed to dump borrow facts: {reason}"]
    pub struct DumpFailed {
        #[span]
        pub span: Span,
        pub reason: String,
    }
}
