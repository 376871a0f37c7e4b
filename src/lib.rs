// Copyright (c) 2018 Fabian Schuiki

//! A fault-tolerant LL(k) recursive descent parsing engine.
//!
//! Grammars are declared as data: each rule carries a reified grammar AST
//! built with the fluent [`builder`](builder/index.html) API, plus a semantic
//! action written as an ordinary closure over the parser's primitives
//! (`consume`, `subrule`, `option`, `or`, `many`, …). On first construction
//! of a parser for a grammar the engine resolves and validates the rules,
//! computes re-sync FOLLOW sets and k-token lookahead decision functions, and
//! caches the results per grammar. At parse time the precomputed decisions
//! drive predictive parsing; on mismatch they drive single-token
//! insertion/deletion and re-synchronization error recovery.

#![deny(missing_docs)]

extern crate bit_set;
extern crate indexmap;
#[macro_use]
extern crate log;
extern crate once_cell;
extern crate thiserror;

pub mod analysis;
pub mod builder;
pub mod errors;
mod follow;
pub mod gast;
mod lookahead;
pub mod parser;
mod resolve;
pub mod token;
mod validate;
mod walker;

/// A pretty printer.
pub struct Pretty<C, T> {
    ctx: C,
    item: T,
}

impl<C, T> Pretty<C, T> {
    pub(crate) fn new(ctx: C, item: T) -> Pretty<C, T> {
        Pretty { ctx, item }
    }
}
