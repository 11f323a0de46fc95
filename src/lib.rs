//! Crate root: public surface for the pseudo-Boolean proof annotator
//!
//! This crate takes a pseudo-Boolean (PB) formula in OPB-like normalized
//! form plus a solver-emitted VeriPB cutting-planes proof, and produces an
//! annotated intermediate proof (IPBIP) in which every derivation step
//! carries machine-checkable hints: for a cutting-planes (`arithmetic`)
//! step, the ancestor ids it was built from; for a reverse-unit-propagation
//! (`rup`) step, the ordered trace of forced literals and the clause that
//! finally went infeasible. Downstream tooling turns an IPBIP file into a
//! fully checkable LRAT-style certificate without having to re-derive any
//! of these facts itself.
//!
//! ## Invariants
//!
//! - **Single relation.** Every constraint is `sum(c_i * l_i) >= rhs`; no
//!   other relation is accepted anywhere in this crate.
//! - **Append-only state.** The clause store and variable table never
//!   remove or renumber an entry while a run is in progress; trimming and
//!   renumbering happen once, read-only, at proof-emission time.
//! - **No recovery.** Every fallible entry point returns a precise
//!   [`error::Error`] instead of attempting to continue past a malformed
//!   proof — this crate does not attempt to *verify* the incoming proof's
//!   soundness, only to annotate it.
//! - **Single-threaded.** Nothing here spawns a thread or depends on
//!   execution order beyond the sequence of calls a caller makes.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Fatal-error taxonomy shared by every fallible entry point.
pub mod error;
/// Variable interning: textual names to dense ids.
pub mod variable;
/// Term and constraint algebra: normalization, sum, scalar product,
/// ceiling division, saturation, negation.
pub mod term;
/// Postfix (reverse-Polish) cutting-planes expressions and the
/// prefix-sharing trie that contracts repeated derivations.
pub mod postfix;
/// Hinted unit propagation over an active set of constraints.
pub mod propagate;
/// Append-only store of every derived constraint, plus the original-id
/// mapping and propagation-trace side table.
pub mod store;
/// The `Manager` façade: the single stateful entry point a caller drives.
pub mod manager;
/// Textual rendering of literals, constraints, and hints.
pub mod format;
/// OPB formula and VeriPB proof line-oriented readers.
pub mod parse;

pub use crate::error::{Error, Result};
pub use crate::manager::Manager;
