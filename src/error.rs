//! Unified fatal-error taxonomy for the proof manager and its collaborators.
//!
//! The original tool aborts the process (`assert`/`exit`) the moment any of
//! these conditions is hit. This port keeps that "first fatal error wins, no
//! recovery" policy (see the crate-level docs) but surfaces it as a
//! `Result` instead of tearing the process down from inside a library call.

/// Everything that can make a run of the proof manager fail.
///
/// There is no variant for a successfully-checked-but-unsound proof: this
/// crate does not attempt to verify the incoming proof's correctness (that
/// is a downstream checker's job). Every variant here corresponds to a
/// malformed run: bad input, an unsupported construct, a RUP step that does
/// not actually derive a conflict, or an internal invariant violated by a
/// bug in this crate itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input line, proof line, or hint did not match the expected
    /// grammar, or referenced a variable/clause id that does not exist.
    #[error("malformed input: {detail}")]
    MalformedInput {
        /// Human-readable description of what was wrong.
        detail: String,
    },

    /// A constraint used a relation other than `>=`.
    #[error("unsupported relation `{relation}` (only `>=` is supported)")]
    UnsupportedConstruct {
        /// The relation token that was rejected.
        relation: String,
    },

    /// Unit propagation over the active set terminated without a conflict,
    /// i.e. the upstream proof asserted a RUP step that does not follow.
    #[error("RUP derivation failed: {detail}")]
    RupFailure {
        /// Human-readable description of the failure.
        detail: String,
    },

    /// A normalized constraint violated one of its invariants (non-positive
    /// coefficient, unsorted terms, duplicate variable), or a hint pointed
    /// at a clause id that does not exist or was trimmed away. These are
    /// internal-assertion failures: they indicate a bug in this crate, not
    /// a malformed proof.
    #[error("internal invariant violated: {detail}")]
    InternalInvariantViolation {
        /// Human-readable description of the violated invariant.
        detail: String,
    },

    /// A coefficient, rhs, or slack computation overflowed `i64`.
    #[error("coefficient arithmetic overflowed: {detail}")]
    CoefficientOverflow {
        /// Human-readable description of the overflowing operation.
        detail: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
