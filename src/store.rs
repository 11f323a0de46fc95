//! Append-only clause store
//!
//! Holds every constraint the manager has derived, in assignment order.
//! Once an id is assigned it is stable; nothing is ever removed (trimming
//! happens later, as a read-only pass over this store — see `manager.rs`).

use crate::error::{Error, Result};
use crate::term::NormalizedConstraint;

/// Dense, monotonically assigned index of a [`StoredConstraint`].
pub type ClauseId = usize;

/// Sentinel written into [`StoredConstraint::hint_a`] for a `rup` entry, to
/// distinguish "my hints live in the propagation-trace side table" from an
/// ordinary single/pair of ancestor ids.
pub const RUP_MARK: i64 = -2;

/// No hint / unset.
pub const NO_HINT: i64 = -1;

/// What kind of derivation produced a stored constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Supplied directly by the input formula.
    Input,
    /// Derived via a cutting-planes postfix expression.
    Arithmetic,
    /// Derived via reverse unit propagation.
    Rup,
    /// An internal, never-emitted template for a solver-reported objective
    /// bound; materializes into an `Arithmetic` entry on
    /// `apply_objective_bound`.
    ObjectiveTemplate,
}

impl ConstraintKind {
    /// The single-character tag used in the IPBIP output grammar.
    pub fn tag(self) -> char {
        match self {
            ConstraintKind::Input => 'i',
            ConstraintKind::Arithmetic => 'a',
            ConstraintKind::Rup => 'u',
            ConstraintKind::ObjectiveTemplate => 'i',
        }
    }
}

/// One step of a unit-propagation trace: "clause `source` propagates
/// literal `(var, neg)`".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PropagationStep {
    /// The clause (global `ClauseId`, already remapped) that forced this
    /// literal.
    pub source: ClauseId,
    /// The forced variable.
    pub var: crate::variable::VarId,
    /// The forced polarity.
    pub neg: bool,
}

/// The terminal record of a [`PropagationTrace`]: the clause that became
/// infeasible. Its `var`/`neg` fields carry no meaning (sentinel).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConflictStep {
    /// The infeasible clause, or `None` if propagation never produced a
    /// conflict (a malformed-RUP fault — see `error::Error::RupFailure`).
    pub source: Option<ClauseId>,
}

/// An ordered list of propagations followed by the conflicting clause.
#[derive(Clone, Debug, Default)]
pub struct PropagationTrace {
    /// Propagation steps, in the order they occurred.
    pub steps: Vec<PropagationStep>,
    /// The terminal conflict.
    pub conflict: Option<ConflictStep>,
}

/// A single constraint as recorded in the store.
#[derive(Clone, Debug)]
pub struct StoredConstraint {
    /// What kind of derivation produced this constraint.
    pub kind: ConstraintKind,
    /// The normalized body.
    pub body: NormalizedConstraint,
    /// First hint slot. For `Arithmetic`, the first ancestor id (or
    /// [`NO_HINT`]). For `Rup`, always [`RUP_MARK`]. Unused for `Input`/
    /// `ObjectiveTemplate`.
    pub hint_a: i64,
    /// Second hint slot. For `Arithmetic`, the second ancestor id (or
    /// [`NO_HINT`]). For `Rup`, the index into the propagation-trace side
    /// table.
    pub hint_b: i64,
}

/// Append-only store of stored constraints, the original-id→internal-id
/// map used by proof-level references, and the propagation-trace side
/// table RUP entries point into.
#[derive(Debug, Default)]
pub struct ClauseStore {
    clauses: Vec<StoredConstraint>,
    /// Original-id (the sequence external `add_input`/`add_postfix`/
    /// `add_derive` calls count in) to internal `ClauseId`. A `None` entry
    /// means "ignored" (see `ignore_original_clauses`).
    original_id_to_internal: Vec<Option<ClauseId>>,
    traces: Vec<PropagationTrace>,
    objective_template: Option<ClauseId>,
}

impl ClauseStore {
    /// An empty store.
    pub fn new() -> Self {
        ClauseStore::default()
    }

    /// Total number of stored constraints.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the store holds no constraints yet.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Borrow a stored constraint by its internal id.
    pub fn get(&self, id: ClauseId) -> Result<&StoredConstraint> {
        self.clauses.get(id).ok_or_else(|| Error::InternalInvariantViolation {
            detail: format!("clause id {id} does not exist"),
        })
    }

    /// Iterate over every stored constraint with its internal id.
    pub fn iter(&self) -> impl Iterator<Item = (ClauseId, &StoredConstraint)> {
        self.clauses.iter().enumerate()
    }

    fn push(&mut self, kind: ConstraintKind, body: NormalizedConstraint, hint_a: i64, hint_b: i64) -> ClauseId {
        let id = self.clauses.len();
        self.clauses.push(StoredConstraint { kind, body, hint_a, hint_b });
        id
    }

    /// Append an `input` clause. Advances the original-id sequence.
    pub fn add_input(&mut self, body: NormalizedConstraint) -> ClauseId {
        let id = self.push(ConstraintKind::Input, body, NO_HINT, NO_HINT);
        self.original_id_to_internal.push(Some(id));
        id
    }

    /// Append an `arithmetic` clause with up to two ancestor hints. Does
    /// *not* advance the original-id sequence — used for the intermediate
    /// steps synthesized while evaluating a postfix expression.
    pub fn add_arithmetic_step(&mut self, body: NormalizedConstraint, hint_a: i64, hint_b: i64) -> ClauseId {
        self.push(ConstraintKind::Arithmetic, body, hint_a, hint_b)
    }

    /// Append an `arithmetic` clause that *does* advance the original-id
    /// sequence: either the final `+`/`d` of a postfix expression (both
    /// hints meaningful), or a single-hint wrapper around a `*`/`s`-fused
    /// or bare-reference result, or an applied objective bound (`hint_b`
    /// unused in both of the latter cases — pass [`NO_HINT`]).
    pub fn add_arithmetic_original(&mut self, body: NormalizedConstraint, hint_a: i64, hint_b: i64) -> ClauseId {
        let id = self.push(ConstraintKind::Arithmetic, body, hint_a, hint_b);
        self.original_id_to_internal.push(Some(id));
        id
    }

    /// Reserve a `rup` clause slot for `body`, advancing the original-id
    /// sequence. The propagation trace is attached afterwards via
    /// [`ClauseStore::attach_rup_trace`], mirroring the source's two-phase
    /// `add_original_clause` + `edit_clause_hints`.
    pub fn add_rup_placeholder(&mut self, body: NormalizedConstraint) -> ClauseId {
        let id = self.push(ConstraintKind::Rup, body, NO_HINT, NO_HINT);
        self.original_id_to_internal.push(Some(id));
        id
    }

    /// Attach a propagation trace to a previously reserved `rup` clause.
    pub fn attach_rup_trace(&mut self, clause_id: ClauseId, trace: PropagationTrace) -> Result<()> {
        let trace_idx = self.traces.len();
        self.traces.push(trace);
        let clause = self.clauses.get_mut(clause_id).ok_or_else(|| Error::InternalInvariantViolation {
            detail: format!("clause id {clause_id} does not exist"),
        })?;
        clause.hint_a = RUP_MARK;
        clause.hint_b = trace_idx as i64;
        Ok(())
    }

    /// Fetch the propagation trace referenced by a `rup` clause's `hint_b`.
    pub fn trace(&self, trace_idx: i64) -> Result<&PropagationTrace> {
        self.traces.get(trace_idx as usize).ok_or_else(|| Error::InternalInvariantViolation {
            detail: format!("propagation trace {trace_idx} does not exist"),
        })
    }

    /// Register a not-yet-emitted objective template clause. Does not
    /// advance the original-id sequence: the template only becomes visible
    /// to the proof when `apply_objective_bound` fires.
    pub fn register_objective_template(&mut self, body: NormalizedConstraint) -> ClauseId {
        let id = self.push(ConstraintKind::ObjectiveTemplate, body, NO_HINT, NO_HINT);
        self.objective_template = Some(id);
        id
    }

    /// Append a fresh `arithmetic` clause whose single hint is the
    /// registered objective template's id, advancing the original-id
    /// sequence. This is how a solver-emitted `o`/`soli` line becomes a
    /// proof constraint.
    pub fn apply_objective_bound(&mut self) -> Result<ClauseId> {
        let template_id = self.objective_template.ok_or_else(|| Error::InternalInvariantViolation {
            detail: "apply_objective_bound called with no registered template".into(),
        })?;
        let body = self.get(template_id)?.body.clone();
        Ok(self.add_arithmetic_original(body, template_id as i64, NO_HINT))
    }

    /// The original-id a subsequent `add_input`/`add_arithmetic_original`/
    /// `add_rup_placeholder` call will be assigned, without consuming it.
    /// Used to label a postfix expression's trie entry with the id its
    /// final clause is about to receive.
    pub fn next_original_id(&self) -> i64 {
        self.original_id_to_internal.len() as i64
    }

    /// Insert `k` sentinel entries into the original-id map so the next
    /// `k` external references resolve to "no clause".
    pub fn ignore_original_clauses(&mut self, k: usize) {
        for _ in 0..k {
            self.original_id_to_internal.push(None);
        }
    }

    /// Resolve an original-id reference (as used by postfix/derive
    /// references from the external proof) to an internal `ClauseId`.
    pub fn resolve_original_id(&self, original_id: i64, one_indexed: bool) -> Result<ClauseId> {
        let idx = if one_indexed { original_id - 1 } else { original_id };
        if idx < 0 {
            return Err(Error::MalformedInput {
                detail: format!("clause reference {original_id} is out of range"),
            });
        }
        match self.original_id_to_internal.get(idx as usize) {
            Some(Some(id)) => Ok(*id),
            Some(None) => Err(Error::MalformedInput {
                detail: format!("clause reference {original_id} refers to an ignored clause"),
            }),
            None => Err(Error::MalformedInput {
                detail: format!("clause reference {original_id} does not exist yet"),
            }),
        }
    }
}
