//! Hinted unit propagation
//!
//! Given a vector of normalized constraints, drives priority-ordered unit
//! propagation until some constraint's slack goes negative, producing the
//! ordered list of propagations that led there together with the
//! conflicting constraint. Operates on a local working copy of the
//! constraint bodies — see [`derive`] — so the caller's stored constraints
//! are never mutated (spec.md §5 "Memory discipline").

use std::collections::BTreeSet;

use crate::term::{NormalizedConstraint, Term};
use crate::variable::VarId;

/// Sentinel propagation factor for a constraint with no remaining terms:
/// it can never be the source of a forced literal.
const UNPROP: i64 = i64::MAX;

/// One propagation in a [`RawTrace`], indexed into the constraint vector
/// `derive` was given (not yet a global `ClauseId` — the caller remaps).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawStep {
    /// Local index (within the vector passed to [`derive`]) of the clause
    /// that forced this literal.
    pub source: usize,
    /// The forced variable.
    pub var: VarId,
    /// The forced polarity.
    pub neg: bool,
}

/// The result of one [`derive`] call: the propagations performed, and the
/// local index of the constraint that went infeasible — or `None` if
/// propagation ran out of forced literals without ever finding one (a
/// malformed-RUP fault, spec.md §4.4).
#[derive(Clone, Debug, Default)]
pub struct RawTrace {
    /// Propagations performed, in order.
    pub steps: Vec<RawStep>,
    /// The infeasible clause, if propagation found one.
    pub conflict: Option<usize>,
}

struct ClauseState {
    /// Terms in their original (normalized, descending-coefficient) order;
    /// a removed term becomes `None` so occurrence indices stay stable.
    terms: Vec<Option<Term>>,
    rhs: i64,
    lhs_sum: i64,
    /// Index of the first remaining (non-`None`) term, or `terms.len()`.
    front: usize,
}

impl ClauseState {
    fn from_constraint(c: &NormalizedConstraint) -> Self {
        let lhs_sum = c.terms.iter().map(|t| t.coeff).sum();
        ClauseState {
            terms: c.terms.iter().copied().map(Some).collect(),
            rhs: c.rhs,
            lhs_sum,
            front: 0,
        }
    }

    fn slack(&self) -> i64 {
        self.lhs_sum - self.rhs
    }

    fn leading_term(&self) -> Option<Term> {
        self.terms.get(self.front).copied().flatten()
    }

    fn propagation_factor(&self) -> i64 {
        match self.leading_term() {
            Some(t) => self.slack().saturating_sub(t.coeff),
            None => UNPROP,
        }
    }

    fn advance_front(&mut self) {
        while self.front < self.terms.len() && self.terms[self.front].is_none() {
            self.front += 1;
        }
    }
}

/// Drive unit propagation over `clauses` until one becomes infeasible (or
/// no constraint has a negative propagation factor — a malformed-RUP
/// fault).
///
/// Tie-breaking in the priority structure is `(propagation_factor,
/// clause_index)` ascending, so ties break by ascending local index.
/// Occurrences of a propagated variable are processed in the order they
/// were registered (clause index ascending, then term index ascending),
/// which is the registration order here since `clauses` is scanned in
/// order.
pub fn derive(clauses: &[NormalizedConstraint]) -> RawTrace {
    let n = clauses.len();
    if n == 0 {
        return RawTrace::default();
    }

    let mut states: Vec<ClauseState> = clauses.iter().map(ClauseState::from_constraint).collect();

    // occurrences[var] = (clause_idx, term_idx) pairs, in registration order.
    let max_var = clauses
        .iter()
        .flat_map(|c| c.terms.iter())
        .map(|t| t.var.as_u32())
        .max()
        .unwrap_or(0);
    let mut occurrences: Vec<Vec<(usize, usize)>> = vec![Vec::new(); max_var as usize + 1];
    for (ci, c) in clauses.iter().enumerate() {
        for (ti, t) in c.terms.iter().enumerate() {
            occurrences[t.var.as_u32() as usize].push((ci, ti));
        }
    }

    let mut factors: Vec<i64> = states.iter().map(ClauseState::propagation_factor).collect();
    let mut priority: BTreeSet<(i64, usize)> =
        factors.iter().enumerate().map(|(i, &f)| (f, i)).collect();

    let mut steps = Vec::new();

    loop {
        let &(factor, idx) = match priority.iter().next() {
            Some(entry) => entry,
            None => return RawTrace { steps, conflict: None },
        };
        if factor >= 0 {
            return RawTrace { steps, conflict: None };
        }

        let leading = states[idx].leading_term().expect("negative factor implies a leading term");
        let var = leading.var;
        let neg = leading.neg;
        steps.push(RawStep { source: idx, var, neg });

        let occs = occurrences[var.as_u32() as usize].clone();
        let mut conflict = None;
        for (cid, tidx) in occs {
            let removed = match states[cid].terms[tidx].take() {
                Some(t) => t,
                None => continue,
            };

            priority.remove(&(factors[cid], cid));

            states[cid].lhs_sum -= removed.coeff;
            if removed.neg == neg {
                states[cid].rhs -= removed.coeff;
            }
            if tidx == states[cid].front {
                states[cid].advance_front();
            }

            let new_factor = states[cid].propagation_factor();
            factors[cid] = new_factor;
            priority.insert((new_factor, cid));

            if states[cid].slack() < 0 {
                conflict = Some(cid);
                break;
            }
        }

        if let Some(cid) = conflict {
            return RawTrace { steps, conflict: Some(cid) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{negate, InputConstraint, NormalizedConstraint};
    use crate::variable::VariableManager;

    fn mk(vm: &mut VariableManager, pairs: &[(i64, &str)], rhs: i64) -> NormalizedConstraint {
        let terms = pairs.iter().map(|&(c, l)| Term::new(c, vm.get_literal(l))).collect();
        NormalizedConstraint::normalize(InputConstraint::new(terms, rhs)).unwrap()
    }

    #[test]
    fn scenario_d_rup_step() {
        // Active set, in stored order: 1~x >= 1, then 2x + 2y >= 3.
        // Target: 1y >= 1.
        let mut vm = VariableManager::new();
        let c_unit = mk(&mut vm, &[(1, "~x")], 1);
        let c_sum = mk(&mut vm, &[(2, "x"), (2, "y")], 3);
        let target = mk(&mut vm, &[(1, "y")], 1);
        let neg_target = negate(&target).unwrap();

        let clauses = vec![c_unit, c_sum, neg_target];
        let trace = derive(&clauses);

        // 1~x >= 1 (index 0) forces ~x; substituting into 2x+2y>=3 (index
        // 1) drives its slack to -1 before the negated target ever needs
        // to fire.
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.steps[0].source, 0);
        assert_eq!(trace.steps[0].var, vm.get_variable("x"));
        assert!(trace.steps[0].neg);
        assert_eq!(trace.conflict, Some(1));
    }

    #[test]
    fn no_conflict_is_reported_as_none() {
        let mut vm = VariableManager::new();
        // A single satisfiable constraint: nothing ever goes negative.
        let c = mk(&mut vm, &[(1, "x")], 0);
        let trace = derive(&[c]);
        assert!(trace.conflict.is_none());
    }

    #[test]
    fn every_trace_step_source_had_one_unfalsified_literal() {
        let mut vm = VariableManager::new();
        let c_unit = mk(&mut vm, &[(1, "~x")], 1);
        let c_sum = mk(&mut vm, &[(2, "x"), (2, "y")], 3);
        let target = mk(&mut vm, &[(1, "y")], 1);
        let neg_target = negate(&target).unwrap();
        let clauses = vec![c_unit, c_sum, neg_target];
        let trace = derive(&clauses);
        // The unit clause (single term) is the source of the sole step.
        assert_eq!(trace.steps[0].source, 0);
        assert_eq!(trace.steps[0].var, vm.get_variable("x"));
        assert!(trace.steps[0].neg);
    }
}
