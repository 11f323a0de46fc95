//! Term and constraint algebra
//!
//! A [`Term`] is `(coeff, var, neg)`. An [`InputConstraint`] is the
//! caller-facing bag of terms plus rhs with no normalization guarantees
//! beyond "each variable occurs at most once". A [`NormalizedConstraint`] is
//! the canonical form every stored constraint is kept in: all coefficients
//! `>= 1`, each variable at most once, terms sorted by descending
//! coefficient (ties broken by ascending variable id, for determinism).
//!
//! The five operations below (`normalize`, `sum`, `scalar`, `div_ceil`,
//! `saturate`, `negate`) are free functions over `NormalizedConstraint`
//! values, mirroring the source's `clause_sum`/`clause_prod`/`clause_div`/
//! `clause_sat`/`negate_clause`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::variable::{Literal, VarId};

/// A single `coeff * literal` term. `coeff` is unconstrained in sign for an
/// [`InputConstraint`]'s terms; it is always `>= 1` in a
/// [`NormalizedConstraint`]'s terms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Term {
    /// The term's coefficient.
    pub coeff: i64,
    /// The variable the term refers to.
    pub var: VarId,
    /// Whether the literal is negated.
    pub neg: bool,
}

impl Term {
    /// Construct a term from a coefficient and a literal.
    pub fn new(coeff: i64, lit: Literal) -> Self {
        Term { coeff, var: lit.var, neg: lit.neg }
    }

    /// The term's literal, dropping the coefficient.
    pub fn literal(self) -> Literal {
        Literal { var: self.var, neg: self.neg }
    }
}

fn checked_add(a: i64, b: i64) -> Result<i64> {
    a.checked_add(b).ok_or_else(|| Error::CoefficientOverflow {
        detail: format!("{a} + {b} overflowed i64"),
    })
}

fn checked_sub(a: i64, b: i64) -> Result<i64> {
    a.checked_sub(b).ok_or_else(|| Error::CoefficientOverflow {
        detail: format!("{a} - {b} overflowed i64"),
    })
}

fn checked_mul(a: i64, b: i64) -> Result<i64> {
    a.checked_mul(b).ok_or_else(|| Error::CoefficientOverflow {
        detail: format!("{a} * {b} overflowed i64"),
    })
}

/// Ceiling division of `n` by `k`, `k >= 1`, `n` may be any sign.
fn ceil_div(n: i64, k: i64) -> Result<i64> {
    debug_assert!(k >= 1);
    // Round toward +infinity for both positive and negative n.
    let q = n.div_euclid(k);
    let r = n.rem_euclid(k);
    if r == 0 {
        Ok(q)
    } else {
        checked_add(q, 1)
    }
}

/// An unordered bag of input terms and an integer rhs, representing
/// `sum(c_i * l_i) >= rhs`. Callers must ensure each variable occurs at
/// most once; no other invariant is required.
#[derive(Clone, Debug, Default)]
pub struct InputConstraint {
    /// The constraint's terms, in no particular order.
    pub terms: Vec<Term>,
    /// The right-hand side.
    pub rhs: i64,
}

impl InputConstraint {
    /// Construct a new input constraint.
    pub fn new(terms: Vec<Term>, rhs: i64) -> Self {
        InputConstraint { terms, rhs }
    }
}

/// A canonicalized PB constraint: coefficients `>= 1`, each variable at
/// most once, terms sorted by descending coefficient (ties broken by
/// ascending variable id for a deterministic, reproducible order).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedConstraint {
    /// The constraint's terms, sorted descending by coefficient.
    pub terms: Vec<Term>,
    /// The right-hand side.
    pub rhs: i64,
}

fn sort_terms(terms: &mut [Term]) {
    terms.sort_by(|a, b| match b.coeff.cmp(&a.coeff) {
        Ordering::Equal => a.var.cmp(&b.var),
        other => other,
    });
}

impl NormalizedConstraint {
    /// Canonicalize an [`InputConstraint`]: drop zero-coefficient terms,
    /// flip negative-coefficient terms to the opposite literal (adjusting
    /// rhs), and sort by descending coefficient.
    pub fn normalize(input: InputConstraint) -> Result<Self> {
        let mut rhs = input.rhs;
        let mut terms = Vec::with_capacity(input.terms.len());
        for t in input.terms {
            if t.coeff == 0 {
                continue;
            } else if t.coeff < 0 {
                rhs = checked_sub(rhs, t.coeff)?;
                let flipped = t.coeff.checked_neg().ok_or_else(|| Error::CoefficientOverflow {
                    detail: format!("negating coefficient {} overflowed i64", t.coeff),
                })?;
                terms.push(Term { coeff: flipped, var: t.var, neg: !t.neg });
            } else {
                terms.push(t);
            }
        }
        sort_terms(&mut terms);
        Ok(NormalizedConstraint { terms, rhs })
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the constraint has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sum of all coefficients, `S` in the propagation-factor formula.
    pub fn coeff_sum(&self) -> Result<i64> {
        self.terms.iter().try_fold(0i64, |acc, t| checked_add(acc, t.coeff))
    }

    /// Validate the normalized-form invariants (positive coefficients,
    /// unique variables, descending sort). Used at the boundary where a
    /// hint refers to a constraint that must already be normalized.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        let mut last_coeff = i64::MAX;
        for t in &self.terms {
            if t.coeff < 1 {
                return Err(Error::InternalInvariantViolation {
                    detail: format!("non-positive coefficient {} on a normalized term", t.coeff),
                });
            }
            if t.coeff > last_coeff {
                return Err(Error::InternalInvariantViolation {
                    detail: "terms are not sorted in descending coefficient order".into(),
                });
            }
            if !seen.insert(t.var) {
                return Err(Error::InternalInvariantViolation {
                    detail: format!("variable {:?} occurs more than once", t.var),
                });
            }
            last_coeff = t.coeff;
        }
        Ok(())
    }
}

/// `A + B`. Coalesces terms by variable, treating `c * ~x` as `c - c*x`.
pub fn sum(a: &NormalizedConstraint, b: &NormalizedConstraint) -> Result<NormalizedConstraint> {
    let mut rhs = checked_add(a.rhs, b.rhs)?;
    let mut net: BTreeMap<VarId, i64> = BTreeMap::new();
    for t in a.terms.iter().chain(b.terms.iter()) {
        if t.neg {
            let entry = net.entry(t.var).or_insert(0);
            *entry = checked_sub(*entry, t.coeff)?;
            rhs = checked_sub(rhs, t.coeff)?;
        } else {
            let entry = net.entry(t.var).or_insert(0);
            *entry = checked_add(*entry, t.coeff)?;
        }
    }
    let terms: Vec<Term> =
        net.into_iter().map(|(var, coeff)| Term { coeff, var, neg: false }).collect();
    NormalizedConstraint::normalize(InputConstraint::new(terms, rhs))
}

/// `k * A`, `k >= 1`.
pub fn scalar(a: &NormalizedConstraint, k: i64) -> Result<NormalizedConstraint> {
    debug_assert!(k >= 1, "scalar product requires a positive multiplier");
    let rhs = checked_mul(a.rhs, k)?;
    let mut terms = Vec::with_capacity(a.terms.len());
    for t in &a.terms {
        terms.push(Term { coeff: checked_mul(t.coeff, k)?, var: t.var, neg: t.neg });
    }
    Ok(NormalizedConstraint { terms, rhs })
}

/// `A / k` with ceiling division, `k >= 1`. Soundness under cutting planes
/// requires `k` to divide every coefficient; this is the caller's
/// responsibility (spec.md §4.2) — this function only computes.
pub fn div_ceil(a: &NormalizedConstraint, k: i64) -> Result<NormalizedConstraint> {
    debug_assert!(k >= 1, "division requires a positive divisor");
    let rhs = ceil_div(a.rhs, k)?;
    let mut terms = Vec::with_capacity(a.terms.len());
    for t in &a.terms {
        terms.push(Term { coeff: ceil_div(t.coeff, k)?, var: t.var, neg: t.neg });
    }
    Ok(NormalizedConstraint { terms, rhs })
}

/// `sat(A)`: clamp every coefficient to `rhs`.
pub fn saturate(a: &NormalizedConstraint) -> NormalizedConstraint {
    let terms = a
        .terms
        .iter()
        .map(|t| Term { coeff: t.coeff.min(a.rhs), var: t.var, neg: t.neg })
        .collect();
    NormalizedConstraint { terms, rhs: a.rhs }
}

/// The PB-sound negation: for `sum(c_i * l_i) >= rhs`, produce
/// `sum(c_i * ~l_i) >= (sum c_i) - rhs + 1`.
pub fn negate(a: &NormalizedConstraint) -> Result<NormalizedConstraint> {
    let neg_rhs = a.rhs.checked_neg().ok_or_else(|| Error::CoefficientOverflow {
        detail: format!("negating rhs {} overflowed i64", a.rhs),
    })?;
    let mut rhs = checked_add(1, neg_rhs)?;
    let mut terms = Vec::with_capacity(a.terms.len());
    for t in &a.terms {
        terms.push(Term { coeff: t.coeff, var: t.var, neg: !t.neg });
        rhs = checked_add(rhs, t.coeff)?;
    }
    Ok(NormalizedConstraint { terms, rhs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableManager;

    fn mk(vm: &mut VariableManager, pairs: &[(i64, &str)], rhs: i64) -> NormalizedConstraint {
        let terms = pairs.iter().map(|&(c, l)| Term::new(c, vm.get_literal(l))).collect();
        NormalizedConstraint::normalize(InputConstraint::new(terms, rhs)).unwrap()
    }

    #[test]
    fn normalize_drops_zero_and_flips_negative() {
        let mut vm = VariableManager::new();
        let x = vm.get_literal("x");
        let y = vm.get_literal("y");
        let input = InputConstraint::new(
            vec![Term::new(0, x), Term::new(-3, y)],
            5,
        );
        let n = NormalizedConstraint::normalize(input).unwrap();
        // -3*y >= ... becomes +3*~y, rhs -= -3 => rhs += 3
        assert_eq!(n.terms.len(), 1);
        assert_eq!(n.terms[0].coeff, 3);
        assert!(n.terms[0].neg);
        assert_eq!(n.rhs, 8);
        n.check_invariants().unwrap();
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut vm = VariableManager::new();
        let a = mk(&mut vm, &[(5, "x"), (3, "y"), (1, "z")], 4);
        let again = NormalizedConstraint::normalize(InputConstraint::new(a.terms.clone(), a.rhs)).unwrap();
        assert_eq!(a, again);
    }

    #[test]
    fn sum_is_commutative() {
        let mut vm = VariableManager::new();
        let a = mk(&mut vm, &[(1, "x"), (1, "y")], 1);
        let b = mk(&mut vm, &[(1, "~x"), (1, "~y")], 2);
        let ab = sum(&a, &b).unwrap();
        let ba = sum(&b, &a).unwrap();
        assert_eq!(ab, ba);
        // From the spec's scenario A: rhs = 1 + 2 - 2 = 1, no terms.
        assert!(ab.is_empty());
        assert_eq!(ab.rhs, 1);
    }

    #[test]
    fn scalar_distributes_over_sum() {
        let mut vm = VariableManager::new();
        let a = mk(&mut vm, &[(2, "x")], 1);
        let b = mk(&mut vm, &[(3, "y")], 2);
        let lhs = scalar(&sum(&a, &b).unwrap(), 4).unwrap();
        let rhs = sum(&scalar(&a, 4).unwrap(), &scalar(&b, 4).unwrap()).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn saturation_clamps_and_is_idempotent() {
        let mut vm = VariableManager::new();
        let a = mk(&mut vm, &[(5, "x"), (3, "y")], 2);
        let s = saturate(&a);
        assert_eq!(s.terms[0].coeff, 2);
        assert_eq!(s.terms[1].coeff, 2);
        assert_eq!(s.rhs, 2);
        assert_eq!(saturate(&s), s);
        for t in &s.terms {
            assert!(t.coeff <= s.rhs);
        }
    }

    #[test]
    fn division_rounds_up() {
        let mut vm = VariableManager::new();
        let a = mk(&mut vm, &[(4, "x"), (4, "y")], 5);
        let d = div_ceil(&a, 2).unwrap();
        assert_eq!(d.terms[0].coeff, 2);
        assert_eq!(d.terms[1].coeff, 2);
        assert_eq!(d.rhs, 3);
    }

    #[test]
    fn negation_matches_scenario_d_shape() {
        let mut vm = VariableManager::new();
        let target = mk(&mut vm, &[(1, "y")], 1);
        let neg = negate(&target).unwrap();
        assert_eq!(neg.terms.len(), 1);
        assert!(neg.terms[0].neg);
        assert_eq!(neg.rhs, 1);
    }

    #[test]
    fn scalar_product_overflow_is_reported() {
        let mut vm = VariableManager::new();
        let a = mk(&mut vm, &[(i64::MAX, "x")], 1);
        let err = scalar(&a, 2).unwrap_err();
        assert!(matches!(err, Error::CoefficientOverflow { .. }));
    }
}
