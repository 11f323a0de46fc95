//! The Manager façade
//!
//! The single stateful entry point a parser collaborator drives: interns
//! variables, evaluates postfix derivations, assembles RUP steps, and —
//! once the run is over — trims and renders the surviving proof. Owns
//! every other subsystem for the life of a run (spec.md §5).

use crate::error::{Error, Result};
use crate::format;
use crate::postfix::{PostfixExpr, PostfixToken, PostfixTrie};
use crate::propagate;
use crate::store::{ClauseId, ClauseStore, ConflictStep, ConstraintKind, PropagationStep, PropagationTrace, NO_HINT};
use crate::term::{self, InputConstraint, NormalizedConstraint};
use crate::variable::VariableManager;

/// Local token classification during postfix evaluation: whether a numeric
/// token turned out, from the operator that consumed it, to be a
/// constraint reference or a bare constant.
#[derive(Copy, Clone, PartialEq, Eq)]
enum TokenRole {
    Unknown,
    Clause,
    Constant,
}

/// Orchestrates variable interning, the constraint store, the postfix
/// trie, and unit propagation into the input/output API a parser
/// collaborator and the CLI binary drive.
#[derive(Debug, Default)]
pub struct Manager {
    vars: VariableManager,
    store: ClauseStore,
    trie: PostfixTrie,
    /// Set once a `≥ 1` empty-terms refutation has been derived; every
    /// later `add_derive` becomes a no-op so a trailing auto-injected
    /// refutation cannot double-derive (spec.md §7, §9).
    derived_unsat: bool,
}

impl Manager {
    /// A fresh manager with no variables or clauses.
    pub fn new() -> Self {
        Manager::default()
    }

    /// Mutable access to the variable interning table, for a parser
    /// collaborator building `InputConstraint`s from textual tokens.
    pub fn vars_mut(&mut self) -> &mut VariableManager {
        &mut self.vars
    }

    /// Read-only access to the variable interning table, for rendering.
    pub fn vars(&self) -> &VariableManager {
        &self.vars
    }

    /// Whether a refutation has already been derived.
    pub fn derived_unsat(&self) -> bool {
        self.derived_unsat
    }

    /// Number of clauses stored so far (pre-trim).
    pub fn clause_count(&self) -> usize {
        self.store.len()
    }

    /// Append an `input` clause.
    pub fn add_input(&mut self, body: InputConstraint) -> Result<ClauseId> {
        let normalized = NormalizedConstraint::normalize(body)?;
        Ok(self.store.add_input(normalized))
    }

    /// Advance the original-id mapping by `k` sentinel "ignored" entries.
    pub fn ignore_original_clauses(&mut self, k: usize) {
        self.store.ignore_original_clauses(k);
    }

    /// Register a not-yet-emitted objective-bound template.
    pub fn register_objective_template(&mut self, body: InputConstraint) -> Result<ClauseId> {
        let normalized = NormalizedConstraint::normalize(body)?;
        Ok(self.store.register_objective_template(normalized))
    }

    /// Materialize the registered objective template into a fresh,
    /// original-id-bearing `arithmetic` clause.
    pub fn apply_objective_bound(&mut self) -> Result<ClauseId> {
        self.store.apply_objective_bound()
    }

    /// Evaluate a postfix cutting-planes expression (§4.3), inserting its
    /// unsimplified token sequence into the trie labeled with the fresh
    /// clause's original id.
    pub fn add_postfix(&mut self, expr: PostfixExpr) -> Result<ClauseId> {
        let original_tokens = expr.tokens.clone();
        let tokens = self.trie.simplify(&expr);
        let n = tokens.len();
        if n == 0 {
            return Err(Error::MalformedInput { detail: "empty postfix expression".into() });
        }

        let mut roles = vec![TokenRole::Unknown; n];
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut stack: Vec<usize> = Vec::new();

        for (i, tok) in tokens.iter().enumerate() {
            match tok {
                PostfixToken::Numeric(_) => stack.push(i),
                PostfixToken::Operator(op) => match op {
                    '+' => {
                        let b = pop_operand(&mut stack)?;
                        let a = pop_operand(&mut stack)?;
                        roles[a] = TokenRole::Clause;
                        roles[b] = TokenRole::Clause;
                        deps[i] = vec![a, b];
                        stack.push(i);
                    }
                    '*' | 'd' => {
                        let b = pop_operand(&mut stack)?;
                        let a = pop_operand(&mut stack)?;
                        roles[a] = TokenRole::Clause;
                        roles[b] = TokenRole::Constant;
                        deps[i] = vec![a, b];
                        stack.push(i);
                    }
                    's' => {
                        let a = pop_operand(&mut stack)?;
                        roles[a] = TokenRole::Clause;
                        deps[i] = vec![a];
                        stack.push(i);
                    }
                    other => {
                        return Err(Error::MalformedInput {
                            detail: format!("unknown postfix operator '{other}'"),
                        })
                    }
                },
            }
        }
        roles[n - 1] = TokenRole::Clause;

        let mut contents: Vec<NormalizedConstraint> = Vec::with_capacity(n);
        let mut source_hint: Vec<i64> = Vec::with_capacity(n);
        // Set when the outermost token is itself a `+`/`d`: its own stored
        // entry then directly advances the original-id sequence, instead of
        // wrapping it in a redundant extra clause.
        let mut final_original: Option<(i64, ClauseId)> = None;

        for (i, tok) in tokens.iter().enumerate() {
            let is_outermost = i == n - 1;
            match tok {
                PostfixToken::Numeric(v) => {
                    if roles[i] == TokenRole::Clause {
                        let internal = self.store.resolve_original_id(*v, expr.one_indexed)?;
                        contents.push(self.store.get(internal)?.body.clone());
                        source_hint.push(internal as i64);
                    } else {
                        contents.push(NormalizedConstraint::default());
                        source_hint.push(NO_HINT);
                    }
                }
                PostfixToken::Operator(op) => match op {
                    '+' => {
                        let (a, b) = (deps[i][0], deps[i][1]);
                        let summed = term::sum(&contents[a], &contents[b])?;
                        let id = if is_outermost {
                            let label = self.store.next_original_id();
                            let id = self.store.add_arithmetic_original(summed.clone(), source_hint[a], source_hint[b]);
                            final_original = Some((label, id));
                            id
                        } else {
                            self.store.add_arithmetic_step(summed.clone(), source_hint[a], source_hint[b])
                        };
                        contents.push(summed);
                        source_hint.push(id as i64);
                    }
                    '*' => {
                        let (a, b) = (deps[i][0], deps[i][1]);
                        let k = numeric_value(&tokens[b])?;
                        let product = term::scalar(&contents[a], k)?;
                        contents.push(product);
                        source_hint.push(source_hint[a]);
                    }
                    'd' => {
                        let (a, b) = (deps[i][0], deps[i][1]);
                        let k = numeric_value(&tokens[b])?;
                        let quotient = term::div_ceil(&contents[a], k)?;
                        let id = if is_outermost {
                            let label = self.store.next_original_id();
                            let id = self.store.add_arithmetic_original(quotient.clone(), source_hint[a], NO_HINT);
                            final_original = Some((label, id));
                            id
                        } else {
                            self.store.add_arithmetic_step(quotient.clone(), source_hint[a], NO_HINT)
                        };
                        contents.push(quotient);
                        source_hint.push(id as i64);
                    }
                    's' => {
                        let a = deps[i][0];
                        let saturated = term::saturate(&contents[a]);
                        contents.push(saturated);
                        source_hint.push(source_hint[a]);
                    }
                    _ => unreachable!("operator alphabet was validated above"),
                },
            }
        }

        let (label, id) = match final_original {
            Some((label, id)) => (label, id),
            None => {
                let final_body = contents.last().expect("n >= 1").clone();
                let final_hint = *source_hint.last().expect("n >= 1");
                let label = self.store.next_original_id();
                let id = self.store.add_arithmetic_original(final_body, final_hint, NO_HINT);
                (label, id)
            }
        };
        self.trie.insert(&original_tokens, label);
        Ok(id)
    }

    /// Every stored constraint currently eligible to seed a RUP active
    /// set: `input`, `rup`, `arithmetic`, or the internal objective
    /// template (which the source tags identically to `input` before it
    /// is applied). Whenever the clause immediately preceding one (by raw
    /// store index, not by active-set membership) is `arithmetic`, the
    /// previously collected entry is dropped — later arithmetics subsume
    /// earlier ones within a run (spec.md §9 Open Question 1).
    fn collect_active_set(&self) -> Result<(Vec<NormalizedConstraint>, Vec<ClauseId>)> {
        let mut bodies = Vec::new();
        let mut relabellings = Vec::new();
        for i in 0..self.store.len() {
            let kind = self.store.get(i)?.kind;
            if i > 0 && self.store.get(i - 1)?.kind == ConstraintKind::Arithmetic {
                bodies.pop();
                relabellings.pop();
            }
            if matches!(
                kind,
                ConstraintKind::Input | ConstraintKind::Rup | ConstraintKind::Arithmetic | ConstraintKind::ObjectiveTemplate
            ) {
                bodies.push(self.store.get(i)?.body.clone());
                relabellings.push(i);
            }
        }
        Ok((bodies, relabellings))
    }

    /// Record a RUP step for `target` (§4.5). A no-op once a refutation
    /// has already been derived.
    pub fn add_derive(&mut self, target: InputConstraint) -> Result<Option<ClauseId>> {
        if self.derived_unsat {
            return Ok(None);
        }

        let target = NormalizedConstraint::normalize(target)?;
        let is_refutation = target.rhs == 1 && target.is_empty();
        if is_refutation {
            self.derived_unsat = true;
        }

        let negated_target = term::negate(&target)?;

        let (mut bodies, mut relabellings) = self.collect_active_set()?;
        let placed_point = self.store.add_rup_placeholder(target);
        bodies.push(negated_target);
        relabellings.push(placed_point);

        let raw = propagate::derive(&bodies);
        let steps: Vec<PropagationStep> = raw
            .steps
            .iter()
            .map(|s| PropagationStep { source: relabellings[s.source], var: s.var, neg: s.neg })
            .collect();
        let conflict_found = raw.conflict.is_some();
        let conflict = raw.conflict.map(|idx| ConflictStep { source: Some(relabellings[idx]) });

        self.store.attach_rup_trace(placed_point, PropagationTrace { steps, conflict })?;

        if !conflict_found {
            return Err(Error::RupFailure {
                detail: "unit propagation terminated without driving any active clause infeasible".into(),
            });
        }

        Ok(Some(placed_point))
    }

    /// Trim every clause unreachable from the final stored constraint and
    /// render the survivors in the IPBIP grammar (spec.md §4.6, §6.2), one
    /// line per surviving clause in original order.
    pub fn trim_and_emit(&self) -> Result<Vec<String>> {
        let total = self.store.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut used = vec![false; total];
        used[total - 1] = true;
        for i in (0..total).rev() {
            if !used[i] {
                continue;
            }
            let c = self.store.get(i)?;
            match c.kind {
                ConstraintKind::Rup => {
                    let trace = self.store.trace(c.hint_b)?;
                    for step in &trace.steps {
                        used[step.source] = true;
                    }
                    if let Some(conflict) = &trace.conflict {
                        if let Some(src) = conflict.source {
                            used[src] = true;
                        }
                    }
                }
                ConstraintKind::Arithmetic | ConstraintKind::ObjectiveTemplate => {
                    if c.hint_a != NO_HINT {
                        used[c.hint_a as usize] = true;
                    }
                    if c.hint_b != NO_HINT {
                        used[c.hint_b as usize] = true;
                    }
                }
                ConstraintKind::Input => {}
            }
        }

        let mut renum = vec![-1i64; total];
        let mut ptr: i64 = 0;
        let mut lines = Vec::new();
        for i in 0..total {
            if !used[i] {
                continue;
            }
            renum[i] = ptr;
            let c = self.store.get(i)?;
            let body_text = format::render_constraint(&c.body, &self.vars);
            let hint_text = match c.kind {
                ConstraintKind::Rup => {
                    let trace = self.store.trace(c.hint_b)?;
                    let mut parts = Vec::with_capacity(trace.steps.len() + 1);
                    for step in &trace.steps {
                        let signed = signed_hint(renum[step.source], ptr);
                        parts.push(format!("[{} {}]", format::render_hint(signed), self.vars.render(step.var, step.neg)));
                    }
                    let conflict_src = trace.conflict.as_ref().and_then(|c| c.source);
                    let src = conflict_src.ok_or_else(|| Error::InternalInvariantViolation {
                        detail: "rup clause survived trimming with no recorded conflict".into(),
                    })?;
                    let signed = signed_hint(renum[src], ptr);
                    parts.push(format!("[{}]", format::render_hint(signed)));
                    parts.join(" ")
                }
                _ => {
                    let h1 = if c.hint_a == NO_HINT { NO_HINT } else { renum[c.hint_a as usize] };
                    let h2 = if c.hint_b == NO_HINT { NO_HINT } else { renum[c.hint_b as usize] };
                    format!("{} {}", format::render_hint(h1), format::render_hint(h2))
                }
            };
            lines.push(format!("{} {} ; {}", c.kind.tag(), body_text, hint_text));
            ptr += 1;
        }
        Ok(lines)
    }
}

fn signed_hint(renumbered: i64, ptr: i64) -> i64 {
    if renumbered == ptr {
        -renumbered
    } else {
        renumbered
    }
}

fn pop_operand(stack: &mut Vec<usize>) -> Result<usize> {
    stack.pop().ok_or_else(|| Error::MalformedInput {
        detail: "postfix expression underflows its operator stack".into(),
    })
}

fn numeric_value(tok: &PostfixToken) -> Result<i64> {
    match tok {
        PostfixToken::Numeric(v) => Ok(*v),
        PostfixToken::Operator(op) => Err(Error::MalformedInput {
            detail: format!("expected a constant operand, found operator '{op}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn input(vm: &mut VariableManager, pairs: &[(i64, &str)], rhs: i64) -> InputConstraint {
        let terms = pairs.iter().map(|&(c, l)| Term::new(c, vm.get_literal(l))).collect();
        InputConstraint::new(terms, rhs)
    }

    #[test]
    fn scenario_a_two_variable_contradiction_via_sum() {
        let mut mgr = Manager::new();
        let x = input(mgr.vars_mut(), &[(1, "x"), (1, "y")], 1);
        mgr.add_input(x).unwrap();
        let y = input(mgr.vars_mut(), &[(1, "~x"), (1, "~y")], 2);
        mgr.add_input(y).unwrap();

        let expr = PostfixExpr::new(
            vec![PostfixToken::Numeric(1), PostfixToken::Numeric(2), PostfixToken::Operator('+')],
            true,
        );
        let sum_id = mgr.add_postfix(expr).unwrap();
        let stored = mgr.store.get(sum_id).unwrap();
        assert!(stored.body.is_empty());
        assert_eq!(stored.body.rhs, 1);

        // The outermost `+` of a postfix expression directly becomes the
        // original-id-bearing entry, carrying both operand hints — no
        // separate wrapper clause is appended on top of it.
        let lines = mgr.trim_and_emit().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "a >= 1 ; 1 2");
    }

    #[test]
    fn scenario_b_saturation_reduction() {
        let mut mgr = Manager::new();
        let c = input(mgr.vars_mut(), &[(5, "x"), (3, "y")], 2);
        mgr.add_input(c).unwrap();
        let expr = PostfixExpr::new(vec![PostfixToken::Numeric(1), PostfixToken::Operator('s')], true);
        let id = mgr.add_postfix(expr).unwrap();
        let stored = mgr.store.get(id).unwrap();
        assert_eq!(stored.body.terms[0].coeff, 2);
        assert_eq!(stored.body.terms[1].coeff, 2);
        assert_eq!(stored.body.rhs, 2);
    }

    #[test]
    fn scenario_c_division_rounds_up() {
        let mut mgr = Manager::new();
        let c = input(mgr.vars_mut(), &[(4, "x"), (4, "y")], 5);
        mgr.add_input(c).unwrap();
        let expr = PostfixExpr::new(
            vec![PostfixToken::Numeric(1), PostfixToken::Numeric(2), PostfixToken::Operator('d')],
            true,
        );
        let id = mgr.add_postfix(expr).unwrap();
        let stored = mgr.store.get(id).unwrap();
        assert_eq!(stored.body.terms[0].coeff, 2);
        assert_eq!(stored.body.rhs, 3);
    }

    #[test]
    fn scenario_d_rup_emission_matches_bracket_grammar() {
        let mut mgr = Manager::new();
        let unit = input(mgr.vars_mut(), &[(1, "~x")], 1);
        mgr.add_input(unit).unwrap();
        let sum = input(mgr.vars_mut(), &[(2, "x"), (2, "y")], 3);
        mgr.add_input(sum).unwrap();

        let target = input(mgr.vars_mut(), &[(1, "y")], 1);
        mgr.add_derive(target).unwrap();

        // The target row is the last stored constraint, so it survives
        // trimming trivially; its trace in turn pulls in both inputs.
        let lines = mgr.trim_and_emit().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "u 1 y >= 1 ; [1 ~x] [2]");
    }

    #[test]
    fn a_previously_submitted_expression_contracts_a_later_prefix() {
        // Reuse is keyed on whole previously-submitted token sequences: if
        // `1 2 +` was itself once a complete submission, a later `1 2 + 3
        // +` contracts its leading `1 2 +` to that submission's id before
        // evaluating the trailing `3 +`.
        let mut mgr = Manager::new();
        let x = input(mgr.vars_mut(), &[(1, "x")], 0);
        mgr.add_input(x).unwrap();
        let y = input(mgr.vars_mut(), &[(1, "y")], 0);
        mgr.add_input(y).unwrap();
        let w = input(mgr.vars_mut(), &[(1, "w")], 0);
        mgr.add_input(w).unwrap();

        let e1 = PostfixExpr::new(
            vec![PostfixToken::Numeric(1), PostfixToken::Numeric(2), PostfixToken::Operator('+')],
            true,
        );
        mgr.add_postfix(e1).unwrap();
        let before = mgr.clause_count();

        let e2 = PostfixExpr::new(
            vec![
                PostfixToken::Numeric(1),
                PostfixToken::Numeric(2),
                PostfixToken::Operator('+'),
                PostfixToken::Numeric(3),
                PostfixToken::Operator('+'),
            ],
            true,
        );
        mgr.add_postfix(e2).unwrap();
        let after = mgr.clause_count();

        // The shared `1 2 +` prefix is not re-evaluated: the trailing `+
        // w` is the expression's sole remaining operator, and since it is
        // also the outermost one its single stored entry directly becomes
        // the original-id-bearing result.
        assert_eq!(after, before + 1);
    }
}
