//! Textual rendering of literals, constraints, and hints
//!
//! Shared by proof emission (`manager::trim_and_emit`) and by the parser
//! collaborator's error messages. Grammar per spec.md §6.2/§6.4.

use crate::term::NormalizedConstraint;
use crate::variable::VariableManager;

/// Sentinel meaning "no hint" — matches [`crate::store::NO_HINT`].
pub const UNSET: i64 = -1;

/// Render a literal as `name` or `~name`.
pub fn render_literal(name: &str, neg: bool) -> String {
    if neg {
        format!("~{name}")
    } else {
        name.to_string()
    }
}

/// Render a normalized constraint as `c1 l1 c2 l2 ... >= R`.
pub fn render_constraint(body: &NormalizedConstraint, vm: &VariableManager) -> String {
    let mut s = String::new();
    for t in &body.terms {
        s.push_str(&t.coeff.to_string());
        s.push(' ');
        s.push_str(&vm.render(t.var, t.neg));
        s.push(' ');
    }
    s.push_str(">= ");
    s.push_str(&body.rhs.to_string());
    s
}

/// Render a post-renumbering hint.
///
/// `hint` is already sign-encoded by the caller: [`UNSET`] for "no hint",
/// a non-negative renumbered id for an ordinary forward reference, or the
/// *negated* renumbered id for a self-reference (spec.md §4.6 — a RUP
/// trace entry whose source is the row being emitted itself). The rendered
/// form is `renumbered_id + 1` for the forward case and `renumbered_id - 1`
/// (i.e. one further from zero, keeping the leading `-`) for the
/// self-referential case.
pub fn render_hint(hint: i64) -> String {
    if hint == UNSET {
        return String::new();
    }
    let shifted = if hint < 0 { hint - 1 } else { hint + 1 };
    shifted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{InputConstraint, Term};
    use crate::variable::VariableManager;

    #[test]
    fn renders_terms_then_relation() {
        let mut vm = VariableManager::new();
        let x = vm.get_literal("x");
        let y = vm.get_literal("~y");
        let body = NormalizedConstraint::normalize(InputConstraint::new(
            vec![Term::new(2, x), Term::new(1, y)],
            1,
        ))
        .unwrap();
        assert_eq!(render_constraint(&body, &vm), "2 x 1 ~y >= 1");
    }

    #[test]
    fn hint_rendering_rules() {
        assert_eq!(render_hint(UNSET), "");
        assert_eq!(render_hint(0), "1");
        assert_eq!(render_hint(4), "5");
        // Self-referential: renumbered id 2, rendered as -(2+1) = -3.
        assert_eq!(render_hint(-2), "-3");
    }
}
