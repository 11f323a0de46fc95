//! Variable interning
//!
//! Bidirectional mapping between textual variable names (as they appear in
//! the OPB formula and VeriPB proof) and dense, 1-based integer ids. Used
//! everywhere downstream — terms, constraints, propagation — so that the
//! rest of the crate never has to compare strings.

use std::collections::HashMap;

/// A dense, 1-based variable id.
///
/// Ids are assigned in first-seen order starting at 1 and are never reused
/// or invalidated: once interned, a name's id is stable for the life of a
/// `VariableManager`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

impl VarId {
    /// Access the underlying 1-based index.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// A literal: a variable together with a polarity.
///
/// The textual form of a negated literal is `~name`; an unnegated literal
/// is rendered as the bare name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    /// The underlying variable.
    pub var: VarId,
    /// Whether the literal is negated (`~var`).
    pub neg: bool,
}

impl Literal {
    /// Construct a positive literal.
    pub fn pos(var: VarId) -> Self {
        Literal { var, neg: false }
    }

    /// Construct a negated literal.
    pub fn neg(var: VarId) -> Self {
        Literal { var, neg: true }
    }

    /// Flip the polarity, keeping the variable.
    pub fn negated(self) -> Self {
        Literal { var: self.var, neg: !self.neg }
    }
}

/// Interns textual variable names to dense ids and memoizes the inverse.
#[derive(Debug, Default)]
pub struct VariableManager {
    assigned: HashMap<String, VarId>,
    r_assigned: HashMap<VarId, String>,
    next: u32,
}

impl VariableManager {
    /// Create an empty manager; the first interned name gets id 1.
    pub fn new() -> Self {
        VariableManager { assigned: HashMap::new(), r_assigned: HashMap::new(), next: 1 }
    }

    /// Intern `name`, returning its id (allocating a fresh one on first
    /// sight).
    pub fn get_variable(&mut self, name: &str) -> VarId {
        if let Some(&id) = self.assigned.get(name) {
            return id;
        }
        let id = VarId(self.next);
        self.next += 1;
        self.assigned.insert(name.to_string(), id);
        self.r_assigned.insert(id, name.to_string());
        id
    }

    /// Parse a literal token (`name` or `~name`) into a [`Literal`],
    /// interning the underlying variable as needed.
    pub fn get_literal(&mut self, token: &str) -> Literal {
        if let Some(rest) = token.strip_prefix('~') {
            Literal::neg(self.get_variable(rest))
        } else {
            Literal::pos(self.get_variable(token))
        }
    }

    /// Render a variable/polarity pair back to its textual literal form.
    ///
    /// Panics if `var` was never interned by this manager — that would be
    /// an internal bug (every `VarId` handed out downstream originated
    /// from `get_variable`/`get_literal`).
    pub fn render(&self, var: VarId, neg: bool) -> String {
        let name = self
            .r_assigned
            .get(&var)
            .unwrap_or_else(|| panic!("uninterned variable id {}", var.0));
        if neg {
            format!("~{name}")
        } else {
            name.clone()
        }
    }

    /// Number of distinct variables interned so far.
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Whether no variable has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_dense() {
        let mut vm = VariableManager::new();
        let x = vm.get_variable("x");
        let y = vm.get_variable("y");
        let x_again = vm.get_variable("x");
        assert_eq!(x, x_again);
        assert_ne!(x, y);
        assert_eq!(x.0, 1);
        assert_eq!(y.0, 2);
    }

    #[test]
    fn literal_parsing_strips_negation() {
        let mut vm = VariableManager::new();
        let lit = vm.get_literal("~foo");
        assert!(lit.neg);
        assert_eq!(vm.render(lit.var, lit.neg), "~foo");

        let lit2 = vm.get_literal("foo");
        assert!(!lit2.neg);
        assert_eq!(lit.var, lit2.var);
    }

    #[test]
    fn render_round_trips() {
        let mut vm = VariableManager::new();
        let v = vm.get_variable("alpha");
        assert_eq!(vm.render(v, false), "alpha");
        assert_eq!(vm.render(v, true), "~alpha");
    }
}
