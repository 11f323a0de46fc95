//! Postfix token stream and the prefix-sharing trie
//!
//! A cutting-planes derivation is written as a postfix (reverse-Polish)
//! expression over `+` (sum), `*` (scalar multiply), `d` (ceiling divide),
//! and `s` (saturate). A numeric token's meaning — a one-based reference
//! into the stored constraints, or a bare integer constant — is inferred
//! from the operator that consumes it (`*`/`d` treat their non-top operand
//! as a constant; everything else is a constraint reference).
//!
//! [`PostfixTrie`] shares repeated prefixes across derivations: once a
//! prefix has been evaluated and assigned a constraint id, later
//! expressions that begin with the same token sequence are shortened to a
//! single reference before evaluation.

use std::collections::BTreeMap;

/// A single postfix token: either a numeric operand (reference or
/// constant, disambiguated at evaluation time) or one of the fixed
/// operator characters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PostfixToken {
    /// A numeric operand.
    Numeric(i64),
    /// One of `+`, `*`, `d`, `s`.
    Operator(char),
}

/// A parsed postfix expression together with the indexing convention its
/// numeric clause-reference tokens were written in.
#[derive(Clone, Debug)]
pub struct PostfixExpr {
    /// The token stream, in postfix (reverse-Polish) order.
    pub tokens: Vec<PostfixToken>,
    /// Whether numeric clause references are 1-based (`true`, the VeriPB
    /// convention) or 0-based.
    pub one_indexed: bool,
}

impl PostfixExpr {
    /// Construct an expression from its tokens.
    pub fn new(tokens: Vec<PostfixToken>, one_indexed: bool) -> Self {
        PostfixExpr { tokens, one_indexed }
    }
}

/// A node in the postfix prefix trie.
#[derive(Debug, Default)]
struct TrieNode {
    /// The constraint id this prefix has already been realized as, if any.
    terminal: Option<i64>,
    children: BTreeMap<PostfixToken, TrieNode>,
}

/// Prefix-sharing index over postfix token streams.
///
/// Keyed on the *raw, unsimplified* token stream regardless of the
/// `one_indexed` convention used by the caller (spec.md §9 Open Question
/// 3) — `one_indexed` only matters when a numeric token is later resolved
/// to a stored clause, not to how the trie is keyed.
#[derive(Debug, Default)]
pub struct PostfixTrie {
    root: TrieNode,
}

impl PostfixTrie {
    /// An empty trie.
    pub fn new() -> Self {
        PostfixTrie { root: TrieNode::default() }
    }

    /// Insert `tokens`, labeling the full-length prefix with `clause_id`.
    /// If a prefix equal to `tokens` was already labeled, the label is
    /// overwritten.
    pub fn insert(&mut self, tokens: &[PostfixToken], clause_id: i64) {
        let mut node = &mut self.root;
        for tok in tokens {
            node = node.children.entry(*tok).or_default();
        }
        node.terminal = Some(clause_id);
    }

    /// Walk `tokens` along the trie and return `(depth, clause_id)` for the
    /// deepest labeled prefix found, if any.
    fn deepest_labeled_prefix(&self, tokens: &[PostfixToken]) -> Option<(usize, i64)> {
        let mut node = &self.root;
        let mut best = None;
        for (i, tok) in tokens.iter().enumerate() {
            match node.children.get(tok) {
                Some(next) => {
                    node = next;
                    if let Some(id) = node.terminal {
                        best = Some((i + 1, id));
                    }
                }
                None => break,
            }
        }
        best
    }

    /// Shorten `tokens` by replacing its deepest previously-labeled prefix
    /// with a single numeric reference to that prefix's constraint id. The
    /// replacement token is offset by `one_indexed` the same way every
    /// other clause-reference token in the expression is, so the shortened
    /// expression remains valid input to the same evaluator.
    ///
    /// Returns the tokens unchanged if no prefix matches.
    pub fn simplify(&self, expr: &PostfixExpr) -> Vec<PostfixToken> {
        match self.deepest_labeled_prefix(&expr.tokens) {
            None => expr.tokens.clone(),
            Some((depth, clause_id)) => {
                let offset = if expr.one_indexed { 1 } else { 0 };
                let mut out = Vec::with_capacity(expr.tokens.len() - depth + 1);
                out.push(PostfixToken::Numeric(clause_id + offset));
                out.extend_from_slice(&expr.tokens[depth..]);
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> PostfixToken {
        PostfixToken::Numeric(n)
    }
    fn op(c: char) -> PostfixToken {
        PostfixToken::Operator(c)
    }

    #[test]
    fn simplify_replaces_labeled_prefix() {
        let mut trie = PostfixTrie::new();
        let prefix = vec![num(1), num(2), op('+')];
        trie.insert(&prefix, 7);

        let expr = PostfixExpr::new(vec![num(1), num(2), op('+'), num(3), op('+')], true);
        let simplified = trie.simplify(&expr);
        assert_eq!(simplified, vec![num(8), num(3), op('+')]);
    }

    #[test]
    fn simplify_is_noop_without_a_match() {
        let trie = PostfixTrie::new();
        let expr = PostfixExpr::new(vec![num(1), num(2), op('+')], true);
        assert_eq!(trie.simplify(&expr), expr.tokens);
    }

    #[test]
    fn reinserting_a_prefix_updates_its_label() {
        let mut trie = PostfixTrie::new();
        let prefix = vec![num(1), num(2), op('+')];
        trie.insert(&prefix, 7);
        trie.insert(&prefix, 9);
        let expr = PostfixExpr::new(prefix.clone(), true);
        assert_eq!(trie.simplify(&expr), vec![num(10)]);
    }

    #[test]
    fn zero_indexed_offset_applies_to_the_replacement_token() {
        let mut trie = PostfixTrie::new();
        let prefix = vec![num(0), num(1), op('+')];
        trie.insert(&prefix, 7);
        let expr = PostfixExpr::new(prefix.clone(), false);
        assert_eq!(trie.simplify(&expr), vec![num(7)]);
    }
}
