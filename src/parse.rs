//! OPB formula and VeriPB proof readers
//!
//! A thin, line-oriented collaborator that drives [`Manager`]'s public
//! input API from the two textual formats a real run is given: the OPB
//! formula (`-f`) and the VeriPB cutting-planes proof (`-p`). Grounded on
//! `loadFormula`/`parseProof`/`str_to_input_clause`/`str_to_rpn_input` in
//! `ipbip_hints.cpp`. Holds no state of its own — every call just parses
//! one line and forwards the result to the manager.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::postfix::{PostfixExpr, PostfixToken};
use crate::term::{InputConstraint, Term};
use crate::variable::{Literal, VariableManager};

const RELATIONS: [&str; 5] = [">=", "<=", ">", "<", "="];

fn is_relation_token(tok: &str) -> bool {
    RELATIONS.contains(&tok)
}

fn parse_i64(tok: Option<&str>, context: &str) -> Result<i64> {
    let tok = tok.ok_or_else(|| Error::MalformedInput { detail: format!("{context}: expected another token") })?;
    tok.parse::<i64>()
        .map_err(|_| Error::MalformedInput { detail: format!("{context}: '{tok}' is not an integer") })
}

/// Parse a `c1 v1 c2 v2 ... >= R` line into an [`InputConstraint`], interning
/// literals into `vm` as they're encountered. Mirrors `str_to_input_clause`.
fn parse_input_constraint(line: &str, vm: &mut VariableManager) -> Result<InputConstraint> {
    let toks: Vec<&str> = line.split_whitespace().collect();
    let mut terms = Vec::new();
    let mut i = 0;
    while i < toks.len() {
        if is_relation_token(toks[i]) {
            if toks[i] != ">=" {
                return Err(Error::UnsupportedConstruct { relation: toks[i].to_string() });
            }
            let rhs = parse_i64(toks.get(i + 1), "constraint rhs")?;
            return Ok(InputConstraint::new(terms, rhs));
        }
        let coeff = parse_i64(Some(toks[i]), "constraint coefficient")?;
        let lit_tok = toks.get(i + 1).ok_or_else(|| Error::MalformedInput {
            detail: format!("constraint line '{line}' has a coefficient with no literal"),
        })?;
        terms.push(Term::new(coeff, vm.get_literal(lit_tok)));
        i += 2;
    }
    Err(Error::MalformedInput { detail: format!("constraint line '{line}' never reached a relation") })
}

/// Build the objective-improvement constraint the source's `o`/`soli`
/// handling derives from a solver-reported assignment: every named
/// variable enters the blocking constraint as a bare positive literal
/// (the assignment's own polarity is discarded), and the right-hand side is
/// one more than the number of variables the assignment set true.
fn parse_objective_constraint(assignment: &[&str], vm: &mut VariableManager) -> InputConstraint {
    let mut terms = Vec::with_capacity(assignment.len());
    let mut found_size: i64 = 0;
    for tok in assignment {
        let var = match tok.strip_prefix('~') {
            Some(name) => vm.get_variable(name),
            None => {
                found_size += 1;
                vm.get_variable(tok)
            }
        };
        terms.push(Term::new(1, Literal::pos(var)));
    }
    InputConstraint::new(terms, found_size + 1)
}

/// Tokenize a postfix cutting-planes line into a [`PostfixExpr`] (always
/// 1-indexed, the VeriPB convention). Mirrors `str_to_rpn_input`/`isnum`: a
/// token is numeric if every character is an ASCII digit, otherwise its
/// first character is taken as an operator.
fn parse_postfix_expr(line: &str) -> Result<PostfixExpr> {
    let mut tokens = Vec::new();
    for tok in line.split_whitespace() {
        if !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()) {
            let v: i64 = tok
                .parse()
                .map_err(|_| Error::MalformedInput { detail: format!("postfix token '{tok}' is not a valid integer") })?;
            tokens.push(PostfixToken::Numeric(v));
        } else {
            let c = tok.chars().next().ok_or_else(|| Error::MalformedInput {
                detail: "postfix line has an empty token".into(),
            })?;
            tokens.push(PostfixToken::Operator(c));
        }
    }
    Ok(PostfixExpr::new(tokens, true))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::MalformedInput { detail: format!("reading {}: {e}", path.display()) })
}

/// Load an OPB-like formula file, feeding every constraint line to
/// [`Manager::add_input`]. A leading `* #variable= N #constraint= M`
/// comment and a `min: ...;` objective line are both ignored — variable
/// count is derived dynamically from the interning table instead of
/// pre-sized, and objective *tracking* plays no part in this system; only
/// solver-emitted proof lines feed the objective-bound machinery. Mirrors
/// `loadFormula`.
pub fn load_opb_formula(path: &Path, mgr: &mut Manager) -> Result<()> {
    let content = read_file(path)?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('*') || line.starts_with("min:") {
            continue;
        }
        let input = parse_input_constraint(line, mgr.vars_mut())?;
        mgr.add_input(input)?;
    }
    Ok(())
}

/// Load a VeriPB proof file, driving [`Manager`] one line at a time.
/// Mirrors `parseProof`'s command dispatch:
///
/// - `#`, `*`, `f`, `w` are ignored.
/// - `o <assignment>` / `soli <assignment>` register and immediately apply
///   an objective-improvement bound.
/// - `u <constraint>` derives a RUP step.
/// - `p <postfix-expr>` evaluates a cutting-planes derivation.
/// - `c` stops processing the remainder of the file.
/// - anything else is ignored, matching the source's dispatch having no
///   default-case diagnostic.
///
/// The leading header line is always skipped. The caller is responsible
/// for injecting the trailing synthetic `>= 1` refutation afterwards
/// (spec.md §6.3) — this function only replays what the proof itself
/// contains.
pub fn load_veripb_proof(path: &Path, mgr: &mut Manager) -> Result<()> {
    let content = read_file(path)?;
    let mut lines = content.lines();
    lines.next();

    for line in lines {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let mut split = line.splitn(2, ' ');
        let command = split.next().unwrap_or("");
        let rest = split.next().unwrap_or("").trim();

        match command {
            "#" | "*" | "f" | "w" => continue,
            "c" => break,
            "o" | "soli" => {
                let assignment: Vec<&str> = rest.split_whitespace().collect();
                let input = parse_objective_constraint(&assignment, mgr.vars_mut());
                mgr.register_objective_template(input)?;
                mgr.apply_objective_bound()?;
            }
            "u" => {
                let input = parse_input_constraint(rest, mgr.vars_mut())?;
                mgr.add_derive(input)?;
            }
            "p" => {
                let expr = parse_postfix_expr(rest)?;
                mgr.add_postfix(expr)?;
            }
            _ => continue,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableManager;

    #[test]
    fn parses_simple_constraint_line() {
        let mut vm = VariableManager::new();
        let c = parse_input_constraint("1 x 1 ~y >= 1", &mut vm).unwrap();
        assert_eq!(c.terms.len(), 2);
        assert_eq!(c.rhs, 1);
        assert_eq!(c.terms[0].coeff, 1);
        assert!(!c.terms[0].neg);
        assert!(c.terms[1].neg);
    }

    #[test]
    fn rejects_non_ge_relation() {
        let mut vm = VariableManager::new();
        let err = parse_input_constraint("1 x <= 1", &mut vm).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruct { .. }));
    }

    #[test]
    fn objective_constraint_counts_true_literals() {
        let mut vm = VariableManager::new();
        let c = parse_objective_constraint(&["x", "~y", "z"], &mut vm);
        assert_eq!(c.terms.len(), 3);
        assert!(c.terms.iter().all(|t| !t.neg));
        // x and z were asserted true; the blocking constraint's rhs is one
        // more than that count.
        assert_eq!(c.rhs, 3);
    }

    #[test]
    fn postfix_tokenizer_splits_numerics_and_operators() {
        let expr = parse_postfix_expr("1 2 + 3 d").unwrap();
        assert_eq!(
            expr.tokens,
            vec![
                PostfixToken::Numeric(1),
                PostfixToken::Numeric(2),
                PostfixToken::Operator('+'),
                PostfixToken::Numeric(3),
                PostfixToken::Operator('d'),
            ]
        );
        assert!(expr.one_indexed);
    }

    #[test]
    fn load_opb_formula_skips_comments_and_objective() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("ipbip-test-formula-{}.opb", std::process::id()));
        fs::write(&path, "* #variable= 2 #constraint= 1\nmin: 1 x;\n1 x 1 y >= 1\n").unwrap();

        let mut mgr = Manager::new();
        load_opb_formula(&path, &mut mgr).unwrap();
        assert_eq!(mgr.clause_count(), 1);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn load_veripb_proof_drives_derive_and_postfix() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("ipbip-test-proof-{}.veripb", std::process::id()));
        fs::write(&path, "pseudo-Boolean proof version 1.2\np 1 2 +\n").unwrap();

        let mut mgr = Manager::new();
        let x = Term::new(1, mgr.vars_mut().get_literal("x"));
        mgr.add_input(InputConstraint::new(vec![x], 1)).unwrap();
        let y = Term::new(1, mgr.vars_mut().get_literal("y"));
        mgr.add_input(InputConstraint::new(vec![y], 1)).unwrap();

        load_veripb_proof(&path, &mut mgr).unwrap();
        assert_eq!(mgr.clause_count(), 3);

        fs::remove_file(&path).ok();
    }
}
