//! Rewriting engine: one derivation step.
//!
//! The string is scanned left to right. At each position the rules are tried
//! in declaration order; the first whose left hand side matches the window
//! and whose condition holds is applied and consumes the whole window.
//! Positions no rule matches are copied unchanged as a group of one.

use std::sync::Arc;

use tracing::debug;
use transsys_core::error::{GrammarError, Result};
use transsys_core::instance::TranssysInstance;
use transsys_core::rng::RngContext;

use crate::contact_graph::ContactGraph;
use crate::grammar::{Lsys, Rule};
use crate::lsys_string::{instantiate, LsysString, SymbolInstance};

impl LsysString {
    /// Derive the next generation.
    ///
    /// Group bookkeeping is written onto this string's symbols; the new
    /// string's contact graph is derived from this string's graph.
    pub fn derive(&mut self, rng: &mut RngContext) -> Result<LsysString> {
        self.derive_with_limit(rng, None)
    }

    /// Derive the next generation, failing if it would exceed `max_len`
    /// symbols.
    pub fn derive_with_limit(
        &mut self,
        rng: &mut RngContext,
        max_len: Option<usize>,
    ) -> Result<LsysString> {
        let lsys = Arc::clone(&self.lsys);
        let n = self.symbols.len();
        let mut successors: Vec<SymbolInstance> = Vec::new();
        successors.try_reserve(n)?;

        let mut rules_fired = 0usize;
        let mut i = 0;
        while i < n {
            let successor_index = successors.len();
            let (window, distance) = match self.find_rule(&lsys, i, rng) {
                Some(rule) => {
                    let window = rule.lhs.len();
                    successors.try_reserve(rule.rhs.len())?;
                    let contexts: Vec<&TranssysInstance> = self.symbols[i..i + window]
                        .iter()
                        .map(|s| &s.transsys)
                        .collect();
                    for element in &rule.rhs {
                        successors.push(instantiate(&lsys, element, &contexts, rng));
                    }
                    rules_fired += 1;
                    (window, 1)
                }
                None => {
                    successors.push(self.symbols[i].successor_clone());
                    (1, 0)
                }
            };

            let num_successors = successors.len() - successor_index;
            for source in &mut self.symbols[i..i + window] {
                source.lhs_group_start = Some(i);
                source.lhs_group_length = window;
                source.successor_index = successor_index;
                source.num_successors = num_successors;
                source.successor_distance = distance;
            }
            i += window;
        }

        if let Some(limit) = max_len {
            if successors.len() > limit {
                return Err(GrammarError::StringTooLong {
                    length: successors.len(),
                    limit,
                }
                .into());
            }
        }

        let graph = ContactGraph::derive(self, &mut successors, lsys.diffusion_range())?;

        debug!(
            generation = self.generation + 1,
            rules_fired,
            symbols = successors.len(),
            edges = graph.edge_count(),
            "derived generation"
        );

        Ok(LsysString {
            lsys,
            generation: self.generation + 1,
            symbols: successors,
            graph,
        })
    }

    /// First rule, in declaration order, applicable at position `i`.
    fn find_rule<'a>(&self, lsys: &'a Lsys, i: usize, rng: &mut RngContext) -> Option<&'a Rule> {
        let remaining = &self.symbols[i..];
        lsys.rules().iter().find(|rule| {
            let window = rule.lhs.len();
            if window > remaining.len() || !rule.matches_symbols(remaining.iter().map(|s| s.symbol)) {
                return false;
            }
            match &rule.condition {
                None => true,
                Some(condition) => {
                    let contexts: Vec<&TranssysInstance> =
                        remaining[..window].iter().map(|s| &s.transsys).collect();
                    condition.is_true(&contexts, rng)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{LhsElement, LsysBuilder, ProductionElement};
    use transsys_core::error::TranssysError;
    use transsys_core::expr::{BinaryOp, Expr};
    use transsys_core::program::{Factor, TranssysProgram, TranssysProgramBuilder};
    use transsys_core::types::SymbolIndex;

    fn program() -> Arc<TranssysProgram> {
        let mut builder = TranssysProgramBuilder::new("cell");
        builder
            .add_factor(Factor::new("m", 0))
            .add_factor(Factor::new("n", 1));
        Arc::new(builder.freeze().unwrap())
    }

    struct Fixture {
        builder: LsysBuilder,
        a: SymbolIndex,
        b: SymbolIndex,
        c: SymbolIndex,
    }

    fn fixture() -> Fixture {
        let p = program();
        let mut builder = LsysBuilder::new("test");
        let a = builder.add_symbol("a", Some(p.clone()));
        let b = builder.add_symbol("b", Some(p.clone()));
        let c = builder.add_symbol("c", Some(p));
        builder.diffusion_range(5);
        Fixture { builder, a, b, c }
    }

    fn run(builder: LsysBuilder) -> (LsysString, LsysString) {
        let lsys = Arc::new(builder.build().unwrap());
        let mut rng = RngContext::new(9);
        let mut axiom = LsysString::axiom(lsys, &mut rng).unwrap();
        let next = axiom.derive(&mut rng).unwrap();
        (axiom, next)
    }

    fn names(string: &LsysString) -> Vec<&str> {
        (0..string.len()).map(|i| string.symbol_name(i).unwrap()).collect()
    }

    #[test]
    fn earlier_rule_wins() {
        let Fixture { mut builder, a, b, c } = fixture();
        builder
            .set_axiom(vec![ProductionElement::new(a)])
            .add_rule(Rule::new("first", vec![LhsElement::new(a)], vec![ProductionElement::new(b)]))
            .add_rule(Rule::new("second", vec![LhsElement::new(a)], vec![ProductionElement::new(c)]));
        let (_, next) = run(builder);
        assert_eq!(names(&next), vec!["b"]);
    }

    #[test]
    fn false_condition_falls_through_to_next_rule() {
        let Fixture { mut builder, a, b, c } = fixture();
        builder
            .set_axiom(vec![ProductionElement::new(a).assign(0, Expr::value(1.0))])
            .add_rule(
                Rule::new("guarded", vec![LhsElement::new(a)], vec![ProductionElement::new(b)])
                    .with_condition(Expr::binary(BinaryOp::Gt, Expr::factor(0), Expr::value(5.0))),
            )
            .add_rule(Rule::new("fallback", vec![LhsElement::new(a)], vec![ProductionElement::new(c)]));
        let (_, next) = run(builder);
        assert_eq!(names(&next), vec!["c"]);
    }

    #[test]
    fn identity_fallback_is_a_deep_copy() {
        let Fixture { mut builder, a, b, .. } = fixture();
        builder
            .set_axiom(vec![ProductionElement::new(a).assign(1, Expr::value(3.0))])
            .add_rule(Rule::new("other", vec![LhsElement::new(b)], vec![]));
        let (source, mut next) = run(builder);

        let src = &source.symbols()[0];
        assert_eq!(src.successor_distance(), 0);
        assert_eq!(src.num_successors(), 1);
        assert_eq!(src.successor_index(), 0);
        assert_eq!(src.lhs_group_length(), 1);
        assert_eq!(next.symbols()[0].transsys().concentrations(), &[0.0, 3.0]);

        next.transsys_mut(0).unwrap().set_concentration(1, 99.0).unwrap();
        assert_eq!(source.symbols()[0].transsys().concentration(1), Some(3.0));
    }

    #[test]
    fn two_symbol_window_is_consumed_as_one_group() {
        let Fixture { mut builder, a, b, c } = fixture();
        builder
            .set_axiom(vec![
                ProductionElement::new(a),
                ProductionElement::new(b),
                ProductionElement::new(a),
            ])
            .add_rule(Rule::new(
                "pair",
                vec![LhsElement::new(a), LhsElement::new(b)],
                vec![
                    ProductionElement::new(c),
                    ProductionElement::new(c),
                    ProductionElement::new(c),
                ],
            ));
        let (source, next) = run(builder);

        let s = source.symbols();
        assert_eq!(s[0].lhs_group_start(), Some(0));
        assert_eq!(s[1].lhs_group_start(), Some(0));
        assert_eq!(s[0].lhs_group_length(), 2);
        assert_eq!(s[1].num_successors(), 3);
        assert_eq!(s[0].successor_distance(), 1);
        // scanning resumed at position 2
        assert_eq!(s[2].lhs_group_start(), Some(2));
        assert_eq!(s[2].successor_index(), 3);
        assert_eq!(s[2].successor_distance(), 0);
        assert_eq!(names(&next), vec!["c", "c", "c", "a"]);
    }

    #[test]
    fn template_copies_then_assignments_overwrite() {
        let Fixture { mut builder, a, b, .. } = fixture();
        builder
            .set_axiom(vec![
                ProductionElement::new(a)
                    .assign(0, Expr::value(1.0))
                    .assign(1, Expr::value(2.0)),
                ProductionElement::new(b).assign(0, Expr::value(10.0)),
            ])
            .add_rule(Rule::new(
                "combine",
                vec![LhsElement::labeled(a, "x"), LhsElement::labeled(b, "y")],
                vec![
                    ProductionElement::new(b).with_template(1),
                    ProductionElement::new(a).with_template(0).assign(
                        0,
                        Expr::binary(BinaryOp::Add, Expr::identifier(0, 0), Expr::identifier(1, 0)),
                    ),
                ],
            ));
        let (_, next) = run(builder);
        assert_eq!(next.symbols()[0].transsys().concentrations(), &[10.0, 0.0]);
        assert_eq!(next.symbols()[1].transsys().concentrations(), &[11.0, 2.0]);
    }

    #[test]
    fn deletion_produces_no_successors() {
        let Fixture { mut builder, a, b, .. } = fixture();
        builder
            .set_axiom(vec![ProductionElement::new(a), ProductionElement::new(b)])
            .add_rule(Rule::new("die", vec![LhsElement::new(a)], vec![]));
        let (source, next) = run(builder);
        assert_eq!(source.symbols()[0].num_successors(), 0);
        assert_eq!(names(&next), vec!["b"]);
        assert_eq!(next.graph().edge_count(), 0);
        assert_eq!(next.generation(), 1);
    }

    #[test]
    fn length_limit_is_enforced() {
        let Fixture { mut builder, a, .. } = fixture();
        builder
            .set_axiom(vec![ProductionElement::new(a)])
            .add_rule(Rule::new(
                "double",
                vec![LhsElement::new(a)],
                vec![ProductionElement::new(a), ProductionElement::new(a)],
            ));
        let lsys = Arc::new(builder.build().unwrap());
        let mut rng = RngContext::new(1);
        let mut string = LsysString::axiom(lsys, &mut rng).unwrap();
        let mut next = string.derive_with_limit(&mut rng, Some(2)).unwrap();
        assert!(matches!(
            next.derive_with_limit(&mut rng, Some(2)),
            Err(TranssysError::Grammar(GrammarError::StringTooLong { length: 4, limit: 2 }))
        ));
    }
}
