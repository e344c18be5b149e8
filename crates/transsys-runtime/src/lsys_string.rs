//! Symbol strings: one generation of a growing organism.
//!
//! An [`LsysString`] owns its symbol instances and their contact graph.
//! Kinetics and diffusion mutate GRN states in place; the rewriting engine
//! reads the string to produce the next generation and records, on each
//! source symbol, which predecessor group consumed it and where that group's
//! successors landed.

use std::sync::Arc;

use tracing::warn;
use transsys_core::error::Result;
use transsys_core::instance::TranssysInstance;
use transsys_core::rng::RngContext;
use transsys_core::types::{FactorIndex, Generation, SymbolIndex};

use crate::contact_graph::{ContactGraph, EdgeHandle};
use crate::grammar::{Lsys, ProductionElement};

/// One occurrence of a symbol in a generation.
#[derive(Debug, Clone)]
pub struct SymbolInstance {
    pub(crate) symbol: SymbolIndex,
    pub(crate) transsys: TranssysInstance,
    pub(crate) lhs_group_start: Option<usize>,
    pub(crate) lhs_group_length: usize,
    pub(crate) successor_index: usize,
    pub(crate) num_successors: usize,
    pub(crate) successor_distance: u32,
    pub(crate) edges: Vec<EdgeHandle>,
}

impl SymbolInstance {
    pub fn new(symbol: SymbolIndex, transsys: TranssysInstance) -> Self {
        Self {
            symbol,
            transsys,
            lhs_group_start: None,
            lhs_group_length: 0,
            successor_index: 0,
            num_successors: 0,
            successor_distance: 0,
            edges: Vec::new(),
        }
    }

    /// Deep copy of symbol and state for the next generation, without
    /// bookkeeping or contacts.
    pub(crate) fn successor_clone(&self) -> Self {
        Self::new(self.symbol, self.transsys.clone())
    }

    pub fn symbol(&self) -> SymbolIndex {
        self.symbol
    }

    pub fn transsys(&self) -> &TranssysInstance {
        &self.transsys
    }

    pub fn transsys_mut(&mut self) -> &mut TranssysInstance {
        &mut self.transsys
    }

    /// Start position of the predecessor group that consumed this symbol in
    /// the most recent derivation; `None` before any derivation.
    pub fn lhs_group_start(&self) -> Option<usize> {
        self.lhs_group_start
    }

    pub fn lhs_group_length(&self) -> usize {
        self.lhs_group_length
    }

    /// Offset of the group's first successor in the derived string.
    pub fn successor_index(&self) -> usize {
        self.successor_index
    }

    pub fn num_successors(&self) -> usize {
        self.num_successors
    }

    /// 1 when a rule produced the successors, 0 for an identity copy.
    pub fn successor_distance(&self) -> u32 {
        self.successor_distance
    }

    /// Handles of all contact edges touching this symbol.
    pub fn edges(&self) -> &[EdgeHandle] {
        &self.edges
    }
}

/// One generation: symbols plus contact graph.
#[derive(Debug, Clone)]
pub struct LsysString {
    pub(crate) lsys: Arc<Lsys>,
    pub(crate) generation: Generation,
    pub(crate) symbols: Vec<SymbolInstance>,
    pub(crate) graph: ContactGraph,
}

impl LsysString {
    /// Instantiate the axiom as generation 0, all symbols in mutual contact.
    pub fn axiom(lsys: Arc<Lsys>, rng: &mut RngContext) -> Result<Self> {
        let mut symbols = Vec::new();
        symbols.try_reserve_exact(lsys.axiom().len())?;
        for element in lsys.axiom() {
            symbols.push(instantiate(&lsys, element, &[], rng));
        }
        let graph = ContactGraph::axiom(&mut symbols)?;
        Ok(Self {
            lsys,
            generation: 0,
            symbols,
            graph,
        })
    }

    pub fn lsys(&self) -> &Arc<Lsys> {
        &self.lsys
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[SymbolInstance] {
        &self.symbols
    }

    pub fn symbol(&self, index: usize) -> Option<&SymbolInstance> {
        self.symbols.get(index)
    }

    pub fn graph(&self) -> &ContactGraph {
        &self.graph
    }

    /// GRN state at a position; the only mutable access a string offers.
    pub fn transsys_mut(&mut self, index: usize) -> Option<&mut TranssysInstance> {
        self.symbols.get_mut(index).map(|s| &mut s.transsys)
    }

    pub fn symbol_name(&self, index: usize) -> Option<&str> {
        let symbol = self.symbols.get(index)?;
        self.lsys.symbol(symbol.symbol).map(|s| s.name.as_str())
    }

    /// Contact neighbors of a position with their distances.
    pub fn neighbors(&self, index: usize) -> Vec<(usize, u32)> {
        let Some(symbol) = self.symbols.get(index) else {
            return Vec::new();
        };
        symbol
            .edges
            .iter()
            .filter_map(|&e| {
                let (i1, i2, distance) = self.graph.edge(e)?;
                Some((if i1 == index { i2 } else { i1 }, distance))
            })
            .collect()
    }

    /// Advance every symbol's GRN state by one kinetics tick.
    pub fn expression_step(&mut self, rng: &mut RngContext) {
        for symbol in &mut self.symbols {
            symbol.transsys.step(rng);
        }
    }

    /// Sum of one factor over all symbols bound to the named program.
    pub fn factor_total(&self, program: &str, factor: FactorIndex) -> f64 {
        self.symbols
            .iter()
            .filter(|s| s.transsys.program().is_some_and(|p| p.name() == program))
            .filter_map(|s| s.transsys.concentration(factor))
            .sum()
    }
}

/// Create the successor described by a production element.
///
/// The new state starts at zero for the target symbol's program, takes the
/// template context's concentrations if one is named, then applies the
/// assignments evaluated against `contexts`.
pub(crate) fn instantiate(
    lsys: &Lsys,
    element: &ProductionElement,
    contexts: &[&TranssysInstance],
    rng: &mut RngContext,
) -> SymbolInstance {
    let program = lsys.symbol(element.symbol).and_then(|s| s.program.clone());
    let mut transsys = TranssysInstance::from_program(program);

    if let Some(position) = element.template {
        let copied = contexts
            .get(position)
            .is_some_and(|source| transsys.copy_concentrations_from(source));
        if !copied {
            warn!(
                symbol = element.symbol,
                template = position,
                "template context missing or bound to another program, state not copied"
            );
        }
    }

    for assignment in &element.assignments {
        let value = assignment.value.evaluate(contexts, rng);
        if let Err(e) = transsys.set_concentration(assignment.factor, value) {
            warn!(symbol = element.symbol, error = %e, "assignment skipped");
        }
    }

    SymbolInstance::new(element.symbol, transsys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::LsysBuilder;
    use transsys_core::expr::Expr;
    use transsys_core::program::{Factor, TranssysProgramBuilder};

    fn lsys() -> Arc<Lsys> {
        let mut program = TranssysProgramBuilder::new("cell");
        program.add_factor(Factor::new("m", 0));
        let program = Arc::new(program.freeze().unwrap());

        let mut builder = LsysBuilder::new("axiom");
        let a = builder.add_symbol("a", Some(program));
        let wall = builder.add_symbol("wall", None);
        builder.set_axiom(vec![
            ProductionElement::new(a).assign(0, Expr::value(2.5)),
            ProductionElement::new(wall),
            ProductionElement::new(a),
        ]);
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn axiom_applies_assignments_and_builds_clique() {
        let string = LsysString::axiom(lsys(), &mut RngContext::new(1)).unwrap();
        assert_eq!(string.generation(), 0);
        assert_eq!(string.len(), 3);
        assert_eq!(string.symbol_name(1), Some("wall"));
        assert_eq!(string.symbols()[0].transsys().concentration(0), Some(2.5));
        assert_eq!(string.symbols()[2].transsys().concentration(0), Some(0.0));
        assert_eq!(string.symbols()[1].transsys().num_factors(), 0);
        assert_eq!(string.graph().edge_count(), 3);
        let mut neighbors = string.neighbors(0);
        neighbors.sort_unstable();
        assert_eq!(neighbors, vec![(1, 1), (2, 1)]);
        assert_eq!(string.factor_total("cell", 0), 2.5);
    }

    #[test]
    fn transsys_mut_changes_state_in_place() {
        let mut string = LsysString::axiom(lsys(), &mut RngContext::new(1)).unwrap();
        string.transsys_mut(2).unwrap().set_concentration(0, 4.0).unwrap();
        assert_eq!(string.factor_total("cell", 0), 6.5);
        assert!(string.transsys_mut(9).is_none());
    }
}
