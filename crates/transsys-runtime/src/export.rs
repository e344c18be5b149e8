//! Generation snapshots: serializable view of one string.
//!
//! A snapshot lists every symbol in string order with its program and
//! concentrations, plus the contact edges, and converts to JSON for
//! downstream analysis.

use serde::{Deserialize, Serialize};
use transsys_core::error::Result;
use transsys_core::types::Generation;

use crate::lsys_string::LsysString;

/// State of one symbol instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub program: Option<String>,
    pub concentrations: Vec<f64>,
}

/// One contact edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub i1: usize,
    pub i2: usize,
    pub distance: u32,
}

/// A complete serializable snapshot of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSnapshot {
    pub generation: Generation,
    pub symbols: Vec<SymbolSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

/// Sum of one factor over all symbols of a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorTotal {
    pub program: String,
    pub factor: String,
    pub total: f64,
}

impl GenerationSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Capture the current state of a string.
pub fn snapshot(string: &LsysString) -> GenerationSnapshot {
    let symbols = string
        .symbols()
        .iter()
        .enumerate()
        .map(|(i, s)| SymbolSnapshot {
            symbol: string.symbol_name(i).unwrap_or("?").to_string(),
            program: string
                .lsys()
                .symbol(s.symbol())
                .and_then(|symbol| symbol.program_name())
                .map(str::to_string),
            concentrations: s.transsys().concentrations().to_vec(),
        })
        .collect();

    let edges = string
        .graph()
        .edges()
        .map(|(i1, i2, distance)| EdgeSnapshot { i1, i2, distance })
        .collect();

    GenerationSnapshot {
        generation: string.generation(),
        symbols,
        edges,
    }
}

/// Totals of every factor of every program used by the grammar, in program
/// then factor order.
pub fn factor_totals(string: &LsysString) -> Vec<FactorTotal> {
    let mut totals = Vec::new();
    for program in string.lsys().programs() {
        for (index, factor) in program.factors().iter().enumerate() {
            totals.push(FactorTotal {
                program: program.name().to_string(),
                factor: factor.name.clone(),
                total: string.factor_total(program.name(), index),
            });
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{LsysBuilder, ProductionElement};
    use std::sync::Arc;
    use transsys_core::expr::Expr;
    use transsys_core::program::{Factor, TranssysProgramBuilder};
    use transsys_core::rng::RngContext;

    fn string() -> LsysString {
        let mut program = TranssysProgramBuilder::new("cell");
        program
            .add_factor(Factor::new("m", 0))
            .add_factor(Factor::new("n", 1));
        let program = Arc::new(program.freeze().unwrap());

        let mut builder = LsysBuilder::new("snap");
        let a = builder.add_symbol("a", Some(program));
        let wall = builder.add_symbol("wall", None);
        builder.set_axiom(vec![
            ProductionElement::new(a).assign(0, Expr::value(1.5)),
            ProductionElement::new(wall),
            ProductionElement::new(a).assign(0, Expr::value(2.0)).assign(1, Expr::value(4.0)),
        ]);
        LsysString::axiom(Arc::new(builder.build().unwrap()), &mut RngContext::new(1)).unwrap()
    }

    #[test]
    fn snapshot_lists_symbols_and_edges_in_order() {
        let snap = snapshot(&string());
        assert_eq!(snap.generation, 0);
        assert_eq!(snap.symbols.len(), 3);
        assert_eq!(snap.symbols[0].symbol, "a");
        assert_eq!(snap.symbols[0].program.as_deref(), Some("cell"));
        assert_eq!(snap.symbols[1].program, None);
        assert!(snap.symbols[1].concentrations.is_empty());
        assert_eq!(snap.symbols[2].concentrations, vec![2.0, 4.0]);
        assert_eq!(
            snap.edges,
            vec![
                EdgeSnapshot { i1: 0, i2: 1, distance: 1 },
                EdgeSnapshot { i1: 0, i2: 2, distance: 1 },
                EdgeSnapshot { i1: 1, i2: 2, distance: 1 },
            ]
        );
    }

    #[test]
    fn json_round_trip() {
        let snap = snapshot(&string());
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"wall\""));
        assert_eq!(GenerationSnapshot::from_json(&json).unwrap(), snap);
    }

    #[test]
    fn totals_per_program_and_factor() {
        let totals = factor_totals(&string());
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].factor, "m");
        assert!((totals[0].total - 3.5).abs() < 1e-12);
        assert_eq!(totals[1].factor, "n");
        assert!((totals[1].total - 4.0).abs() < 1e-12);
    }
}
