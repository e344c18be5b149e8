//! # transsys Runtime
//!
//! L-system derivation, contact graphs and diffusion.
//!
//! The runtime is the "organism": it rewrites a string of symbol instances
//! generation by generation, keeps track of which instances touch each
//! other, and lets transcription factors flow between contacting cells.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use transsys_core::prelude::*;
//! use transsys_runtime::prelude::*;
//!
//! let mut program = TranssysProgramBuilder::new("cell");
//! program.add_factor(Factor::new("m", 0).with_diffusibility(Expr::value(0.5)));
//! let program = Arc::new(program.freeze().unwrap());
//!
//! let mut grammar = LsysBuilder::new("growth");
//! let cell = grammar.add_symbol("cell", Some(program));
//! grammar
//!     .set_axiom(vec![ProductionElement::new(cell).assign(0, Expr::value(1.0))])
//!     .add_rule(Rule::new(
//!         "divide",
//!         vec![LhsElement::new(cell)],
//!         vec![ProductionElement::new(cell).with_template(0), ProductionElement::new(cell)],
//!     ))
//!     .diffusion_range(2);
//!
//! let mut organism = Organism::new(Arc::new(grammar.build().unwrap()), SimulationConfig::default()).unwrap();
//! let snapshots = organism.run(3).unwrap();
//! assert_eq!(snapshots[2].symbols.len(), 8);
//! ```

pub mod grammar;
pub mod lsys_string;
pub mod contact_graph;
pub mod rewriting;
pub mod diffusion;
pub mod config;
pub mod export;
pub mod organism;
pub mod prelude;
