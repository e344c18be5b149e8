//! # transsys
//!
//! Gene regulatory networks embedded in growing L-system organisms.
//!
//! Every symbol of an L-system string may carry a transcription factor
//! network. Between derivations the networks express genes, and factors
//! diffuse along a contact graph that is re-derived with every generation
//! from which predecessor produced which successor.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use transsys::prelude::*;
//!
//! // A cell whose morphogen decays and diffuses
//! let mut program = TranssysProgramBuilder::new("cell");
//! program
//!     .add_factor(
//!         Factor::new("morphogen", 0)
//!             .with_decay(Expr::value(0.1))
//!             .with_diffusibility(Expr::value(0.3)),
//!     )
//!     .add_gene(Gene::new("gm", 0, 0).with_promoter(PromoterElement::constitutive(Expr::value(1.0))));
//! let program = Arc::new(program.freeze().unwrap());
//!
//! // A filament that grows at its apex
//! let mut grammar = LsysBuilder::new("filament");
//! let apex = grammar.add_symbol("apex", Some(program.clone()));
//! let cell = grammar.add_symbol("cell", Some(program));
//! grammar
//!     .set_axiom(vec![ProductionElement::new(apex)])
//!     .add_rule(Rule::new(
//!         "grow",
//!         vec![LhsElement::new(apex)],
//!         vec![ProductionElement::new(cell).with_template(0), ProductionElement::new(apex)],
//!     ))
//!     .diffusion_range(2);
//!
//! let config = SimulationConfig { timesteps_per_derivation: 4, ..SimulationConfig::default() };
//! let mut organism = Organism::new(Arc::new(grammar.build().unwrap()), config).unwrap();
//! let snapshots = organism.run(5).unwrap();
//!
//! assert_eq!(snapshots[4].symbols.len(), 6);
//! println!("{}", snapshots[4].to_json().unwrap());
//! ```
//!
//! ## Architecture
//!
//! - [`transsys_core`] - Expressions, GRN programs, per-cell kinetics, errors
//! - [`transsys_runtime`] - Grammars, strings, contact graphs, rewriting,
//!   diffusion and the organism driver
//!
//! ## Key Concepts
//!
//! ### One generation
//!
//! | Phase | What It Does |
//! |-------|--------------|
//! | Expression | Decay, synthesis and promoter kinetics in every symbol |
//! | Diffusion | Factor exchange between same-program contact neighbors |
//! | Derivation | Context-sensitive rewriting, first matching rule wins |
//! | Contact graph | Siblings touch at 1, group contacts widen by successor distance |
//!
//! ### Determinism
//!
//! All random draws come from one seeded [`RngContext`](transsys_core::rng::RngContext)
//! per organism. The same grammar, configuration and seed reproduce the same
//! snapshots.

// Re-export all subcrates
pub use transsys_core as core;
pub use transsys_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use transsys::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use transsys_core::types::{FactorIndex, GeneIndex, Generation, SymbolIndex};
    pub use transsys_core::expr::{BinaryOp, Expr, UnaryOp};
    pub use transsys_core::program::{
        Factor, Gene, PromoterElement, TranssysProgram, TranssysProgramBuilder,
    };
    pub use transsys_core::instance::{michaelis_menten, TranssysInstance};
    pub use transsys_core::rng::RngContext;

    // Error types
    pub use transsys_core::error::{
        ConfigError, GrammarError, GraphError, ProgramError, Result, TranssysError,
    };

    // Runtime
    pub use transsys_runtime::prelude::*;
}
