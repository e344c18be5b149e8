//! # transsys Core
//!
//! Gene regulatory network (GRN) programs and their kinetics.
//!
//! This crate holds everything that concerns a single cell's regulatory
//! state, independent of any L-system:
//!
//! - **Expressions** - resolved arithmetic/logical trees with random draws
//! - **Programs** - factors and genes, built freely and frozen once
//! - **Instances** - double-buffered concentration vectors advanced by
//!   decay, synthesis and Michaelis-Menten promoter kinetics
//! - **RNG context** - the seeded generator every evaluation draws from
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use transsys_core::prelude::*;
//!
//! let mut builder = TranssysProgramBuilder::new("toggle");
//! builder
//!     .add_factor(Factor::new("a", 0).with_decay(Expr::value(0.1)))
//!     .add_gene(Gene::new("ga", 0, 0).with_promoter(PromoterElement::constitutive(Expr::value(1.0))));
//! let program = Arc::new(builder.freeze().unwrap());
//!
//! let mut cell = TranssysInstance::new(program);
//! let mut rng = RngContext::new(42);
//! cell.step(&mut rng);
//! assert_eq!(cell.concentration(0), Some(1.0));
//! ```

pub mod error;
pub mod types;
pub mod rng;
pub mod expr;
pub mod program;
pub mod instance;
pub mod prelude;
