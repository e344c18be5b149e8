//! transsys Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use transsys_core::prelude::*;
//! ```

pub use crate::types::{FactorIndex, GeneIndex, Generation, SymbolIndex};

pub use crate::expr::{BinaryOp, Expr, UnaryOp};

pub use crate::program::{Factor, Gene, PromoterElement, TranssysProgram, TranssysProgramBuilder};

pub use crate::instance::{michaelis_menten, TranssysInstance};

pub use crate::rng::RngContext;

pub use crate::error::{
    ConfigError, GrammarError, GraphError, ProgramError, Result, TranssysError,
};
