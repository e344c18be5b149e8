//! transsys Runtime Prelude: convenient imports for common usage.
//!
//! ```rust
//! use transsys_runtime::prelude::*;
//! ```

// Re-export grammar
pub use crate::grammar::{Assignment, LhsElement, Lsys, LsysBuilder, ProductionElement, Rule, Symbol};

// Re-export strings and contact graphs
pub use crate::lsys_string::{LsysString, SymbolInstance};
pub use crate::contact_graph::{group_contacts, ContactGraph, EdgeHandle, GroupContact};

// Re-export driver
pub use crate::config::SimulationConfig;
pub use crate::organism::{Organism, OrganismStats};

// Re-export snapshots
pub use crate::export::{
    factor_totals, snapshot, EdgeSnapshot, FactorTotal, GenerationSnapshot, SymbolSnapshot,
};
