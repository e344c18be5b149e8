//! Shared index types.

/// Position of a factor in its program's factor table.
pub type FactorIndex = usize;

/// Position of a gene in its program's gene table.
pub type GeneIndex = usize;

/// Position of a symbol in a grammar's symbol table.
pub type SymbolIndex = usize;

/// Generation counter of a derived string (the axiom is generation 0).
pub type Generation = u64;
