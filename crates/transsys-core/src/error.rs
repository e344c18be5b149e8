//! Error types for transsys operations.
//!
//! Builders and the simulation engine report structured errors instead of
//! panicking. Run-time degradations that the engine tolerates (an identifier
//! pointing past a concentration vector, a gene whose product does not exist)
//! are not errors; they are logged with `tracing::warn!` and contribute zero.

use thiserror::Error;

/// Result type for transsys operations.
pub type Result<T> = std::result::Result<T, TranssysError>;

/// Errors that can occur while building or simulating a transsys model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranssysError {
    /// A GRN program failed validation at freeze time.
    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    /// A grammar failed validation, or a derivation violated a grammar limit.
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    /// A contact graph does not fit the string it belongs to.
    #[error("Contact graph error: {0}")]
    Graph(#[from] GraphError),

    /// Configuration errors.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A factor index beyond a state's concentration vector.
    #[error("Factor {factor} out of range ({num_factors} factors)")]
    FactorOutOfRange { factor: usize, num_factors: usize },

    /// Memory for a new generation could not be reserved.
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TranssysError {
    fn from(e: serde_json::Error) -> Self {
        TranssysError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for TranssysError {
    fn from(e: toml::de::Error) -> Self {
        TranssysError::Serialization(e.to_string())
    }
}

impl From<toml::ser::Error> for TranssysError {
    fn from(e: toml::ser::Error) -> Self {
        TranssysError::Serialization(e.to_string())
    }
}

impl From<std::collections::TryReserveError> for TranssysError {
    fn from(e: std::collections::TryReserveError) -> Self {
        TranssysError::Allocation(e.to_string())
    }
}

/// Errors raised when freezing a GRN program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// Two factors or two genes share a name.
    #[error("Duplicate name in program {program}: {name}")]
    DuplicateName { program: String, name: String },

    /// Factor or gene indices are not dense `0..n` after sorting.
    #[error("Index gap in program {program}: expected {kind} index {expected}, found {found}")]
    IndexGap {
        program: String,
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    /// An activate/repress element without binding factors.
    #[error("Gene {gene} has a regulated promoter element without binding factors")]
    EmptyBindingSet { gene: String },

    /// A binding factor index beyond the factor table.
    #[error("Gene {gene} binds factor {factor}, but the program has {num_factors} factors")]
    FactorOutOfRange {
        gene: String,
        factor: usize,
        num_factors: usize,
    },
}

/// Errors raised when building a grammar or deriving from it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Two symbols share a name.
    #[error("Duplicate symbol: {0}")]
    DuplicateSymbol(String),

    /// A symbol index beyond the symbol table.
    #[error("Unknown symbol index {index} in {context}")]
    UnknownSymbol { index: usize, context: String },

    /// A rule whose left hand side is empty.
    #[error("Rule {0} has an empty left hand side")]
    EmptyLhs(String),

    /// Two left hand side elements of one rule carry the same label.
    #[error("Rule {rule} uses label {label} more than once")]
    DuplicateLabel { rule: String, label: String },

    /// A template position beyond the rule's left hand side.
    #[error("Rule {rule} names template position {position}, but its lhs has {lhs_len} elements")]
    TemplateOutOfRange {
        rule: String,
        position: usize,
        lhs_len: usize,
    },

    /// A template whose program differs from the target symbol's program.
    #[error("Rule {rule}: template symbol {template} and target symbol {target} use different programs")]
    TemplateProgramMismatch {
        rule: String,
        template: String,
        target: String,
    },

    /// A template in the axiom, which has no left hand side to copy from.
    #[error("Axiom element {0} names a template")]
    TemplateInAxiom(usize),

    /// An assignment to a symbol without a program.
    #[error("{context}: symbol {symbol} has no program to assign to")]
    AssignmentWithoutProgram { context: String, symbol: String },

    /// An assignment to a factor beyond the target program's factor table.
    #[error("{context}: factor {factor} out of range for symbol {symbol}")]
    AssignmentOutOfRange {
        context: String,
        symbol: String,
        factor: usize,
    },

    /// An expression reading a context beyond the available left hand side
    /// positions (the axiom has none).
    #[error("{context}: expression reads context {index}, only {available} available")]
    ContextOutOfRange {
        context: String,
        index: usize,
        available: usize,
    },

    /// A derived generation longer than the configured maximum.
    #[error("Derived string has {length} symbols, limit is {limit}")]
    StringTooLong { length: usize, limit: usize },
}

/// Contact graph precondition violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The graph does not describe the string it is attached to.
    #[error("Malformed contact graph: {0}")]
    Malformed(String),

    /// A node or edge count beyond the graph's index space.
    #[error("Contact graph too large: {0} nodes or edges")]
    TooLarge(usize),
}

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid value.
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Out of range.
    #[error("{field} out of range: {value} (must be {min}-{max})")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
}

// Convenience constructors
impl TranssysError {
    pub fn malformed_graph(msg: impl Into<String>) -> Self {
        TranssysError::Graph(GraphError::Malformed(msg.into()))
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TranssysError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }
}
