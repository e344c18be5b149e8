//! L-system grammar: symbols, axiom and context-sensitive rules.
//!
//! The grammar arrives already resolved: symbols, labels and factors are
//! addressed by index. [`LsysBuilder::build`] checks every cross-reference
//! once, so the rewriting engine can index without further validation.

use std::collections::HashSet;
use std::sync::Arc;

use transsys_core::error::{GrammarError, Result};
use transsys_core::expr::Expr;
use transsys_core::program::TranssysProgram;
use transsys_core::types::{FactorIndex, SymbolIndex};

/// A grammar terminal, optionally carrying a GRN program.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub program: Option<Arc<TranssysProgram>>,
}

impl Symbol {
    pub fn program_name(&self) -> Option<&str> {
        self.program.as_deref().map(TranssysProgram::name)
    }
}

/// One position of a rule's left hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct LhsElement {
    pub symbol: SymbolIndex,
    pub label: Option<String>,
}

impl LhsElement {
    pub fn new(symbol: SymbolIndex) -> Self {
        Self {
            symbol,
            label: None,
        }
    }

    pub fn labeled(symbol: SymbolIndex, label: impl Into<String>) -> Self {
        Self {
            symbol,
            label: Some(label.into()),
        }
    }
}

/// Direct assignment of one factor of a newly produced symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub factor: FactorIndex,
    pub value: Expr,
}

/// One symbol produced by a rule (or by the axiom).
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionElement {
    pub symbol: SymbolIndex,
    /// Left hand side position whose state is copied wholesale.
    pub template: Option<usize>,
    pub assignments: Vec<Assignment>,
}

impl ProductionElement {
    pub fn new(symbol: SymbolIndex) -> Self {
        Self {
            symbol,
            template: None,
            assignments: Vec::new(),
        }
    }

    pub fn with_template(mut self, lhs_position: usize) -> Self {
        self.template = Some(lhs_position);
        self
    }

    pub fn assign(mut self, factor: FactorIndex, value: Expr) -> Self {
        self.assignments.push(Assignment { factor, value });
        self
    }
}

/// A rewriting rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub lhs: Vec<LhsElement>,
    pub condition: Option<Expr>,
    pub rhs: Vec<ProductionElement>,
}

impl Rule {
    pub fn new(name: impl Into<String>, lhs: Vec<LhsElement>, rhs: Vec<ProductionElement>) -> Self {
        Self {
            name: name.into(),
            lhs,
            condition: None,
            rhs,
        }
    }

    pub fn with_condition(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Position of a labeled left hand side element.
    pub fn label_position(&self, label: &str) -> Option<usize> {
        self.lhs
            .iter()
            .position(|e| e.label.as_deref() == Some(label))
    }

    /// Whether the rule's symbol sequence matches `window` from its start.
    pub fn matches_symbols(&self, window: impl IntoIterator<Item = SymbolIndex>) -> bool {
        let mut window = window.into_iter();
        self.lhs
            .iter()
            .all(|e| window.next() == Some(e.symbol))
    }
}

/// A validated L-system grammar.
#[derive(Debug, Clone)]
pub struct Lsys {
    name: String,
    symbols: Vec<Symbol>,
    axiom: Vec<ProductionElement>,
    rules: Vec<Rule>,
    diffusion_range: u32,
}

impl Lsys {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn symbol(&self, index: SymbolIndex) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    pub fn symbol_index(&self, name: &str) -> Option<SymbolIndex> {
        self.symbols.iter().position(|s| s.name == name)
    }

    pub fn axiom(&self) -> &[ProductionElement] {
        &self.axiom
    }

    /// Rules in declaration order, which is also their priority order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Largest contact distance kept when deriving a new generation.
    pub fn diffusion_range(&self) -> u32 {
        self.diffusion_range
    }

    /// Distinct programs referenced by the symbol table, in first-use order.
    pub fn programs(&self) -> Vec<Arc<TranssysProgram>> {
        let mut programs: Vec<Arc<TranssysProgram>> = Vec::new();
        for program in self.symbols.iter().filter_map(|s| s.program.as_ref()) {
            if !programs.iter().any(|p| Arc::ptr_eq(p, program)) {
                programs.push(Arc::clone(program));
            }
        }
        programs
    }
}

/// Build-phase container for an [`Lsys`].
#[derive(Debug, Clone, Default)]
pub struct LsysBuilder {
    name: String,
    symbols: Vec<Symbol>,
    axiom: Vec<ProductionElement>,
    rules: Vec<Rule>,
    diffusion_range: u32,
}

impl LsysBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a symbol and return its index.
    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        program: Option<Arc<TranssysProgram>>,
    ) -> SymbolIndex {
        self.symbols.push(Symbol {
            name: name.into(),
            program,
        });
        self.symbols.len() - 1
    }

    pub fn set_axiom(&mut self, axiom: Vec<ProductionElement>) -> &mut Self {
        self.axiom = axiom;
        self
    }

    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn diffusion_range(&mut self, range: u32) -> &mut Self {
        self.diffusion_range = range;
        self
    }

    /// Validate all cross-references and freeze the grammar.
    pub fn build(self) -> Result<Lsys> {
        let mut names = HashSet::new();
        for symbol in &self.symbols {
            if !names.insert(symbol.name.as_str()) {
                return Err(GrammarError::DuplicateSymbol(symbol.name.clone()).into());
            }
        }

        for (i, element) in self.axiom.iter().enumerate() {
            if element.template.is_some() {
                return Err(GrammarError::TemplateInAxiom(i).into());
            }
            self.check_production(element, "axiom")?;
            check_contexts(element.assignments.iter().map(|a| &a.value), 0, "axiom")?;
        }

        for rule in &self.rules {
            self.check_rule(rule)?;
        }

        Ok(Lsys {
            name: self.name,
            symbols: self.symbols,
            axiom: self.axiom,
            rules: self.rules,
            diffusion_range: self.diffusion_range,
        })
    }

    fn symbol(&self, index: SymbolIndex, context: &str) -> Result<&Symbol> {
        self.symbols.get(index).ok_or_else(|| {
            GrammarError::UnknownSymbol {
                index,
                context: context.to_string(),
            }
            .into()
        })
    }

    fn check_rule(&self, rule: &Rule) -> Result<()> {
        let context = format!("rule {}", rule.name);
        if rule.lhs.is_empty() {
            return Err(GrammarError::EmptyLhs(rule.name.clone()).into());
        }

        let mut labels = HashSet::new();
        for element in &rule.lhs {
            self.symbol(element.symbol, &context)?;
            if let Some(label) = &element.label {
                if !labels.insert(label.as_str()) {
                    return Err(GrammarError::DuplicateLabel {
                        rule: rule.name.clone(),
                        label: label.clone(),
                    }
                    .into());
                }
            }
        }

        let available = rule.lhs.len();
        check_contexts(rule.condition.iter(), available, &context)?;

        for element in &rule.rhs {
            let target = self.check_production(element, &context)?;
            check_contexts(element.assignments.iter().map(|a| &a.value), available, &context)?;
            let Some(position) = element.template else {
                continue;
            };
            let lhs = rule.lhs.get(position).ok_or_else(|| GrammarError::TemplateOutOfRange {
                rule: rule.name.clone(),
                position,
                lhs_len: rule.lhs.len(),
            })?;
            let template = self.symbol(lhs.symbol, &context)?;
            let same = match (&template.program, &target.program) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            };
            if !same {
                return Err(GrammarError::TemplateProgramMismatch {
                    rule: rule.name.clone(),
                    template: template.name.clone(),
                    target: target.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_production(&self, element: &ProductionElement, context: &str) -> Result<&Symbol> {
        let target = self.symbol(element.symbol, context)?;
        if element.assignments.is_empty() {
            return Ok(target);
        }
        let Some(program) = &target.program else {
            return Err(GrammarError::AssignmentWithoutProgram {
                context: context.to_string(),
                symbol: target.name.clone(),
            }
            .into());
        };
        for assignment in &element.assignments {
            if assignment.factor >= program.num_factors() {
                return Err(GrammarError::AssignmentOutOfRange {
                    context: context.to_string(),
                    symbol: target.name.clone(),
                    factor: assignment.factor,
                }
                .into());
            }
        }
        Ok(target)
    }
}

/// Reject expressions reading a context index `>= available`.
fn check_contexts<'a>(
    exprs: impl IntoIterator<Item = &'a Expr>,
    available: usize,
    context: &str,
) -> Result<()> {
    for expr in exprs {
        if let Some(index) = expr.max_context().filter(|&index| index >= available) {
            return Err(GrammarError::ContextOutOfRange {
                context: context.to_string(),
                index,
                available,
            }
            .into());
        }
    }
    Ok(())
}
