//! GRN programs: factors, genes and their promoters.
//!
//! A program is assembled with [`TranssysProgramBuilder`] in any order and
//! then frozen. Freezing consumes the builder, sorts factors and genes by
//! their declared index and checks the result, so a [`TranssysProgram`] is
//! always an immutable, densely indexed table that simulation code can
//! address by position.

use crate::error::{ProgramError, Result};
use crate::expr::Expr;
use crate::types::{FactorIndex, GeneIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// A regulated, possibly diffusible substance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub index: FactorIndex,
    /// Fraction lost per tick, clamped to `[0, 1]`.
    pub decay: Option<Expr>,
    /// Fraction exchanged with contact neighbors per tick, clamped to `[0, 1]`.
    pub diffusibility: Option<Expr>,
    /// Amount produced per tick independent of genes, clamped to `[0, inf)`.
    pub synthesis: Option<Expr>,
}

impl Factor {
    pub fn new(name: impl Into<String>, index: FactorIndex) -> Self {
        Self {
            name: name.into(),
            index,
            decay: None,
            diffusibility: None,
            synthesis: None,
        }
    }

    pub fn with_decay(mut self, decay: Expr) -> Self {
        self.decay = Some(decay);
        self
    }

    pub fn with_diffusibility(mut self, diffusibility: Expr) -> Self {
        self.diffusibility = Some(diffusibility);
        self
    }

    pub fn with_synthesis(mut self, synthesis: Expr) -> Self {
        self.synthesis = Some(synthesis);
        self
    }
}

/// One element of a gene's promoter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PromoterElement {
    /// Unconditional production at the evaluated rate.
    Constitutive(Expr),
    /// Michaelis-Menten activation by the least abundant binding factor.
    Activate {
        factors: Vec<FactorIndex>,
        km: Expr,
        max: Expr,
    },
    /// Michaelis-Menten repression by the least abundant binding factor.
    Repress {
        factors: Vec<FactorIndex>,
        km: Expr,
        max: Expr,
    },
}

impl PromoterElement {
    pub fn constitutive(rate: Expr) -> Self {
        PromoterElement::Constitutive(rate)
    }

    pub fn activate(factors: Vec<FactorIndex>, km: Expr, max: Expr) -> Self {
        PromoterElement::Activate { factors, km, max }
    }

    pub fn repress(factors: Vec<FactorIndex>, km: Expr, max: Expr) -> Self {
        PromoterElement::Repress { factors, km, max }
    }

    /// Binding factors of a regulated element; empty for constitutive ones.
    pub fn binding_factors(&self) -> &[FactorIndex] {
        match self {
            PromoterElement::Constitutive(_) => &[],
            PromoterElement::Activate { factors, .. } | PromoterElement::Repress { factors, .. } => {
                factors.as_slice()
            }
        }
    }
}

/// A gene: a promoter driving production of one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub name: String,
    pub index: GeneIndex,
    pub promoter: Vec<PromoterElement>,
    pub product: FactorIndex,
}

impl Gene {
    pub fn new(name: impl Into<String>, index: GeneIndex, product: FactorIndex) -> Self {
        Self {
            name: name.into(),
            index,
            promoter: Vec::new(),
            product,
        }
    }

    pub fn with_promoter(mut self, element: PromoterElement) -> Self {
        self.promoter.push(element);
        self
    }
}

/// Mutable build-phase container for a program.
#[derive(Debug, Clone, Default)]
pub struct TranssysProgramBuilder {
    name: String,
    factors: Vec<Factor>,
    genes: Vec<Gene>,
}

impl TranssysProgramBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factors: Vec::new(),
            genes: Vec::new(),
        }
    }

    pub fn add_factor(&mut self, factor: Factor) -> &mut Self {
        self.factors.push(factor);
        self
    }

    pub fn add_gene(&mut self, gene: Gene) -> &mut Self {
        self.genes.push(gene);
        self
    }

    /// Look up a factor declared so far.
    pub fn factor_index(&self, name: &str) -> Option<FactorIndex> {
        self.factors.iter().find(|f| f.name == name).map(|f| f.index)
    }

    /// Sort, validate and convert into an immutable program.
    pub fn freeze(self) -> Result<TranssysProgram> {
        let TranssysProgramBuilder {
            name,
            mut factors,
            mut genes,
        } = self;

        factors.sort_by_key(|f| f.index);
        genes.sort_by_key(|g| g.index);

        check_dense(&name, "factor", factors.iter().map(|f| f.index))?;
        check_dense(&name, "gene", genes.iter().map(|g| g.index))?;
        check_unique(&name, factors.iter().map(|f| f.name.as_str()))?;
        check_unique(&name, genes.iter().map(|g| g.name.as_str()))?;

        let num_factors = factors.len();
        for gene in &genes {
            for element in &gene.promoter {
                if matches!(element, PromoterElement::Constitutive(_)) {
                    continue;
                }
                let binding = element.binding_factors();
                if binding.is_empty() {
                    return Err(ProgramError::EmptyBindingSet {
                        gene: gene.name.clone(),
                    }
                    .into());
                }
                if let Some(&factor) = binding.iter().find(|&&f| f >= num_factors) {
                    return Err(ProgramError::FactorOutOfRange {
                        gene: gene.name.clone(),
                        factor,
                        num_factors,
                    }
                    .into());
                }
            }
            if gene.product >= num_factors {
                // Tolerated: the gene simply never contributes.
                warn!(
                    program = %name,
                    gene = %gene.name,
                    product = gene.product,
                    num_factors,
                    "gene product outside the factor table"
                );
            }
        }

        Ok(TranssysProgram {
            name,
            factors,
            genes,
        })
    }
}

fn check_dense(
    program: &str,
    kind: &'static str,
    indices: impl Iterator<Item = usize>,
) -> Result<()> {
    for (expected, found) in indices.enumerate() {
        if expected != found {
            return Err(ProgramError::IndexGap {
                program: program.to_string(),
                kind,
                expected,
                found,
            }
            .into());
        }
    }
    Ok(())
}

fn check_unique<'a>(program: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ProgramError::DuplicateName {
                program: program.to_string(),
                name: name.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// A frozen GRN program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranssysProgram {
    name: String,
    factors: Vec<Factor>,
    genes: Vec<Gene>,
}

impl TranssysProgram {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn factor(&self, index: FactorIndex) -> Option<&Factor> {
        self.factors.get(index)
    }

    pub fn factor_index(&self, name: &str) -> Option<FactorIndex> {
        self.factors.iter().position(|f| f.name == name)
    }

    pub fn gene_index(&self, name: &str) -> Option<GeneIndex> {
        self.genes.iter().position(|g| g.name == name)
    }

    /// Serialize the program (factors, genes and their expressions) to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
