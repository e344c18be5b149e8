//! GRN state of one cell and its per-tick kinetics.
//!
//! Each tick:
//! 1. Every factor decays and is synthesized independently of genes
//! 2. Every gene adds `max(activation - repression, 0)` to its product
//! 3. The next buffer becomes the current one
//!
//! All expressions read the pre-tick concentrations; the new values only
//! become visible after the swap.

use crate::error::{Result, TranssysError};
use crate::program::{PromoterElement, TranssysProgram};
use crate::rng::RngContext;
use crate::types::FactorIndex;
use std::sync::Arc;
use tracing::warn;

/// Concentration vector attached to a program, double-buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct TranssysInstance {
    program: Option<Arc<TranssysProgram>>,
    current: Vec<f64>,
    next: Vec<f64>,
}

/// Saturating regulation term. `km <= 0` saturates immediately.
pub fn michaelis_menten(c: f64, km: f64, max: f64) -> f64 {
    if km <= 0.0 {
        max
    } else {
        max * c / (km + c)
    }
}

impl TranssysInstance {
    /// All concentrations start at zero.
    pub fn new(program: Arc<TranssysProgram>) -> Self {
        let n = program.num_factors();
        Self {
            program: Some(program),
            current: vec![0.0; n],
            next: vec![0.0; n],
        }
    }

    /// State of a symbol that carries no GRN.
    pub fn without_program() -> Self {
        Self {
            program: None,
            current: Vec::new(),
            next: Vec::new(),
        }
    }

    pub fn from_program(program: Option<Arc<TranssysProgram>>) -> Self {
        match program {
            Some(p) => Self::new(p),
            None => Self::without_program(),
        }
    }

    pub fn program(&self) -> Option<&Arc<TranssysProgram>> {
        self.program.as_ref()
    }

    /// Whether both states are bound to the same program object.
    pub fn same_program(&self, other: &TranssysInstance) -> bool {
        match (&self.program, &other.program) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn num_factors(&self) -> usize {
        self.current.len()
    }

    pub fn concentration(&self, factor: FactorIndex) -> Option<f64> {
        self.current.get(factor).copied()
    }

    pub fn concentrations(&self) -> &[f64] {
        &self.current
    }

    pub fn set_concentration(&mut self, factor: FactorIndex, value: f64) -> Result<()> {
        let num_factors = self.current.len();
        let slot = self
            .current
            .get_mut(factor)
            .ok_or(TranssysError::FactorOutOfRange {
                factor,
                num_factors,
            })?;
        *slot = value;
        Ok(())
    }

    /// Add a (possibly negative) amount to one concentration.
    pub fn add_to_concentration(&mut self, factor: FactorIndex, amount: f64) -> Result<()> {
        let num_factors = self.current.len();
        let slot = self
            .current
            .get_mut(factor)
            .ok_or(TranssysError::FactorOutOfRange {
                factor,
                num_factors,
            })?;
        *slot += amount;
        Ok(())
    }

    /// Copy all concentrations from a state of the same program.
    pub fn copy_concentrations_from(&mut self, other: &TranssysInstance) -> bool {
        if !self.same_program(other) {
            return false;
        }
        self.current.copy_from_slice(&other.current);
        true
    }

    /// Advance one tick of GRN kinetics.
    pub fn step(&mut self, rng: &mut RngContext) {
        let Some(program) = self.program.clone() else {
            return;
        };

        let mut next = std::mem::take(&mut self.next);
        next.clear();
        next.resize(self.current.len(), 0.0);

        {
            let contexts = [&*self];

            for (i, factor) in program.factors().iter().enumerate() {
                let decay = factor
                    .decay
                    .as_ref()
                    .map(|e| e.evaluate(&contexts, rng).clamp(0.0, 1.0))
                    .unwrap_or(0.0);
                let synthesis = factor
                    .synthesis
                    .as_ref()
                    .map(|e| e.evaluate(&contexts, rng).max(0.0))
                    .unwrap_or(0.0);
                next[i] = self.current[i] * (1.0 - decay) + synthesis;
            }

            for gene in program.genes() {
                let mut activation = 0.0;
                let mut repression = 0.0;
                for element in &gene.promoter {
                    match element {
                        PromoterElement::Constitutive(rate) => {
                            activation += rate.evaluate(&contexts, rng);
                        }
                        PromoterElement::Activate { factors, km, max } => {
                            let km = km.evaluate(&contexts, rng);
                            let max = max.evaluate(&contexts, rng);
                            activation += michaelis_menten(self.min_bound(factors), km, max);
                        }
                        PromoterElement::Repress { factors, km, max } => {
                            let km = km.evaluate(&contexts, rng);
                            let max = max.evaluate(&contexts, rng);
                            repression += michaelis_menten(self.min_bound(factors), km, max);
                        }
                    }
                }
                match next.get_mut(gene.product) {
                    Some(slot) => *slot += (activation - repression).max(0.0),
                    None => warn!(
                        program = program.name(),
                        gene = %gene.name,
                        product = gene.product,
                        "dropping production of gene with out-of-range product"
                    ),
                }
            }
        }

        self.next = next;
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Run `steps` ticks and return the trajectory, initial state included.
    pub fn time_series(&mut self, steps: usize, rng: &mut RngContext) -> Vec<Vec<f64>> {
        let mut series = Vec::with_capacity(steps + 1);
        series.push(self.current.clone());
        for _ in 0..steps {
            self.step(rng);
            series.push(self.current.clone());
        }
        series
    }

    /// Lowest concentration among the binding factors.
    fn min_bound(&self, factors: &[FactorIndex]) -> f64 {
        factors
            .iter()
            .map(|&f| self.current.get(f).copied().unwrap_or(0.0))
            .fold(f64::INFINITY, f64::min)
    }
}
