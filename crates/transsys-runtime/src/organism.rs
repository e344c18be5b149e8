//! Organism: drives one grammar through successive generations.
//!
//! Each [`Organism::step`] runs `timesteps_per_derivation` ticks of gene
//! expression (each followed by diffusion unless disabled) and then derives
//! the next generation. A failed derivation leaves the current generation in
//! place.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use transsys_core::error::Result;
use transsys_core::rng::RngContext;
use transsys_core::types::Generation;

use crate::config::SimulationConfig;
use crate::export::{self, GenerationSnapshot};
use crate::grammar::Lsys;
use crate::lsys_string::LsysString;

/// Statistics about the organism.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganismStats {
    pub generation: Generation,
    /// Expression ticks run since the axiom.
    pub time: u64,
    pub symbols: usize,
    pub symbols_with_program: usize,
    pub contact_edges: usize,
    pub derivations_failed: usize,
}

/// A growing organism: the current generation plus its run state.
pub struct Organism {
    string: LsysString,
    config: SimulationConfig,
    rng: RngContext,
    time: u64,
    derivations_failed: usize,
}

impl Organism {
    /// Validate the config and instantiate the axiom as generation 0.
    pub fn new(lsys: Arc<Lsys>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = RngContext::new(config.rng_seed);
        let string = LsysString::axiom(lsys, &mut rng)?;
        info!(
            lsys = string.lsys().name(),
            symbols = string.len(),
            seed = config.rng_seed,
            "organism created"
        );
        Ok(Self {
            string,
            config,
            rng,
            time: 0,
            derivations_failed: 0,
        })
    }

    pub fn string(&self) -> &LsysString {
        &self.string
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn generation(&self) -> Generation {
        self.string.generation()
    }

    /// One tick of gene expression in every symbol.
    pub fn expression_step(&mut self) {
        self.string.expression_step(&mut self.rng);
        self.time += 1;
    }

    pub fn diffusion_step(&mut self) -> Result<()> {
        self.string.diffusion_step(&mut self.rng)
    }

    /// Replace the current generation with its derivation.
    pub fn derivation_step(&mut self) -> Result<()> {
        match self
            .string
            .derive_with_limit(&mut self.rng, self.config.max_string_length)
        {
            Ok(next) => {
                self.string = next;
                Ok(())
            }
            Err(e) => {
                self.derivations_failed += 1;
                warn!(
                    generation = self.string.generation(),
                    error = %e,
                    "derivation failed, keeping current generation"
                );
                Err(e)
            }
        }
    }

    /// Expression and diffusion ticks followed by one derivation.
    pub fn step(&mut self) -> Result<GenerationSnapshot> {
        for _ in 0..self.config.timesteps_per_derivation {
            self.expression_step();
            if self.config.diffusion {
                self.diffusion_step()?;
            }
        }
        self.derivation_step()?;

        info!(
            generation = self.string.generation(),
            symbols = self.string.len(),
            edges = self.string.graph().edge_count(),
            "generation complete"
        );
        Ok(self.snapshot())
    }

    /// Run `generations` steps and return the snapshot of each new generation.
    pub fn run(&mut self, generations: usize) -> Result<Vec<GenerationSnapshot>> {
        let mut snapshots = Vec::with_capacity(generations);
        for _ in 0..generations {
            snapshots.push(self.step()?);
        }
        Ok(snapshots)
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        export::snapshot(&self.string)
    }

    pub fn stats(&self) -> OrganismStats {
        OrganismStats {
            generation: self.string.generation(),
            time: self.time,
            symbols: self.string.len(),
            symbols_with_program: self
                .string
                .symbols()
                .iter()
                .filter(|s| s.transsys().program().is_some())
                .count(),
            contact_edges: self.string.graph().edge_count(),
            derivations_failed: self.derivations_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{LhsElement, LsysBuilder, ProductionElement, Rule};
    use transsys_core::error::{ConfigError, GrammarError, TranssysError};
    use transsys_core::expr::{BinaryOp, Expr};
    use transsys_core::program::{Factor, Gene, PromoterElement, TranssysProgramBuilder};

    /// Cells accumulate `m`; a cell divides once `m` reaches 2.
    fn dividing_cells() -> Arc<Lsys> {
        let mut program = TranssysProgramBuilder::new("cell");
        program
            .add_factor(Factor::new("m", 0))
            .add_gene(Gene::new("gm", 0, 0).with_promoter(PromoterElement::constitutive(Expr::value(1.0))));
        let program = Arc::new(program.freeze().unwrap());

        let mut builder = LsysBuilder::new("division");
        let cell = builder.add_symbol("cell", Some(program));
        builder
            .set_axiom(vec![ProductionElement::new(cell)])
            .add_rule(
                Rule::new(
                    "divide",
                    vec![LhsElement::new(cell)],
                    vec![ProductionElement::new(cell), ProductionElement::new(cell)],
                )
                .with_condition(Expr::binary(BinaryOp::Ge, Expr::factor(0), Expr::value(2.0))),
            )
            .diffusion_range(1);
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn cells_divide_when_condition_is_met() {
        let mut organism = Organism::new(dividing_cells(), SimulationConfig::default()).unwrap();
        let first = organism.step().unwrap();
        assert_eq!(first.generation, 1);
        assert_eq!(first.symbols.len(), 1);
        assert_eq!(first.symbols[0].concentrations, vec![1.0]);

        let second = organism.step().unwrap();
        assert_eq!(second.symbols.len(), 2);
        // daughters start from zero
        assert!(second.symbols.iter().all(|s| s.concentrations == vec![0.0]));
        assert_eq!(second.edges.len(), 1);

        let stats = organism.stats();
        assert_eq!(stats.generation, 2);
        assert_eq!(stats.time, 2);
        assert_eq!(stats.symbols, 2);
        assert_eq!(stats.symbols_with_program, 2);
        assert_eq!(stats.contact_edges, 1);
    }

    #[test]
    fn timesteps_per_derivation_controls_expression() {
        let config = SimulationConfig {
            timesteps_per_derivation: 3,
            ..SimulationConfig::default()
        };
        let mut organism = Organism::new(dividing_cells(), config).unwrap();
        let snapshots = organism.run(1).unwrap();
        assert_eq!(snapshots[0].symbols.len(), 2);
        assert_eq!(organism.stats().time, 3);
    }

    #[test]
    fn failed_derivation_keeps_generation() {
        let config = SimulationConfig {
            timesteps_per_derivation: 2,
            max_string_length: Some(1),
            ..SimulationConfig::default()
        };
        let mut organism = Organism::new(dividing_cells(), config).unwrap();
        let err = organism.step().unwrap_err();
        assert!(matches!(
            err,
            TranssysError::Grammar(GrammarError::StringTooLong { length: 2, limit: 1 })
        ));
        assert_eq!(organism.generation(), 0);
        assert_eq!(organism.string().len(), 1);
        assert_eq!(organism.stats().derivations_failed, 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulationConfig {
            timesteps_per_derivation: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            Organism::new(dividing_cells(), config),
            Err(TranssysError::Config(ConfigError::OutOfRange { .. }))
        ));
    }
}
