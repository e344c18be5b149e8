//! Diffusion engine: exchange of factors between contacting symbols.
//!
//! Runs per program, then per factor of that program. Only neighbors bound
//! to the same program take part; edges to other programs (or to symbols
//! without one) are ignored.
//!
//! Every symbol proposes an inflow along each of its same-program edges. An
//! edge keeps the smaller of its two endpoints' proposals, and all kept
//! flows are applied in one pass, so total mass per factor is conserved.

use std::sync::Arc;

use tracing::{debug, warn};
use transsys_core::error::Result;
use transsys_core::expr::Expr;
use transsys_core::program::TranssysProgram;
use transsys_core::rng::RngContext;
use transsys_core::types::FactorIndex;

use crate::contact_graph::EdgeHandle;
use crate::lsys_string::LsysString;

impl LsysString {
    /// One diffusion step over the whole string.
    ///
    /// Fails without touching any concentration if the contact graph does
    /// not describe this string.
    pub fn diffusion_step(&mut self, rng: &mut RngContext) -> Result<()> {
        self.graph.check(&self.symbols)?;

        let mut edges_used = 0usize;
        for program in self.lsys.programs() {
            let members: Vec<usize> = self
                .symbols
                .iter()
                .enumerate()
                .filter(|(_, s)| s.transsys.program().is_some_and(|p| Arc::ptr_eq(p, &program)))
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                continue;
            }

            for (factor, definition) in program.factors().iter().enumerate() {
                let Some(diffusibility) = definition.diffusibility.as_ref() else {
                    warn!(
                        program = program.name(),
                        factor = %definition.name,
                        "factor has no diffusibility, not diffused"
                    );
                    continue;
                };
                edges_used += self.diffuse_factor(&program, &members, factor, diffusibility, rng)?;
            }
        }

        debug!(
            generation = self.generation,
            symbols = self.symbols.len(),
            edges_used,
            "diffusion step"
        );
        Ok(())
    }

    /// Diffuse one factor among `members`; returns the number of edges that
    /// carried a flow.
    fn diffuse_factor(
        &mut self,
        program: &Arc<TranssysProgram>,
        members: &[usize],
        factor: FactorIndex,
        diffusibility: &Expr,
        rng: &mut RngContext,
    ) -> Result<usize> {
        let mut proposals: Vec<(EdgeHandle, f64)> = Vec::new();
        for &i in members {
            let own = &self.symbols[i].transsys;
            let c_i = own.concentration(factor).unwrap_or(0.0);
            let d_i = diffusibility.evaluate(&[own], rng).clamp(0.0, 1.0);

            let neighbors: Vec<(EdgeHandle, f64)> = self.symbols[i]
                .edges
                .iter()
                .filter_map(|&e| {
                    let j = self.graph.other_end(e, i)?;
                    let other = &self.symbols[j].transsys;
                    if !other.program().is_some_and(|p| Arc::ptr_eq(p, program)) {
                        return None;
                    }
                    Some((e, other.concentration(factor).unwrap_or(0.0)))
                })
                .collect();
            if neighbors.is_empty() {
                continue;
            }

            let k = neighbors.len() as f64;
            let mean = (c_i + neighbors.iter().map(|&(_, c)| c).sum::<f64>()) / (k + 1.0);
            let gradient_sum: f64 = neighbors.iter().map(|&(_, c_j)| c_j - c_i).sum();

            for &(edge, c_j) in &neighbors {
                let gradient = c_j - c_i;
                // A flat neighborhood (zero gradient sum) transfers the
                // diffusibility itself along every edge.
                let inflow = if gradient_sum != 0.0 {
                    gradient / gradient_sum * d_i * (mean - c_i)
                } else {
                    d_i
                };
                // Stored flows run from the edge's first endpoint to its second.
                let Some((first, _, _)) = self.graph.edge(edge) else {
                    continue;
                };
                let flow = if first == i { -inflow } else { inflow };
                proposals.push((edge, flow));
            }
        }

        self.graph.reset_scratch();
        for (edge, flow) in proposals {
            self.graph.propose(edge, flow);
        }

        let flows = self.graph.recorded_flows();
        for &(i1, i2, flow) in &flows {
            self.symbols[i1].transsys.add_to_concentration(factor, -flow)?;
            self.symbols[i2].transsys.add_to_concentration(factor, flow)?;
        }
        Ok(flows.len())
    }
}
