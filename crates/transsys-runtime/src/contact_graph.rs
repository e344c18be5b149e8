//! Contact graph: which symbol instances touch each other.
//!
//! The graph is an undirected edge arena backed by petgraph. Node `i` is the
//! symbol at string position `i`; edges carry an integer distance plus
//! per-edge scratch used by the diffusion engine. Every edge is created once,
//! never removed, and addressed by its stable [`EdgeHandle`], which the two
//! endpoint [`SymbolInstance`]s keep in their edge lists.
//!
//! Each generation gets a fresh graph derived from the previous one:
//! 1. Successors of one predecessor group are pairwise connected at distance 1
//! 2. Edges between groups are collapsed to one (shortest) contact per group pair
//! 3. Successors of two contacting groups are connected at
//!    `d + successor_distance(p1) + successor_distance(p2)` if that stays
//!    within the grammar's diffusion range
//!
//! The number of edges is computed before anything is inserted, so the arena
//! is allocated exactly once. Sizes beyond petgraph's `u32` index space are
//! rejected and the allocation itself is fallible, so an oversized string
//! fails the call instead of aborting the process.

use std::collections::HashMap;

use petgraph::graph::{Edge, EdgeIndex, Node, NodeIndex, UnGraph};
use tracing::warn;
use transsys_core::error::{GraphError, Result, TranssysError};

use crate::lsys_string::{LsysString, SymbolInstance};

/// Stable handle of an edge in a [`ContactGraph`].
pub type EdgeHandle = EdgeIndex;

/// Data stored on a contact edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEdge {
    pub distance: u32,
    /// Flow from the first to the second endpoint proposed during diffusion.
    amount_diffused: f64,
    amount_valid: bool,
}

impl ContactEdge {
    fn new(distance: u32) -> Self {
        Self {
            distance,
            amount_diffused: 0.0,
            amount_valid: false,
        }
    }
}

/// Shortest contact between two predecessor groups of the previous generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupContact {
    /// Start position of the lower group.
    pub g1: usize,
    /// Start position of the higher group.
    pub g2: usize,
    pub distance: u32,
}

/// Successor range of one predecessor group.
#[derive(Debug, Clone, Copy)]
struct Group {
    successor_index: usize,
    num_successors: usize,
    successor_distance: u32,
}

/// Undirected, distance-weighted adjacency over one generation's symbols.
#[derive(Debug, Clone, Default)]
pub struct ContactGraph {
    graph: UnGraph<(), ContactEdge>,
}

impl ContactGraph {
    fn with_capacity(num_nodes: usize, num_edges: usize) -> Result<Self> {
        // petgraph's default index is u32 and reserves u32::MAX as "end".
        let limit = u32::MAX as usize;
        for count in [num_nodes, num_edges] {
            if count > limit {
                return Err(GraphError::TooLarge(count).into());
            }
        }

        // petgraph's own with_capacity aborts on allocation failure.
        Vec::<Node<()>>::new().try_reserve_exact(num_nodes)?;
        Vec::<Edge<ContactEdge>>::new().try_reserve_exact(num_edges)?;

        let mut graph = UnGraph::with_capacity(num_nodes, num_edges);
        for _ in 0..num_nodes {
            graph.add_node(());
        }
        Ok(Self { graph })
    }

    /// Germ cluster: every pair of axiom symbols in contact at distance 1.
    pub(crate) fn axiom(symbols: &mut [SymbolInstance]) -> Result<Self> {
        let n = symbols.len();
        let num_edges = pairs(n).ok_or(GraphError::TooLarge(usize::MAX))?;
        let mut graph = Self::with_capacity(n, num_edges)?;
        for i in 0..n {
            for j in (i + 1)..n {
                graph.connect(symbols, i, j, 1);
            }
        }
        debug_assert_eq!(graph.edge_count(), num_edges);
        Ok(graph)
    }

    /// Build the graph of a new generation from the previous one.
    ///
    /// `previous` must carry the group bookkeeping written by the derivation
    /// that produced `successors`.
    pub(crate) fn derive(
        previous: &LsysString,
        successors: &mut [SymbolInstance],
        diffusion_range: u32,
    ) -> Result<Self> {
        let groups = collect_groups(previous.symbols());
        let contacts = group_contacts(previous);

        // Dry run: exact edge count before allocating.
        let too_large = || TranssysError::from(GraphError::TooLarge(usize::MAX));
        let mut num_edges: usize = 0;
        for group in groups.values() {
            let intra = pairs(group.num_successors).ok_or_else(too_large)?;
            num_edges = num_edges.checked_add(intra).ok_or_else(too_large)?;
        }
        for contact in &contacts {
            let (Some(a), Some(b)) = (groups.get(&contact.g1), groups.get(&contact.g2)) else {
                continue;
            };
            if inter_distance(contact, a, b) <= diffusion_range {
                let inter = a
                    .num_successors
                    .checked_mul(b.num_successors)
                    .ok_or_else(too_large)?;
                num_edges = num_edges.checked_add(inter).ok_or_else(too_large)?;
            }
        }

        let mut graph = Self::with_capacity(successors.len(), num_edges)?;

        let mut starts: Vec<usize> = groups.keys().copied().collect();
        starts.sort_unstable();
        for group in starts.iter().filter_map(|start| groups.get(start)) {
            let range = group.successor_index..group.successor_index + group.num_successors;
            for i in range.clone() {
                for j in (i + 1)..range.end {
                    graph.connect(successors, i, j, 1);
                }
            }
        }

        for contact in &contacts {
            let (Some(a), Some(b)) = (groups.get(&contact.g1), groups.get(&contact.g2)) else {
                continue;
            };
            let distance = inter_distance(contact, a, b);
            if distance > diffusion_range {
                continue;
            }
            for i in a.successor_index..a.successor_index + a.num_successors {
                for j in b.successor_index..b.successor_index + b.num_successors {
                    graph.connect(successors, i, j, distance);
                }
            }
        }

        debug_assert_eq!(graph.edge_count(), num_edges);
        Ok(graph)
    }

    fn connect(&mut self, symbols: &mut [SymbolInstance], i1: usize, i2: usize, distance: u32) {
        let edge = self.graph.add_edge(
            NodeIndex::new(i1),
            NodeIndex::new(i2),
            ContactEdge::new(distance),
        );
        symbols[i1].edges.push(edge);
        symbols[i2].edges.push(edge);
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Endpoints and distance of an edge.
    pub fn edge(&self, edge: EdgeHandle) -> Option<(usize, usize, u32)> {
        let (a, b) = self.graph.edge_endpoints(edge)?;
        let data = self.graph.edge_weight(edge)?;
        Some((a.index(), b.index(), data.distance))
    }

    /// All edges as `(i1, i2, distance)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (e.source().index(), e.target().index(), e.weight.distance))
    }

    /// The endpoint of `edge` that is not `node`.
    pub fn other_end(&self, edge: EdgeHandle, node: usize) -> Option<usize> {
        let (a, b) = self.graph.edge_endpoints(edge)?;
        if a.index() == node {
            Some(b.index())
        } else if b.index() == node {
            Some(a.index())
        } else {
            None
        }
    }

    /// Distance between two positions, if they are in contact.
    pub fn distance_between(&self, i1: usize, i2: usize) -> Option<u32> {
        if i1.max(i2) >= self.node_count() {
            return None;
        }
        let edge = self.graph.find_edge(NodeIndex::new(i1), NodeIndex::new(i2))?;
        self.graph.edge_weight(edge).map(|e| e.distance)
    }

    /// Verify the graph describes `symbols`: one node per symbol and every
    /// back-link pointing at an edge that touches its owner.
    pub fn check(&self, symbols: &[SymbolInstance]) -> Result<()> {
        if self.node_count() != symbols.len() {
            return Err(TranssysError::malformed_graph(format!(
                "{} nodes for {} symbols",
                self.node_count(),
                symbols.len()
            )));
        }
        let mut links = 0;
        for (i, symbol) in symbols.iter().enumerate() {
            for &edge in &symbol.edges {
                if self.other_end(edge, i).is_none() {
                    return Err(TranssysError::malformed_graph(format!(
                        "symbol {} links edge {} which does not touch it",
                        i,
                        edge.index()
                    )));
                }
            }
            links += symbol.edges.len();
        }
        if links != 2 * self.edge_count() {
            return Err(TranssysError::malformed_graph(format!(
                "{} back-links for {} edges",
                links,
                self.edge_count()
            )));
        }
        Ok(())
    }

    // --- Diffusion scratch ---

    pub(crate) fn reset_scratch(&mut self) {
        for edge in self.graph.edge_weights_mut() {
            edge.amount_diffused = 0.0;
            edge.amount_valid = false;
        }
    }

    /// Record a proposed flow from the edge's first to its second endpoint,
    /// keeping whichever proposal is smaller in magnitude.
    pub(crate) fn propose(&mut self, edge: EdgeHandle, flow: f64) {
        let Some(data) = self.graph.edge_weight_mut(edge) else {
            return;
        };
        if !data.amount_valid || flow.abs() < data.amount_diffused.abs() {
            data.amount_diffused = flow;
            data.amount_valid = true;
        }
    }

    /// Flows recorded since the last reset, as `(i1, i2, flow)`.
    pub(crate) fn recorded_flows(&self) -> Vec<(usize, usize, f64)> {
        self.graph
            .raw_edges()
            .iter()
            .filter(|e| e.weight.amount_valid)
            .map(|e| (e.source().index(), e.target().index(), e.weight.amount_diffused))
            .collect()
    }
}

fn pairs(n: usize) -> Option<usize> {
    n.checked_mul(n.saturating_sub(1)).map(|p| p / 2)
}

fn inter_distance(contact: &GroupContact, a: &Group, b: &Group) -> u32 {
    contact
        .distance
        .saturating_add(a.successor_distance)
        .saturating_add(b.successor_distance)
}

/// Successor ranges keyed by group start.
fn collect_groups(symbols: &[SymbolInstance]) -> HashMap<usize, Group> {
    symbols
        .iter()
        .enumerate()
        .filter(|(i, s)| s.lhs_group_start == Some(*i))
        .map(|(i, s)| {
            (
                i,
                Group {
                    successor_index: s.successor_index,
                    num_successors: s.num_successors,
                    successor_distance: s.successor_distance,
                },
            )
        })
        .collect()
}

/// Collapse the previous generation's edges to predecessor-group pairs.
///
/// Keys are canonical `(min, max)` group starts; duplicate pairs keep the
/// shortest distance and edges inside one group are dropped. The result is
/// sorted by key so graph construction does not depend on hash order.
pub fn group_contacts(previous: &LsysString) -> Vec<GroupContact> {
    let symbols = previous.symbols();
    let mut shortest: HashMap<(usize, usize), u32> = HashMap::new();
    for (i1, i2, distance) in previous.graph().edges() {
        let (Some(g1), Some(g2)) = (symbols[i1].lhs_group_start, symbols[i2].lhs_group_start)
        else {
            warn!(i1, i2, "contact between symbols without group bookkeeping, skipped");
            continue;
        };
        if g1 == g2 {
            continue;
        }
        shortest
            .entry((g1.min(g2), g1.max(g2)))
            .and_modify(|d| *d = (*d).min(distance))
            .or_insert(distance);
    }

    let mut contacts: Vec<GroupContact> = shortest
        .into_iter()
        .map(|((g1, g2), distance)| GroupContact { g1, g2, distance })
        .collect();
    contacts.sort_unstable_by_key(|c| (c.g1, c.g2));
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use transsys_core::instance::TranssysInstance;

    fn bare_symbols(n: usize) -> Vec<SymbolInstance> {
        (0..n)
            .map(|_| SymbolInstance::new(0, TranssysInstance::without_program()))
            .collect()
    }

    #[test]
    fn axiom_is_a_clique() {
        let mut symbols = bare_symbols(4);
        let graph = ContactGraph::axiom(&mut symbols).unwrap();
        assert_eq!(graph.edge_count(), 6);
        for i in 0..4 {
            assert_eq!(symbols[i].edges().len(), 3);
            for j in 0..4 {
                if i != j {
                    assert_eq!(graph.distance_between(i, j), Some(1));
                }
            }
        }
        graph.check(&symbols).unwrap();
    }

    #[test]
    fn empty_and_single_axioms_have_no_edges() {
        let mut none = bare_symbols(0);
        assert_eq!(ContactGraph::axiom(&mut none).unwrap().edge_count(), 0);
        let mut one = bare_symbols(1);
        let graph = ContactGraph::axiom(&mut one).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn oversized_axiom_fails_instead_of_aborting() {
        // 100k symbols need ~5e9 clique edges, beyond the u32 edge index.
        let mut symbols = bare_symbols(100_000);
        let result = ContactGraph::axiom(&mut symbols);
        assert!(matches!(
            result,
            Err(TranssysError::Graph(GraphError::TooLarge(_))) | Err(TranssysError::Allocation(_))
        ));
        assert!(symbols.iter().all(|s| s.edges().is_empty()));
    }

    #[test]
    fn scratch_keeps_smaller_proposal() {
        let mut symbols = bare_symbols(2);
        let mut graph = ContactGraph::axiom(&mut symbols).unwrap();
        let edge = symbols[0].edges()[0];
        graph.reset_scratch();
        graph.propose(edge, 0.5);
        graph.propose(edge, -0.25);
        graph.propose(edge, 0.75);
        assert_eq!(graph.recorded_flows(), vec![(0, 1, -0.25)]);
        graph.reset_scratch();
        assert!(graph.recorded_flows().is_empty());
    }

    #[test]
    fn check_detects_foreign_back_links() {
        let mut symbols = bare_symbols(3);
        let graph = ContactGraph::axiom(&mut symbols).unwrap();
        let foreign = symbols[1]
            .edges()
            .iter()
            .copied()
            .find(|&e| graph.other_end(e, 0).is_none())
            .unwrap();
        symbols[0].edges.push(foreign);
        assert!(matches!(
            graph.check(&symbols),
            Err(TranssysError::Graph(GraphError::Malformed(_)))
        ));

        let fewer = bare_symbols(2);
        assert!(graph.check(&fewer).is_err());
    }

    #[test]
    fn other_end_and_edge_lookup() {
        let mut symbols = bare_symbols(2);
        let graph = ContactGraph::axiom(&mut symbols).unwrap();
        let edge = symbols[1].edges()[0];
        assert_eq!(graph.edge(edge), Some((0, 1, 1)));
        assert_eq!(graph.other_end(edge, 1), Some(0));
        assert_eq!(graph.other_end(edge, 5), None);
        assert_eq!(graph.distance_between(0, 7), None);
    }
}
