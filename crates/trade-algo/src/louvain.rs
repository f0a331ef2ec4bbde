//! C6 — Community Partitioner.
//!
//! Louvain modularity maximization, used by the pipeline only when an SCC's
//! vertex count exceeds `largeSCCThreshold`. Edges are treated as
//! undirected for clustering purposes, weighted by the number of NFTs that
//! can satisfy the corresponding want edge in either direction. Standard
//! two-phase Louvain: repeated local moving to a local modularity optimum,
//! then aggregation of communities into super-vertices, iterated until a
//! pass produces no further merge.
//!
//! Vertex order is sorted ascending up front and preserved through every
//! pass so that, like `scc::tarjan_scc`, the resulting partition is stable
//! across repeated runs on the same input.

use std::collections::HashMap;

use trade_types::WalletId;

struct WeightedGraph {
    /// `adjacency[i]` maps neighbor index to edge weight; no self-loops
    /// except those introduced by aggregation.
    adjacency: Vec<HashMap<usize, f64>>,
    degree: Vec<f64>,
    total_weight: f64,
}

impl WeightedGraph {
    fn from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut adjacency = vec![HashMap::new(); n];
        for &(u, v, w) in edges {
            if w <= 0.0 {
                continue;
            }
            if u == v {
                *adjacency[u].entry(u).or_insert(0.0) += 2.0 * w;
            } else {
                *adjacency[u].entry(v).or_insert(0.0) += w;
                *adjacency[v].entry(u).or_insert(0.0) += w;
            }
        }
        let degree: Vec<f64> = adjacency.iter().map(|m| m.values().sum()).collect();
        let total_weight = degree.iter().sum::<f64>() / 2.0;
        Self { adjacency, degree, total_weight }
    }
}

/// One pass of local moving: repeatedly sweeps all nodes in index order,
/// moving each to the neighboring community that yields the largest
/// modularity gain, until a full sweep produces no move. Returns the final
/// community assignment (community ids are node indices of their first
/// member, not contiguous).
fn local_moving(graph: &WeightedGraph) -> Vec<usize> {
    let n = graph.adjacency.len();
    let mut community: Vec<usize> = (0..n).collect();
    let mut community_total: Vec<f64> = graph.degree.clone();

    if graph.total_weight <= 0.0 {
        return community;
    }

    let two_m = 2.0 * graph.total_weight;
    loop {
        let mut moved_any = false;
        for node in 0..n {
            let current_comm = community[node];
            let k_i = graph.degree[node];

            // Weight from `node` into each neighboring community, excluding itself.
            let mut weight_to_comm: HashMap<usize, f64> = HashMap::new();
            for (&neighbor, &w) in &graph.adjacency[node] {
                if neighbor != node {
                    *weight_to_comm.entry(community[neighbor]).or_insert(0.0) += w;
                }
            }

            community_total[current_comm] -= k_i;

            let mut best_comm = current_comm;
            let mut best_gain = weight_to_comm.get(&current_comm).copied().unwrap_or(0.0)
                - community_total[current_comm] * k_i / two_m;

            let mut candidates: Vec<usize> = weight_to_comm.keys().copied().collect();
            candidates.sort_unstable();
            for comm in candidates {
                let gain =
                    weight_to_comm[&comm] - community_total[comm] * k_i / two_m;
                if gain > best_gain + 1.0e-12 {
                    best_gain = gain;
                    best_comm = comm;
                }
            }

            community_total[best_comm] += k_i;
            if best_comm != current_comm {
                community[node] = best_comm;
                moved_any = true;
            }
        }
        if !moved_any {
            break;
        }
    }

    community
}

/// Collapses each community of the current level into a single super-vertex
/// for the next level, summing inter-community edge weight and folding
/// intra-community weight into a self-loop. Returns the aggregated graph
/// plus, for each new super-vertex index, the set of original-level indices
/// it contains (expressed over the *previous* level's indices).
fn aggregate(graph: &WeightedGraph, community: &[usize]) -> (WeightedGraph, Vec<Vec<usize>>) {
    let mut comm_ids: Vec<usize> = community.to_vec();
    comm_ids.sort_unstable();
    comm_ids.dedup();
    let index_of: HashMap<usize, usize> =
        comm_ids.iter().enumerate().map(|(i, &c)| (c, i)).collect();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); comm_ids.len()];
    for (node, &comm) in community.iter().enumerate() {
        members[index_of[&comm]].push(node);
    }

    // Each undirected edge is stored on both endpoints; visit it once by
    // requiring `node <= neighbor`. Existing self-loops carry the
    // `from_edges` 2x convention already, so they are halved back to a raw
    // weight before re-entering `from_edges`, which will re-double them —
    // otherwise each aggregation pass would double self-loop weight again.
    let mut edge_weight: HashMap<(usize, usize), f64> = HashMap::new();
    for (node, neighbors) in graph.adjacency.iter().enumerate() {
        let a = index_of[&community[node]];
        for (&neighbor, &w) in neighbors {
            if node > neighbor {
                continue;
            }
            let b = index_of[&community[neighbor]];
            let key = if a <= b { (a, b) } else { (b, a) };
            let raw = if node == neighbor { w / 2.0 } else { w };
            *edge_weight.entry(key).or_insert(0.0) += raw;
        }
    }

    let edges: Vec<(usize, usize, f64)> =
        edge_weight.into_iter().map(|((a, b), w)| (a, b, w)).collect();
    let aggregated = WeightedGraph::from_edges(comm_ids.len(), &edges);
    (aggregated, members)
}

/// Runs Louvain to (local) convergence and returns each final community as
/// the set of original wallet ids it contains. `edges` are undirected pairs
/// already combined across both want-edge directions, weighted by the
/// number of NFTs that can satisfy the edge (spec.md §4.6).
pub fn partition(vertices: &[WalletId], edges: &[(WalletId, WalletId, f64)]) -> Vec<Vec<WalletId>> {
    let mut ordered: Vec<WalletId> = vertices.to_vec();
    ordered.sort();
    if ordered.is_empty() {
        return Vec::new();
    }
    let index_of: HashMap<&WalletId, usize> =
        ordered.iter().enumerate().map(|(i, v)| (v, i)).collect();

    let base_edges: Vec<(usize, usize, f64)> = edges
        .iter()
        .filter_map(|(u, v, w)| {
            let &ui = index_of.get(u)?;
            let &vi = index_of.get(v)?;
            Some((ui, vi, *w))
        })
        .collect();

    let mut graph = WeightedGraph::from_edges(ordered.len(), &base_edges);
    // `membership[level][super_index]` = original-level (level 0) indices.
    let mut level_members: Vec<Vec<usize>> = (0..ordered.len()).map(|i| vec![i]).collect();

    loop {
        let community = local_moving(&graph);
        let distinct: std::collections::HashSet<usize> = community.iter().copied().collect();
        if distinct.len() == community.len() {
            // No node moved into a shared community; already at a local optimum.
            break;
        }

        let (aggregated, members_of_super) = aggregate(&graph, &community);
        let mut next_level_members: Vec<Vec<usize>> = Vec::with_capacity(members_of_super.len());
        for group in &members_of_super {
            let mut merged = Vec::new();
            for &super_node in group {
                merged.extend(level_members[super_node].iter().copied());
            }
            next_level_members.push(merged);
        }

        if aggregated.adjacency.len() == graph.adjacency.len() {
            break;
        }
        graph = aggregated;
        level_members = next_level_members;
    }

    let mut result: Vec<Vec<WalletId>> = level_members
        .into_iter()
        .map(|group| {
            let mut wallets: Vec<WalletId> =
                group.into_iter().map(|i| ordered[i].clone()).collect();
            wallets.sort();
            wallets
        })
        .collect();
    result.sort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wid(s: &str) -> WalletId {
        WalletId::from(s)
    }

    #[test]
    fn two_tight_cliques_joined_by_one_edge_split_into_two_communities() {
        let vertices: Vec<WalletId> =
            ["a", "b", "c", "d", "e", "f"].iter().map(|s| wid(s)).collect();
        let mut edges = Vec::new();
        for (u, v) in [("a", "b"), ("a", "c"), ("b", "c")] {
            edges.push((wid(u), wid(v), 5.0));
        }
        for (u, v) in [("d", "e"), ("d", "f"), ("e", "f")] {
            edges.push((wid(u), wid(v), 5.0));
        }
        edges.push((wid("c"), wid("d"), 1.0));

        let communities = partition(&vertices, &edges);
        assert_eq!(communities.len(), 2);
        for community in &communities {
            assert_eq!(community.len(), 3);
        }
    }

    #[test]
    fn single_vertex_has_no_edges() {
        let vertices = vec![wid("a")];
        let communities = partition(&vertices, &[]);
        assert_eq!(communities, vec![vec![wid("a")]]);
    }
}
