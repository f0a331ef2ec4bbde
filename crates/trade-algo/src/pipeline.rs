//! Ties C4 (SCC) → C5 (cycles) → C6 (communities, when an SCC is large) →
//! materialization → C8 (scoring) → C7 (canonicalization/dedup) into the
//! single pipeline the orchestrator (C9) runs per affected subgraph.
//!
//! The orchestrator hands this pipeline the *affected subgraph* — the union
//! of BFS neighborhoods around touched wallets, already restricted to the
//! current wallet projection (spec.md §4.9) — not the whole tenant graph.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;

use trade_core::TenantGraph;
use trade_types::{TradeLoop, ValuationResolver, WalletId};

use crate::canonical::dedup_candidates;
use crate::cycles::enumerate_cycles;
use crate::louvain;
use crate::materialize::{materialize_edge_path, materialize_variants};
use crate::scc::tarjan_scc;

pub struct PipelineOutcome {
    /// Accepted candidates (quality ≥ threshold) for this round, keyed by
    /// canonical id and already deduplicated within the round.
    pub candidates: HashMap<String, TradeLoop>,
    pub budget_exhausted: bool,
    pub cancelled: bool,
}

/// Runs the full discovery pipeline restricted to `scope` (the affected
/// subgraph's vertex set).
pub fn run(
    graph: &TenantGraph,
    resolver: &dyn ValuationResolver,
    scope: &HashSet<WalletId>,
    cancel_flag: &AtomicBool,
) -> PipelineOutcome {
    let config = &graph.config;
    let edges: Vec<(WalletId, WalletId)> = graph
        .wallet_projection()
        .into_iter()
        .filter(|(u, v)| scope.contains(u) && scope.contains(v))
        .collect();

    let vertices: Vec<WalletId> = scope.iter().cloned().collect();
    let sccs = tarjan_scc(&vertices, &edges);

    let mut accepted: Vec<TradeLoop> = Vec::new();
    let mut budget_exhausted = false;
    let mut cancelled = false;

    for members in sccs {
        if cancelled {
            break;
        }
        let member_set: HashSet<WalletId> = members.iter().cloned().collect();
        let induced: Vec<(WalletId, WalletId)> = edges
            .iter()
            .filter(|(u, v)| member_set.contains(u) && member_set.contains(v))
            .cloned()
            .collect();

        if members.len() as u32 <= config.large_scc_threshold {
            let outcome = run_one_scc(
                graph,
                resolver,
                &members,
                &induced,
                config.max_cycles_per_scc as usize,
                cancel_flag,
            );
            accepted.extend(outcome.0);
            budget_exhausted |= outcome.1;
            cancelled |= outcome.2;
            continue;
        }

        // Large SCC: shard via Louvain, enumerate within each community,
        // then separately enumerate the bridge subgraph of representatives
        // so inter-community cycles are not lost entirely (spec.md §4.6).
        let undirected_edges: Vec<(WalletId, WalletId, f64)> = induced
            .iter()
            .map(|(u, v)| (u.clone(), v.clone(), 1.0))
            .collect();
        let communities = louvain::partition(&members, &undirected_edges);

        let mut comm_of: HashMap<WalletId, usize> = HashMap::new();
        for (idx, community) in communities.iter().enumerate() {
            for wallet in community {
                comm_of.insert(wallet.clone(), idx);
            }
        }

        for community in &communities {
            if cancelled {
                break;
            }
            let comm_set: HashSet<WalletId> = community.iter().cloned().collect();
            let comm_edges: Vec<(WalletId, WalletId)> = induced
                .iter()
                .filter(|(u, v)| comm_set.contains(u) && comm_set.contains(v))
                .cloned()
                .collect();
            let outcome = run_one_scc(
                graph,
                resolver,
                community,
                &comm_edges,
                config.max_cycles_per_scc as usize,
                cancel_flag,
            );
            accepted.extend(outcome.0);
            budget_exhausted |= outcome.1;
            cancelled |= outcome.2;
        }

        if !cancelled {
            let bridge = run_bridge_subgraph(
                graph,
                resolver,
                &induced,
                &comm_of,
                communities.len(),
                config.max_cycles_per_scc as usize,
                cancel_flag,
            );
            accepted.extend(bridge.0);
            budget_exhausted |= bridge.1;
            cancelled |= bridge.2;
        }
    }

    let by_id = dedup_candidates(accepted);
    let candidates: HashMap<String, TradeLoop> = by_id
        .into_iter()
        .filter(|(_, loop_)| loop_.quality_score >= config.quality_threshold)
        .collect();

    PipelineOutcome { candidates, budget_exhausted, cancelled }
}

fn adjacency_of(edges: &[(WalletId, WalletId)]) -> HashMap<WalletId, Vec<WalletId>> {
    let mut adj: HashMap<WalletId, Vec<WalletId>> = HashMap::new();
    for (u, v) in edges {
        adj.entry(u.clone()).or_default().push(v.clone());
    }
    for list in adj.values_mut() {
        list.sort();
        list.dedup();
    }
    adj
}

#[allow(clippy::too_many_arguments)]
fn run_one_scc(
    graph: &TenantGraph,
    resolver: &dyn ValuationResolver,
    members: &[WalletId],
    edges: &[(WalletId, WalletId)],
    max_candidates: usize,
    cancel_flag: &AtomicBool,
) -> (Vec<TradeLoop>, bool, bool) {
    let adj = adjacency_of(edges);
    let outcome = enumerate_cycles(
        members,
        &adj,
        graph.config.max_depth as usize,
        graph.config.max_cycles_per_scc as usize,
        graph.config.cancellation_check_interval as usize,
        cancel_flag,
    );

    let mut accepted = Vec::new();
    let mut remaining = max_candidates;
    for vertex_cycle in &outcome.cycles {
        if remaining == 0 {
            break;
        }
        for steps in materialize_variants(graph, vertex_cycle, remaining) {
            remaining = remaining.saturating_sub(1);
            let scored = crate::scoring::score_loop(graph, resolver, steps);
            accepted.push(scored);
            if remaining == 0 {
                break;
            }
        }
    }

    (accepted, outcome.budget_exhausted, outcome.cancelled)
}

/// Builds the bridge subgraph of one representative per community plus
/// every inter-community edge, enumerates cycles over it, and translates
/// each representative-to-representative hop back to a real crossing
/// wallet edge before materialization.
#[allow(clippy::too_many_arguments)]
fn run_bridge_subgraph(
    graph: &TenantGraph,
    resolver: &dyn ValuationResolver,
    induced: &[(WalletId, WalletId)],
    comm_of: &HashMap<WalletId, usize>,
    community_count: usize,
    max_candidates: usize,
    cancel_flag: &AtomicBool,
) -> (Vec<TradeLoop>, bool, bool) {
    if community_count < 2 {
        return (Vec::new(), false, false);
    }

    // One representative per community: its lexicographically smallest member.
    let mut representative: Vec<Option<WalletId>> = vec![None; community_count];
    for (wallet, &comm) in comm_of {
        let slot = &mut representative[comm];
        if slot.as_ref().map_or(true, |current| wallet < current) {
            *slot = Some(wallet.clone());
        }
    }
    let representative: Vec<WalletId> = representative.into_iter().flatten().collect();
    if representative.len() != community_count {
        return (Vec::new(), false, false);
    }

    let mut cross_edges: HashMap<(usize, usize), Vec<(WalletId, WalletId)>> = HashMap::new();
    for (u, v) in induced {
        let (Some(&cu), Some(&cv)) = (comm_of.get(u), comm_of.get(v)) else {
            continue;
        };
        if cu != cv {
            cross_edges.entry((cu, cv)).or_default().push((u.clone(), v.clone()));
        }
    }
    for edges in cross_edges.values_mut() {
        edges.sort();
    }

    let mut adj: HashMap<WalletId, Vec<WalletId>> = HashMap::new();
    for &(cu, cv) in cross_edges.keys() {
        adj.entry(representative[cu].clone())
            .or_default()
            .push(representative[cv].clone());
    }
    for list in adj.values_mut() {
        list.sort();
        list.dedup();
    }

    let outcome = enumerate_cycles(
        &representative,
        &adj,
        graph.config.max_depth as usize,
        graph.config.max_cycles_per_scc as usize,
        graph.config.cancellation_check_interval as usize,
        cancel_flag,
    );

    let rep_to_comm: HashMap<&WalletId, usize> =
        representative.iter().enumerate().map(|(i, w)| (w, i)).collect();

    let mut accepted = Vec::new();
    let mut remaining = max_candidates;
    for rep_cycle in &outcome.cycles {
        if remaining == 0 {
            break;
        }
        let n = rep_cycle.len();
        let mut real_path: Vec<(WalletId, WalletId)> = Vec::with_capacity(n);
        let mut complete = true;
        for i in 0..n {
            let cu = rep_to_comm[&rep_cycle[i]];
            let cv = rep_to_comm[&rep_cycle[(i + 1) % n]];
            match cross_edges.get(&(cu, cv)).and_then(|v| v.first()) {
                Some(edge) => real_path.push(edge.clone()),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            continue;
        }
        for steps in materialize_edge_path(graph, &real_path, remaining) {
            remaining = remaining.saturating_sub(1);
            let scored = crate::scoring::score_loop(graph, resolver, steps);
            accepted.push(scored);
            if remaining == 0 {
                break;
            }
        }
    }

    (accepted, outcome.budget_exhausted, outcome.cancelled)
}
