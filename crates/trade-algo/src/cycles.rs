//! C5 — Cycle Enumerator.
//!
//! Johnson's elementary-cycle algorithm, restricted to one SCC at a time
//! and bounded by a depth limit and a per-SCC emission budget. Cancellation
//! is checked via a shared flag rather than a closure: the Discovery
//! Orchestrator (C9) flips it when a newer mutation supersedes an in-flight
//! round, and every recursive level observes it promptly without threading
//! a generic callback through the whole call graph.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use trade_types::WalletId;

pub struct EnumerationOutcome {
    /// Elementary cycles as ordered vertex lists, each starting at its
    /// lexicographically smallest member (the `s` vertex in Johnson's
    /// algorithm); closure back to the first vertex is implicit.
    pub cycles: Vec<Vec<WalletId>>,
    pub budget_exhausted: bool,
    pub cancelled: bool,
}

struct Ctx<'a> {
    ordered: &'a [WalletId],
    index_of: HashMap<&'a WalletId, usize>,
    adj: &'a HashMap<WalletId, Vec<WalletId>>,
    max_depth: usize,
    max_cycles: usize,
    cancellation_check_interval: usize,
    cancel_flag: &'a AtomicBool,
    edges_visited: usize,
    results: Vec<Vec<WalletId>>,
    budget_exhausted: bool,
    cancelled: bool,
}

/// Enumerates elementary cycles within a single SCC. `adj` must already be
/// restricted to edges between members of `scc_vertices` and sorted per
/// source vertex for deterministic traversal order.
pub fn enumerate_cycles(
    scc_vertices: &[WalletId],
    adj: &HashMap<WalletId, Vec<WalletId>>,
    max_depth: usize,
    max_cycles: usize,
    cancellation_check_interval: usize,
    cancel_flag: &AtomicBool,
) -> EnumerationOutcome {
    let mut ordered: Vec<WalletId> = scc_vertices.to_vec();
    ordered.sort();
    let index_of: HashMap<&WalletId, usize> =
        ordered.iter().enumerate().map(|(i, v)| (v, i)).collect();

    let mut ctx = Ctx {
        ordered: &ordered,
        index_of,
        adj,
        max_depth,
        max_cycles: max_cycles.max(1),
        cancellation_check_interval: cancellation_check_interval.max(1),
        cancel_flag,
        edges_visited: 0,
        results: Vec::new(),
        budget_exhausted: false,
        cancelled: false,
    };

    for s_idx in 0..ordered.len() {
        if ctx.cancelled || ctx.budget_exhausted {
            break;
        }
        let s = &ordered[s_idx].clone();
        let mut blocked: HashSet<WalletId> = HashSet::new();
        let mut blocked_map: HashMap<WalletId, HashSet<WalletId>> = HashMap::new();
        let mut path: Vec<WalletId> = vec![s.clone()];
        blocked.insert(s.clone());
        circuit(&mut ctx, s, s_idx, s, &mut path, &mut blocked, &mut blocked_map);
    }

    EnumerationOutcome {
        cycles: ctx.results,
        budget_exhausted: ctx.budget_exhausted,
        cancelled: ctx.cancelled,
    }
}

fn circuit(
    ctx: &mut Ctx,
    v: &WalletId,
    s_idx: usize,
    s: &WalletId,
    path: &mut Vec<WalletId>,
    blocked: &mut HashSet<WalletId>,
    blocked_map: &mut HashMap<WalletId, HashSet<WalletId>>,
) -> bool {
    if ctx.cancelled || ctx.budget_exhausted {
        return false;
    }

    let mut found = false;
    let successors = ctx.adj.get(v).cloned().unwrap_or_default();

    for w in &successors {
        ctx.edges_visited += 1;
        if ctx.edges_visited % ctx.cancellation_check_interval == 0
            && ctx.cancel_flag.load(Ordering::Relaxed)
        {
            ctx.cancelled = true;
            return found;
        }
        let Some(&w_idx) = ctx.index_of.get(w) else {
            continue;
        };
        if w_idx < s_idx {
            continue;
        }
        if w == s {
            if path.len() <= ctx.max_depth {
                ctx.results.push(path.clone());
                found = true;
                if ctx.results.len() >= ctx.max_cycles {
                    ctx.budget_exhausted = true;
                    return found;
                }
            }
        } else if !blocked.contains(w) && path.len() < ctx.max_depth {
            path.push(w.clone());
            blocked.insert(w.clone());
            let sub_found = circuit(ctx, w, s_idx, s, path, blocked, blocked_map);
            path.pop();
            if sub_found {
                found = true;
            } else {
                unblock(w, blocked, blocked_map);
            }
            if ctx.cancelled || ctx.budget_exhausted {
                return found;
            }
        }
    }

    if found {
        unblock(v, blocked, blocked_map);
    } else {
        for w in &successors {
            if let Some(&w_idx) = ctx.index_of.get(w) {
                if w_idx >= s_idx {
                    blocked_map.entry(w.clone()).or_default().insert(v.clone());
                }
            }
        }
    }

    found
}

fn unblock(
    v: &WalletId,
    blocked: &mut HashSet<WalletId>,
    blocked_map: &mut HashMap<WalletId, HashSet<WalletId>>,
) {
    blocked.remove(v);
    if let Some(dependents) = blocked_map.remove(v) {
        for w in dependents {
            if blocked.contains(&w) {
                unblock(&w, blocked, blocked_map);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wid(s: &str) -> WalletId {
        WalletId::from(s)
    }

    fn adj_from(edges: &[(&str, &str)]) -> HashMap<WalletId, Vec<WalletId>> {
        let mut adj: HashMap<WalletId, Vec<WalletId>> = HashMap::new();
        for (u, v) in edges {
            adj.entry(wid(u)).or_default().push(wid(v));
        }
        for list in adj.values_mut() {
            list.sort();
        }
        adj
    }

    #[test]
    fn finds_the_single_triangle() {
        let vertices = vec![wid("a"), wid("b"), wid("c")];
        let adj = adj_from(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let flag = AtomicBool::new(false);
        let outcome = enumerate_cycles(&vertices, &adj, 10, 1_000, 4_096, &flag);
        assert_eq!(outcome.cycles, vec![vec![wid("a"), wid("b"), wid("c")]]);
        assert!(!outcome.budget_exhausted);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn respects_depth_bound() {
        // 4-cycle a-b-c-d-a should be excluded when max_depth = 3.
        let vertices = vec![wid("a"), wid("b"), wid("c"), wid("d")];
        let adj = adj_from(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")]);
        let flag = AtomicBool::new(false);
        let outcome = enumerate_cycles(&vertices, &adj, 3, 1_000, 4_096, &flag);
        assert!(outcome.cycles.is_empty());

        let outcome = enumerate_cycles(&vertices, &adj, 4, 1_000, 4_096, &flag);
        assert_eq!(outcome.cycles.len(), 1);
    }

    #[test]
    fn stops_at_per_scc_budget() {
        // Complete digraph on 5 vertices has many elementary cycles.
        let names = ["a", "b", "c", "d", "e"];
        let vertices: Vec<WalletId> = names.iter().map(|s| wid(s)).collect();
        let mut edges = Vec::new();
        for u in &names {
            for v in &names {
                if u != v {
                    edges.push((*u, *v));
                }
            }
        }
        let adj = adj_from(&edges);
        let flag = AtomicBool::new(false);
        let outcome = enumerate_cycles(&vertices, &adj, 5, 3, 4_096, &flag);
        assert_eq!(outcome.cycles.len(), 3);
        assert!(outcome.budget_exhausted);
    }

    #[test]
    fn respects_cancellation_flag() {
        let names = ["a", "b", "c", "d", "e"];
        let vertices: Vec<WalletId> = names.iter().map(|s| wid(s)).collect();
        let mut edges = Vec::new();
        for u in &names {
            for v in &names {
                if u != v {
                    edges.push((*u, *v));
                }
            }
        }
        let adj = adj_from(&edges);
        let flag = AtomicBool::new(true);
        let outcome = enumerate_cycles(&vertices, &adj, 5, 1_000, 1, &flag);
        assert!(outcome.cancelled);
    }
}
