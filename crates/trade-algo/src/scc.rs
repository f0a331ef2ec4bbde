//! C4 — SCC Partitioner.
//!
//! Tarjan's strongly-connected-components algorithm over the wallet
//! projection of the want graph, run iteratively (an explicit work stack
//! rather than recursion) so depth is bounded by available memory, not the
//! call stack, for tenants with very large affected subgraphs.

use std::collections::{HashMap, HashSet};

use trade_types::WalletId;

/// Returns every strongly connected component with at least two members
/// (singletons cannot contain a cycle). Adjacency lists are sorted so that
/// a component's member list — and therefore its identity — is stable
/// across repeated runs on the same input (spec.md §4.4).
pub fn tarjan_scc(vertices: &[WalletId], edges: &[(WalletId, WalletId)]) -> Vec<Vec<WalletId>> {
    let mut adj: HashMap<&WalletId, Vec<&WalletId>> = HashMap::new();
    for v in vertices {
        adj.entry(v).or_default();
    }
    for (u, v) in edges {
        adj.entry(u).or_default().push(v);
    }
    for list in adj.values_mut() {
        list.sort();
        list.dedup();
    }

    let mut index_counter = 0usize;
    let mut indices: HashMap<&WalletId, usize> = HashMap::new();
    let mut lowlink: HashMap<&WalletId, usize> = HashMap::new();
    let mut on_stack: HashSet<&WalletId> = HashSet::new();
    let mut stack: Vec<&WalletId> = Vec::new();
    let mut result: Vec<Vec<WalletId>> = Vec::new();

    for start in vertices {
        if indices.contains_key(start) {
            continue;
        }
        strongconnect(
            start,
            &adj,
            &mut index_counter,
            &mut indices,
            &mut lowlink,
            &mut on_stack,
            &mut stack,
            &mut result,
        );
    }

    for component in &mut result {
        component.sort();
    }
    result.retain(|c| c.len() >= 2);
    result.sort();
    result
}

#[allow(clippy::too_many_arguments)]
fn strongconnect<'a>(
    root: &'a WalletId,
    adj: &HashMap<&'a WalletId, Vec<&'a WalletId>>,
    index_counter: &mut usize,
    indices: &mut HashMap<&'a WalletId, usize>,
    lowlink: &mut HashMap<&'a WalletId, usize>,
    on_stack: &mut HashSet<&'a WalletId>,
    stack: &mut Vec<&'a WalletId>,
    result: &mut Vec<Vec<WalletId>>,
) {
    let mut work: Vec<(&'a WalletId, usize)> = vec![(root, 0)];
    indices.insert(root, *index_counter);
    lowlink.insert(root, *index_counter);
    *index_counter += 1;
    stack.push(root);
    on_stack.insert(root);

    while let Some(&(node, child_idx)) = work.last() {
        let children = adj.get(node).map(|v| v.as_slice()).unwrap_or(&[]);
        if child_idx < children.len() {
            work.last_mut().unwrap().1 += 1;
            let child = children[child_idx];
            if !indices.contains_key(child) {
                indices.insert(child, *index_counter);
                lowlink.insert(child, *index_counter);
                *index_counter += 1;
                stack.push(child);
                on_stack.insert(child);
                work.push((child, 0));
            } else if on_stack.contains(child) {
                let merged = lowlink[node].min(indices[child]);
                lowlink.insert(node, merged);
            }
        } else {
            work.pop();
            if let Some(&(parent, _)) = work.last() {
                let merged = lowlink[parent].min(lowlink[node]);
                lowlink.insert(parent, merged);
            }
            if lowlink[node] == indices[node] {
                let mut component = Vec::new();
                loop {
                    let w = stack.pop().expect("node must be on stack when its own root");
                    on_stack.remove(w);
                    component.push(w.clone());
                    if w == node {
                        break;
                    }
                }
                result.push(component);
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

    #[test]
    fn singleton_with_no_self_loop_is_not_an_scc() {
        let vertices = vec![wid("a"), wid("b")];
        let edges = vec![(wid("a"), wid("b"))];
        let sccs = tarjan_scc(&vertices, &edges);
        assert!(sccs.is_empty());
    }

    #[test]
    fn two_cycle_is_one_scc() {
        let vertices = vec![wid("a"), wid("b")];
        let edges = vec![(wid("a"), wid("b")), (wid("b"), wid("a"))];
        let sccs = tarjan_scc(&vertices, &edges);
        assert_eq!(sccs, vec![vec![wid("a"), wid("b")]]);
    }

    #[test]
    fn disjoint_cycles_yield_separate_sccs() {
        let vertices = vec![wid("a"), wid("b"), wid("c"), wid("d")];
        let edges = vec![
            (wid("a"), wid("b")),
            (wid("b"), wid("a")),
            (wid("c"), wid("d")),
            (wid("d"), wid("c")),
        ];
        let sccs = tarjan_scc(&vertices, &edges);
        assert_eq!(sccs.len(), 2);
    }

    #[test]
    fn deterministic_across_repeated_runs() {
        let vertices = vec![wid("a"), wid("b"), wid("c")];
        let edges = vec![
            (wid("a"), wid("b")),
            (wid("b"), wid("c")),
            (wid("c"), wid("a")),
        ];
        let first = tarjan_scc(&vertices, &edges);
        let second = tarjan_scc(&vertices, &edges);
        assert_eq!(first, second);
    }
}
