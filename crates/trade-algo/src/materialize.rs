//! Turns an elementary vertex cycle from C5 into one or more concrete
//! `Step` sequences, one per distinct choice of NFT at each edge with more
//! than one candidate (spec.md §4.5 "edge multiplicity"). Since the cycle
//! is elementary, every wallet appears once as a giver, so an NFT's unique
//! owner can only satisfy the single edge where that owner gives — variants
//! never repeat a giver or an NFT across steps.

use trade_core::TenantGraph;
use trade_types::{Step, WalletId};

/// Expands a vertex cycle `[v0, v1, ..., v_{n-1}]` (meaning `v0 -> v1 -> ...
/// -> v_{n-1} -> v0`) into concrete step sequences, capped at
/// `remaining_budget` variants. Returns an empty vector if any edge has no
/// satisfying NFT (should not happen for edges C4/C5 derived from the
/// wallet projection, but defends against a stale subgraph view).
pub fn materialize_variants(
    graph: &TenantGraph,
    vertex_cycle: &[WalletId],
    remaining_budget: usize,
) -> Vec<Vec<Step>> {
    let n = vertex_cycle.len();
    if n == 0 {
        return Vec::new();
    }
    let edges: Vec<(WalletId, WalletId)> = (0..n)
        .map(|i| (vertex_cycle[i].clone(), vertex_cycle[(i + 1) % n].clone()))
        .collect();
    materialize_edge_path(graph, &edges, remaining_budget)
}

/// As `materialize_variants`, but over an explicit closed path of
/// `(giver, receiver)` edges rather than one derived from a plain vertex
/// cycle. Used both by the normal per-SCC path and by the bridge-subgraph
/// path (C6), where a "hop" between two community representatives stands in
/// for a real cross-community wallet edge chosen by the caller.
pub fn materialize_edge_path(
    graph: &TenantGraph,
    edges: &[(WalletId, WalletId)],
    remaining_budget: usize,
) -> Vec<Vec<Step>> {
    if edges.is_empty() || remaining_budget == 0 {
        return Vec::new();
    }

    let mut per_edge_choices = Vec::with_capacity(edges.len());
    for (giver, receiver) in edges {
        let nfts = graph.nfts_satisfying_edge(giver, receiver);
        if nfts.is_empty() {
            return Vec::new();
        }
        per_edge_choices.push((giver.clone(), receiver.clone(), nfts));
    }

    let mut variants: Vec<Vec<Step>> = vec![Vec::new()];
    for (giver, receiver, nfts) in per_edge_choices {
        let mut next = Vec::with_capacity(variants.len() * nfts.len());
        'outer: for partial in &variants {
            for nft in &nfts {
                let mut steps = partial.clone();
                steps.push(Step {
                    giver: giver.clone(),
                    receiver: receiver.clone(),
                    nft: nft.clone(),
                });
                next.push(steps);
                if next.len() >= remaining_budget {
                    break 'outer;
                }
            }
        }
        variants = next;
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_types::{EngineConfig, Mutation, Valuation, WantTarget};

    fn add_nft(wallet: &str, nft: &str, collection: &str) -> Mutation {
        Mutation::AddNft {
            wallet: wallet.into(),
            nft: nft.into(),
            collection: collection.into(),
            valuation_hint: Some(Valuation::new(1.0)),
        }
    }

    #[test]
    fn single_candidate_per_edge_yields_one_variant() {
        let mut graph = TenantGraph::new(EngineConfig::default());
        graph
            .apply_mutation_batch(vec![add_nft("a", "n1", "k"), add_nft("b", "n2", "k")])
            .unwrap();
        graph
            .apply_mutation_batch(vec![
                Mutation::AddWant { wallet: "a".into(), target: WantTarget::Nft("n2".into()) },
                Mutation::AddWant { wallet: "b".into(), target: WantTarget::Nft("n1".into()) },
            ])
            .unwrap();

        let cycle = vec![WalletId::from("a"), WalletId::from("b")];
        let variants = materialize_variants(&graph, &cycle, 100);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].len(), 2);
    }

    #[test]
    fn multiple_nft_choices_expand_into_multiple_variants() {
        let mut graph = TenantGraph::new(EngineConfig::default());
        graph
            .apply_mutation_batch(vec![
                add_nft("a", "n1", "k"),
                add_nft("a", "n2", "k"),
                add_nft("b", "n3", "k"),
            ])
            .unwrap();
        graph
            .apply_mutation_batch(vec![
                Mutation::AddWant { wallet: "b".into(), target: WantTarget::Collection("k".into()) },
                Mutation::AddWant { wallet: "a".into(), target: WantTarget::Nft("n3".into()) },
            ])
            .unwrap();

        let cycle = vec![WalletId::from("a"), WalletId::from("b")];
        let variants = materialize_variants(&graph, &cycle, 100);
        // a -> b has two candidate NFTs (n1, n2); b -> a has exactly one (n3).
        assert_eq!(variants.len(), 2);
    }

    #[test]
    fn budget_caps_variant_count() {
        let mut graph = TenantGraph::new(EngineConfig::default());
        graph
            .apply_mutation_batch(vec![
                add_nft("a", "n1", "k"),
                add_nft("a", "n2", "k"),
                add_nft("a", "n3", "k"),
                add_nft("b", "n4", "k"),
            ])
            .unwrap();
        graph
            .apply_mutation_batch(vec![
                Mutation::AddWant { wallet: "b".into(), target: WantTarget::Collection("k".into()) },
                Mutation::AddWant { wallet: "a".into(), target: WantTarget::Nft("n4".into()) },
            ])
            .unwrap();

        let cycle = vec![WalletId::from("a"), WalletId::from("b")];
        let variants = materialize_variants(&graph, &cycle, 2);
        assert_eq!(variants.len(), 2);
    }
}
