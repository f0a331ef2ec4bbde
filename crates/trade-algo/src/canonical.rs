//! C7 — Canonical ID & Dedup.
//!
//! Reduces a candidate loop to a rotation- and direction-invariant key so
//! that the same cycle discovered via different start vertices, NFT
//! multiplicity choices, or enumeration order collapses to one entry.
//!
//! The Bloom filter (`trade_types::BloomFilter`) that guards the exact
//! active-loop map is a pure pre-check: every lookup that matters here is
//! ultimately an exact string comparison against a `HashMap<String, _>`
//! keyed by the canonical id itself, so a Bloom collision can never cause
//! two distinct loops to be treated as the same one — it can only cost an
//! extra exact lookup (spec.md §4.7, "fails closed").

use std::collections::HashMap;

use trade_types::{Step, TradeLoop};

/// `canonicalId(L) = canonicalId(rotate(L, k)) = canonicalId(reverse(L))`
/// for any elementary cycle `L` and rotation `k` (spec.md invariant 4).
pub fn canonical_id(steps: &[Step]) -> String {
    let seq: Vec<(String, String)> = steps
        .iter()
        .map(|s| (s.giver.as_str().to_owned(), s.nft.as_str().to_owned()))
        .collect();

    let mut reversed = seq.clone();
    reversed.reverse();

    std::cmp::min(min_rotation_encoding(&seq), min_rotation_encoding(&reversed))
}

fn min_rotation_encoding(seq: &[(String, String)]) -> String {
    let n = seq.len();
    if n == 0 {
        return String::new();
    }
    (0..n).map(|start| encode_rotation(seq, start)).min().unwrap()
}

fn encode_rotation(seq: &[(String, String)], start: usize) -> String {
    let n = seq.len();
    let mut buf = String::new();
    for offset in 0..n {
        let (wallet, nft) = &seq[(start + offset) % n];
        if offset > 0 {
            buf.push(',');
        }
        buf.push_str(wallet);
        buf.push('|');
        buf.push_str(nft);
    }
    buf
}

/// Collapses a round's freshly enumerated candidates to one `TradeLoop` per
/// canonical id, keeping the first occurrence encountered. Enumeration order
/// upstream is already deterministic (sorted SCC members, sorted adjacency,
/// smallest-NFT-first edge choices), so "first occurrence" is itself
/// deterministic across repeated runs on the same graph state.
pub fn dedup_candidates(candidates: Vec<TradeLoop>) -> HashMap<String, TradeLoop> {
    let mut by_id: HashMap<String, TradeLoop> = HashMap::new();
    for candidate in candidates {
        by_id.entry(candidate.canonical_id.clone()).or_insert(candidate);
    }
    by_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_types::WalletId;

    fn step(g: &str, r: &str, n: &str) -> Step {
        Step {
            giver: WalletId::from(g),
            receiver: WalletId::from(r),
            nft: n.into(),
        }
    }

    #[test]
    fn rotation_invariant() {
        let original = vec![step("a", "b", "x"), step("b", "c", "y"), step("c", "a", "z")];
        let rotated = vec![step("b", "c", "y"), step("c", "a", "z"), step("a", "b", "x")];
        assert_eq!(canonical_id(&original), canonical_id(&rotated));
    }

    #[test]
    fn direction_invariant() {
        let original = vec![step("a", "b", "x"), step("b", "c", "y"), step("c", "a", "z")];
        let mut reversed = original.clone();
        reversed.reverse();
        assert_eq!(canonical_id(&original), canonical_id(&reversed));
    }

    #[test]
    fn distinguishes_different_loops() {
        let a = vec![step("a", "b", "x"), step("b", "a", "y")];
        let b = vec![step("a", "b", "x"), step("b", "a", "z")];
        assert_ne!(canonical_id(&a), canonical_id(&b));
    }
}
