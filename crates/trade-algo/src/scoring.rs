//! C8 — Quality Scorer.
//!
//! Pure function of a candidate loop's contents, the tenant graph (for the
//! reliability heuristic), and the host-supplied valuation oracle. Never
//! mutates anything and never makes its own I/O, so it is trivially safe to
//! call from inside a cancellable enumeration loop.

use chrono::Utc;
use trade_core::TenantGraph;
use trade_types::{LoopStatus, QualityWeights, Step, TradeLoop, ValuationResolver};

use crate::canonical::canonical_id;

const EPSILON: f64 = 1.0e-9;

/// `1 - (N - 2) / (maxDepth - 1)`, clamped to `[0, 1]`. A 2-cycle always
/// scores 1.0; a cycle at the depth bound approaches 0.
pub fn efficiency(participant_count: usize, max_depth: u8) -> f64 {
    let denom = (max_depth as f64 - 1.0).max(1.0);
    let raw = 1.0 - (participant_count as f64 - 2.0) / denom;
    raw.clamp(0.0, 1.0)
}

/// `1 - (max - min) / max(mean, eps)`, clamped to `[0, 1]`. A loop where
/// every leg trades equal value scores 1.0.
pub fn fairness(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let raw = 1.0 - (max - min) / mean.max(EPSILON);
    raw.clamp(0.0, 1.0)
}

/// A step "relies on a scarce collection want" when the receiver's want for
/// the NFT was satisfied only via collection expansion (not a specific
/// want) and the backing collection currently has two or fewer members —
/// the expansion that produced this edge has little room left to have
/// picked a different NFT, so the edge is more likely to disappear on the
/// next mutation than an edge backed by a specific want.
fn relies_on_scarce_collection_want(graph: &TenantGraph, step: &Step) -> bool {
    let Some(receiver) = graph.wallet(&step.receiver) else {
        return false;
    };
    if receiver.specific_wants.contains(&step.nft) {
        return false;
    }
    let Some(nft) = graph.nft(&step.nft) else {
        return false;
    };
    match graph.collection(&nft.collection) {
        Some(collection) => collection.members.len() <= 2,
        None => false,
    }
}

/// 0.8 if any step relies on a scarce collection want, else 1.0.
pub fn reliability(graph: &TenantGraph, steps: &[Step]) -> f64 {
    if steps.iter().any(|s| relies_on_scarce_collection_want(graph, s)) {
        0.8
    } else {
        1.0
    }
}

pub fn composite(efficiency: f64, fairness: f64, reliability: f64, weights: &QualityWeights) -> f64 {
    weights.efficiency * efficiency + weights.fairness * fairness + weights.reliability * reliability
}

/// Scores a fully materialized candidate (concrete NFT per step) and
/// returns it as a `Pending` `TradeLoop`, ready for the acceptance
/// threshold check and then the active-set diff.
pub fn score_loop(
    graph: &TenantGraph,
    resolver: &dyn ValuationResolver,
    steps: Vec<Step>,
) -> TradeLoop {
    let values: Vec<f64> = steps.iter().map(|s| resolver.value_of(&s.nft).get()).collect();
    let eff = efficiency(steps.len(), graph.config.max_depth);
    let fair = fairness(&values);
    let rel = reliability(graph, &steps);
    let quality_score = composite(eff, fair, rel, &graph.config.weights);

    TradeLoop {
        canonical_id: canonical_id(&steps),
        steps,
        efficiency: eff,
        fairness: fair,
        quality_score,
        discovered_at: Utc::now(),
        status: LoopStatus::Pending,
    }
}
