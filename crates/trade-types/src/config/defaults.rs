pub(super) fn max_depth() -> u8 {
    10
}

pub(super) fn max_cycles_per_scc() -> u32 {
    1_000
}

pub(super) fn max_scc_concurrency() -> u8 {
    6
}

pub(super) fn large_scc_threshold() -> u32 {
    500
}

pub(super) fn debounce_window_ms() -> u32 {
    25
}

pub(super) fn compute_deadline_ms() -> u32 {
    30_000
}

pub(super) fn quality_threshold() -> f64 {
    0.5
}

pub(super) fn weights() -> super::QualityWeights {
    super::QualityWeights {
        efficiency: 0.40,
        fairness: 0.30,
        reliability: 0.30,
    }
}

pub(super) fn bloom_false_positive_rate() -> f64 {
    1.0e-3
}

pub(super) fn max_queued_mutations() -> u32 {
    10_000
}

pub(super) fn subscriber_buffer() -> u32 {
    1_024
}

pub(super) fn cancellation_check_interval() -> u32 {
    4_096
}
