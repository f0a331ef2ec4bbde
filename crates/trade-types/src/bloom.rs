use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

/// A fixed-size Bloom filter over canonical loop keys, sized for a target
/// false-positive rate and expected item count.
///
/// Double hashing (Kirsch-Mitzenmacher) derives all `k` probe positions from
/// two independent SipHash-1-3 digests, avoiding `k` separate hash
/// computations per insert/query.
#[derive(Clone, Debug)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(1.0e-9, 0.5);
        let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let num_bits = (-(n * p.ln()) / ln2_sq).ceil().max(64.0) as u64;
        let num_hashes = ((num_bits as f64 / n) * std::f64::consts::LN_2)
            .round()
            .clamp(1.0, 16.0) as u32;
        let words = (num_bits as usize).div_ceil(64);
        Self {
            bits: vec![0u64; words],
            num_bits,
            num_hashes,
        }
    }

    fn probes(&self, key: &str) -> impl Iterator<Item = u64> + '_ {
        let mut h1 = SipHasher13::new_with_keys(0x5bd1_e995_51a9_3e1f, 0x6a09_e667_f3bc_c908);
        key.hash(&mut h1);
        let d1 = h1.finish();

        let mut h2 = SipHasher13::new_with_keys(0xbb67_ae85_84ca_a73b, 0x3c6e_f372_fe94_f82b);
        key.hash(&mut h2);
        let d2 = h2.finish().wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;

        let num_bits = self.num_bits;
        (0..self.num_hashes).map(move |i| d1.wrapping_add((i as u64).wrapping_mul(d2)) % num_bits)
    }

    pub fn insert(&mut self, key: &str) {
        for bit in self.probes(key).collect::<Vec<_>>() {
            let word = (bit / 64) as usize;
            let offset = bit % 64;
            self.bits[word] |= 1u64 << offset;
        }
    }

    pub fn might_contain(&self, key: &str) -> bool {
        self.probes(key)
            .all(|bit| {
                let word = (bit / 64) as usize;
                let offset = bit % 64;
                self.bits[word] & (1u64 << offset) != 0
            })
    }

    /// Rebuilds the filter from scratch over the given keys, sized for the
    /// given expected item count and target false-positive rate. Used by the
    /// writer to swap in a freshly-sized filter at round end without readers
    /// ever observing a partially-built one.
    pub fn rebuild<'a>(
        keys: impl Iterator<Item = &'a str>,
        expected_items: usize,
        false_positive_rate: f64,
    ) -> Self {
        let mut filter = Self::new(expected_items, false_positive_rate);
        for key in keys {
            filter.insert(key);
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_negatives() {
        let keys: Vec<String> = (0..500).map(|i| format!("key-{i}")).collect();
        let filter = BloomFilter::rebuild(keys.iter().map(|s| s.as_str()), keys.len(), 1.0e-3);
        for key in &keys {
            assert!(filter.might_contain(key));
        }
    }

    #[test]
    fn false_positive_rate_is_roughly_bounded() {
        let keys: Vec<String> = (0..2_000).map(|i| format!("present-{i}")).collect();
        let filter = BloomFilter::rebuild(keys.iter().map(|s| s.as_str()), keys.len(), 1.0e-3);
        let false_positives = (0..20_000)
            .map(|i| format!("absent-{i}"))
            .filter(|k| filter.might_contain(k))
            .count();
        // Generous margin over the 1e-3 target to keep the test stable.
        assert!(false_positives < 200, "got {false_positives} false positives");
    }
}
