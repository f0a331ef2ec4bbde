mod defaults;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Relative weights for the composite quality score. Must sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QualityWeights {
    pub efficiency: f64,
    pub fairness: f64,
    pub reliability: f64,
}

impl QualityWeights {
    fn sum(&self) -> f64 {
        self.efficiency + self.fairness + self.reliability
    }
}

/// Tunable behavior of a single tenant's discovery pipeline.
///
/// Deserializable from whatever configuration format the host uses; every
/// field has a default matching the contract in the engine's external
/// interface documentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "defaults::max_depth")]
    pub max_depth: u8,

    #[serde(default = "defaults::max_cycles_per_scc")]
    pub max_cycles_per_scc: u32,

    #[serde(default = "defaults::max_scc_concurrency")]
    pub max_scc_concurrency: u8,

    #[serde(default = "defaults::large_scc_threshold")]
    pub large_scc_threshold: u32,

    #[serde(default = "defaults::debounce_window_ms")]
    pub debounce_window_ms: u32,

    #[serde(default = "defaults::compute_deadline_ms")]
    pub compute_deadline_ms: u32,

    #[serde(default = "defaults::quality_threshold")]
    pub quality_threshold: f64,

    #[serde(default = "defaults::weights")]
    pub weights: QualityWeights,

    #[serde(default = "defaults::bloom_false_positive_rate")]
    pub bloom_false_positive_rate: f64,

    #[serde(default = "defaults::max_queued_mutations")]
    pub max_queued_mutations: u32,

    #[serde(default = "defaults::subscriber_buffer")]
    pub subscriber_buffer: u32,

    #[serde(default = "defaults::cancellation_check_interval")]
    pub cancellation_check_interval: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: defaults::max_depth(),
            max_cycles_per_scc: defaults::max_cycles_per_scc(),
            max_scc_concurrency: defaults::max_scc_concurrency(),
            large_scc_threshold: defaults::large_scc_threshold(),
            debounce_window_ms: defaults::debounce_window_ms(),
            compute_deadline_ms: defaults::compute_deadline_ms(),
            quality_threshold: defaults::quality_threshold(),
            weights: defaults::weights(),
            bloom_false_positive_rate: defaults::bloom_false_positive_rate(),
            max_queued_mutations: defaults::max_queued_mutations(),
            subscriber_buffer: defaults::subscriber_buffer(),
            cancellation_check_interval: defaults::cancellation_check_interval(),
        }
    }
}

impl EngineConfig {
    /// Validates every bound enumerated in the engine's configuration
    /// contract. Never panics on a bad value; the host decides what to do
    /// with a rejected config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_depth", self.max_depth as f64, 2.0, 15.0)?;
        check_range(
            "max_cycles_per_scc",
            self.max_cycles_per_scc as f64,
            100.0,
            10_000.0,
        )?;
        check_range(
            "max_scc_concurrency",
            self.max_scc_concurrency as f64,
            1.0,
            32.0,
        )?;
        check_range(
            "large_scc_threshold",
            self.large_scc_threshold as f64,
            50.0,
            5_000.0,
        )?;
        check_range("debounce_window_ms", self.debounce_window_ms as f64, 0.0, 250.0)?;
        check_range(
            "compute_deadline_ms",
            self.compute_deadline_ms as f64,
            1_000.0,
            120_000.0,
        )?;
        check_range("quality_threshold", self.quality_threshold, 0.0, 1.0)?;
        check_range(
            "bloom_false_positive_rate",
            self.bloom_false_positive_rate,
            1.0e-5,
            1.0e-2,
        )?;

        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1.0e-9 {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }

        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        Err(ConfigError::OutOfRange { field, min, max, value })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_depth() {
        let mut cfg = EngineConfig::default();
        cfg.max_depth = 16;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut cfg = EngineConfig::default();
        cfg.weights.efficiency = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_document_fills_in_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"max-depth": 6}"#).unwrap();
        assert_eq!(cfg.max_depth, 6);
        assert_eq!(cfg.quality_threshold, defaults::quality_threshold());
        cfg.validate().unwrap();
    }

    #[test]
    fn empty_json_document_matches_default() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn unknown_field_is_rejected_rather_than_silently_ignored() {
        let err = serde_json::from_str::<EngineConfig>(r#"{"max-depht": 6}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }
}
