//! Shared vocabulary for the trade discovery engine: identifiers, the
//! mutation wire format, trade-loop types, external resolver traits,
//! configuration, and the Bloom filter used for canonical-id dedup.
//!
//! This crate has no algorithmic logic of its own; it exists so that
//! `trade-core` (graph state) and `trade-algo` (discovery pipeline) can
//! share types without depending on each other.

pub mod bloom;
pub mod config;
pub mod error;
pub mod ids;
pub mod loop_types;
pub mod mutation;
pub mod telemetry;
pub mod valuation;

pub use bloom::BloomFilter;
pub use config::{EngineConfig, QualityWeights};
pub use error::{ConfigError, Error, Result};
pub use ids::{CollectionId, NftId, TenantId, WalletId};
pub use loop_types::{LoopStatus, Step, TradeLoop};
pub use mutation::{Mutation, MutationBatch, WantTarget};
pub use telemetry::Telemetry;
pub use valuation::{CollectionResolver, NullResolver, Valuation, ValuationResolver};
