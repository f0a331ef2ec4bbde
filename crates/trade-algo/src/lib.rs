//! Graph algorithms behind trade loop discovery (C4–C8): SCC partitioning,
//! elementary-cycle enumeration, community partitioning for scale,
//! NFT-multiplicity materialization, canonicalization/dedup, and quality
//! scoring. `pipeline::run` composes all of them into the single pass the
//! discovery orchestrator invokes per affected subgraph.

pub mod canonical;
pub mod cycles;
pub mod louvain;
pub mod materialize;
pub mod pipeline;
pub mod scc;
pub mod scoring;

pub use pipeline::{run as run_pipeline, PipelineOutcome};
