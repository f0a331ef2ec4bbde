//! C9 (Discovery Orchestrator) and C10 (Query & Subscription API): the
//! event-driven, per-tenant runtime that wraps `trade-core`'s graph and
//! `trade-algo`'s pipeline into the engine a host embeds.

pub mod api;
pub mod mutation_queue;
pub mod registry;
pub mod subscription;
pub mod tenant_worker;

pub use api::{Engine, InventoryItem};
pub use registry::Registry;
pub use subscription::{LoopEvent, Publisher, Subscription};
pub use trade_types::Telemetry;
