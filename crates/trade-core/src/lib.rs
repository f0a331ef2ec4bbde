//! C1 (Tenant Graph Store) and C3 (Want Expander): the mutable, per-tenant
//! graph of wallets, NFTs, collections, and active trade loops, plus the
//! incremental want-expansion logic that keeps it ready for discovery.

pub mod graph;
pub mod nft;
pub mod snapshot;
pub mod wallet;
pub mod want_expander;

pub use graph::TenantGraph;
pub use nft::{Collection, Nft};
pub use snapshot::{Snapshot, CURRENT_SNAPSHOT_VERSION};
pub use wallet::Wallet;
