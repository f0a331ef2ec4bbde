use thiserror::Error;

use crate::ids::{NftId, WalletId};

/// Errors surfaced synchronously to a mutation or query caller.
///
/// Internal-only signals (cancelled rounds, exhausted enumeration budgets,
/// lagged subscribers) are not part of this enum; they are reported as
/// `tracing` events and, where the contract calls for it, as terminal
/// subscription events (see `trade_engine::subscription`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("NFT {nft} is already owned by wallet {owner}")]
    ConflictingOwnership { nft: NftId, owner: WalletId },

    #[error("unknown wallet {0}")]
    UnknownWallet(WalletId),

    #[error("unknown NFT {0}")]
    UnknownNft(NftId),

    #[error("tenant mutation queue is full, retry with backoff")]
    TenantBackpressured,

    #[error("snapshot format version {found} is incompatible with supported version {supported}")]
    SnapshotIncompatible { found: u32, supported: u32 },

    #[error("tenant worker for this request is no longer running")]
    EngineUnavailable,
}

/// Raised by `EngineConfig::validate` when a configuration value is outside
/// the bounds enumerated in the engine's external contract.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be in range [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("quality weights (w_e, w_f, w_r) must sum to 1.0, got {sum}")]
    WeightsDoNotSumToOne { sum: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
