use crate::ids::TenantId;

/// Internal-only signals a tenant worker's round can produce. These never
/// surface as `Error` — a cancelled or budget-exhausted round is not a
/// failure, it's a normal outcome of the debounce/budget contract — but a
/// host may still want visibility into them beyond the `tracing` events
/// each round already emits.
#[derive(Clone, Debug, PartialEq)]
pub enum Telemetry {
    /// A round was interrupted by a new mutation or the compute deadline
    /// and discarded without emitting; `pending_touched` carries forward.
    RoundCancelled { tenant: TenantId },
    /// A round hit `maxCyclesPerSCC` on at least one SCC but still
    /// committed and emitted its partial results.
    BudgetExhausted { tenant: TenantId },
}
