//! C9 — Discovery Orchestrator, one instance per tenant.
//!
//! A single async task owns the tenant's `TenantGraph` behind a
//! `parking_lot::RwLock`: it is the sole writer (mutations are applied here,
//! never anywhere else), while queries elsewhere in the process take a
//! read lock for a cheap immutable view (spec.md §5). The same task runs
//! the four-state debounce/compute/emit cycle, offloading the actual
//! SCC/cycle/community pipeline onto a blocking-pool thread so it never
//! stalls the tenant's ability to keep accepting and applying mutations
//! while a round is in flight.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::Instant;
use trade_core::TenantGraph;
use trade_types::{Telemetry, TenantId, ValuationResolver, WalletId};

use crate::mutation_queue::QueuedMutation;
use crate::subscription::{LoopEvent, Publisher};

type TelemetryHook = dyn Fn(Telemetry) + Send + Sync;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Debouncing,
    Computing,
    Emitting,
}

/// Drives the tenant's mutation queue and discovery rounds until the queue
/// is closed (the registry dropped its sender, e.g. during shutdown/drain).
pub async fn run(
    tenant: TenantId,
    graph: Arc<RwLock<TenantGraph>>,
    publisher: Arc<Publisher>,
    resolver: Arc<dyn ValuationResolver>,
    mut queue: mpsc::Receiver<QueuedMutation>,
    telemetry_hook: Option<Arc<TelemetryHook>>,
) {
    let mut pending_touched: HashSet<WalletId> = HashSet::new();
    let mut state = WorkerState::Idle;
    let mut debounce_deadline = Instant::now();

    loop {
        match state {
            WorkerState::Idle => {
                let Some(item) = queue.recv().await else {
                    return;
                };
                apply_and_respond(&graph, item, &mut pending_touched);
                if !pending_touched.is_empty() {
                    let window = Duration::from_millis(graph.read().config.debounce_window_ms as u64);
                    debounce_deadline = Instant::now() + window;
                    state = WorkerState::Debouncing;
                }
            }
            WorkerState::Debouncing => {
                tokio::select! {
                    biased;
                    item = queue.recv() => {
                        match item {
                            Some(item) => {
                                apply_and_respond(&graph, item, &mut pending_touched);
                                let window = Duration::from_millis(graph.read().config.debounce_window_ms as u64);
                                debounce_deadline = Instant::now() + window;
                            }
                            None => return,
                        }
                    }
                    _ = tokio::time::sleep_until(debounce_deadline) => {
                        state = WorkerState::Computing;
                    }
                }
            }
            WorkerState::Computing => {
                let config = graph.read().config.clone();
                let scope = affected_scope(&graph.read(), &pending_touched, config.max_depth as usize);
                let snapshot_bytes = graph.read().snapshot();
                let cancel_flag = Arc::new(AtomicBool::new(false));
                let resolver_for_task = resolver.clone();
                let cancel_flag_for_task = cancel_flag.clone();
                let scope_for_task = scope.clone();
                let mut handle = tokio::task::spawn_blocking(move || {
                    let snap_graph = TenantGraph::restore(&snapshot_bytes)?;
                    let outcome = trade_algo::run_pipeline(
                        &snap_graph,
                        resolver_for_task.as_ref(),
                        &scope_for_task,
                        &cancel_flag_for_task,
                    );
                    Ok::<_, trade_types::Error>(outcome)
                });

                let deadline = tokio::time::sleep(Duration::from_millis(config.compute_deadline_ms as u64));
                tokio::pin!(deadline);

                let outcome = loop {
                    tokio::select! {
                        biased;
                        item = queue.recv() => {
                            match item {
                                Some(item) => {
                                    apply_and_respond(&graph, item, &mut pending_touched);
                                    cancel_flag.store(true, Ordering::Relaxed);
                                }
                                None => {
                                    handle.abort();
                                    return;
                                }
                            }
                        }
                        _ = &mut deadline => {
                            cancel_flag.store(true, Ordering::Relaxed);
                        }
                        result = &mut handle => {
                            break result;
                        }
                    }
                };

                match outcome {
                    Ok(Ok(pipeline_outcome)) => {
                        if pipeline_outcome.cancelled {
                            tracing::debug!(tenant = %tenant, "discovery round cancelled; retrying affected wallets next round");
                            // pending_touched already carries forward whatever
                            // the interrupting mutation(s) touched; the
                            // candidate set itself is discarded (spec.md
                            // §4.9), but affected active loops are still
                            // re-validated directly and flagged `Stale` if a
                            // premise already broke (spec.md §3 lifecycle).
                            mark_stale(&graph, &publisher, &scope);
                            if let Some(hook) = &telemetry_hook {
                                hook(Telemetry::RoundCancelled { tenant: tenant.clone() });
                            }
                        } else {
                            if pipeline_outcome.budget_exhausted {
                                tracing::warn!(tenant = %tenant, "per-SCC cycle budget exhausted this round; partial results kept");
                                if let Some(hook) = &telemetry_hook {
                                    hook(Telemetry::BudgetExhausted { tenant: tenant.clone() });
                                }
                            }
                            state = WorkerState::Emitting;
                            emit(
                                &graph,
                                &publisher,
                                pipeline_outcome.candidates,
                                &scope,
                                pipeline_outcome.budget_exhausted,
                            );
                            pending_touched.clear();
                        }
                    }
                    Ok(Err(err)) => {
                        tracing::error!(tenant = %tenant, %err, "discovery round failed; existing active loops left untouched");
                    }
                    Err(join_err) => {
                        tracing::error!(tenant = %tenant, %join_err, "discovery round task panicked");
                    }
                }
                state = WorkerState::Idle;
            }
            WorkerState::Emitting => {
                // `emit` runs synchronously inside the Computing arm above;
                // this state exists for external visibility only (e.g. a
                // future status endpoint) and always falls straight through.
                state = WorkerState::Idle;
            }
        }
    }
}

fn apply_and_respond(
    graph: &Arc<RwLock<TenantGraph>>,
    item: QueuedMutation,
    pending_touched: &mut HashSet<WalletId>,
) {
    let result = graph.write().apply_mutation_batch(item.batch);
    if let Ok(touched) = &result {
        pending_touched.extend(touched.iter().cloned());
    }
    let _ = item.respond_to.send(result);
}

fn emit(
    graph: &Arc<RwLock<TenantGraph>>,
    publisher: &Publisher,
    candidates: std::collections::HashMap<String, trade_types::TradeLoop>,
    scope: &HashSet<WalletId>,
    budget_exhausted: bool,
) {
    let mut graph = graph.write();
    let (added, removed, reactivated) = graph.diff_active_loops(&candidates, scope, budget_exhausted);
    let removed_ids: Vec<String> = removed.iter().map(|l| l.canonical_id.clone()).collect();
    graph.commit_diff(added.clone(), &removed_ids, &reactivated);
    let version = graph.version();
    drop(graph);

    for loop_ in added {
        publisher.publish(LoopEvent::LoopAdded { loop_, version });
    }
    for loop_ in removed {
        publisher.publish(LoopEvent::LoopRemoved { loop_, version });
    }
}

/// Directly re-validates active loops touching `scope` without running any
/// enumeration at all (used when a round was cancelled outright), emitting
/// `loop_stale` for any whose premises already broke.
fn mark_stale(graph: &Arc<RwLock<TenantGraph>>, publisher: &Publisher, scope: &HashSet<WalletId>) {
    let mut g = graph.write();
    let staled = g.mark_stale_for_touched(scope);
    let version = g.version();
    drop(g);

    for loop_ in staled {
        publisher.publish(LoopEvent::LoopStale { loop_, version });
    }
}

/// BFS over the (undirected view of the) wallet projection, radius
/// `max_depth` hops, seeded at every touched wallet (spec.md §4.9). The
/// radius matches `maxDepth` because a cycle of up to that many participants
/// can place a touched wallet up to `maxDepth - 1` hops from another
/// participant it shares a loop with.
fn affected_scope(
    graph: &TenantGraph,
    touched: &HashSet<WalletId>,
    radius: usize,
) -> HashSet<WalletId> {
    if touched.is_empty() {
        return HashSet::new();
    }
    let mut adjacency: std::collections::HashMap<WalletId, Vec<WalletId>> =
        std::collections::HashMap::new();
    for (u, v) in graph.wallet_projection() {
        adjacency.entry(u.clone()).or_default().push(v.clone());
        adjacency.entry(v).or_default().push(u);
    }

    let mut visited: HashSet<WalletId> = touched.clone();
    let mut frontier: Vec<WalletId> = touched.iter().cloned().collect();
    for _ in 0..radius {
        let mut next = Vec::new();
        for wallet in &frontier {
            if let Some(neighbors) = adjacency.get(wallet) {
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        next.push(neighbor.clone());
                    }
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    visited
}
