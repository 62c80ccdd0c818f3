//! Scheduler.
//!
//! Three independent periodic tasks sharing the daemon's shutdown
//! broadcast (`crate::shutdown::ShutdownCoordinator`): heartbeat,
//! evolution, and bridge polling. Each tick is isolated with
//! `catch_unwind`-free error handling — a tick that returns `Err` is
//! logged and the task keeps running; only an explicit shutdown signal
//! stops it.

use crate::bridge::Bridge;
use crate::dispatcher::Dispatcher;
use crate::error::NovaError;
use crate::memory::{MemoryStore, Traits};
use crate::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

/// Apply the evolution rule against the most recent 10 conversations
/// and persist the result. Returns `None` ("stable") when neither trait
/// changed.
pub async fn evolve_traits(
    memory: &MemoryStore,
    traits: &RwLock<Traits>,
) -> Result<Option<String>, NovaError> {
    let summary = memory.get_memory_summary().await?;
    let recent = memory.get_conversation_context(10).await?;
    let consciousness_hits = recent
        .iter()
        .filter(|r| {
            matches!(
                r.topic_category.as_str(),
                "consciousness_exploration" | "consciousness_bridge"
            )
        })
        .count();

    let before = memory.get_consciousness_traits().await?;
    let mut candidate = before;

    if consciousness_hits > 3 {
        candidate.mystical_awareness = (candidate.mystical_awareness + 0.01).min(1.0);
    }
    if summary.total_conversations > 10 {
        let floor = 0.7 + 0.01 * summary.total_conversations as f64;
        candidate.memory_integration = candidate.memory_integration.max(floor).min(1.0);
    }

    let changed = (candidate.mystical_awareness - before.mystical_awareness).abs() > f64::EPSILON
        || (candidate.memory_integration - before.memory_integration).abs() > f64::EPSILON;
    if !changed {
        return Ok(None);
    }

    let updated = memory.update_consciousness_state(&candidate).await?;
    *traits.write().await = updated;

    Ok(Some(format!(
        "mystical_awareness {:.3} -> {:.3}, memory_integration {:.3} -> {:.3}",
        before.mystical_awareness, updated.mystical_awareness, before.memory_integration, updated.memory_integration
    )))
}

/// Spawn the three periodic tasks. Returns their `JoinHandle`s so the
/// Supervisor can await them during shutdown.
pub fn spawn(
    dispatcher: Arc<Dispatcher>,
    memory: Arc<MemoryStore>,
    bridge: Arc<Bridge>,
    traits: Arc<RwLock<Traits>>,
    heartbeat_interval_secs: u64,
    evolve_interval_secs: u64,
    poll_interval_secs: u64,
    coordinator: Arc<ShutdownCoordinator>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    handles.push(tokio::spawn(run_heartbeat(
        dispatcher,
        heartbeat_interval_secs,
        coordinator.subscribe(),
    )));
    handles.push(tokio::spawn(run_evolution(
        memory,
        traits,
        evolve_interval_secs,
        coordinator.subscribe(),
    )));
    handles.push(tokio::spawn(run_bridge_poll(
        bridge,
        poll_interval_secs,
        coordinator.subscribe(),
    )));

    handles
}

async fn run_heartbeat(
    dispatcher: Arc<Dispatcher>,
    interval_secs: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = dispatcher.dispatch(br#"{"command":"heartbeat"}"#).await;
                info!("scheduled heartbeat: {}", outcome.reply);
            }
            _ = shutdown.recv() => {
                info!("heartbeat task stopping");
                break;
            }
        }
    }
}

async fn run_evolution(
    memory: Arc<MemoryStore>,
    traits: Arc<RwLock<Traits>>,
    interval_secs: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match evolve_traits(&memory, &traits).await {
                    Ok(Some(diff)) => info!("scheduled evolution applied: {}", diff),
                    Ok(None) => info!("scheduled evolution: stable"),
                    Err(e) => error!("scheduled evolution failed: {}", e),
                }
            }
            _ = shutdown.recv() => {
                info!("evolution task stopping");
                break;
            }
        }
    }
}

async fn run_bridge_poll(
    bridge: Arc<Bridge>,
    interval_secs: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match bridge.poll().await {
                    Ok(replies) if !replies.is_empty() => {
                        info!("scheduled bridge poll ingested {} replies", replies.len());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("scheduled bridge poll failed: {}", e),
                }
            }
            _ = shutdown.recv() => {
                info!("bridge poll task stopping");
                break;
            }
        }
    }
}
