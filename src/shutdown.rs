//! Shared cancellation signal.
//!
//! A single `ShutdownCoordinator` is constructed by the Supervisor and
//! handed to the socket server and every scheduler task. SIGINT/SIGTERM
//! and the `shutdown` command both funnel into the same broadcast.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Represents the shutdown state and coordination mechanisms
pub struct ShutdownCoordinator {
    shutdown_signal: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    /// Creates a new ShutdownCoordinator instance
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Subscribes to shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates the shutdown sequence
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown sequence");
        self.shutdown_signal.store(true, Ordering::SeqCst);
        
        // Broadcast shutdown signal to all subscribers
        if let Err(e) = self.shutdown_tx.send(()) {
            error!("Failed to broadcast shutdown signal: {}", e);
        }
    }

    /// Returns whether shutdown has been initiated
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    /// Handles OS signals for graceful shutdown
    pub async fn handle_signals(coordinator: Arc<ShutdownCoordinator>) {
        let ctrl_c = tokio::signal::ctrl_c();
        
        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C signal");
            }
            _ = terminate => {
                info!("Received SIGTERM signal");
            }
        }

        coordinator.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_broadcasts_to_subscribers() {
        let coordinator = ShutdownCoordinator::new();
        let mut receiver = coordinator.subscribe();

        coordinator.shutdown().await;

        assert!(receiver.recv().await.is_ok());
        assert!(coordinator.is_shutdown_requested());
    }
}