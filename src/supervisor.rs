//! Daemon Supervisor.
//!
//! Wires every component at startup in a fixed order (config →
//! directories → memory store → bridge → dispatcher → socket server →
//! scheduler) and tears them down in the reverse order on a single
//! cancellation signal, translated from SIGINT/SIGTERM by
//! [`crate::shutdown::ShutdownCoordinator`].

use crate::bridge::Bridge;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::NovaError;
use crate::memory::MemoryStore;
use crate::scheduler;
use crate::server::SocketServer;
use crate::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct Supervisor {
    config: Config,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        Supervisor { config }
    }

    /// Run until a shutdown signal (SIGINT/SIGTERM, or a `shutdown`
    /// command over the socket) is received. Returns `Ok(())` on a
    /// clean stop; startup failures (ConfigError, BindError, StoreError)
    /// are returned to the caller, which exits non-zero.
    pub async fn run(self) -> Result<(), NovaError> {
        self.config.ensure_directories()?;

        let memory = Arc::new(MemoryStore::new(&self.config.db_path).await?);
        info!("memory store opened at {}", self.config.db_path.display());

        let bridge = Arc::new(Bridge::new(
            &self.config.bridge_dir,
            "nova",
            memory.clone(),
        )?);
        info!("bridge rooted at {}", self.config.bridge_dir.display());

        let traits = memory.get_consciousness_traits().await?;
        let traits = Arc::new(RwLock::new(traits));

        let heartbeat_log_path = self.config.logs_dir.join("heartbeat.log");
        let dispatcher = Arc::new(Dispatcher::new(
            memory.clone(),
            bridge.clone(),
            traits.clone(),
            heartbeat_log_path,
        ));

        let (server, listener) = SocketServer::bind(&self.config.socket_path, dispatcher.clone())?;
        info!("socket server bound at {}", self.config.socket_path.display());

        let coordinator = Arc::new(ShutdownCoordinator::new());
        let signal_coordinator = coordinator.clone();
        tokio::spawn(async move {
            ShutdownCoordinator::handle_signals(signal_coordinator).await;
        });

        let scheduler_handles = scheduler::spawn(
            dispatcher.clone(),
            memory.clone(),
            bridge.clone(),
            traits.clone(),
            self.config.heartbeat_interval_secs,
            self.config.evolve_interval_secs,
            self.config.poll_interval_secs,
            coordinator.clone(),
        );

        server.serve(listener, coordinator).await;

        info!("stopping scheduler tasks");
        for handle in scheduler_handles {
            let _ = handle.await;
        }

        info!("memory store closing");
        memory.close().await;

        info!("supervisor shutdown complete");
        Ok(())
    }
}
