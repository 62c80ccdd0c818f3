//! Socket Server.
//!
//! Owns the listening UNIX socket exclusively; it is the only component
//! that calls `accept()`. One request per connection, no framing
//! header: read up to a bounded number of bytes, hand to the
//! [`Dispatcher`], write the reply, close.

use crate::dispatcher::Dispatcher;
use crate::error::NovaError;
use crate::shutdown::ShutdownCoordinator;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

/// Requests larger than this are truncated at the read; well-formed
/// command requests are expected to fit comfortably inside it.
const MAX_REQUEST_BYTES: usize = 64 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SocketServer {
    socket_path: PathBuf,
    dispatcher: Arc<Dispatcher>,
}

impl SocketServer {
    /// Remove any stale socket file, bind, and set mode 0666 so local
    /// CLI callers running as a different user can still connect.
    pub fn bind(socket_path: impl Into<PathBuf>, dispatcher: Arc<Dispatcher>) -> Result<(Self, UnixListener), NovaError> {
        let socket_path = socket_path.into();
        remove_stale_socket(&socket_path)?;

        let listener = UnixListener::bind(&socket_path)
            .map_err(|e| NovaError::Bind(format!("binding {}: {}", socket_path.display(), e)))?;

        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o666))
            .map_err(|e| NovaError::Bind(format!("chmod {}: {}", socket_path.display(), e)))?;

        Ok((
            SocketServer {
                socket_path,
                dispatcher,
            },
            listener,
        ))
    }

    /// Accept connections until the shutdown signal fires. Each
    /// connection is handled on its own task; shutdown does not forcibly
    /// kill in-flight handlers, it simply stops accepting new ones — the
    /// caller is expected to await outstanding handler tasks separately
    /// if a hard deadline is required.
    pub async fn serve(self, listener: UnixListener, coordinator: Arc<ShutdownCoordinator>) {
        info!("socket server listening on {}", self.socket_path.display());
        let mut shutdown_rx = coordinator.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let dispatcher = self.dispatcher.clone();
                            let coordinator = coordinator.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, dispatcher, coordinator).await {
                                    warn!("connection handler error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("accept() failed: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("socket server stopping (shutdown signal)");
                    break;
                }
            }
        }
        remove_stale_socket(&self.socket_path).ok();
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    dispatcher: Arc<Dispatcher>,
    coordinator: Arc<ShutdownCoordinator>,
) -> Result<(), NovaError> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let n = tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| NovaError::Protocol("read timeout".into()))?
        .map_err(NovaError::Io)?;

    if n == 0 {
        return Ok(());
    }

    let outcome = dispatcher.dispatch(&buf[..n]).await;

    tokio::time::timeout(WRITE_TIMEOUT, stream.write_all(outcome.reply.as_bytes()))
        .await
        .map_err(|_| NovaError::Protocol("write timeout".into()))?
        .map_err(NovaError::Io)?;
    stream.shutdown().await.ok();

    if outcome.shutdown_requested {
        info!("shutdown command received, broadcasting cancellation");
        coordinator.shutdown().await;
    }

    Ok(())
}

fn remove_stale_socket(path: &Path) -> Result<(), NovaError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(NovaError::Bind(format!(
            "removing stale socket {}: {}",
            path.display(),
            e
        ))),
    }
}
