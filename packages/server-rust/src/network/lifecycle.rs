//! Service lifecycle: state machine, shutdown signalling and the files
//! orchestrators watch (ready marker, termination message).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::{info, warn};

/// Written to when startup fails and no termination file is configured.
pub const DEFAULT_TERMINATION_FILE: &str = "/dev/termination-log";

/// Service state, transitioned by [`ServiceLifecycle`].
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Configuration loaded, listener not yet serving.
    Starting,
    /// Accepting requests.
    Ready,
    /// Shutdown signalled; finishing in-flight requests.
    Draining,
    /// Listener closed.
    Stopped,
}

impl ServiceState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Lock-free lifecycle state plus a shutdown broadcast.
#[derive(Debug)]
pub struct ServiceLifecycle {
    state: ArcSwap<ServiceState>,
    shutdown_signal: watch::Sender<bool>,
}

impl ServiceLifecycle {
    /// Creates a lifecycle in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: ArcSwap::from_pointee(ServiceState::Starting),
            shutdown_signal: tx,
        }
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        **self.state.load()
    }

    pub fn set_ready(&self) {
        self.state.store(Arc::new(ServiceState::Ready));
    }

    /// Moves to `Draining` and wakes every shutdown receiver.
    pub fn trigger_shutdown(&self) {
        self.state.store(Arc::new(ServiceState::Draining));
        self.shutdown_signal.send_replace(true);
    }

    pub fn mark_stopped(&self) {
        self.state.store(Arc::new(ServiceState::Stopped));
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_signal.borrow()
    }

    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Resolves once [`trigger_shutdown`](Self::trigger_shutdown) has been called.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_receiver();
        // The sender lives in `self`, so `wait_for` cannot observe a closed channel.
        let _ = rx.wait_for(|stopping| *stopping).await;
    }
}

impl Default for ServiceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Touches the readiness marker, creating parent directories as needed.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be written.
pub async fn write_ready_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, b"ready\n").await?;
    info!(file = %path.display(), "wrote ready file");
    Ok(())
}

/// Configured termination file, or [`DEFAULT_TERMINATION_FILE`].
#[must_use]
pub fn termination_file(configured: Option<&Path>) -> PathBuf {
    configured.map_or_else(|| PathBuf::from(DEFAULT_TERMINATION_FILE), Path::to_path_buf)
}

/// Records why the process is about to exit. Failures are only logged.
pub fn write_termination_message(path: &Path, message: &str) {
    if let Err(err) = std::fs::write(path, message) {
        warn!(
            file = %path.display(),
            error = %err,
            "failed to write termination message"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn state_machine_transitions() {
        let lifecycle = ServiceLifecycle::new();
        assert_eq!(lifecycle.state(), ServiceState::Starting);

        lifecycle.set_ready();
        assert_eq!(lifecycle.state(), ServiceState::Ready);
        assert!(!lifecycle.is_shutting_down());

        lifecycle.trigger_shutdown();
        assert_eq!(lifecycle.state(), ServiceState::Draining);
        assert!(lifecycle.is_shutting_down());

        lifecycle.mark_stopped();
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
    }

    #[test]
    fn state_names() {
        assert_eq!(ServiceState::Starting.as_str(), "starting");
        assert_eq!(ServiceState::Draining.as_str(), "draining");
    }

    #[tokio::test]
    async fn wait_for_shutdown_wakes_on_trigger() {
        let lifecycle = Arc::new(ServiceLifecycle::new());
        let waiter = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.wait_for_shutdown().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        lifecycle.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_if_already_triggered() {
        let lifecycle = ServiceLifecycle::new();
        lifecycle.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(1), lifecycle.wait_for_shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ready_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/ready");
        write_ready_file(&path).await.unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn termination_file_defaults() {
        assert_eq!(
            termination_file(None),
            PathBuf::from("/dev/termination-log")
        );
        assert_eq!(
            termination_file(Some(Path::new("/tmp/term"))),
            PathBuf::from("/tmp/term")
        );
    }

    #[test]
    fn termination_message_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("termination-log");
        write_termination_message(&path, "failed to load config: missing server.yaml");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "failed to load config: missing server.yaml"
        );
    }
}
