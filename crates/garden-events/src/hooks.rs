use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tracing::{debug, info};

/// Handle returned by [`CleanupHooks::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Process-wide registry of handlers that run when the process is interrupted
/// or exits.
pub struct CleanupHooks {
    next_id: AtomicU64,
    hooks: Mutex<Vec<(HookId, String, Hook)>>,
}

impl CleanupHooks {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            hooks: Mutex::new(Vec::new()),
        }
    }

    fn hooks(&self) -> MutexGuard<'_, Vec<(HookId, String, Hook)>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a hook. Hooks run once, in registration order.
    pub fn register<F>(&self, name: impl Into<String>, hook: F) -> HookId
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        debug!(hook = %name, "Cleanup hook registered");
        self.hooks().push((id, name, Box::new(hook)));
        id
    }

    pub fn unregister(&self, id: HookId) -> bool {
        let mut hooks = self.hooks();
        let before = hooks.len();
        hooks.retain(|(hook_id, _, _)| *hook_id != id);
        hooks.len() != before
    }

    pub fn len(&self) -> usize {
        self.hooks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and clear every registered hook.
    pub async fn run_all(&self) {
        let hooks = std::mem::take(&mut *self.hooks());
        for (_, name, hook) in hooks {
            debug!(hook = %name, "Running cleanup hook");
            hook().await;
        }
    }

    /// Resolves on Ctrl-C, or SIGTERM on unix.
    pub async fn wait_for_interrupt() {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                debug!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    debug!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, running cleanup hooks"),
            _ = terminate => info!("Received terminate signal, running cleanup hooks"),
        }
    }

    /// Wait for an interrupt, then run every hook.
    pub async fn run_on_interrupt(self: Arc<Self>) {
        Self::wait_for_interrupt().await;
        self.run_all().await;
    }
}

impl Default for CleanupHooks {
    fn default() -> Self {
        Self::new()
    }
}
