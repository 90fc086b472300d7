//! Fault reporting for failures that have no caller to return to.
//!
//! A persistence write failing during a remote commit, or a panic on a
//! worker thread, is reported here. One registry is created per agent and
//! shared through the agent context; listeners receive every report.

use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::error;

use crate::error::Error;
use crate::node::listeners::{ListenerKey, ListenerSet};

/// Receives reported faults.
pub trait FaultListener: Send + Sync {
    fn fault(&self, message: &str, error: &Error);
}

impl<F> FaultListener for F
where
    F: Fn(&str, &Error) + Send + Sync,
{
    fn fault(&self, message: &str, error: &Error) {
        self(message, error)
    }
}

pub struct FaultRegistry {
    console: bool,
    listeners: ListenerSet<dyn FaultListener>,
    reported: AtomicU64,
    hook_installed: AtomicBool,
}

impl FaultRegistry {
    /// `console` echoes each report to stderr.
    pub fn new(console: bool) -> Self {
        FaultRegistry {
            console,
            listeners: ListenerSet::new(),
            reported: AtomicU64::new(0),
            hook_installed: AtomicBool::new(false),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn FaultListener>) -> ListenerKey {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    /// Number of reports since creation.
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::SeqCst)
    }

    pub fn report(&self, message: &str, err: &Error) {
        self.reported.fetch_add(1, Ordering::SeqCst);
        error!(error = %err, "{}", message);
        if self.console {
            eprintln!("mibkeeper: {}: {}", message, err);
        }
        for listener in self.listeners.snapshot().iter() {
            listener.fault(message, err);
        }
    }

    /// Route panics on any thread to this registry, then to the previously
    /// installed hook. Returns `false` if this registry already installed
    /// its hook.
    pub fn install_panic_hook(self: &Arc<Self>) -> bool {
        if self.hook_installed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let registry = Arc::downgrade(self);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if let Some(registry) = registry.upgrade() {
                let payload = info
                    .payload()
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| info.payload().downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                let location = info
                    .location()
                    .map(|l| format!("{}:{}", l.file(), l.line()))
                    .unwrap_or_default();
                registry.report(&format!("uncaught panic at {}", location), &Error::Panic(payload));
            }
            previous(info);
        }));
        true
    }
}

impl Default for FaultRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collector() -> (Arc<Mutex<Vec<String>>>, Arc<dyn FaultListener>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Arc<dyn FaultListener> = Arc::new(move |msg: &str, err: &Error| {
            sink.lock().push(format!("{}: {}", msg, err));
        });
        (seen, listener)
    }

    #[test]
    fn report_reaches_listeners() {
        let registry = FaultRegistry::new(false);
        let (seen, listener) = collector();
        registry.add_listener(listener);
        registry.report("commit persist", &Error::Config("x".into()));
        assert_eq!(registry.reported(), 1);
        assert_eq!(seen.lock().len(), 1);
        assert!(seen.lock()[0].starts_with("commit persist"));
    }

    #[test]
    fn removed_listener_is_not_called() {
        let registry = FaultRegistry::new(false);
        let (seen, listener) = collector();
        let key = registry.add_listener(listener);
        assert!(registry.remove_listener(key));
        registry.report("m", &Error::Config("x".into()));
        assert!(seen.lock().is_empty());
        assert_eq!(registry.reported(), 1);
    }

    #[test]
    fn panic_hook_installs_once_and_reports() {
        let registry = Arc::new(FaultRegistry::new(false));
        let (seen, listener) = collector();
        registry.add_listener(listener);
        assert!(registry.install_panic_hook());
        assert!(!registry.install_panic_hook());

        let result = std::thread::spawn(|| panic!("worker exploded")).join();
        assert!(result.is_err());
        // Other tests may panic concurrently; look for ours only.
        assert!(seen.lock().iter().any(|m| m.contains("worker exploded")));
    }
}
