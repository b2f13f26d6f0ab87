//! The suppression engine.
//!
//! [`Suppressor`] is the single context every intercepted call is routed to.
//! It owns the readiness flag, the identity cache, the host window and the
//! subclass records; the last three sit behind one lock that is only held for
//! short critical sections and never across an OS call.

mod entry_points;
mod lifecycle;
mod messages;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{ClassRef, WindowApi};
use crate::cache::IdentityCache;
use crate::classify::Classifier;
use crate::config::Config;
use crate::hooks::{EntryPoint, HookHost, ObserverToken};
use crate::subclass::SubclassTable;
use crate::sweeper::Sweeper;
use crate::win32::WindowHandle;

/// Activation progress, used to unwind exactly what was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    StateReady,
    HooksInstalled,
    MessageHookInstalled,
    HostWindowCreated,
    Ready,
}

pub(crate) struct ProcessState {
    phase: Phase,
    cache: IdentityCache,
    host_window: Option<WindowHandle>,
    subclasses: SubclassTable,
    observer: Option<ObserverToken>,
    installed: Vec<EntryPoint>,
    sweeper: Option<Sweeper>,
}

/// Counters of suppressed actions.
#[derive(Debug, Default)]
pub struct SuppressionStats {
    entries: [AtomicU64; EntryPoint::COUNT],
    messages: AtomicU64,
}

impl SuppressionStats {
    fn record(&self, entry: EntryPoint) {
        self.entries[entry.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, entry: EntryPoint) -> u64 {
        self.entries[entry.index()].load(Ordering::Relaxed)
    }

    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }
}

pub struct Suppressor {
    config: Config,
    classifier: Classifier,
    api: Arc<dyn WindowApi>,
    host: Arc<dyn HookHost>,
    ready: AtomicBool,
    state: Mutex<ProcessState>,
    stats: SuppressionStats,
}

impl Suppressor {
    pub fn new(config: Config, api: Arc<dyn WindowApi>, host: Arc<dyn HookHost>) -> Self {
        let state = ProcessState {
            phase: Phase::Uninitialized,
            cache: IdentityCache::new(config.cache_capacity()),
            host_window: None,
            subclasses: SubclassTable::new(config.max_subclassed_windows),
            observer: None,
            installed: Vec::new(),
            sweeper: None,
        };
        Self {
            classifier: Classifier::from_config(&config),
            config,
            api,
            host,
            ready: AtomicBool::new(false),
            state: Mutex::new(state),
            stats: SuppressionStats::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &SuppressionStats {
        &self.stats
    }

    /// Gate checked by every hook before any suppression logic runs.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn host_window(&self) -> Option<WindowHandle> {
        self.lock().host_window
    }

    pub fn is_subclassed(&self, hwnd: WindowHandle) -> bool {
        self.lock().subclasses.contains(hwnd)
    }

    /// Cached classification. Destroyed handles are rejected before the cache
    /// is consulted so a stale verdict never leaks out. A failed query counts
    /// as "not a target" for this call and is not remembered.
    pub fn is_target(&self, hwnd: WindowHandle) -> bool {
        if hwnd.is_null() || !self.api.is_window(hwnd) {
            return false;
        }
        if let Some(hit) = self.lock().cache.lookup(hwnd) {
            return hit;
        }
        match self.classifier.classify(self.api.as_ref(), hwnd) {
            Some(is_target) => {
                self.lock().cache.record(hwnd, is_target);
                is_target
            }
            None => false,
        }
    }

    /// Whether a creation request names a target window.
    pub fn matches_request(&self, class: &ClassRef, title: Option<&str>) -> bool {
        self.classifier.matches_request(class, title)
    }

    fn lock(&self) -> MutexGuard<'_, ProcessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Call the captured previous implementation of `entry`, or return
    /// `fallback` when none was captured.
    fn original<T>(&self, entry: EntryPoint, fallback: T, call: impl FnOnce(&dyn WindowApi) -> T) -> T {
        if self.host.is_bound(entry) {
            call(self.api.as_ref())
        } else {
            tracing::warn!(%entry, "previous implementation not captured; failing safe");
            fallback
        }
    }
}
