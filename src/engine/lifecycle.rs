use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use super::{Phase, Suppressor};
use crate::cache::IdentityCache;
use crate::hooks::EntryPoint;
use crate::sweeper::Sweeper;
use crate::win32::SW_HIDE;

impl Suppressor {
    /// Install everything in order and open the readiness gate.
    ///
    /// A failed mandatory step unwinds whatever was already acquired and leaves
    /// the engine inert.
    pub fn activate(self: &Arc<Self>) -> anyhow::Result<()> {
        {
            let mut state = self.lock();
            match state.phase {
                Phase::Uninitialized => {}
                Phase::Ready => {
                    debug!("already activated");
                    return Ok(());
                }
                phase => return Err(anyhow!("activation already in progress ({phase:?})")),
            }
            state.cache = IdentityCache::new(self.config.cache_capacity());
            state.phase = Phase::StateReady;
        }
        info!("initializing");

        if let Err(err) = self.install_hooks() {
            self.deactivate();
            return Err(err);
        }
        self.lock().phase = Phase::HooksInstalled;

        if self.config.watch_window_procs {
            match self.host.watch_window_procs() {
                Ok(token) => self.lock().observer = Some(token),
                Err(err) => warn!(%err, "window watcher unavailable; continuing without it"),
            }
        }
        self.lock().phase = Phase::MessageHookInstalled;

        let Some(host_window) = self.api.create_host_window() else {
            self.deactivate();
            return Err(anyhow!("failed to create host window"));
        };
        {
            let mut state = self.lock();
            state.host_window = Some(host_window);
            state.phase = Phase::HostWindowCreated;
        }
        info!(%host_window, "host window created");

        self.ready.store(true, Ordering::Release);
        self.lock().phase = Phase::Ready;

        if let Some(sweep) = self.config.sweep {
            let sweeper = Sweeper::start(Arc::downgrade(self), sweep);
            self.lock().sweeper = Some(sweeper);
        }
        info!("initialization complete");
        Ok(())
    }

    fn install_hooks(&self) -> anyhow::Result<()> {
        for entry in EntryPoint::ALL {
            if entry == EntryPoint::DwmSetWindowAttribute && !self.config.hook_compositor {
                continue;
            }
            match self.host.install(entry) {
                Ok(()) => self.lock().installed.push(entry),
                Err(err) if entry.is_mandatory() => {
                    return Err(anyhow!(err).context(format!("installing mandatory hook {entry}")));
                }
                Err(err) => warn!(%err, "optional hook unavailable"),
            }
        }
        debug!(count = self.lock().installed.len(), "hooks installed");
        Ok(())
    }

    /// Close the gate and release everything activation acquired. Safe to call
    /// in any phase, including after a partial activation.
    pub fn deactivate(&self) {
        self.ready.store(false, Ordering::Release);

        let (sweeper, observer) = {
            let mut state = self.lock();
            if state.phase == Phase::Uninitialized {
                return;
            }
            (state.sweeper.take(), state.observer.take())
        };
        info!("uninitializing");

        if let Some(sweeper) = sweeper {
            sweeper.stop();
        }
        if let Some(token) = observer {
            self.host.unwatch_window_procs(token);
        }

        self.restore_all_subclasses();

        let host_window = self.lock().host_window.take();
        if let Some(host_window) = host_window.filter(|hwnd| self.api.is_window(*hwnd)) {
            self.api.destroy_window(host_window);
            info!(%host_window, "host window destroyed");
        }

        let installed = std::mem::take(&mut self.lock().installed);
        for entry in installed {
            self.host.uninstall(entry);
        }

        {
            let mut state = self.lock();
            state.cache.clear();
            state.phase = Phase::Uninitialized;
        }
        info!("uninitialization complete");
    }

    /// One pass of the fallback sweep: hide every visible target window of
    /// this process. Returns how many were hidden.
    ///
    /// Runs off the windows' own threads, so the hide is posted rather than
    /// sent; teardown may be joining this thread from the UI thread.
    pub fn sweep(&self) -> usize {
        if !self.is_ready() {
            return 0;
        }
        let mut hidden = 0;
        for hwnd in self.api.process_windows() {
            if self.is_target(hwnd) && self.api.is_window_visible(hwnd) {
                self.api.show_window_async(hwnd, SW_HIDE);
                hidden += 1;
            }
        }
        if hidden > 0 {
            debug!(hidden, "sweep hid Magnifier windows");
        }
        hidden
    }
}
