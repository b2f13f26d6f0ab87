//! Bounded fallback that periodically re-hides target windows.
//!
//! The hooks catch every known path on their own; the sweep only exists for
//! builds of the Magnifier that show their window some other way. It stops
//! after a fixed number of passes and is cancelled with a signal plus join.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::SweepConfig;
use crate::engine::Suppressor;

#[derive(Debug)]
pub struct Sweeper {
    stop: Sender<()>,
    join: Option<JoinHandle<u32>>,
}

impl Sweeper {
    pub fn start(engine: Weak<Suppressor>, config: SweepConfig) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let interval = Duration::from_millis(config.interval_ms.max(1));
        let join = thread::spawn(move || {
            let mut passes = 0;
            while passes < config.max_passes {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                if !engine.is_ready() {
                    break;
                }
                engine.sweep();
                passes += 1;
            }
            tracing::debug!(passes, "sweeper finished");
            passes
        });
        Self {
            stop,
            join: Some(join),
        }
    }

    /// Signal the thread and wait for it. Returns the number of passes run.
    pub fn stop(mut self) -> u32 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u32 {
        let _ = self.stop.send(());
        let join = self.join.take();
        // The engine can be dropped from inside its own sweep thread.
        if let Some(join) = join.filter(|join| join.thread().id() != thread::current().id()) {
            return join.join().unwrap_or_default();
        }
        0
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.shutdown();
        }
    }
}
