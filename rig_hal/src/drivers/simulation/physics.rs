//! Background physics thread.
//!
//! Steps the plant with the measured wall-clock delta at a fixed period.
//! Encoder callbacks therefore fire on this thread, asynchronously to the
//! control loop, exactly as hardware interrupts would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::state::SimHandle;

/// Owns the physics thread; stops it on [`PhysicsThread::stop`] or drop.
pub struct PhysicsThread {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PhysicsThread {
    /// Start stepping `sim` every `period`.
    pub fn spawn(sim: SimHandle, period: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        let join = thread::Builder::new()
            .name("sim-physics".to_string())
            .spawn(move || {
                let mut last = Instant::now();
                while r.load(Ordering::SeqCst) {
                    thread::sleep(period);
                    let now = Instant::now();
                    sim.step(now - last);
                    last = now;
                }
                debug!("Physics thread exiting");
            });

        let join = match join {
            Ok(j) => Some(j),
            Err(e) => {
                warn!("Failed to spawn physics thread: {e}");
                None
            }
        };
        Self { running, join }
    }

    /// Stop and join the thread. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl Drop for PhysicsThread {
    fn drop(&mut self) {
        self.stop();
    }
}
