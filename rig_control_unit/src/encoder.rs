//! Encoder position estimator.
//!
//! The encoder callback is the only writer of the pulse counter; the control
//! loop and the tuning tools read it. Both sides share one `AtomicI64`.

use rig_common::axis::EncoderConfig;
use rig_common::driver::DriverError;
use rig_common::encoder::{EncoderRegistration, EncoderSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};

/// Writer handle owned by the encoder callback.
#[derive(Debug, Clone)]
pub struct PulseCounter {
    counts: Arc<AtomicI64>,
}

impl PulseCounter {
    /// Apply one decoded transition (`+1` or `-1`).
    #[inline]
    pub fn apply(&self, direction: i8) {
        self.counts.fetch_add(direction as i64, Ordering::Relaxed);
    }
}

/// Signed pulse count scaled to physical units.
pub struct PositionEstimator {
    counts: Arc<AtomicI64>,
    gain: f64,
    registration: Option<Box<dyn EncoderRegistration>>,
}

impl PositionEstimator {
    /// Register with `source` and start counting.
    pub fn attach(
        source: &mut dyn EncoderSource,
        config: &EncoderConfig,
    ) -> Result<Self, DriverError> {
        let mut estimator = Self::detached(config.gain);
        let writer = estimator.counter();
        let registration = source.register(config, Box::new(move |dir| writer.apply(dir)))?;
        estimator.registration = Some(registration);
        info!("Encoder attached (gain={} units/count)", config.gain);
        Ok(estimator)
    }

    /// Estimator with no encoder behind it; feed it through [`Self::counter`].
    pub fn detached(gain: f64) -> Self {
        Self {
            counts: Arc::new(AtomicI64::new(0)),
            gain,
            registration: None,
        }
    }

    /// A writer handle onto the same counter.
    pub fn counter(&self) -> PulseCounter {
        PulseCounter {
            counts: self.counts.clone(),
        }
    }

    /// Raw pulse count.
    #[inline]
    pub fn counts(&self) -> i64 {
        self.counts.load(Ordering::Relaxed)
    }

    /// Position in physical units.
    #[inline]
    pub fn position(&self) -> f64 {
        self.counts() as f64 * self.gain
    }

    /// Units per count.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Shift the origin to `target`, so a later position is relative to it.
    ///
    /// Edges arriving during the call are kept.
    pub fn rebase(&self, target: f64) {
        let shift = (target / self.gain).round() as i64;
        let before = self.counts.fetch_sub(shift, Ordering::Relaxed);
        debug!("Rebased encoder by {shift} counts (was {before})");
    }

    /// Reset the count to zero.
    pub fn zero(&self) {
        self.counts.store(0, Ordering::Relaxed);
    }

    /// Stop receiving transitions. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(mut reg) = self.registration.take() {
            reg.cancel();
            info!("Encoder callback released");
        }
    }

    /// Whether a callback registration is still held.
    pub fn is_attached(&self) -> bool {
        self.registration.is_some()
    }
}

impl Drop for PositionEstimator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_common::encoder::EdgeCallback;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    const GAIN: f64 = 0.011_270_884_64;

    struct FlagRegistration(Arc<AtomicBool>);

    impl EncoderRegistration for FlagRegistration {
        fn cancel(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct ManualSource {
        cancelled: Arc<AtomicBool>,
        callback: Option<EdgeCallback>,
    }

    impl EncoderSource for ManualSource {
        fn register(
            &mut self,
            _config: &EncoderConfig,
            callback: EdgeCallback,
        ) -> Result<Box<dyn EncoderRegistration>, DriverError> {
            self.callback = Some(callback);
            Ok(Box::new(FlagRegistration(self.cancelled.clone())))
        }
    }

    #[test]
    fn counts_edges_in_both_directions() {
        let est = PositionEstimator::detached(GAIN);
        let w = est.counter();
        for _ in 0..10 {
            w.apply(1);
        }
        w.apply(-1);
        assert_eq!(est.counts(), 9);
        assert!((est.position() - 9.0 * GAIN).abs() < 1e-12);
    }

    #[test]
    fn rebase_subtracts_rounded_target() {
        let est = PositionEstimator::detached(GAIN);
        let w = est.counter();
        for _ in 0..8875 {
            w.apply(1);
        }
        // 100 / GAIN = 8872.42 → 8872
        est.rebase(100.0);
        assert_eq!(est.counts(), 3);
    }

    #[test]
    fn concurrent_writers_lose_no_edges() {
        let est = PositionEstimator::detached(1.0);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let w = est.counter();
                thread::spawn(move || {
                    let dir = if i % 2 == 0 { 1 } else { -1 };
                    for _ in 0..10_000 {
                        w.apply(dir);
                    }
                    for _ in 0..5_000 {
                        w.apply(1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(est.counts(), 20_000);
    }

    #[test]
    fn attach_routes_callback_and_cancel_is_idempotent() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut source = ManualSource {
            cancelled: cancelled.clone(),
            callback: None,
        };
        let mut est = PositionEstimator::attach(&mut source, &EncoderConfig::default()).unwrap();

        let cb = source.callback.take().unwrap();
        cb(1);
        cb(1);
        cb(-1);
        assert_eq!(est.counts(), 1);

        est.cancel();
        est.cancel();
        assert!(cancelled.load(Ordering::SeqCst));
        assert!(!est.is_attached());
    }

    #[test]
    fn drop_releases_registration() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut source = ManualSource {
            cancelled: cancelled.clone(),
            callback: None,
        };
        {
            let _est = PositionEstimator::attach(&mut source, &EncoderConfig::default()).unwrap();
        }
        assert!(cancelled.load(Ordering::SeqCst));
    }
}
