//! Progress reporting for long running computations.
//! Reporting is a side effect only, an observer can stop a computation by returning [`ComputationStatus::Cancel`].

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationStatus {
    Continue,
    Cancel,
}

pub trait ProgressNotification: Send + Sync {
    /// Start a new computation consisting of `total` steps.
    fn reset(&self, total: u64);
    /// Mark one step as done, returns `Error::Cancelled` when the observer wants the computation to stop.
    fn tick(&self) -> Result<()>;
}

impl<P: ProgressNotification> ProgressNotification for &P {
    fn reset(&self, total: u64) {
        (**self).reset(total);
    }

    fn tick(&self) -> Result<()> {
        (**self).tick()
    }
}

/// Progress implementation that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyProgress;

impl ProgressNotification for DummyProgress {
    fn reset(&self, _total: u64) {}

    fn tick(&self) -> Result<()> {
        Ok(())
    }
}

/// Reports the steps of one stage of a computation to a progress that was reset for all stages.
/// The reset of the stage is ignored, so the reported progress keeps increasing over the stages.
pub struct SubProgress<'a, P: ProgressNotification> {
    parent: &'a P,
}

impl<'a, P: ProgressNotification> SubProgress<'a, P> {
    pub fn new(parent: &'a P) -> Self {
        Self { parent }
    }
}

impl<P: ProgressNotification> ProgressNotification for SubProgress<'_, P> {
    fn reset(&self, _total: u64) {}

    fn tick(&self) -> Result<()> {
        self.parent.tick()
    }
}

/// Forwards the progress to a callback receiving (completed steps, total steps).
pub struct CallbackProgress<F>
where
    F: Fn(u64, u64) -> ComputationStatus + Send + Sync,
{
    total: AtomicU64,
    current: AtomicU64,
    cb: F,
}

impl<F> CallbackProgress<F>
where
    F: Fn(u64, u64) -> ComputationStatus + Send + Sync,
{
    pub fn with_cb(cb: F) -> Self {
        Self {
            total: AtomicU64::new(0),
            current: AtomicU64::new(0),
            cb,
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Completed fraction in the range [0, 1]
    pub fn fraction(&self) -> f64 {
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return 0.0;
        }

        self.current() as f64 / total as f64
    }
}

impl<F> ProgressNotification for CallbackProgress<F>
where
    F: Fn(u64, u64) -> ComputationStatus + Send + Sync,
{
    fn reset(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
        self.current.store(0, Ordering::SeqCst);
        (self.cb)(0, total);
    }

    fn tick(&self) -> Result<()> {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        match (self.cb)(current, self.total.load(Ordering::SeqCst)) {
            ComputationStatus::Continue => Ok(()),
            ComputationStatus::Cancel => Err(Error::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn callback_progress_is_monotonic() {
        let seen = Mutex::new(Vec::new());
        let progress = CallbackProgress::with_cb(|done, total| {
            seen.lock().expect("poisoned").push((done, total));
            ComputationStatus::Continue
        });

        progress.reset(3);
        for _ in 0..3 {
            progress.tick().expect("tick");
        }

        assert_eq!(progress.fraction(), 1.0);
        assert_eq!(*seen.lock().expect("poisoned"), vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn sub_progress_continues_the_parent() {
        let seen = Mutex::new(Vec::new());
        let progress = CallbackProgress::with_cb(|done, total| {
            seen.lock().expect("poisoned").push((done, total));
            ComputationStatus::Continue
        });

        progress.reset(4);
        for _ in 0..2 {
            let stage = SubProgress::new(&progress);
            stage.reset(2);
            stage.tick().expect("tick");
            stage.tick().expect("tick");
        }

        assert_eq!(*seen.lock().expect("poisoned"), vec![(0, 4), (1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn callback_progress_cancels() {
        let progress = CallbackProgress::with_cb(|done, _| {
            if done >= 2 {
                ComputationStatus::Cancel
            } else {
                ComputationStatus::Continue
            }
        });

        progress.reset(10);
        assert!(progress.tick().is_ok());
        assert!(matches!(progress.tick(), Err(Error::Cancelled)));
    }
}
