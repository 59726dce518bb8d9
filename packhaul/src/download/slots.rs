//! Counting slots that bound how many downloads run at once.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A fixed pool of worker slots.
///
/// Workers block in [`WorkerSlots::acquire`] until a slot frees up, so
/// at most `count` downloads transfer bytes concurrently regardless of
/// how many tasks have been submitted.
pub struct WorkerSlots {
    available: Mutex<usize>,
    released: Condvar,
}

impl WorkerSlots {
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            available: Mutex::new(count.max(1)),
            released: Condvar::new(),
        })
    }

    /// Block until a slot is free and claim it.
    ///
    /// The slot is held until the returned guard drops.
    pub fn acquire(self: &Arc<Self>) -> SlotGuard {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        SlotGuard {
            slots: Arc::clone(self),
        }
    }

    /// Claim a slot without blocking, if one is free.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        let mut available = self.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(SlotGuard {
            slots: Arc::clone(self),
        })
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        self.released.notify_one();
    }
}

/// RAII slot claim; dropping it returns the slot to the pool.
pub struct SlotGuard {
    slots: Arc<WorkerSlots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_acquire_up_to_limit() {
        let slots = WorkerSlots::new(2);

        let a = slots.try_acquire();
        let b = slots.try_acquire();
        let c = slots.try_acquire();

        assert!(a.is_some());
        assert!(b.is_some());
        assert!(c.is_none());
    }

    #[test]
    fn test_drop_releases_slot() {
        let slots = WorkerSlots::new(1);

        let guard = slots.try_acquire().unwrap();
        assert!(slots.try_acquire().is_none());

        drop(guard);
        assert!(slots.try_acquire().is_some());
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let slots = WorkerSlots::new(1);
        let guard = slots.acquire();

        let slots2 = Arc::clone(&slots);
        let waiter = thread::spawn(move || {
            let _guard = slots2.acquire();
        });

        // Waiter should still be blocked on the held slot
        thread::sleep(Duration::from_millis(30));
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.join().unwrap();
    }

    #[test]
    fn test_zero_count_is_clamped_to_one() {
        let slots = WorkerSlots::new(0);
        assert!(slots.try_acquire().is_some());
    }
}
