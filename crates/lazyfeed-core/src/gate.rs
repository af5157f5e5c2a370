//! Single-slot admission gate serializing fetches.

use std::ops::{Deref, DerefMut};

use futures_util::lock::{Mutex, MutexGuard};

/// Binary gate `{idle, fetching}` guarding the state a fetch needs.
///
/// At most one [`GatePass`] exists at a time. Waiters are admitted in an
/// unspecified order; exclusivity is the only guarantee.
pub struct AdmissionGate<S> {
    slot: Mutex<S>,
}

impl<S> AdmissionGate<S> {
    pub fn new(state: S) -> Self {
        Self {
            slot: Mutex::new(state),
        }
    }

    /// Enters the gate if it is idle.
    pub fn try_enter(&self) -> Option<GatePass<'_, S>> {
        self.slot.try_lock().map(|guard| GatePass { guard })
    }

    /// Waits until the gate is idle, then enters it.
    pub async fn enter(&self) -> GatePass<'_, S> {
        GatePass {
            guard: self.slot.lock().await,
        }
    }
}

/// Exclusive access to the gated state; leaving scope reopens the gate.
pub struct GatePass<'a, S> {
    guard: MutexGuard<'a, S>,
}

impl<S> Deref for GatePass<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.guard
    }
}

impl<S> DerefMut for GatePass<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_executor::block_on;

    #[test]
    fn second_entry_waits_for_the_first_pass() {
        let gate = AdmissionGate::new(0u32);

        let mut pass = gate.try_enter().expect("idle gate admits");
        *pass += 1;
        assert!(gate.try_enter().is_none(), "gate is single-slot");

        drop(pass);
        let pass = block_on(gate.enter());
        assert_eq!(*pass, 1);
    }

    #[test]
    fn concurrent_holders_never_overlap() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let gate = Arc::new(AdmissionGate::new(()));
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let _pass = block_on(gate.enter());
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        std::thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
