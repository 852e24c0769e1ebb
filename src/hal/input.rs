//! Operator input for manual probing.

use core::sync::atomic::{AtomicI32, Ordering};

/// Front-panel controls used while jogging the nozzle by hand.
pub trait OperatorInput {
    /// The confirm button is currently down.
    fn button_pressed(&mut self) -> bool;

    /// Block while the button is held; `true` once it has been held long
    /// enough to count as a cancel.
    fn click_and_hold(&mut self) -> bool;

    /// Block until the button is released.
    fn wait_for_release(&mut self);

    /// Service background work while waiting on the operator.
    fn idle(&mut self);
}

/// Jog wheel click counter.
///
/// Incremented from the encoder interrupt with [`JogEncoder::add`] and drained
/// by the probing loop with [`JogEncoder::take`]. Both are single atomic
/// operations, so no click is lost or counted twice.
#[derive(Debug, Default)]
pub struct JogEncoder {
    clicks: AtomicI32,
}

impl JogEncoder {
    /// A counter with no pending clicks.
    pub const fn new() -> Self {
        Self {
            clicks: AtomicI32::new(0),
        }
    }

    /// Record `clicks` (negative turns the other way). Interrupt safe.
    #[inline]
    pub fn add(&self, clicks: i32) {
        self.clicks.fetch_add(clicks, Ordering::AcqRel);
    }

    /// Read and clear the pending clicks.
    #[inline]
    pub fn take(&self) -> i32 {
        self.clicks.swap(0, Ordering::AcqRel)
    }

    /// Pending clicks without clearing.
    #[inline]
    pub fn pending(&self) -> i32 {
        self.clicks.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears() {
        let encoder = JogEncoder::new();
        encoder.add(3);
        encoder.add(-1);
        assert_eq!(encoder.pending(), 2);
        assert_eq!(encoder.take(), 2);
        assert_eq!(encoder.take(), 0);
    }

    #[test]
    fn test_concurrent_add_and_take() {
        use std::sync::Arc;

        let encoder = Arc::new(JogEncoder::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let enc = Arc::clone(&encoder);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        enc.add(1);
                    }
                })
            })
            .collect();

        let mut drained = 0;
        while handles.iter().any(|h| !h.is_finished()) {
            drained += encoder.take();
        }
        for h in handles {
            h.join().unwrap();
        }
        drained += encoder.take();

        assert_eq!(drained, 4000);
    }
}
