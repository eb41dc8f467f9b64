use std::time::{Duration, Instant};

/// Blocks the calling thread between retry attempts.
pub trait Backoff {
    /// Suspend for at least `duration`.
    fn pause(&mut self, duration: Duration);
}

impl<B: Backoff + ?Sized> Backoff for &mut B {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Real-time backoff using `std::thread::sleep`.
///
/// Sleeps against a deadline, so an early wake-up only costs another sleep
/// for the remainder; it never shortens the pause.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Backoff for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep(deadline - now);
        }
    }
}
