//! The time source the dispatcher's per-tick budget is measured against.

/// A monotonic millisecond counter.
///
/// Firmware typically backs this with SysTick or a free-running timer. The
/// counter may wrap; the dispatcher only ever subtracts nearby readings.
pub trait Clock {
    /// Milliseconds since some fixed point.
    fn now_ms(&mut self) -> u32;
}

/// A [`Clock`] that never advances.
///
/// Disables the per-tick handler budget entirely: every reading is zero,
/// so elapsed time is always zero. Useful on targets with no timebase,
/// where handlers are trusted to keep their steps short.
pub struct NullClock;

impl Clock for NullClock {
    fn now_ms(&mut self) -> u32 {
        0
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        /// A [`Clock`] backed by [`std::time::Instant`].
        pub struct StdClock {
            epoch: std::time::Instant,
        }

        impl StdClock {
            /// A clock whose epoch is the moment of construction.
            pub fn new() -> StdClock {
                StdClock {
                    epoch: std::time::Instant::now(),
                }
            }
        }

        impl Default for StdClock {
            fn default() -> StdClock {
                StdClock::new()
            }
        }

        impl Clock for StdClock {
            fn now_ms(&mut self) -> u32 {
                self.epoch.elapsed().as_millis() as u32
            }
        }
    }
}
