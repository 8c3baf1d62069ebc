//! Default providers backed by `std`.

use super::{ConsoleLevel, ConsoleProvider, RandomProvider, TimeProvider};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Clock measuring from the moment the provider was built.
pub struct StdTimeProvider {
    epoch: Instant,
}

impl StdTimeProvider {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for StdTimeProvider {
    fn start_timer(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn elapsed_millis(&self, start: u64) -> u64 {
        self.start_timer().saturating_sub(start)
    }
}

/// xorshift64 generator, seeded from the system clock unless given a seed.
pub struct StdRandomProvider {
    state: u64,
}

const FALLBACK_SEED: u64 = 0x12345678_9abcdef0;

impl StdRandomProvider {
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(FALLBACK_SEED);
        Self::with_seed(nanos)
    }

    /// Reproducible sequence for tests and replay
    pub fn with_seed(seed: u64) -> Self {
        // xorshift never leaves the all-zero state
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }
}

impl Default for StdRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for StdRandomProvider {
    fn random(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        // top 53 bits fill the mantissa exactly
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Console provider that forwards sandboxed output to the `log` facade
/// under the `jsgate::console` target.
#[derive(Debug, Default)]
pub struct LogConsoleProvider;

impl ConsoleProvider for LogConsoleProvider {
    fn write(&self, level: ConsoleLevel, message: &str) {
        let level = match level {
            ConsoleLevel::Log | ConsoleLevel::Info => log::Level::Info,
            ConsoleLevel::Debug => log::Level::Debug,
            ConsoleLevel::Warn => log::Level::Warn,
            ConsoleLevel::Error => log::Level::Error,
        };
        log::log!(target: "jsgate::console", level, "{message}");
    }
}
