//! Host-based integration tests for the keyer core
//!
//! Everything runs against the simulated clock in
//! `keyer_core::test_utils::simulator`; nothing here sleeps in real time.

use keyer_core::{Duration, FarnsworthConfig, FarnsworthStrategy, KeyerConfig};

/// Keyer configuration with plain 3/7 spacing
pub fn standard_config(wpm: u32, hang_ms: u32) -> KeyerConfig {
    KeyerConfig {
        farnsworth: FarnsworthConfig::STANDARD,
        ptt_hang_time: Duration::from_millis(hang_ms),
        ..KeyerConfig::with_wpm(wpm)
    }
}

/// Keyer configuration with Farnsworth spacing `offset` WPM below `wpm`
pub fn farnsworth_config(wpm: u32, strategy: FarnsworthStrategy, offset: u32) -> KeyerConfig {
    KeyerConfig {
        farnsworth: FarnsworthConfig { strategy, offset },
        ptt_hang_time: Duration::from_millis(500),
        ..KeyerConfig::with_wpm(wpm)
    }
}

pub fn ms(v: u32) -> Duration {
    Duration::from_millis(v)
}

#[cfg(test)]
mod translator_tests;
#[cfg(test)]
mod ptt_tests;
#[cfg(test)]
mod adapter_tests;
