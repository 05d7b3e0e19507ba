#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Keyer Core
//!
//! CW keyer core logic library for embedded systems: iambic paddle keying
//! with PTT hang time, Farnsworth spacing, speed-pot tracking and
//! text-to-Morse playback, all driven by a non-blocking poll loop.

pub mod types;
pub mod timing;
pub mod fsm;
pub mod controller;
pub mod hal;
pub mod morse;
pub mod speed;
pub mod translator;
pub mod line;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use timing::*;
pub use fsm::*;
pub use controller::*;
pub use speed::*;
pub use translator::*;
pub use line::*;
pub use hal::{*, Instant, Duration};

/// Keyer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration for most amateur radio applications:
/// 20 WPM, Farnsworth spacing 5 WPM below, 1s PTT hang
pub fn default_config() -> KeyerConfig {
    KeyerConfig::default()
}
