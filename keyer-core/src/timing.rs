//! WPM to element/space durations
//!
//! PARIS timing: one dit lasts `1.2 / wpm` seconds. Farnsworth spacing is
//! pluggable because the right stretch for inter-character and inter-word gaps
//! is a calibration choice rather than a fixed rule.

use crate::hal::Duration;
use crate::types::Element;

/// Dit length in microseconds at 1 WPM
pub const DIT_CONSTANT_US: u32 = 1_200_000;

/// Lowest speed the timing model accepts; smaller values are clamped
pub const MIN_WPM: u32 = 1;

/// How character and word spaces are stretched at low speeds
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FarnsworthStrategy {
    /// Plain 3/7 dit spacing, Farnsworth WPM ignored
    Standard,
    /// Spaces scaled by `clamp(1.2 - 0.02 * wpm, 0.4, 1.0)`; the word space
    /// uses the Farnsworth WPM for its factor
    SlidingFactor,
    /// Word space timed as if sent at the Farnsworth WPM
    EffectiveSpeed,
}

/// Farnsworth strategy plus the offset that derives the Farnsworth WPM
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FarnsworthConfig {
    pub strategy: FarnsworthStrategy,
    /// Farnsworth WPM = WPM - offset
    pub offset: u32,
}

impl FarnsworthConfig {
    pub const STANDARD: FarnsworthConfig = FarnsworthConfig {
        strategy: FarnsworthStrategy::Standard,
        offset: 0,
    };

    /// Farnsworth WPM for a character speed, never above `wpm` or below
    /// [`MIN_WPM`]
    pub fn farnsworth_wpm(&self, wpm: u32) -> u32 {
        let wpm = wpm.max(MIN_WPM);
        wpm.saturating_sub(self.offset).clamp(MIN_WPM, wpm)
    }
}

/// The five durations every keyer transition is measured against
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DurationSet {
    pub dit: Duration,
    pub dah: Duration,
    pub element_space: Duration,
    pub character_space: Duration,
    pub word_space: Duration,
}

impl DurationSet {
    /// Duration of a keyed element or a space
    pub const fn of(&self, element: Element) -> Duration {
        match element {
            Element::Dit => self.dit,
            Element::Dah => self.dah,
            Element::CharSpace => self.character_space,
            Element::WordSpace => self.word_space,
        }
    }
}

/// Sliding Farnsworth factor in thousandths, clamped to [400, 1000]
fn sliding_factor_permille(wpm: u32) -> u64 {
    let factor = 1200_i64 - 20 * i64::from(wpm);
    factor.clamp(400, 1000) as u64
}

fn scaled(base: u32, units: u32, permille: u64) -> Duration {
    Duration::from_micros((u64::from(base) * u64::from(units) * permille / 1000) as u32)
}

/// Compute the duration set for a character speed and a Farnsworth speed.
///
/// `wpm` is clamped to at least [`MIN_WPM`]; `farnsworth_wpm` is clamped into
/// `[MIN_WPM, wpm]`.
pub fn durations(wpm: u32, farnsworth_wpm: u32, strategy: FarnsworthStrategy) -> DurationSet {
    let wpm = wpm.max(MIN_WPM);
    let farnsworth_wpm = farnsworth_wpm.clamp(MIN_WPM, wpm);
    let dit = DIT_CONSTANT_US / wpm;

    let (character_space, word_space) = match strategy {
        FarnsworthStrategy::Standard => (scaled(dit, 3, 1000), scaled(dit, 7, 1000)),
        FarnsworthStrategy::SlidingFactor => (
            scaled(dit, 3, sliding_factor_permille(wpm)),
            scaled(dit, 7, sliding_factor_permille(farnsworth_wpm)),
        ),
        FarnsworthStrategy::EffectiveSpeed => (
            scaled(dit, 3, 1000),
            scaled(DIT_CONSTANT_US / farnsworth_wpm, 7, 1000),
        ),
    };

    DurationSet {
        dit: Duration::from_micros(dit),
        dah: Duration::from_micros(dit * 3),
        element_space: Duration::from_micros(dit),
        character_space,
        word_space,
    }
}
