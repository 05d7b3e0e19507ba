//! Speed potentiometer to WPM

use crate::fsm::Keyer;
use crate::hal::{AnalogSource, OutputSink, PaddleInputs};
use crate::types::SpeedConfig;

/// Default averaging window
pub const DEFAULT_WINDOW: usize = 10;

/// Windowed average of raw speed samples with 1 WPM hysteresis.
///
/// A new WPM is produced at most once per `N` samples, when the window has
/// been completely refilled and the mapped value differs from the last one
/// handed out.
#[derive(Debug, Clone)]
pub struct SpeedEstimator<const N: usize = DEFAULT_WINDOW> {
    readings: [u16; N],
    index: usize,
    total: u32,
    last_wpm: Option<u32>,
    config: SpeedConfig,
}

impl<const N: usize> SpeedEstimator<N> {
    const NON_EMPTY: () = assert!(N > 0, "averaging window must hold at least one sample");

    pub fn new(config: SpeedConfig) -> Self {
        let () = Self::NON_EMPTY;
        Self {
            readings: [0; N],
            index: 0,
            total: 0,
            last_wpm: None,
            config,
        }
    }

    pub fn config(&self) -> &SpeedConfig {
        &self.config
    }

    /// Last WPM handed out, if any
    pub fn last_wpm(&self) -> Option<u32> {
        self.last_wpm
    }

    /// Feed one raw sample; returns the WPM to apply when it changed
    pub fn sample(&mut self, raw: u16) -> Option<u32> {
        self.total -= u32::from(self.readings[self.index]);
        self.readings[self.index] = raw;
        self.total += u32::from(raw);
        self.index = (self.index + 1) % N;
        if self.index != 0 {
            return None;
        }

        let average = (self.total / N as u32) as u16;
        let wpm = self.map_to_wpm(average);
        if self.last_wpm.map_or(true, |last| last.abs_diff(wpm) >= 1) {
            self.last_wpm = Some(wpm);
            return Some(wpm);
        }
        None
    }

    /// Read the source once and push any speed change into the keyer
    pub fn poll<A, P, O>(&mut self, source: &mut A, keyer: &mut Keyer<P, O>) -> Option<u32>
    where
        A: AnalogSource,
        P: PaddleInputs,
        O: OutputSink,
    {
        let raw = match source.read_raw() {
            Ok(raw) => raw,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("speed read failed");
                return None;
            }
        };
        let wpm = self.sample(raw)?;
        keyer.set_wpm(wpm);
        Some(wpm)
    }

    /// Linear map of a raw reading onto the WPM range, integer arithmetic
    pub fn map_to_wpm(&self, raw: u16) -> u32 {
        let c = &self.config;
        let raw = raw.clamp(c.raw_min, c.raw_max);
        let (from, to) = if c.inverted {
            (i64::from(c.wpm_max), i64::from(c.wpm_min))
        } else {
            (i64::from(c.wpm_min), i64::from(c.wpm_max))
        };
        let span = i64::from(c.raw_max) - i64::from(c.raw_min);
        if span <= 0 {
            return c.wpm_min;
        }
        let offset = i64::from(raw) - i64::from(c.raw_min);
        (from + offset * (to - from) / span) as u32
    }
}
