//! Core data types for the keyer

use crate::hal::Duration;
use crate::timing::{FarnsworthConfig, FarnsworthStrategy, MIN_WPM};

/// Morse code elements
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Element {
    /// Dit (short element)
    Dit,
    /// Dah (long element)
    Dah,
    /// Character space (inter-character pause)
    CharSpace,
    /// Word space (inter-word pause)
    WordSpace,
}

impl Element {
    /// Parse one symbol of a Morse pattern
    pub const fn from_symbol(symbol: u8) -> Option<Element> {
        match symbol {
            b'.' => Some(Element::Dit),
            b'-' => Some(Element::Dah),
            _ => None,
        }
    }
}

/// Paddle side identification
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PaddleSide {
    /// Dit paddle (typically left side)
    Dit,
    /// Dah paddle (typically right side)
    Dah,
}

/// Paddle levels sampled once per tick
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PaddleState {
    pub dit: bool,
    pub dah: bool,
}

impl PaddleState {
    pub const RELEASED: PaddleState = PaddleState { dit: false, dah: false };

    pub const fn new(dit: bool, dah: bool) -> Self {
        Self { dit, dah }
    }

    /// Both paddles pressed (squeeze)
    pub const fn both_pressed(&self) -> bool {
        self.dit && self.dah
    }
}

/// FSM states for the keyer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyerState {
    /// Ready for paddle or programmatic input
    Idle,
    /// Single dit, from a paddle or a trigger
    TransmittingDit,
    /// Single dah, from a paddle or a trigger
    TransmittingDah,
    /// Dit sent as part of a squeeze
    IambicDit,
    /// Dah sent as part of a squeeze
    IambicDah,
    /// Silent gap of one dit after every element
    WaitingElementSpace,
    WaitingCharacterSpace,
    WaitingWordSpace,
}

impl KeyerState {
    /// Returns the element being keyed in this state, if any
    pub const fn keyed_element(&self) -> Option<Element> {
        match self {
            KeyerState::TransmittingDit | KeyerState::IambicDit => Some(Element::Dit),
            KeyerState::TransmittingDah | KeyerState::IambicDah => Some(Element::Dah),
            _ => None,
        }
    }
}

/// Configuration validation failures
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// WPM range is empty, inverted or starts below the minimum
    InvalidWpmRange,
    /// Initial WPM is outside the configured range
    InitialWpmOutOfRange,
    /// PTT hang time exceeds the supported maximum
    HangTimeTooLong,
    /// Analog range is empty or inverted
    InvalidAnalogRange,
}

#[cfg(feature = "std")]
impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::InvalidWpmRange => write!(f, "WPM range must satisfy 1 <= min < max"),
            ConfigError::InitialWpmOutOfRange => write!(f, "Initial WPM outside the WPM range"),
            ConfigError::HangTimeTooLong => write!(f, "PTT hang time must be <= 10s"),
            ConfigError::InvalidAnalogRange => write!(f, "Analog range must satisfy min < max"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Pin assignment, board-specific numbering
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub dit: u8,
    pub dah: u8,
    pub output: u8,
    pub ptt: u8,
    pub indicator: u8,
    pub speed: u8,
}

/// Speed potentiometer mapping
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpeedConfig {
    pub wpm_min: u32,
    pub wpm_max: u32,
    /// Reverse the pot direction (for pots wired backwards)
    pub inverted: bool,
    pub raw_min: u16,
    pub raw_max: u16,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            wpm_min: 5,
            wpm_max: 40,
            inverted: true,
            raw_min: 0,
            raw_max: 1023,
        }
    }
}

/// Keyer configuration parameters
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyerConfig {
    pub pins: PinConfig,
    /// Speed at power-up, before the pot has been read
    pub initial_wpm: u32,
    pub speed: SpeedConfig,
    pub farnsworth: FarnsworthConfig,
    /// How long PTT stays asserted after keying stops
    pub ptt_hang_time: Duration,
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig {
                dit: 3,
                dah: 2,
                output: 10,
                ptt: 11,
                indicator: 13,
                speed: 0,
            },
            initial_wpm: 20,
            speed: SpeedConfig::default(),
            farnsworth: FarnsworthConfig {
                strategy: FarnsworthStrategy::SlidingFactor,
                offset: 5,
            },
            ptt_hang_time: Duration::from_millis(1000),
        }
    }
}

impl KeyerConfig {
    /// Longest accepted PTT hang time
    pub const MAX_HANG_TIME: Duration = Duration::from_millis(10_000);

    /// Default configuration running at `wpm`
    pub fn with_wpm(wpm: u32) -> Self {
        Self {
            initial_wpm: wpm,
            ..Default::default()
        }
    }

    /// Check the configuration for values the keyer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speed.wpm_min < MIN_WPM || self.speed.wpm_min >= self.speed.wpm_max {
            return Err(ConfigError::InvalidWpmRange);
        }
        if self.initial_wpm < self.speed.wpm_min || self.initial_wpm > self.speed.wpm_max {
            return Err(ConfigError::InitialWpmOutOfRange);
        }
        if self.ptt_hang_time > Self::MAX_HANG_TIME {
            return Err(ConfigError::HangTimeTooLong);
        }
        if self.speed.raw_min >= self.speed.raw_max {
            return Err(ConfigError::InvalidAnalogRange);
        }
        Ok(())
    }
}
