//! Hardware Abstraction Layer for keyer implementation
//!
//! The keyer core only ever talks to four small capabilities: a wrapping
//! microsecond [`Clock`], debounced [`PaddleInputs`], an [`OutputSink`] for the
//! key and PTT lines, and an [`AnalogSource`] for the speed potentiometer.

use core::ops::{Add, Div, Mul};
use embedded_hal::digital::{InputPin, OutputPin};
use crate::types::PaddleSide;

/// Point on the keyer clock, in microseconds.
///
/// The counter is 32 bits wide and wraps roughly every 71 minutes, so there is
/// deliberately no `PartialOrd`: raw ordering is wrong after the first wrap.
/// Use [`Instant::has_reached`] and [`Instant::is_after`] instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant(u32);

impl Instant {
    pub const fn from_micros(us: u32) -> Self {
        Self(us)
    }

    pub const fn from_millis(ms: u32) -> Self {
        Self(ms.wrapping_mul(1000))
    }

    pub const fn as_micros(&self) -> u32 {
        self.0
    }

    /// True once `self` is at or past `deadline`.
    ///
    /// The difference is read as a signed half-range value, which stays
    /// correct across the wrap as long as the two readings are less than
    /// ~35 minutes apart.
    pub const fn has_reached(&self, deadline: Instant) -> bool {
        (self.0.wrapping_sub(deadline.0) as i32) >= 0
    }

    /// Strictly later than `other`, wrap-safe.
    pub const fn is_after(&self, other: Instant) -> bool {
        (self.0.wrapping_sub(other.0) as i32) > 0
    }

    /// Elapsed time since an earlier instant, wrap-safe.
    pub const fn duration_since(&self, earlier: Instant) -> Duration {
        Duration(self.0.wrapping_sub(earlier.0))
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant(self.0.wrapping_add(rhs.0))
    }
}

/// Span of keyer time in microseconds
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Duration(u32);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub const fn from_micros(us: u32) -> Self {
        Self(us)
    }

    pub const fn from_millis(ms: u32) -> Self {
        Self(ms.saturating_mul(1000))
    }

    pub const fn as_micros(&self) -> u32 {
        self.0
    }

    pub const fn as_millis(&self) -> u32 {
        self.0 / 1000
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_add(rhs.0))
    }
}

impl Div<u32> for Duration {
    type Output = Duration;

    fn div(self, rhs: u32) -> Duration {
        Duration(self.0 / rhs)
    }
}

impl Mul<u32> for Duration {
    type Output = Duration;

    fn mul(self, rhs: u32) -> Duration {
        Duration(self.0.saturating_mul(rhs))
    }
}

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Analog conversion failed
    AdcError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::AdcError => write!(f, "Analog conversion failed"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Monotonic (wrapping) time source
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Debounced paddle state, normalised so that `true` means pressed
pub trait PaddleInputs {
    type Error: From<HalError>;

    /// Check if the given paddle is currently pressed
    fn is_pressed(&mut self, side: PaddleSide) -> Result<bool, Self::Error>;
}

/// Key and PTT output lines
pub trait OutputSink {
    type Error: From<HalError>;

    /// Sidetone and indicator together (true = key down)
    fn set_key(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Transmitter enable
    fn set_ptt(&mut self, on: bool) -> Result<(), Self::Error>;
}

/// Raw speed-control samples
pub trait AnalogSource {
    type Error: From<HalError>;

    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Paddle pair on embedded-hal input pins (pulled up, grounded when pressed)
pub struct EmbeddedHalPaddles<DIT, DAH> {
    dit: DIT,
    dah: DAH,
}

impl<DIT, DAH> EmbeddedHalPaddles<DIT, DAH>
where
    DIT: InputPin,
    DAH: InputPin,
{
    pub fn new(dit: DIT, dah: DAH) -> Self {
        Self { dit, dah }
    }

    pub fn release(self) -> (DIT, DAH) {
        (self.dit, self.dah)
    }
}

impl<DIT, DAH> PaddleInputs for EmbeddedHalPaddles<DIT, DAH>
where
    DIT: InputPin,
    DAH: InputPin,
{
    type Error = HalError;

    fn is_pressed(&mut self, side: PaddleSide) -> Result<bool, Self::Error> {
        // Active low
        match side {
            PaddleSide::Dit => self.dit.is_low().map_err(|_| HalError::GpioError),
            PaddleSide::Dah => self.dah.is_low().map_err(|_| HalError::GpioError),
        }
    }
}

/// Key, indicator and PTT lines on embedded-hal output pins
pub struct EmbeddedHalOutputs<KEY, LED, PTT> {
    key: KEY,
    led: LED,
    ptt: PTT,
    inverted: bool,
}

impl<KEY, LED, PTT> EmbeddedHalOutputs<KEY, LED, PTT>
where
    KEY: OutputPin,
    LED: OutputPin,
    PTT: OutputPin,
{
    pub fn new(key: KEY, led: LED, ptt: PTT, inverted: bool) -> Self {
        Self { key, led, ptt, inverted }
    }

    pub fn release(self) -> (KEY, LED, PTT) {
        (self.key, self.led, self.ptt)
    }

    fn drive<P: OutputPin>(pin: &mut P, state: bool) -> Result<(), HalError> {
        if state {
            pin.set_high().map_err(|_| HalError::GpioError)
        } else {
            pin.set_low().map_err(|_| HalError::GpioError)
        }
    }
}

impl<KEY, LED, PTT> OutputSink for EmbeddedHalOutputs<KEY, LED, PTT>
where
    KEY: OutputPin,
    LED: OutputPin,
    PTT: OutputPin,
{
    type Error = HalError;

    fn set_key(&mut self, on: bool) -> Result<(), Self::Error> {
        let led = Self::drive(&mut self.led, on);
        Self::drive(&mut self.key, on != self.inverted)?;
        led
    }

    fn set_ptt(&mut self, on: bool) -> Result<(), Self::Error> {
        Self::drive(&mut self.ptt, on)
    }
}

/// Clock backed by the embassy time driver, truncated to 32 bits
#[cfg(feature = "embassy-time")]
#[derive(Copy, Clone, Debug, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy-time")]
impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::from_micros(embassy_time::Instant::now().as_micros() as u32)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use core::cell::Cell;

    /// Settable clock
    #[derive(Default)]
    pub struct MockClock {
        now: Cell<Instant>,
    }

    impl MockClock {
        pub fn new(start: Instant) -> Self {
            Self { now: Cell::new(start) }
        }

        pub fn set(&self, now: Instant) {
            self.now.set(now);
        }

        pub fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            self.now.get()
        }
    }

    #[derive(Default, Debug)]
    pub struct MockPaddles {
        dit: bool,
        dah: bool,
        failing: bool,
    }

    impl MockPaddles {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&mut self, dit: bool, dah: bool) {
            self.dit = dit;
            self.dah = dah;
        }

        pub fn set_pressed(&mut self, side: PaddleSide, pressed: bool) {
            match side {
                PaddleSide::Dit => self.dit = pressed,
                PaddleSide::Dah => self.dah = pressed,
            }
        }

        /// Make every read fail with `GpioError`
        pub fn set_failing(&mut self, failing: bool) {
            self.failing = failing;
        }
    }

    impl PaddleInputs for MockPaddles {
        type Error = HalError;

        fn is_pressed(&mut self, side: PaddleSide) -> Result<bool, Self::Error> {
            if self.failing {
                return Err(HalError::GpioError);
            }
            Ok(match side {
                PaddleSide::Dit => self.dit,
                PaddleSide::Dah => self.dah,
            })
        }
    }

    #[derive(Default, Debug)]
    pub struct MockOutputs {
        key: bool,
        ptt: bool,
        key_writes: u32,
        ptt_writes: u32,
        failing: bool,
    }

    impl MockOutputs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_key_down(&self) -> bool {
            self.key
        }

        pub fn is_ptt_on(&self) -> bool {
            self.ptt
        }

        pub fn key_writes(&self) -> u32 {
            self.key_writes
        }

        pub fn ptt_writes(&self) -> u32 {
            self.ptt_writes
        }

        /// Make every write fail after recording the requested level
        pub fn set_failing(&mut self, failing: bool) {
            self.failing = failing;
        }
    }

    impl OutputSink for MockOutputs {
        type Error = HalError;

        fn set_key(&mut self, on: bool) -> Result<(), Self::Error> {
            self.key = on;
            self.key_writes += 1;
            if self.failing {
                Err(HalError::GpioError)
            } else {
                Ok(())
            }
        }

        fn set_ptt(&mut self, on: bool) -> Result<(), Self::Error> {
            self.ptt = on;
            self.ptt_writes += 1;
            if self.failing {
                Err(HalError::GpioError)
            } else {
                Ok(())
            }
        }
    }

    /// Analog source returning a fixed value until changed
    #[derive(Default, Debug)]
    pub struct MockAnalog {
        value: u16,
        failing: bool,
    }

    impl MockAnalog {
        pub fn new(value: u16) -> Self {
            Self { value, failing: false }
        }

        pub fn set(&mut self, value: u16) {
            self.value = value;
        }

        pub fn set_failing(&mut self, failing: bool) {
            self.failing = failing;
        }
    }

    impl AnalogSource for MockAnalog {
        type Error = HalError;

        fn read_raw(&mut self) -> Result<u16, Self::Error> {
            if self.failing {
                return Err(HalError::AdcError);
            }
            Ok(self.value)
        }
    }
}
