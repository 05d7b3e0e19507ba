//! Interrupt-fed paddle state
//!
//! Edge interrupts store the paddle level here; the control loop reads it
//! through [`PaddleInputs`]. An edge arriving within the debounce interval of
//! the last accepted edge on the same paddle is dropped.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use crate::hal::{Duration, HalError, Instant, PaddleInputs};
use crate::types::{PaddleSide, PaddleState};

/// Default lockout after an accepted edge
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);

/// Atomic paddle input state management
/// Safe for use in interrupt contexts
pub struct PaddleInput {
    dit_pressed: AtomicBool,
    dah_pressed: AtomicBool,
    dit_last_edge: AtomicU32,
    dah_last_edge: AtomicU32,
    debounce_us: AtomicU32,
}

impl PaddleInput {
    /// Create new paddle input manager
    pub const fn new() -> Self {
        Self {
            dit_pressed: AtomicBool::new(false),
            dah_pressed: AtomicBool::new(false),
            dit_last_edge: AtomicU32::new(0),
            dah_last_edge: AtomicU32::new(0),
            debounce_us: AtomicU32::new(DEFAULT_DEBOUNCE.as_micros()),
        }
    }

    pub fn set_debounce(&self, debounce: Duration) {
        self.debounce_us.store(debounce.as_micros(), Ordering::Relaxed);
    }

    /// Record a paddle edge (called from interrupt handler).
    ///
    /// `pressed` is already normalised to active-high. Returns false when the
    /// edge was swallowed by the debounce lockout.
    pub fn update(&self, side: PaddleSide, pressed: bool, now: Instant) -> bool {
        let (level, last_edge) = match side {
            PaddleSide::Dit => (&self.dit_pressed, &self.dit_last_edge),
            PaddleSide::Dah => (&self.dah_pressed, &self.dah_last_edge),
        };
        if level.load(Ordering::Relaxed) == pressed {
            return true;
        }

        let last = Instant::from_micros(last_edge.load(Ordering::Relaxed));
        let lockout = Duration::from_micros(self.debounce_us.load(Ordering::Relaxed));
        if now.duration_since(last) < lockout {
            return false;
        }
        level.store(pressed, Ordering::Relaxed);
        last_edge.store(now.as_micros(), Ordering::Relaxed);
        true
    }

    /// Check if Dit paddle is pressed
    pub fn dit(&self) -> bool {
        self.dit_pressed.load(Ordering::Relaxed)
    }

    /// Check if Dah paddle is pressed
    pub fn dah(&self) -> bool {
        self.dah_pressed.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> PaddleState {
        PaddleState::new(self.dit(), self.dah())
    }

    /// Reset all paddle states
    pub fn reset(&self) {
        self.dit_pressed.store(false, Ordering::Relaxed);
        self.dah_pressed.store(false, Ordering::Relaxed);
        self.dit_last_edge.store(0, Ordering::Relaxed);
        self.dah_last_edge.store(0, Ordering::Relaxed);
    }
}

impl Default for PaddleInput {
    fn default() -> Self {
        Self::new()
    }
}

impl PaddleInputs for &PaddleInput {
    type Error = HalError;

    fn is_pressed(&mut self, side: PaddleSide) -> Result<bool, Self::Error> {
        Ok(match side {
            PaddleSide::Dit => self.dit(),
            PaddleSide::Dah => self.dah(),
        })
    }
}
