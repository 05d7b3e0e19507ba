//! Finite State Machine implementation for the keyer
//!
//! [`KeyerFsm`] is the pure machine: every transition takes the sampled paddle
//! levels and the current tick's clock reading and returns the output
//! [`Effects`] it wants applied. [`Keyer`] owns the paddles and the output sink
//! and applies those effects after each transition.

use crate::hal::{Duration, Instant, OutputSink, PaddleInputs};
use crate::timing::{self, DurationSet, FarnsworthConfig, MIN_WPM};
use crate::types::{Element, KeyerConfig, KeyerState, PaddleSide, PaddleState};

/// Output changes requested by one transition
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Effects {
    /// New key (sidetone + indicator) level, if it changes
    pub key: Option<bool>,
    /// New PTT level, if it changes
    pub ptt: Option<bool>,
}

impl Effects {
    pub const NONE: Effects = Effects { key: None, ptt: None };

    pub const fn is_empty(&self) -> bool {
        self.key.is_none() && self.ptt.is_none()
    }
}

/// Absolute clock readings the machine schedules against
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingMarks {
    pub transmission_start: Instant,
    pub transmission_end: Instant,
    pub last_key_end: Instant,
    pub waiting_end: Instant,
}

/// Snapshot for status reporting
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyerStatus {
    pub state: KeyerState,
    pub wpm: u32,
    pub farnsworth_wpm: u32,
    pub ptt_active: bool,
    pub durations: DurationSet,
}

/// Main keyer FSM implementation
pub struct KeyerFsm {
    state: KeyerState,
    previous_state: KeyerState,
    wpm: u32,
    farnsworth_wpm: u32,
    farnsworth: FarnsworthConfig,
    durations: DurationSet,
    hang_time: Duration,
    marks: TimingMarks,
    ptt_active: bool,
    now: Instant,
}

impl KeyerFsm {
    /// Create new FSM with given configuration
    pub fn new(config: &KeyerConfig) -> Self {
        let wpm = config.initial_wpm.max(MIN_WPM);
        let farnsworth_wpm = config.farnsworth.farnsworth_wpm(wpm);
        Self {
            state: KeyerState::Idle,
            previous_state: KeyerState::Idle,
            wpm,
            farnsworth_wpm,
            farnsworth: config.farnsworth,
            durations: timing::durations(wpm, farnsworth_wpm, config.farnsworth.strategy),
            hang_time: config.ptt_hang_time,
            marks: TimingMarks::default(),
            ptt_active: false,
            now: Instant::default(),
        }
    }

    /// Get current FSM state
    pub fn current_state(&self) -> KeyerState {
        self.state
    }

    pub fn is_ready_for_input(&self) -> bool {
        self.state == KeyerState::Idle
    }

    pub fn is_ptt_active(&self) -> bool {
        self.ptt_active
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn farnsworth_wpm(&self) -> u32 {
        self.farnsworth_wpm
    }

    pub fn durations(&self) -> &DurationSet {
        &self.durations
    }

    pub fn marks(&self) -> TimingMarks {
        self.marks
    }

    pub fn hang_time(&self) -> Duration {
        self.hang_time
    }

    /// Clock reading of the most recent tick
    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn status(&self) -> KeyerStatus {
        KeyerStatus {
            state: self.state,
            wpm: self.wpm,
            farnsworth_wpm: self.farnsworth_wpm,
            ptt_active: self.ptt_active,
            durations: self.durations,
        }
    }

    /// Change the character speed.
    ///
    /// Returns false when `wpm` (clamped to [`MIN_WPM`]) is already in effect.
    /// Deadlines already scheduled are left alone; the new durations apply
    /// from the next element or space.
    pub fn set_wpm(&mut self, wpm: u32) -> bool {
        let wpm = wpm.max(MIN_WPM);
        if wpm == self.wpm {
            return false;
        }
        self.wpm = wpm;
        self.farnsworth_wpm = self.farnsworth.farnsworth_wpm(wpm);
        self.durations = timing::durations(wpm, self.farnsworth_wpm, self.farnsworth.strategy);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "WPM={} Farnsworth={} dit={}us char={}us word={}us",
            self.wpm,
            self.farnsworth_wpm,
            self.durations.dit.as_micros(),
            self.durations.character_space.as_micros(),
            self.durations.word_space.as_micros()
        );
        true
    }

    /// Evaluate one tick
    pub fn step(&mut self, paddles: PaddleState, now: Instant) -> Effects {
        self.now = now;
        let mut fx = Effects::NONE;

        match self.state {
            KeyerState::Idle => self.handle_idle_state(paddles, &mut fx),

            KeyerState::TransmittingDit
            | KeyerState::TransmittingDah
            | KeyerState::IambicDit
            | KeyerState::IambicDah => {
                if now.has_reached(self.marks.transmission_end) {
                    fx.key = Some(false);
                    self.previous_state = self.state;
                    self.marks.waiting_end = now + self.durations.element_space;
                    self.state = KeyerState::WaitingElementSpace;
                }
            }

            KeyerState::WaitingElementSpace => {
                if now.has_reached(self.marks.waiting_end) {
                    self.handle_element_space_end(paddles, &mut fx);
                }
            }

            KeyerState::WaitingCharacterSpace | KeyerState::WaitingWordSpace => {
                if now.has_reached(self.marks.waiting_end) {
                    self.state = KeyerState::Idle;
                }
            }
        }

        self.check_end_transmission(&mut fx);
        fx
    }

    /// Start a programmatic element or space at the last tick's time.
    ///
    /// Returns `None` without touching any state unless the keyer is idle.
    pub fn start(&mut self, element: Element) -> Option<Effects> {
        if !self.is_ready_for_input() {
            return None;
        }
        let mut fx = Effects::NONE;
        match element {
            Element::Dit => self.begin_element(Element::Dit, KeyerState::TransmittingDit, &mut fx),
            Element::Dah => self.begin_element(Element::Dah, KeyerState::TransmittingDah, &mut fx),
            Element::CharSpace => self.begin_space(KeyerState::WaitingCharacterSpace, element, &mut fx),
            Element::WordSpace => self.begin_space(KeyerState::WaitingWordSpace, element, &mut fx),
        }
        Some(fx)
    }

    /// Reset FSM to initial state, releasing both outputs
    pub fn reset(&mut self) -> Effects {
        self.state = KeyerState::Idle;
        self.previous_state = KeyerState::Idle;
        self.ptt_active = false;
        Effects { key: Some(false), ptt: Some(false) }
    }

    fn handle_idle_state(&mut self, paddles: PaddleState, fx: &mut Effects) {
        if paddles.both_pressed() {
            self.begin_element(Element::Dit, KeyerState::IambicDit, fx);
        } else if paddles.dit {
            self.begin_element(Element::Dit, KeyerState::TransmittingDit, fx);
        } else if paddles.dah {
            self.begin_element(Element::Dah, KeyerState::TransmittingDah, fx);
        }
    }

    fn handle_element_space_end(&mut self, paddles: PaddleState, fx: &mut Effects) {
        if !paddles.both_pressed() {
            self.state = KeyerState::Idle;
            return;
        }
        match self.previous_state.keyed_element() {
            Some(Element::Dit) => self.begin_element(Element::Dah, KeyerState::IambicDah, fx),
            Some(Element::Dah) => self.begin_element(Element::Dit, KeyerState::IambicDit, fx),
            _ => self.state = KeyerState::Idle,
        }
    }

    fn begin_element(&mut self, element: Element, state: KeyerState, fx: &mut Effects) {
        self.begin_transmission(fx);
        fx.key = Some(true);
        self.marks.transmission_end = self.now + self.durations.of(element);
        self.marks.last_key_end = self.marks.transmission_end;
        self.state = state;

        #[cfg(feature = "defmt")]
        defmt::trace!("key {} until {}", element, self.marks.transmission_end);
    }

    fn begin_space(&mut self, state: KeyerState, space: Element, fx: &mut Effects) {
        self.begin_transmission(fx);
        fx.key = Some(false);
        self.marks.waiting_end = self.now + self.durations.of(space);
        self.state = state;
    }

    /// Assert PTT for a new session; no-op while one is open
    fn begin_transmission(&mut self, fx: &mut Effects) {
        if self.ptt_active {
            return;
        }
        self.ptt_active = true;
        fx.ptt = Some(true);
        self.marks.transmission_start = self.now;
        // Marks from an earlier session may be more than half the clock range
        // old and would read as future deadlines.
        self.marks.last_key_end = self.now;
        self.marks.waiting_end = self.now;

        #[cfg(feature = "defmt")]
        defmt::info!("PTT: ON");
    }

    fn check_end_transmission(&mut self, fx: &mut Effects) {
        let now = self.now;
        if self.ptt_active
            && self.is_ready_for_input()
            && now != self.marks.transmission_start
            && now.has_reached(self.marks.last_key_end + self.hang_time)
            && now.has_reached(self.marks.waiting_end + self.hang_time)
        {
            self.ptt_active = false;
            fx.ptt = Some(false);

            #[cfg(feature = "defmt")]
            defmt::info!(
                "PTT: OFF ({}ms)",
                now.duration_since(self.marks.transmission_start).as_millis()
            );
        }
    }
}

/// Keyer bound to its paddles and output lines
pub struct Keyer<P, O> {
    fsm: KeyerFsm,
    paddles: P,
    sink: O,
}

impl<P, O> Keyer<P, O>
where
    P: PaddleInputs,
    O: OutputSink,
{
    pub fn new(config: &KeyerConfig, paddles: P, sink: O) -> Self {
        Self {
            fsm: KeyerFsm::new(config),
            paddles,
            sink,
        }
    }

    /// Drive every output to its idle level
    pub fn initialize(&mut self) {
        let fx = self.fsm.reset();
        self.apply(fx);
    }

    /// Sample the paddles and evaluate one tick
    pub fn poll(&mut self, now: Instant) {
        let paddles = PaddleState::new(
            self.read_paddle(PaddleSide::Dit),
            self.read_paddle(PaddleSide::Dah),
        );
        let fx = self.fsm.step(paddles, now);
        self.apply(fx);
    }

    pub fn is_ready_for_input(&self) -> bool {
        self.fsm.is_ready_for_input()
    }

    pub fn trigger_dit(&mut self) -> bool {
        self.start(Element::Dit)
    }

    pub fn trigger_dah(&mut self) -> bool {
        self.start(Element::Dah)
    }

    pub fn send_character_space(&mut self) -> bool {
        self.start(Element::CharSpace)
    }

    pub fn send_word_space(&mut self) -> bool {
        self.start(Element::WordSpace)
    }

    pub fn set_wpm(&mut self, wpm: u32) -> bool {
        self.fsm.set_wpm(wpm)
    }

    pub fn wpm(&self) -> u32 {
        self.fsm.wpm()
    }

    pub fn state(&self) -> KeyerState {
        self.fsm.current_state()
    }

    pub fn is_ptt_active(&self) -> bool {
        self.fsm.is_ptt_active()
    }

    pub fn status(&self) -> KeyerStatus {
        self.fsm.status()
    }

    pub fn fsm(&self) -> &KeyerFsm {
        &self.fsm
    }

    pub fn paddles_mut(&mut self) -> &mut P {
        &mut self.paddles
    }

    pub fn sink(&self) -> &O {
        &self.sink
    }

    pub fn release(self) -> (P, O) {
        (self.paddles, self.sink)
    }

    fn start(&mut self, element: Element) -> bool {
        match self.fsm.start(element) {
            Some(fx) => {
                self.apply(fx);
                true
            }
            None => false,
        }
    }

    fn read_paddle(&mut self, side: PaddleSide) -> bool {
        // An unreadable paddle counts as released
        self.paddles.is_pressed(side).unwrap_or(false)
    }

    fn apply(&mut self, fx: Effects) {
        if let Some(on) = fx.ptt.filter(|on| *on) {
            self.write_ptt(on);
        }
        if let Some(on) = fx.key {
            if self.sink.set_key(on).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("key write failed");
            }
        }
        if let Some(on) = fx.ptt.filter(|on| !*on) {
            self.write_ptt(on);
        }
    }

    fn write_ptt(&mut self, on: bool) {
        if self.sink.set_ptt(on).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("PTT write failed");
        }
    }
}
