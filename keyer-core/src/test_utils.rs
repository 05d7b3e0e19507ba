//! Test utilities for keyer core functionality

pub mod paddle_simulator {
    //! Scripted paddle input

    use crate::hal::Duration;
    use crate::types::PaddleSide;
    use std::vec::Vec;

    /// Paddle level change, relative to the start of its script
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PaddleEvent {
        pub at: Duration,
        pub side: PaddleSide,
        pub pressed: bool,
    }

    /// Paddle events in time order
    #[derive(Debug, Clone, Default)]
    pub struct PaddleScript {
        events: Vec<PaddleEvent>,
    }

    impl PaddleScript {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press(mut self, at: Duration, side: PaddleSide) -> Self {
            self.insert(PaddleEvent { at, side, pressed: true });
            self
        }

        pub fn release(mut self, at: Duration, side: PaddleSide) -> Self {
            self.insert(PaddleEvent { at, side, pressed: false });
            self
        }

        /// Hold one paddle from `from` for `hold`
        pub fn tap(self, side: PaddleSide, from: Duration, hold: Duration) -> Self {
            self.press(from, side).release(from + hold, side)
        }

        /// Hold both paddles from `from` for `hold`
        pub fn squeeze(self, from: Duration, hold: Duration) -> Self {
            self.tap(PaddleSide::Dit, from, hold)
                .tap(PaddleSide::Dah, from, hold)
        }

        pub fn events(&self) -> &[PaddleEvent] {
            &self.events
        }

        fn insert(&mut self, event: PaddleEvent) {
            let pos = self.events.partition_point(|e| e.at <= event.at);
            self.events.insert(pos, event);
        }
    }
}

pub mod output_capture {
    //! Output capture and analysis for testing

    use crate::hal::{Duration, Instant};
    use std::string::String;
    use std::vec::Vec;

    /// One key-down period
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyInterval {
        pub start: Instant,
        pub duration: Duration,
    }

    impl KeyInterval {
        pub fn end(&self) -> Instant {
            self.start + self.duration
        }
    }

    /// Output capture buffer
    #[derive(Debug, Default)]
    pub struct OutputCapture {
        intervals: Vec<KeyInterval>,
        key_down_at: Option<Instant>,
        ptt_on: Vec<Instant>,
        ptt_off: Vec<Instant>,
    }

    impl OutputCapture {
        pub fn new() -> Self {
            Self::default()
        }

        /// Record key down event
        pub fn key_down(&mut self, at: Instant) {
            if self.key_down_at.is_none() {
                self.key_down_at = Some(at);
            }
        }

        /// Record key up event
        pub fn key_up(&mut self, at: Instant) {
            if let Some(start) = self.key_down_at.take() {
                self.intervals.push(KeyInterval {
                    start,
                    duration: at.duration_since(start),
                });
            }
        }

        pub fn ptt(&mut self, on: bool, at: Instant) {
            if on {
                self.ptt_on.push(at);
            } else {
                self.ptt_off.push(at);
            }
        }

        /// Completed key-down periods
        pub fn intervals(&self) -> &[KeyInterval] {
            &self.intervals
        }

        pub fn ptt_on_times(&self) -> &[Instant] {
            &self.ptt_on
        }

        pub fn ptt_off_times(&self) -> &[Instant] {
            &self.ptt_off
        }

        /// Key-up time between consecutive key-down periods
        pub fn gaps(&self) -> Vec<Duration> {
            self.intervals
                .windows(2)
                .map(|w| w[1].start.duration_since(w[0].end()))
                .collect()
        }

        /// Read the capture back as Morse.
        ///
        /// Key-down periods shorter than two dits are dits. Gaps under two
        /// dits separate elements, under seven dits characters (`' '`), and
        /// anything longer separates words (`" / "`).
        pub fn to_morse_string(&self, dit: Duration) -> String {
            let mut result = String::new();
            for (i, interval) in self.intervals.iter().enumerate() {
                if i > 0 {
                    let gap = interval.start.duration_since(self.intervals[i - 1].end());
                    if gap >= dit * 7 {
                        result.push_str(" / ");
                    } else if gap >= dit * 2 {
                        result.push(' ');
                    }
                }
                result.push(if interval.duration < dit * 2 { '.' } else { '-' });
            }
            result
        }

        /// Analyze timing accuracy
        pub fn analyze_timing(&self, dit: Duration) -> TimingAnalysis {
            let (dits, dahs): (Vec<KeyInterval>, Vec<KeyInterval>) = self
                .intervals
                .iter()
                .copied()
                .partition(|interval| interval.duration < dit * 2);
            TimingAnalysis {
                expected_unit: dit,
                dit_durations: dits.iter().map(|i| i.duration).collect(),
                dah_durations: dahs.iter().map(|i| i.duration).collect(),
                element_gaps: self.gaps().into_iter().filter(|gap| *gap < dit * 2).collect(),
            }
        }
    }

    /// Timing analysis results
    #[derive(Debug)]
    pub struct TimingAnalysis {
        pub expected_unit: Duration,
        pub dit_durations: Vec<Duration>,
        pub dah_durations: Vec<Duration>,
        pub element_gaps: Vec<Duration>,
    }

    impl TimingAnalysis {
        /// Dit length error in percent
        pub fn dit_accuracy(&self) -> f64 {
            error_percent(&self.dit_durations, self.expected_unit)
        }

        /// Dah length error in percent (expected 3 units)
        pub fn dah_accuracy(&self) -> f64 {
            error_percent(&self.dah_durations, self.expected_unit * 3)
        }

        /// Inter-element spacing error in percent
        pub fn spacing_accuracy(&self) -> f64 {
            error_percent(&self.element_gaps, self.expected_unit)
        }
    }

    fn error_percent(samples: &[Duration], expected: Duration) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let expected = expected.as_micros() as f64;
        let average = samples.iter().map(|d| d.as_micros() as f64).sum::<f64>() / samples.len() as f64;
        ((average - expected).abs() / expected) * 100.0
    }
}

pub mod simulator {
    //! Keyer and translator on a simulated clock

    use super::output_capture::OutputCapture;
    use super::paddle_simulator::{PaddleEvent, PaddleScript};
    use crate::fsm::Keyer;
    use crate::hal::mock::{MockOutputs, MockPaddles};
    use crate::hal::{Duration, Instant};
    use crate::translator::{SetTextError, Translator};
    use crate::types::KeyerConfig;
    use std::collections::VecDeque;

    /// Control loop period used by the firmware
    pub const DEFAULT_TICK: Duration = Duration::from_micros(500);

    pub type SimKeyer = Keyer<MockPaddles, MockOutputs>;

    /// Runs the same poll sequence as the firmware control loop and records
    /// every key and PTT edge.
    pub struct Simulator {
        keyer: SimKeyer,
        translator: Translator,
        start: Instant,
        now: Instant,
        tick: Duration,
        pending: VecDeque<(Instant, PaddleEvent)>,
        capture: OutputCapture,
        key: bool,
        ptt: bool,
    }

    impl Simulator {
        pub fn new(config: &KeyerConfig) -> Self {
            Self::starting_at(config, Instant::from_micros(0))
        }

        /// Start the clock at an arbitrary reading, e.g. just before the wrap
        pub fn starting_at(config: &KeyerConfig, start: Instant) -> Self {
            let mut keyer = Keyer::new(config, MockPaddles::new(), MockOutputs::new());
            keyer.initialize();
            Self {
                keyer,
                translator: Translator::new(),
                start,
                now: start,
                tick: DEFAULT_TICK,
                pending: VecDeque::new(),
                capture: OutputCapture::new(),
                key: false,
                ptt: false,
            }
        }

        /// Poll at a different cadence than the firmware's 500us
        pub fn with_tick(mut self, tick: Duration) -> Self {
            self.tick = tick;
            self
        }

        pub fn now(&self) -> Instant {
            self.now
        }

        /// Time since the simulation started
        pub fn elapsed(&self) -> Duration {
            self.now.duration_since(self.start)
        }

        pub fn keyer(&self) -> &SimKeyer {
            &self.keyer
        }

        pub fn keyer_mut(&mut self) -> &mut SimKeyer {
            &mut self.keyer
        }

        pub fn translator(&self) -> &Translator {
            &self.translator
        }

        pub fn capture(&self) -> &OutputCapture {
            &self.capture
        }

        pub fn sink(&self) -> &MockOutputs {
            self.keyer.sink()
        }

        pub fn send_text(&mut self, text: &str) -> Result<(), SetTextError> {
            self.translator.set_text(text)
        }

        /// Set both paddle levels immediately
        pub fn set_paddles(&mut self, dit: bool, dah: bool) {
            self.keyer.paddles_mut().set(dit, dah);
        }

        /// Schedule a script relative to the current time
        pub fn play(&mut self, script: &PaddleScript) {
            for event in script.events() {
                let at = self.now + event.at;
                let pos = self
                    .pending
                    .iter()
                    .position(|(t, _)| t.is_after(at))
                    .unwrap_or(self.pending.len());
                self.pending.insert(pos, (at, *event));
            }
        }

        /// One control-loop iteration, then advance the clock by one tick
        pub fn step(&mut self) {
            while let Some((at, event)) = self.pending.front().copied() {
                if !self.now.has_reached(at) {
                    break;
                }
                self.keyer.paddles_mut().set_pressed(event.side, event.pressed);
                self.pending.pop_front();
            }

            self.keyer.poll(self.now);
            self.translator.poll(&mut self.keyer);
            self.record_edges();
            self.now = self.now + self.tick;
        }

        pub fn run_for(&mut self, duration: Duration) {
            let end = self.elapsed() + duration;
            while self.elapsed() < end {
                self.step();
            }
        }

        /// Step until the translator is done and the keyer is idle.
        ///
        /// Returns false if `limit` passes first.
        pub fn run_until_idle(&mut self, limit: Duration) -> bool {
            self.run_until(limit, |sim| {
                !sim.translator.is_sending() && sim.keyer.is_ready_for_input() && sim.pending.is_empty()
            })
        }

        /// Like [`Simulator::run_until_idle`], but also waits for PTT release
        pub fn run_until_ptt_off(&mut self, limit: Duration) -> bool {
            self.run_until(limit, |sim| {
                !sim.translator.is_sending() && sim.keyer.is_ready_for_input() && !sim.ptt
            })
        }

        fn run_until(&mut self, limit: Duration, done: impl Fn(&Self) -> bool) -> bool {
            let end = self.elapsed() + limit;
            while self.elapsed() < end {
                self.step();
                if done(self) {
                    return true;
                }
            }
            false
        }

        fn record_edges(&mut self) {
            let sink = self.keyer.sink();
            let (key, ptt) = (sink.is_key_down(), sink.is_ptt_on());
            if ptt != self.ptt {
                self.ptt = ptt;
                self.capture.ptt(ptt, self.now);
            }
            if key != self.key {
                self.key = key;
                if key {
                    self.capture.key_down(self.now);
                } else {
                    self.capture.key_up(self.now);
                }
            }
        }
    }
}
