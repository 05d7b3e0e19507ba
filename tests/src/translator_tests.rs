//! Text playback end to end

use keyer_core::test_utils::paddle_simulator::PaddleScript;
use keyer_core::test_utils::simulator::Simulator;
use keyer_core::{FarnsworthStrategy, PaddleSide, SetTextError, TranslatorState};
use rstest::rstest;

use crate::{farnsworth_config, ms, standard_config};

fn play_text(sim: &mut Simulator, text: &str) {
    sim.send_text(text).expect("text accepted");
    assert!(sim.run_until_idle(ms(30_000)), "translator did not finish");
}

#[test]
fn test_sos() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    play_text(&mut sim, "sos");

    assert_eq!(sim.capture().to_morse_string(ms(60)), "... --- ...");
    assert!(!sim.translator().is_sending());
    assert_eq!(sim.translator().state(), TranslatorState::Idle);
}

#[test]
fn test_hi_there() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    play_text(&mut sim, "HI THERE");

    assert_eq!(
        sim.capture().to_morse_string(ms(60)),
        ".... .. / - .... . .-. ."
    );
}

#[test]
fn test_unsupported_character_is_skipped() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    play_text(&mut sim, "A~B");

    assert_eq!(sim.capture().to_morse_string(ms(60)), ".- -...");

    // Same spacing as "AB": element space, character space and a few ticks
    // of translator steps; no extra character space for the skipped '~'
    let gaps = sim.capture().gaps();
    let between = gaps[1];
    assert!(between >= ms(240) && between < ms(245), "gap {}us", between.as_micros());
}

#[test]
fn test_only_unsupported_characters() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    play_text(&mut sim, "#%");

    assert!(sim.capture().intervals().is_empty());
    assert!(sim.capture().ptt_on_times().is_empty());
}

#[test]
fn test_text_rejected_while_sending() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    sim.send_text("CQ").unwrap();
    sim.run_for(ms(100));

    assert_eq!(sim.send_text("TEST"), Err(SetTextError::Busy));
    assert!(sim.run_until_idle(ms(10_000)));
    assert_eq!(sim.capture().to_morse_string(ms(60)), "-.-. --.-");

    // Accepted again once the first line is done
    assert!(sim.send_text("E").is_ok());
}

#[test]
fn test_empty_text_rejected() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    assert_eq!(sim.send_text(""), Err(SetTextError::Empty));
    assert!(!sim.translator().is_sending());
}

#[rstest]
#[case(FarnsworthStrategy::Standard, 240)]
#[case(FarnsworthStrategy::SlidingFactor, 204)]
#[case(FarnsworthStrategy::EffectiveSpeed, 240)]
fn test_character_gap_follows_strategy(#[case] strategy: FarnsworthStrategy, #[case] gap_ms: u32) {
    let mut sim = Simulator::new(&farnsworth_config(20, strategy, 5));
    play_text(&mut sim, "EE");

    let gap = sim.capture().gaps()[0];
    assert!(
        gap >= ms(gap_ms) && gap < ms(gap_ms + 5),
        "gap {}us",
        gap.as_micros()
    );
}

#[test]
fn test_paddle_waits_for_translator_element() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    sim.send_text("T").unwrap();
    sim.run_for(ms(50));

    // Dit pressed while the translator's dah is keyed. The translator's
    // character space claims the keyer at the end of the element space, so
    // the paddle is served only after it.
    sim.play(&PaddleScript::new().tap(PaddleSide::Dit, ms(0), ms(600)));
    assert!(sim.run_until_idle(ms(5_000)));
    sim.run_for(ms(500));

    let intervals = sim.capture().intervals();
    assert_eq!(intervals[0].duration, ms(180));
    assert!(intervals.len() >= 2);
    assert!(intervals[1].start.duration_since(intervals[0].end()) >= ms(240));
}

#[rstest]
#[case(100)]
#[case(1_000)]
#[case(2_000)]
fn test_poll_cadence_does_not_change_output(#[case] tick_us: u32) {
    let tick = keyer_core::Duration::from_micros(tick_us);
    let mut sim = Simulator::new(&standard_config(20, 500)).with_tick(tick);
    play_text(&mut sim, "CQ DE");

    assert_eq!(sim.capture().to_morse_string(ms(60)), "-.-. --.- / -.. .");
    // Elements end on the first tick at or after their deadline
    let first_dah = sim.capture().intervals()[0].duration;
    assert!(first_dah >= ms(180) && first_dah < ms(180) + tick, "dah {}us", first_dah.as_micros());
}

#[test]
fn test_paris_timing_is_accurate() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    play_text(&mut sim, "PARIS");

    let analysis = sim.capture().analyze_timing(ms(60));
    assert_eq!(analysis.dit_durations.len(), 10);
    assert_eq!(analysis.dah_durations.len(), 4);
    assert!(analysis.dit_accuracy() < 1.0, "dit error {:.2}%", analysis.dit_accuracy());
    assert!(analysis.dah_accuracy() < 1.0, "dah error {:.2}%", analysis.dah_accuracy());
    assert!(analysis.spacing_accuracy() < 1.0, "spacing error {:.2}%", analysis.spacing_accuracy());
}
