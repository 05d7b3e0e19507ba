//! PTT hang time

use keyer_core::test_utils::paddle_simulator::PaddleScript;
use keyer_core::test_utils::simulator::Simulator;
use keyer_core::{Instant, PaddleSide};

use crate::{ms, standard_config};

#[test]
fn test_ptt_released_after_hang_time() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    sim.play(&PaddleScript::new().tap(PaddleSide::Dit, ms(0), ms(1)));
    assert!(sim.run_until_ptt_off(ms(2_000)));

    let capture = sim.capture();
    assert_eq!(capture.ptt_on_times(), &[Instant::from_millis(0)]);
    // Dit 0-60, element space to 120, then 500ms of hang
    assert_eq!(capture.ptt_off_times(), &[Instant::from_millis(620)]);
}

#[test]
fn test_ptt_raised_with_first_key_edge() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    sim.play(&PaddleScript::new().tap(PaddleSide::Dah, ms(10), ms(1)));
    sim.run_for(ms(2_000));

    let capture = sim.capture();
    let interval = capture.intervals()[0];
    assert_eq!(capture.ptt_on_times()[0], interval.start);
    assert!(capture.ptt_off_times()[0].is_after(interval.end()));
}

#[test]
fn test_element_within_hang_extends_session() {
    let mut sim = Simulator::new(&standard_config(20, 500));
    sim.play(
        &PaddleScript::new()
            .tap(PaddleSide::Dit, ms(0), ms(1))
            .tap(PaddleSide::Dit, ms(400), ms(1)),
    );
    sim.run_for(ms(1_500));

    let capture = sim.capture();
    assert_eq!(capture.intervals().len(), 2);
    assert_eq!(capture.ptt_on_times().len(), 1);
    // Second dit 400-460, element space to 520
    assert_eq!(capture.ptt_off_times(), &[Instant::from_millis(1_020)]);
}

#[test]
fn test_element_after_hang_opens_new_session() {
    let mut sim = Simulator::new(&standard_config(20, 200));
    sim.play(
        &PaddleScript::new()
            .tap(PaddleSide::Dit, ms(0), ms(1))
            .tap(PaddleSide::Dit, ms(600), ms(1)),
    );
    sim.run_for(ms(1_500));

    let capture = sim.capture();
    assert_eq!(
        capture.ptt_on_times(),
        &[Instant::from_millis(0), Instant::from_millis(600)]
    );
    assert_eq!(
        capture.ptt_off_times(),
        &[Instant::from_millis(320), Instant::from_millis(920)]
    );
}

#[test]
fn test_zero_hang_time() {
    let mut sim = Simulator::new(&standard_config(20, 0));
    sim.play(&PaddleScript::new().tap(PaddleSide::Dit, ms(0), ms(1)));
    sim.run_for(ms(500));

    assert_eq!(sim.capture().ptt_off_times(), &[Instant::from_millis(120)]);
}

#[test]
fn test_held_paddle_keeps_ptt() {
    let mut sim = Simulator::new(&standard_config(20, 100));
    sim.play(&PaddleScript::new().tap(PaddleSide::Dah, ms(0), ms(2_000)));
    sim.run_for(ms(1_900));

    assert!(sim.keyer().is_ptt_active());
    assert_eq!(sim.capture().ptt_on_times().len(), 1);
    assert!(sim.capture().ptt_off_times().is_empty());
}

#[test]
fn test_text_session_across_clock_wrap() {
    let start = Instant::from_micros(u32::MAX - 200_000);
    let mut sim = Simulator::starting_at(&standard_config(20, 500), start);
    sim.send_text("SOS").unwrap();
    assert!(sim.run_until_ptt_off(ms(10_000)));

    let capture = sim.capture();
    assert_eq!(capture.to_morse_string(ms(60)), "... --- ...");
    assert_eq!(capture.ptt_on_times().len(), 1);
    assert_eq!(capture.ptt_off_times().len(), 1);

    // Hang counts from the end of the trailing character space:
    // element space 60 + character space 180 + hang 500
    let last = capture.intervals()[capture.intervals().len() - 1];
    assert_eq!(capture.ptt_off_times()[0].duration_since(last.end()), ms(740));
}
