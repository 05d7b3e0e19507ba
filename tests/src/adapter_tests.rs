//! embedded-hal pin adapters against pin mocks

use std::io::ErrorKind;

use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};
use embedded_hal_mock::eh1::MockError;
use keyer_core::{
    EmbeddedHalOutputs, EmbeddedHalPaddles, HalError, Instant, Keyer, KeyerState, OutputSink,
    PaddleInputs, PaddleSide,
};

use crate::standard_config;

#[test]
fn test_paddles_are_active_low() {
    let dit = PinMock::new(&[Transaction::get(State::Low), Transaction::get(State::High)]);
    let dah = PinMock::new(&[Transaction::get(State::High)]);
    let mut paddles = EmbeddedHalPaddles::new(dit, dah);

    assert_eq!(paddles.is_pressed(PaddleSide::Dit), Ok(true));
    assert_eq!(paddles.is_pressed(PaddleSide::Dit), Ok(false));
    assert_eq!(paddles.is_pressed(PaddleSide::Dah), Ok(false));

    let (mut dit, mut dah) = paddles.release();
    dit.done();
    dah.done();
}

#[test]
fn test_paddle_read_error() {
    let dit = PinMock::new(&[
        Transaction::get(State::Low).with_error(MockError::Io(ErrorKind::NotConnected))
    ]);
    let dah = PinMock::new(&[]);
    let mut paddles = EmbeddedHalPaddles::new(dit, dah);

    assert_eq!(paddles.is_pressed(PaddleSide::Dit), Err(HalError::GpioError));

    let (mut dit, mut dah) = paddles.release();
    dit.done();
    dah.done();
}

#[test]
fn test_outputs_drive_key_indicator_and_ptt() {
    let key = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
    let led = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
    let ptt = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
    let mut outputs = EmbeddedHalOutputs::new(key, led, ptt, false);

    outputs.set_ptt(true).unwrap();
    outputs.set_key(true).unwrap();
    outputs.set_key(false).unwrap();
    outputs.set_ptt(false).unwrap();

    let (mut key, mut led, mut ptt) = outputs.release();
    key.done();
    led.done();
    ptt.done();
}

#[test]
fn test_inverted_key_line() {
    // Only the key line is inverted; the indicator follows the logical level
    let key = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
    let led = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
    let ptt = PinMock::new(&[]);
    let mut outputs = EmbeddedHalOutputs::new(key, led, ptt, true);

    outputs.set_key(true).unwrap();
    outputs.set_key(false).unwrap();

    let (mut key, mut led, mut ptt) = outputs.release();
    key.done();
    led.done();
    ptt.done();
}

#[test]
fn test_keyer_on_adapter_pins() {
    // initialize, press dit at 0, released and expired at 60ms
    let dit = PinMock::new(&[Transaction::get(State::Low), Transaction::get(State::High)]);
    let dah = PinMock::new(&[Transaction::get(State::High), Transaction::get(State::High)]);
    let key = PinMock::new(&[
        Transaction::set(State::Low),
        Transaction::set(State::High),
        Transaction::set(State::Low),
    ]);
    let led = PinMock::new(&[
        Transaction::set(State::Low),
        Transaction::set(State::High),
        Transaction::set(State::Low),
    ]);
    let ptt = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);

    let mut keyer = Keyer::new(
        &standard_config(20, 500),
        EmbeddedHalPaddles::new(dit, dah),
        EmbeddedHalOutputs::new(key, led, ptt, false),
    );
    keyer.initialize();

    keyer.poll(Instant::from_millis(0));
    assert_eq!(keyer.state(), KeyerState::TransmittingDit);
    assert!(keyer.is_ptt_active());

    keyer.poll(Instant::from_millis(60));
    assert_eq!(keyer.state(), KeyerState::WaitingElementSpace);
    assert!(keyer.is_ptt_active());

    let (paddles, outputs) = keyer.release();
    let (mut dit, mut dah) = paddles.release();
    let (mut key, mut led, mut ptt) = outputs.release();
    dit.done();
    dah.done();
    key.done();
    led.done();
    ptt.done();
}
