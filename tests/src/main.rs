// Keyer simulation on the host: plays text and paddle input through the
// same poll loop as the firmware and prints what came out.

use keyer_core::test_utils::paddle_simulator::PaddleScript;
use keyer_core::test_utils::simulator::Simulator;
use keyer_core::{default_config, Duration, FarnsworthStrategy, KeyerConfig, PaddleSide};
use keyer_tests::{farnsworth_config, ms, standard_config};

fn main() {
    println!("CW keyer simulation (keyer-core {})", keyer_core::VERSION);

    play_text("Default config", &default_config(), "CQ TEST");
    play_text("Standard spacing", &standard_config(20, 500), "CQ TEST");
    play_text(
        "Effective speed 15/10",
        &farnsworth_config(15, FarnsworthStrategy::EffectiveSpeed, 5),
        "PARIS PARIS",
    );
    play_squeeze(&standard_config(25, 500));

    println!("Done");
}

fn play_text(label: &str, config: &KeyerConfig, text: &str) {
    let mut sim = Simulator::new(config);
    if let Err(e) = sim.send_text(text) {
        println!("{label}: text rejected: {e}");
        return;
    }
    if !sim.run_until_ptt_off(ms(60_000)) {
        println!("{label}: did not finish");
        return;
    }

    let status = sim.keyer().status();
    report(label, &sim, status.durations.dit);
    println!(
        "  {} WPM (Farnsworth {}), char space {}ms, word space {}ms",
        status.wpm,
        status.farnsworth_wpm,
        status.durations.character_space.as_millis(),
        status.durations.word_space.as_millis()
    );
}

fn play_squeeze(config: &KeyerConfig) {
    let mut sim = Simulator::new(config);
    let dit = sim.keyer().status().durations.dit;
    sim.play(
        &PaddleScript::new()
            .squeeze(ms(0), dit * 7)
            .tap(PaddleSide::Dah, dit * 20, dit * 5),
    );
    sim.run_until_ptt_off(ms(10_000));
    report("Squeeze then dah", &sim, dit);
}

fn report(label: &str, sim: &Simulator, dit: Duration) {
    let capture = sim.capture();
    let analysis = capture.analyze_timing(dit);
    println!("{label}:");
    println!("  {}", capture.to_morse_string(dit));
    println!(
        "  {} elements in {}ms, timing error: dit {:.1}%, dah {:.1}%, spacing {:.1}%",
        capture.intervals().len(),
        sim.elapsed().as_millis(),
        analysis.dit_accuracy(),
        analysis.dah_accuracy(),
        analysis.spacing_accuracy()
    );
}
