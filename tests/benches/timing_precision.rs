//! Cost of the per-tick work on the host

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use keyer_core::hal::mock::{MockOutputs, MockPaddles};
use keyer_core::test_utils::simulator::Simulator;
use keyer_core::{
    default_config, durations, FarnsworthStrategy, Instant, Keyer, SpeedConfig, SpeedEstimator,
    Translator,
};

fn bench_durations(c: &mut Criterion) {
    c.bench_function("durations sliding factor", |b| {
        b.iter(|| durations(black_box(23), black_box(18), FarnsworthStrategy::SlidingFactor))
    });
}

fn bench_keyer_poll(c: &mut Criterion) {
    let mut keyer = Keyer::new(&default_config(), MockPaddles::new(), MockOutputs::new());
    keyer.initialize();
    keyer.paddles_mut().set(true, true);
    let mut now = 0u32;

    c.bench_function("keyer poll squeezed", |b| {
        b.iter(|| {
            now = now.wrapping_add(500);
            keyer.poll(black_box(Instant::from_micros(now)));
        })
    });
}

fn bench_translator_poll(c: &mut Criterion) {
    c.bench_function("translator line", |b| {
        b.iter_batched(
            || {
                let mut keyer = Keyer::new(&default_config(), MockPaddles::new(), MockOutputs::new());
                keyer.initialize();
                let mut translator: Translator = Translator::new();
                let _ = translator.set_text("CQ CQ DE TEST K");
                (keyer, translator)
            },
            |(mut keyer, mut translator)| {
                let mut now = 0u32;
                while translator.is_sending() {
                    now = now.wrapping_add(500);
                    keyer.poll(Instant::from_micros(now));
                    translator.poll(&mut keyer);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_speed_sample(c: &mut Criterion) {
    let mut estimator: SpeedEstimator = SpeedEstimator::new(SpeedConfig::default());
    let mut raw = 0u16;

    c.bench_function("speed sample", |b| {
        b.iter(|| {
            raw = (raw + 7) % 1024;
            black_box(estimator.sample(raw))
        })
    });
}

fn bench_simulated_word(c: &mut Criterion) {
    c.bench_function("simulated PARIS", |b| {
        b.iter(|| {
            let mut sim = Simulator::new(&default_config());
            let _ = sim.send_text("PARIS");
            sim.run_until_idle(keyer_core::Duration::from_millis(10_000))
        })
    });
}

criterion_group!(
    benches,
    bench_durations,
    bench_keyer_poll,
    bench_translator_poll,
    bench_speed_sample,
    bench_simulated_word
);
criterion_main!(benches);
