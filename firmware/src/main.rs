#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

// RISC-V runtime
use riscv_rt as _;

// Panic handler
use panic_halt as _;

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;

use cwkeyer_firmware::*;

// Static resources
static KEYER: StaticCell<BoardKeyer> = StaticCell::new();
static TRANSLATOR: StaticCell<Translator> = StaticCell::new();
static SPEED: StaticCell<SpeedEstimator> = StaticCell::new();

/// Main firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("CW Keyer Firmware Starting...");

    time_driver::init();

    let mut config = board_config();
    if let Err(_e) = config.validate() {
        #[cfg(feature = "defmt")]
        defmt::error!("Invalid configuration ({}), using defaults", _e);
        config = KeyerConfig::default();
    }

    let board = match init_board(&config) {
        Ok(board) => board,
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::error!("Hardware init failed: {}", _e);
            loop {
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    };

    #[cfg(feature = "defmt")]
    defmt::info!(
        "Keyer config: {} WPM ({}-{}), PTT hang {}ms, debounce {}ms",
        config.initial_wpm,
        config.speed.wpm_min,
        config.speed.wpm_max,
        config.ptt_hang_time.as_millis(),
        PADDLE_DEBOUNCE.as_millis()
    );

    let keyer = KEYER.init(Keyer::new(&config, &PADDLE, board.outputs));
    let translator = TRANSLATOR.init(Translator::new());
    let speed = SPEED.init(SpeedEstimator::new(config.speed));

    spawner.must_spawn(control_loop_task(keyer, translator, speed, board.speed));

    #[cfg(feature = "defmt")]
    defmt::info!("Keyer firmware ready");

    // Main supervision loop
    loop {
        Timer::after(Duration::from_secs(1)).await;
        #[cfg(feature = "defmt")]
        defmt::trace!("Heartbeat: {} queued lines", TEXT_CHANNEL.len());
    }
}
