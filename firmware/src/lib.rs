#![no_std]

//! Firmware library: board support and the keyer control-loop task

pub use embassy_executor::Spawner;
pub use static_cell::StaticCell;

pub use keyer_core::*;

pub use crate::ch32v203_hardware::*;
pub use crate::tasks::*;

// Embassy tasks module
pub mod tasks {
    use core::cell::RefCell;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::blocking_mutex::Mutex;
    use embassy_sync::channel::Channel;
    use embassy_time::{Duration, Ticker};

    use keyer_core::hal::{Clock, EmbassyClock};
    use keyer_core::{Keyer, LineAssembler, PaddleInput, SpeedEstimator, TextLine, Translator};

    use crate::ch32v203_hardware::{BoardOutputs, SpeedPot};

    /// Control loop period
    pub const CONTROL_PERIOD: Duration = Duration::from_micros(500);

    /// Lines waiting for the translator
    pub const TEXT_QUEUE_DEPTH: usize = 2;

    pub type BoardKeyer = Keyer<&'static PaddleInput, BoardOutputs>;

    /// Complete text lines for the translator
    pub static TEXT_CHANNEL: Channel<CriticalSectionRawMutex, TextLine, TEXT_QUEUE_DEPTH> =
        Channel::new();

    static LINE_BUFFER: Mutex<CriticalSectionRawMutex, RefCell<LineAssembler>> =
        Mutex::new(RefCell::new(LineAssembler::new()));

    /// Assemble serial input into lines (called from the USART interrupt)
    pub fn handle_uart_byte(byte: u8) {
        let Some(result) = LINE_BUFFER.lock(|lines| lines.borrow_mut().push(byte)) else {
            return;
        };
        match result {
            Ok(text) => {
                if TEXT_CHANNEL.try_send(text).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Text queue full, line dropped");
                }
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Line dropped: {}", _e);
            }
        }
    }

    /// Keyer control loop: speed pot, paddles, then the translator
    #[embassy_executor::task]
    pub async fn control_loop_task(
        keyer: &'static mut BoardKeyer,
        translator: &'static mut Translator,
        speed: &'static mut SpeedEstimator,
        mut speed_pot: SpeedPot,
    ) {
        #[cfg(feature = "defmt")]
        defmt::info!("Control loop started");

        keyer.initialize();
        let clock = EmbassyClock;
        let mut ticker = Ticker::every(CONTROL_PERIOD);

        loop {
            if !translator.is_sending() {
                if let Ok(line) = TEXT_CHANNEL.try_receive() {
                    if let Err(_e) = translator.set_text(&line) {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("Text rejected: {}", _e);
                    }
                }
            }

            speed.poll(&mut speed_pot, &mut *keyer);
            keyer.poll(clock.now());
            translator.poll(&mut *keyer);

            ticker.next().await;
        }
    }
}

// CH32V203 hardware module
pub mod ch32v203_hardware;

// Time driver for embassy
pub mod time_driver;
