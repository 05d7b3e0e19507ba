//! CH32V203 Hardware Implementation
//!
//! 64KB Flash / 20KB RAM, running from the 8MHz HSI out of reset. Paddle
//! edges, speed-pot conversions and serial bytes arrive by interrupt and are
//! handed to the control loop through atomics; outputs are plain GPIO writes.

use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use portable_atomic::{AtomicBool, AtomicU16, Ordering};

use keyer_core::hal::{AnalogSource, Clock, Duration, EmbassyClock, EmbeddedHalOutputs, HalError};
use keyer_core::types::{KeyerConfig, PaddleSide, PinConfig, SpeedConfig};
use keyer_core::controller::PaddleInput;

const RCC_BASE: u32 = 0x4002_1000;
const RCC_APB2PCENR: u32 = 0x18;

pub const GPIOA_BASE: u32 = 0x4001_0800;
pub const GPIOC_BASE: u32 = 0x4001_1000;
const GPIO_CFGLR: u32 = 0x00;
const GPIO_CFGHR: u32 = 0x04;
const GPIO_INDR: u32 = 0x08;
const GPIO_BSHR: u32 = 0x10;

const EXTI_BASE: u32 = 0x4001_0400;
const EXTI_INTENR: u32 = 0x00;
const EXTI_RTENR: u32 = 0x08;
const EXTI_FTENR: u32 = 0x0C;
const EXTI_INTFR: u32 = 0x14;

const ADC1_BASE: u32 = 0x4001_2400;
const ADC_STATR: u32 = 0x00;
const ADC_CTLR1: u32 = 0x04;
const ADC_CTLR2: u32 = 0x08;
const ADC_RSQR3: u32 = 0x34;
const ADC_RDATAR: u32 = 0x4C;

const USART1_BASE: u32 = 0x4001_3800;
const USART_STATR: u32 = 0x00;
const USART_DATAR: u32 = 0x04;
const USART_BRR: u32 = 0x08;
const USART_CTLR1: u32 = 0x0C;

const PFIC_IENR1: u32 = 0xE000_E100;
const PFIC_IENR2: u32 = 0xE000_E104;
const EXTI0_IRQ: u32 = 22;
const EXTI1_IRQ: u32 = 23;
const ADC1_2_IRQ: u32 = 34;
const USART1_IRQ: u32 = 53;

/// Board pin assignment
pub mod pins {
    /// Dit paddle input, PA0 / EXTI0
    pub const DIT_PIN: u8 = 0;

    /// Dah paddle input, PA1 / EXTI1
    pub const DAH_PIN: u8 = 1;

    /// Key output (sidetone oscillator enable), PA2
    pub const KEY_PIN: u8 = 2;

    /// PTT output, PA3
    pub const PTT_PIN: u8 = 3;

    /// Speed potentiometer, PA4 / ADC channel 4
    pub const SPEED_PIN: u8 = 4;

    /// Key indicator LED, PC13
    pub const LED_PIN: u8 = 13;

    /// Serial text input, PA10 / USART1 RX
    pub const UART_RX_PIN: u8 = 10;
}

/// Keyer configuration for this board: default timing, 12-bit speed ADC
pub fn board_config() -> KeyerConfig {
    KeyerConfig {
        pins: PinConfig {
            dit: pins::DIT_PIN,
            dah: pins::DAH_PIN,
            output: pins::KEY_PIN,
            ptt: pins::PTT_PIN,
            indicator: pins::LED_PIN,
            speed: pins::SPEED_PIN,
        },
        speed: SpeedConfig {
            raw_max: 4095,
            ..SpeedConfig::default()
        },
        ..KeyerConfig::default()
    }
}

/// GPIO line addressed by port base and pin number
pub struct GpioPin {
    port: u32,
    pin: u8,
}

impl GpioPin {
    pub const fn new(port: u32, pin: u8) -> Self {
        Self { port, pin }
    }

    /// Push-pull output, 50MHz
    fn into_output(self) -> Self {
        self.configure(0x3);
        self
    }

    /// Input with pull-up
    fn into_pull_up_input(self) -> Self {
        self.configure(0x8);
        unsafe { write_reg(self.port + GPIO_BSHR, 1 << self.pin) };
        self
    }

    /// Analog input
    fn into_analog(self) -> Self {
        self.configure(0x0);
        self
    }

    fn configure(&self, mode: u32) {
        let (reg, shift) = if self.pin < 8 {
            (self.port + GPIO_CFGLR, u32::from(self.pin) * 4)
        } else {
            (self.port + GPIO_CFGHR, u32::from(self.pin - 8) * 4)
        };
        unsafe {
            let cfg = read_reg(reg) & !(0xF << shift);
            write_reg(reg, cfg | (mode << shift));
        }
    }

    fn level(&self) -> bool {
        unsafe { read_reg(self.port + GPIO_INDR) & (1 << self.pin) != 0 }
    }
}

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        unsafe { write_reg(self.port + GPIO_BSHR, 1 << (self.pin + 16)) };
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        unsafe { write_reg(self.port + GPIO_BSHR, 1 << self.pin) };
        Ok(())
    }
}

impl InputPin for GpioPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

/// Key, indicator and PTT lines
pub type BoardOutputs = EmbeddedHalOutputs<GpioPin, GpioPin, GpioPin>;

/// Paddle levels written by the EXTI handlers
pub static PADDLE: PaddleInput = PaddleInput::new();

/// Contact bounce lockout for the paddle jack
pub const PADDLE_DEBOUNCE: Duration = Duration::from_millis(5);

static SPEED_RAW: AtomicU16 = AtomicU16::new(0);
static SPEED_VALID: AtomicBool = AtomicBool::new(false);

/// Latest speed-pot conversion
pub struct SpeedPot;

impl AnalogSource for SpeedPot {
    type Error = HalError;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        if !SPEED_VALID.load(Ordering::Acquire) {
            return Err(HalError::NotInitialized);
        }
        Ok(SPEED_RAW.load(Ordering::Relaxed))
    }
}

/// Board peripherals after initialisation
pub struct Board {
    pub outputs: BoardOutputs,
    pub speed: SpeedPot,
}

/// Bring up clocks, GPIO, EXTI, ADC and USART1
pub fn init_board(config: &KeyerConfig) -> Result<Board, HalError> {
    if config.pins.dit > 15 || config.pins.dah > 15 || config.pins.speed > 7 {
        return Err(HalError::InvalidConfig);
    }

    unsafe {
        // AFIO, GPIOA, GPIOC, ADC1, USART1
        let enr = read_reg(RCC_BASE + RCC_APB2PCENR);
        write_reg(
            RCC_BASE + RCC_APB2PCENR,
            enr | (1 << 0) | (1 << 2) | (1 << 4) | (1 << 9) | (1 << 14),
        );
    }

    GpioPin::new(GPIOA_BASE, config.pins.dit).into_pull_up_input();
    GpioPin::new(GPIOA_BASE, config.pins.dah).into_pull_up_input();
    let key = GpioPin::new(GPIOA_BASE, config.pins.output).into_output();
    let ptt = GpioPin::new(GPIOA_BASE, config.pins.ptt).into_output();
    let led = GpioPin::new(GPIOC_BASE, config.pins.indicator).into_output();
    GpioPin::new(GPIOA_BASE, config.pins.speed).into_analog();
    // RX: floating input
    GpioPin::new(GPIOA_BASE, pins::UART_RX_PIN).configure(0x4);

    PADDLE.set_debounce(PADDLE_DEBOUNCE);
    configure_exti(&[config.pins.dit, config.pins.dah]);
    configure_adc(config.pins.speed);
    configure_usart();

    #[cfg(feature = "defmt")]
    defmt::info!("CH32V203 board initialized");

    Ok(Board {
        outputs: EmbeddedHalOutputs::new(key, led, ptt, false),
        speed: SpeedPot,
    })
}

fn configure_exti(lines: &[u8]) {
    let mask = lines.iter().fold(0u32, |m, line| m | (1 << line));
    unsafe {
        // Port A is the reset mapping for every EXTI line
        write_reg(EXTI_BASE + EXTI_RTENR, read_reg(EXTI_BASE + EXTI_RTENR) | mask);
        write_reg(EXTI_BASE + EXTI_FTENR, read_reg(EXTI_BASE + EXTI_FTENR) | mask);
        write_reg(EXTI_BASE + EXTI_INTENR, read_reg(EXTI_BASE + EXTI_INTENR) | mask);
        write_reg(PFIC_IENR1, (1 << EXTI0_IRQ) | (1 << EXTI1_IRQ));
    }
}

fn configure_adc(channel: u8) {
    unsafe {
        write_reg(ADC1_BASE + ADC_RSQR3, u32::from(channel));
        // EOC interrupt
        write_reg(ADC1_BASE + ADC_CTLR1, 1 << 5);
        // ADON, continuous conversion, software trigger
        write_reg(ADC1_BASE + ADC_CTLR2, (1 << 0) | (1 << 1) | (0x7 << 17) | (1 << 20));
        write_reg(ADC1_BASE + ADC_CTLR2, read_reg(ADC1_BASE + ADC_CTLR2) | (1 << 22));
        write_reg(PFIC_IENR2, 1 << (ADC1_2_IRQ - 32));
    }
}

fn configure_usart() {
    unsafe {
        // 9600 baud at 8MHz
        write_reg(USART1_BASE + USART_BRR, 8_000_000 / 9600);
        // UE, RE, RXNEIE
        write_reg(USART1_BASE + USART_CTLR1, (1 << 13) | (1 << 2) | (1 << 5));
        write_reg(PFIC_IENR2, 1 << (USART1_IRQ - 32));
    }
}

/// Record a paddle edge; `level_low` is the raw pin level (pressed = low)
pub fn handle_paddle_edge(side: PaddleSide, level_low: bool) {
    if !PADDLE.update(side, level_low, EmbassyClock.now()) {
        #[cfg(feature = "defmt")]
        defmt::trace!("bounce on {}", side);
    }
}

fn paddle_pin_low(pin: u8) -> bool {
    matches!(GpioPin::new(GPIOA_BASE, pin).is_low(), Ok(true))
}

/// EXTI0 interrupt handler for Dit paddle
#[no_mangle]
extern "C" fn EXTI0() {
    unsafe { write_reg(EXTI_BASE + EXTI_INTFR, 1 << pins::DIT_PIN) };
    handle_paddle_edge(PaddleSide::Dit, paddle_pin_low(pins::DIT_PIN));
}

/// EXTI1 interrupt handler for Dah paddle
#[no_mangle]
extern "C" fn EXTI1() {
    unsafe { write_reg(EXTI_BASE + EXTI_INTFR, 1 << pins::DAH_PIN) };
    handle_paddle_edge(PaddleSide::Dah, paddle_pin_low(pins::DAH_PIN));
}

/// ADC end-of-conversion handler
#[no_mangle]
extern "C" fn ADC1_2() {
    let raw = unsafe {
        write_reg(ADC1_BASE + ADC_STATR, 0);
        read_reg(ADC1_BASE + ADC_RDATAR)
    };
    SPEED_RAW.store((raw & 0x0FFF) as u16, Ordering::Relaxed);
    SPEED_VALID.store(true, Ordering::Release);
}

/// USART1 receive handler
#[no_mangle]
extern "C" fn USART1() {
    unsafe {
        // RXNE
        if read_reg(USART1_BASE + USART_STATR) & (1 << 5) != 0 {
            let byte = read_reg(USART1_BASE + USART_DATAR) as u8;
            crate::tasks::handle_uart_byte(byte);
        }
    }
}

unsafe fn read_reg(addr: u32) -> u32 {
    core::ptr::read_volatile(addr as *const u32)
}

unsafe fn write_reg(addr: u32, value: u32) {
    core::ptr::write_volatile(addr as *mut u32, value)
}
