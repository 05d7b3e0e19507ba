//! Embassy time driver on the QingKe V4 system timer
//!
//! The STK counter is 64 bits wide and free-running at HCLK/8. Out of reset
//! HCLK is the 8MHz HSI, so one counter step is one microsecond, which is the
//! tick rate embassy-time is built with. A single alarm maps onto the
//! compare register.

use core::cell::Cell;
use critical_section::Mutex;
use embassy_time_driver::{AlarmHandle, Driver};
use portable_atomic::{AtomicBool, Ordering};

const STK_BASE: u32 = 0xE000_F000;
const STK_CTLR: u32 = 0x00;
const STK_SR: u32 = 0x04;
const STK_CNTL: u32 = 0x08;
const STK_CNTH: u32 = 0x0C;
const STK_CMPLR: u32 = 0x10;
const STK_CMPHR: u32 = 0x14;

/// Counter enable
const CTLR_STE: u32 = 1 << 0;
/// Compare interrupt enable
const CTLR_STIE: u32 = 1 << 1;

const PFIC_IENR1: u32 = 0xE000_E100;
const SYSTICK_IRQ: u32 = 12;

struct AlarmState {
    timestamp: Cell<u64>,
    callback: Cell<Option<(fn(*mut ()), *mut ())>>,
}

// The context pointer is only handed back to embassy's own callback
unsafe impl Send for AlarmState {}

pub struct SysTickDriver {
    allocated: AtomicBool,
    alarm: Mutex<AlarmState>,
}

impl SysTickDriver {
    const fn new() -> Self {
        Self {
            allocated: AtomicBool::new(false),
            alarm: Mutex::new(AlarmState {
                timestamp: Cell::new(u64::MAX),
                callback: Cell::new(None),
            }),
        }
    }

    /// Start the counter and unmask the timer interrupt
    fn start(&self) {
        unsafe {
            write_reg(STK_BASE + STK_CMPLR, u32::MAX);
            write_reg(STK_BASE + STK_CMPHR, u32::MAX);
            write_reg(STK_BASE + STK_SR, 0);
            write_reg(STK_BASE + STK_CTLR, CTLR_STE | CTLR_STIE);

            let ienr = PFIC_IENR1 as *mut u32;
            core::ptr::write_volatile(ienr, 1 << SYSTICK_IRQ);
        }
    }

    fn on_interrupt(&self) {
        unsafe { write_reg(STK_BASE + STK_SR, 0) };

        let now = self.now();
        let fire = critical_section::with(|cs| {
            let alarm = self.alarm.borrow(cs);
            if now >= alarm.timestamp.get() {
                alarm.timestamp.set(u64::MAX);
                alarm.callback.get()
            } else {
                None
            }
        });
        if let Some((callback, ctx)) = fire {
            callback(ctx);
        }
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        // High word re-read guards against a carry between the two reads
        loop {
            let hi = unsafe { read_reg(STK_BASE + STK_CNTH) };
            let lo = unsafe { read_reg(STK_BASE + STK_CNTL) };
            if hi == unsafe { read_reg(STK_BASE + STK_CNTH) } {
                return (u64::from(hi) << 32) | u64::from(lo);
            }
        }
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        if self.allocated.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(AlarmHandle::new(0))
        }
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, callback: fn(*mut ()), ctx: *mut ()) {
        critical_section::with(|cs| {
            self.alarm.borrow(cs).callback.set(Some((callback, ctx)));
        });
    }

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        critical_section::with(|cs| {
            let alarm = self.alarm.borrow(cs);
            if timestamp <= self.now() {
                alarm.timestamp.set(u64::MAX);
                return false;
            }
            alarm.timestamp.set(timestamp);
            unsafe {
                // High word first parks the compare out of reach
                write_reg(STK_BASE + STK_CMPHR, u32::MAX);
                write_reg(STK_BASE + STK_CMPLR, timestamp as u32);
                write_reg(STK_BASE + STK_CMPHR, (timestamp >> 32) as u32);
            }
            true
        })
    }
}

embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver::new());

/// Start the system timer; call once before the executor runs
pub fn init() {
    DRIVER.start();
}

/// System timer compare interrupt
#[no_mangle]
extern "C" fn SysTick() {
    DRIVER.on_interrupt();
}

unsafe fn read_reg(addr: u32) -> u32 {
    core::ptr::read_volatile(addr as *const u32)
}

unsafe fn write_reg(addr: u32, value: u32) {
    core::ptr::write_volatile(addr as *mut u32, value)
}
