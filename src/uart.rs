//! 16550-compatible UART, polled.

use core::fmt;

// Register offsets (DLAB = 0 unless noted)
const THR: usize = 0; // transmit holding (write)
const DLL: usize = 0; // divisor latch low (DLAB = 1)
const IER: usize = 1; // interrupt enable
const DLM: usize = 1; // divisor latch high (DLAB = 1)
const FCR: usize = 2; // FIFO control (write)
const LCR: usize = 3; // line control
const MCR: usize = 4; // modem control
const LSR: usize = 5; // line status

const LCR_DLAB: u8 = 0x80;
const LSR_THRE: u8 = 0x20;
const FCR_ENABLE_CLEAR: u8 = 0x07;
const MCR_DTR_RTS: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFormat {
    /// 5..=8
    pub data_bits: u8,
    /// 1 or 2
    pub stop_bits: u8,
    pub parity: Parity,
}

impl LineFormat {
    /// LCR value for this format (DLAB clear).
    pub const fn lcr(&self) -> u8 {
        let word = match self.data_bits {
            5 => 0b00,
            6 => 0b01,
            7 => 0b10,
            _ => 0b11,
        };
        let stop = if self.stop_bits >= 2 { 1 << 2 } else { 0 };
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Odd => 1 << 3,
            Parity::Even => (1 << 3) | (1 << 4),
        };
        word | stop | parity
    }
}

/// Baud divisor, rounded to nearest: clock / (16 * baud).
pub const fn divisor(clock_hz: u32, baud: u32) -> u16 {
    let div = (clock_hz + 8 * baud) / (16 * baud);
    if div == 0 {
        1
    } else if div > u16::MAX as u32 {
        u16::MAX
    } else {
        div as u16
    }
}

pub struct Uart16550 {
    base: usize,
}

impl Uart16550 {
    /// # Safety
    ///
    /// `base` must be the MMIO base of a 16550 that the current privilege
    /// level may access.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn init(&mut self, clock_hz: u32, baud: u32, format: LineFormat) {
        let div = divisor(clock_hz, baud);
        self.write_reg(IER, 0x00);
        self.write_reg(LCR, LCR_DLAB);
        self.write_reg(DLL, (div & 0xFF) as u8);
        self.write_reg(DLM, (div >> 8) as u8);
        self.write_reg(LCR, format.lcr());
        self.write_reg(FCR, FCR_ENABLE_CLEAR);
        self.write_reg(MCR, MCR_DTR_RTS);
    }

    pub fn putc(&mut self, c: u8) {
        while self.read_reg(LSR) & LSR_THRE == 0 {
            core::hint::spin_loop();
        }
        self.write_reg(THR, c);
    }

    fn write_reg(&mut self, offset: usize, value: u8) {
        unsafe { ((self.base + offset) as *mut u8).write_volatile(value) }
    }

    fn read_reg(&self, offset: usize) -> u8 {
        unsafe { ((self.base + offset) as *const u8).read_volatile() }
    }
}

impl fmt::Write for Uart16550 {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            self.putc(b);
        }
        Ok(())
    }
}
