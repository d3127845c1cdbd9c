//! The untrusted U-mode task: a fake temperature sensor that asks the kernel
//! to encrypt each reading and ships the ciphertext to the dashboard.
//!
//! Runs entirely at User level. It reaches the outside world only through
//! [`UserEnvironment`]; it must not use `log` or touch any kernel static.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::{SENSOR_BASE_CELSIUS, SENSOR_SPAN};
use crate::crypto::{DataBlock, BLOCK_SIZE};
use crate::protocol;
use crate::syscall::SyscallStatus;

/// What U-mode can do.
pub trait UserEnvironment {
    /// `ecall` ENCRYPT on `block`.
    fn encrypt(&mut self, block: &mut DataBlock) -> SyscallStatus;

    /// Write one protocol line to the link UART.
    fn send(&mut self, line: &str);

    /// Local diagnostics, one line.
    fn debug(&mut self, args: fmt::Arguments<'_>);

    /// Load one byte of the kernel's secret storage. Under a working PMP
    /// this traps and the kernel never lets the task run again, so a `Some`
    /// means isolation has failed.
    fn read_kernel_secret(&mut self) -> Option<u8>;

    /// Wait until the next report is due.
    fn pause(&mut self);
}

/// Sensor reading for a cycle: `"Temp: NN.0C     "`, exactly one block.
pub fn reading(cycle: u32) -> DataBlock {
    let celsius = SENSOR_BASE_CELSIUS + cycle % SENSOR_SPAN;
    let mut text: String<BLOCK_SIZE> = String::new();
    let _ = write!(text, "Temp: {celsius}.0C");

    let mut block = [b' '; BLOCK_SIZE];
    block[..text.len()].copy_from_slice(text.as_bytes());
    block
}

pub struct SensorTask {
    cycle: u32,
    attack_cycle: Option<u32>,
}

impl SensorTask {
    pub const fn new(attack_cycle: Option<u32>) -> Self {
        Self {
            cycle: 0,
            attack_cycle,
        }
    }

    /// Cycles completed so far.
    pub const fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn run_cycle<E: UserEnvironment>(&mut self, env: &mut E) {
        env.debug(format_args!("--- [SANDBOX] Cycle {} ---", self.cycle));
        self.cycle = self.cycle.wrapping_add(1);

        let mut block = reading(self.cycle);
        match env.encrypt(&mut block) {
            SyscallStatus::Ok => {
                let line = protocol::data_line(&block);
                env.debug(format_args!("[SANDBOX] Sending: {}", line.trim_end()));
                env.send(&line);
            }
            // Never put a plaintext reading on the wire.
            refused => env.debug(format_args!("[SANDBOX] kernel refused encrypt: {refused:?}")),
        }

        if self.attack_cycle == Some(self.cycle) {
            env.debug(format_args!("[SANDBOX] >:D LAUNCHING ATTACK ON KERNEL..."));
            if let Some(stolen) = env.read_kernel_secret() {
                env.debug(format_args!(
                    "[SANDBOX] read {stolen:#04x} from kernel memory: attack succeeded (FAIL!)"
                ));
            }
        }

        env.pause();
    }
}
