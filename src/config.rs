//! Build-time configuration. There is no runtime configuration surface:
//! changing any of these means reflashing.

use crate::pmp::{MemoryMap, Permissions, Region, RegionKind};
use crate::uart::{LineFormat, Parity};

// ============================================================================
// UART (QEMU virt machine: 16550-compatible at 0x1000_0000)
// ============================================================================

/// Local diagnostics console.
pub const CONSOLE_UART_BASE: usize = 0x1000_0000;

/// Link to the remote dashboard. QEMU virt has a single 16550, so the link
/// shares it with the console; boards with a second UART point this at it.
pub const LINK_UART_BASE: usize = 0x1000_0000;

/// Input clock of the 16550 on QEMU virt (`clock-frequency` in the DT).
pub const UART_CLOCK_HZ: u32 = 3_686_400;

pub const LINK_BAUD_RATE: u32 = 9600;

pub const LINK_FORMAT: LineFormat = LineFormat {
    data_bits: 8,
    stop_bits: 1,
    parity: Parity::None,
};

// ============================================================================
// Security
// ============================================================================

/// AES-128 key. Only ever materialized inside the kernel's `.kernel_secret`
/// section.
pub const SECRET_KEY: [u8; 16] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6,
    0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

/// Syscall operation ids (register a0).
pub const SYSCALL_ENCRYPT: usize = 1;

// ============================================================================
// Sandbox task
// ============================================================================

/// Temperature reported on cycle 0; cycle `n` reports `BASE + n % SPAN`.
pub const SENSOR_BASE_CELSIUS: u32 = 20;
pub const SENSOR_SPAN: u32 = 10;

/// The task tries to read the kernel secret right after this cycle's report.
pub const ATTACK_CYCLE: Option<u32> = Some(3);

/// Busy-wait between reports (roughly two seconds under QEMU TCG).
pub const REPORT_PERIOD_SPINS: u32 = 40_000_000;

// ============================================================================
// Memory map (must agree with memory.x)
// ============================================================================

pub const TEXT: Region = Region::new(
    "text",
    0x8000_0000,
    128 * 1024,
    RegionKind::SharedCode,
    Permissions::R.union(Permissions::X),
    true,
);

/// Holds the `.data` load image, which includes the key bytes.
pub const KERNEL_ROM: Region = Region::new(
    "kernel-rom",
    0x8002_0000,
    32 * 1024,
    RegionKind::Kernel,
    Permissions::empty(),
    false,
);

pub const KERNEL_RAM: Region = Region::new(
    "kernel-ram",
    0x8004_0000,
    64 * 1024,
    RegionKind::Kernel,
    Permissions::empty(),
    false,
);

pub const TASK_RAM: Region = Region::new(
    "task-ram",
    0x8005_0000,
    64 * 1024,
    RegionKind::TaskData,
    Permissions::R.union(Permissions::W),
    false,
);

pub const UART_MMIO: Region = Region::new(
    "uart",
    0x1000_0000,
    4 * 1024,
    RegionKind::Peripheral,
    Permissions::R.union(Permissions::W),
    false,
);

pub static MEMORY_MAP: MemoryMap =
    MemoryMap::new(&[TEXT, KERNEL_ROM, KERNEL_RAM, TASK_RAM, UART_MMIO]);
