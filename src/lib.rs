//! RISC-V Secure Sandbox — two-level security kernel
//!
//! A minimal M-mode kernel that keeps an AES-128 key to itself and lets an
//! untrusted U-mode task use it through exactly one `ecall`:
//!
//!   1. **Privilege separation** — M-mode boots, programs PMP, brings up
//!      the link UART, then drops to U-mode via `mret`
//!   2. **Single trap vector** — every exception is classified once:
//!      - ecall from U-mode        → syscall service (ENCRYPT)
//!      - load/store access fault  → violation handler
//!      - anything else            → violation handler (fatal)
//!   3. **Fail-stop containment** — a violation emits one alert line on the
//!      link and moves the kernel to `Locked`, which is absorbing
//!
//! Everything that decides something lives in ordinary typed Rust in this
//! library and is tested on the host. The firmware image (`src/main.rs`,
//! feature `firmware`) only translates registers to and from these types.
//!
//! Memory map (QEMU virt, see `memory.x`):
//!   0x8000_0000 .. 0x8001_FFFF  TEXT        (128K) shared code + rodata  U=R-X
//!   0x8002_0000 .. 0x8002_7FFF  KERNEL_ROM  (32K)  .data load image      U=none
//!   0x8004_0000 .. 0x8004_FFFF  KERNEL_RAM  (64K)  kernel state + stacks U=none
//!   0x8005_0000 .. 0x8005_FFFF  TASK_RAM    (64K)  task stack + buffers  U=RW-
//!   0x1000_0000 .. 0x1000_0FFF  UART MMIO   (4K)   16550                 U=RW-

#![cfg_attr(not(test), no_std)]

#[cfg(all(target_arch = "riscv32", target_os = "none"))]
pub mod arch;
pub mod config;
pub mod crypto;
pub mod error;
pub mod kernel;
pub mod logger;
pub mod pmp;
pub mod privilege;
pub mod protocol;
pub mod sandbox;
pub mod syscall;
pub mod trap;
pub mod uart;
pub mod violation;

pub use crypto::{CryptoEngine, DataBlock, Secret, BLOCK_SIZE};
pub use error::{AccessFault, CryptoError, SyscallError};
pub use kernel::{Kernel, TrapOutcome};
pub use privilege::{BootPrivilege, Handoff, PrivilegeLevel};
pub use syscall::{SyscallRequest, SyscallStatus, UserBlock, UserMemory};
pub use trap::{TrapCause, TrapFrame};
pub use violation::SecurityState;
