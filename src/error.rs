//! Error types shared across the kernel.

use thiserror::Error;

use crate::pmp::Access;
use crate::privilege::PrivilegeLevel;

/// Why a syscall was not serviced. Never surfaces as a fault in the task;
/// it is folded into the status word written back to `a0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyscallError {
    #[error("unsupported syscall operation {0}")]
    Unsupported(usize),
    #[error("syscall argument {addr:#x}..+{len} is not task-owned memory")]
    BadArgument { addr: usize, len: usize },
}

/// A memory access the PMP layout forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{access:?} at {addr:#x} denied for {level:?} level")]
pub struct AccessFault {
    pub addr: usize,
    pub access: Access,
    pub level: PrivilegeLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("{0} bytes is not a whole number of cipher blocks")]
    PartialBlock(usize),
}
