//! Syscall service.
//!
//! Ecall ABI:
//!   a0 = operation
//!     1 = encrypt(a1 = &mut [u8; 16])   AES-128-ECB in place
//!   a1 = argument (task address)
//!   Status written back to a0 (see [`SyscallStatus`]).

use log::{debug, trace};

use crate::config::SYSCALL_ENCRYPT;
use crate::crypto::{CryptoEngine, DataBlock, BLOCK_SIZE};
use crate::error::SyscallError;
use crate::pmp::{MemoryMap, Permissions, RegionKind};
use crate::trap::TrapFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Unknown(usize),
}

impl From<usize> for Operation {
    fn from(id: usize) -> Self {
        match id {
            SYSCALL_ENCRYPT => Operation::Encrypt,
            other => Operation::Unknown(other),
        }
    }
}

/// Decoded `ecall` registers. Consumed by [`SyscallService::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRequest {
    pub operation: usize,
    pub argument: usize,
}

impl SyscallRequest {
    pub const fn from_frame(frame: &TrapFrame) -> Self {
        Self {
            operation: frame.a0,
            argument: frame.a1,
        }
    }
}

/// Status word returned in `a0`.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallStatus {
    Ok = 0,
    /// Unknown operation: nothing touched, caller resumed.
    Unsupported = 1,
    /// Argument is not a task-owned block: nothing touched, caller resumed.
    BadArgument = 2,
}

impl SyscallStatus {
    pub const fn word(self) -> usize {
        self as usize
    }

    pub const fn from_word(word: usize) -> Option<Self> {
        match word {
            0 => Some(SyscallStatus::Ok),
            1 => Some(SyscallStatus::Unsupported),
            2 => Some(SyscallStatus::BadArgument),
            _ => None,
        }
    }
}

impl From<Result<(), SyscallError>> for SyscallStatus {
    fn from(result: Result<(), SyscallError>) -> Self {
        match result {
            Ok(()) => SyscallStatus::Ok,
            Err(SyscallError::Unsupported(_)) => SyscallStatus::Unsupported,
            Err(SyscallError::BadArgument { .. }) => SyscallStatus::BadArgument,
        }
    }
}

/// Capability for one task-owned block.
///
/// Only [`SyscallService::validate`] creates these, and only for ranges that
/// lie entirely inside task RAM the U-mode task may both read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBlock {
    addr: usize,
}

impl UserBlock {
    pub const fn addr(&self) -> usize {
        self.addr
    }
}

/// The task's address space as seen from the kernel.
pub trait UserMemory {
    fn block_mut(&mut self, block: UserBlock) -> Option<&mut DataBlock>;
}

#[derive(Debug)]
pub struct SyscallService {
    memory_map: &'static MemoryMap,
}

impl SyscallService {
    pub const fn new(memory_map: &'static MemoryMap) -> Self {
        Self { memory_map }
    }

    /// Turn an untrusted task address into a block capability.
    pub fn validate(&self, addr: usize) -> Result<UserBlock, SyscallError> {
        let bad = SyscallError::BadArgument { addr, len: BLOCK_SIZE };
        let region = self.memory_map.region_of(addr).ok_or(bad)?;
        let task_rw = Permissions::R | Permissions::W;
        if region.kind != RegionKind::TaskData
            || !region.user.contains(task_rw)
            || !region.contains_range(addr, BLOCK_SIZE)
        {
            return Err(bad);
        }
        Ok(UserBlock { addr })
    }

    pub fn handle<M: UserMemory>(
        &self,
        request: SyscallRequest,
        memory: &mut M,
        crypto: &CryptoEngine,
    ) -> Result<(), SyscallError> {
        match Operation::from(request.operation) {
            Operation::Encrypt => {
                let block = self.validate(request.argument)?;
                let data = memory.block_mut(block).ok_or(SyscallError::BadArgument {
                    addr: request.argument,
                    len: BLOCK_SIZE,
                })?;
                crypto.encrypt_block_in_place(data);
                trace!("[KERNEL] encrypt block at {:#010x}", block.addr());
                Ok(())
            }
            Operation::Unknown(id) => {
                debug!("[KERNEL] ignoring unsupported syscall {id}");
                Err(SyscallError::Unsupported(id))
            }
        }
    }
}
