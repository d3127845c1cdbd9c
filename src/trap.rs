//! Trap frame layout and cause classification.

use static_assertions::const_assert_eq;

/// mcause codes (exceptions, interrupt bit clear).
pub mod cause {
    pub const INSTRUCTION_ACCESS_FAULT: usize = 1;
    pub const ILLEGAL_INSTRUCTION: usize = 2;
    pub const BREAKPOINT: usize = 3;
    pub const LOAD_ACCESS_FAULT: usize = 5;
    pub const STORE_ACCESS_FAULT: usize = 7;
    pub const ECALL_FROM_U: usize = 8;
    pub const ECALL_FROM_M: usize = 11;

    /// Top bit of mcause: set for interrupts.
    pub const INTERRUPT: usize = 1 << (usize::BITS - 1);
}

/// Width of the `ecall` instruction; mepc is advanced by this on resume.
pub const ECALL_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    /// `ecall` from U-mode.
    UserRequest,
    IllegalLoad,
    IllegalStore,
    /// Anything else, carrying the raw mcause.
    Unclassified(usize),
}

impl TrapCause {
    pub const fn classify(mcause: usize) -> Self {
        match mcause {
            cause::ECALL_FROM_U => TrapCause::UserRequest,
            cause::LOAD_ACCESS_FAULT => TrapCause::IllegalLoad,
            cause::STORE_ACCESS_FAULT => TrapCause::IllegalStore,
            other => TrapCause::Unclassified(other),
        }
    }

    pub const fn is_violation(self) -> bool {
        !matches!(self, TrapCause::UserRequest)
    }
}

/// Registers saved by the trap vector.
///
/// Only caller-saved registers are spilled; the Rust handler preserves
/// s0-s11 itself. Field order is the vector's store order, so this must
/// match `_trap_vector` in `main.rs`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub ra: usize,
    pub t0: usize,
    pub t1: usize,
    pub t2: usize,
    /// Syscall operation id on entry, status word on exit.
    pub a0: usize,
    /// Syscall argument (task address of the block).
    pub a1: usize,
    pub a2: usize,
    pub a3: usize,
    pub a4: usize,
    pub a5: usize,
    pub a6: usize,
    pub a7: usize,
    pub t3: usize,
    pub t4: usize,
    pub t5: usize,
    pub t6: usize,
    pub mepc: usize,
    pub mcause: usize,
    pub mtval: usize,
    pub mstatus: usize,
}

impl TrapFrame {
    pub const WORDS: usize = 20;
    pub const SIZE: usize = Self::WORDS * core::mem::size_of::<usize>();

    pub const fn cause(&self) -> TrapCause {
        TrapCause::classify(self.mcause)
    }
}

const_assert_eq!(core::mem::size_of::<TrapFrame>(), TrapFrame::SIZE);
const_assert_eq!(core::mem::offset_of!(TrapFrame, a0), 4 * core::mem::size_of::<usize>());
const_assert_eq!(core::mem::offset_of!(TrapFrame, mepc), 16 * core::mem::size_of::<usize>());
