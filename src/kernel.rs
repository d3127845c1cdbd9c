//! The kernel proper: owns the secret and decides the fate of every trap.

use core::fmt::Write;

use log::trace;

use crate::crypto::{CryptoEngine, Secret};
use crate::pmp::MemoryMap;
use crate::syscall::{SyscallRequest, SyscallService, SyscallStatus, UserMemory};
use crate::trap::{TrapFrame, ECALL_WIDTH};
use crate::violation::{SecurityState, ViolationHandler};

/// The only two ways a trap can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// `mret` to `frame.mepc` with the updated frame.
    Resume,
    /// Stop the hart forever.
    Halt,
}

#[derive(Debug)]
pub struct Kernel {
    crypto: CryptoEngine,
    syscalls: SyscallService,
    violations: ViolationHandler,
    serviced: u32,
}

impl Kernel {
    pub const fn new(secret: Secret, memory_map: &'static MemoryMap) -> Self {
        Self {
            crypto: CryptoEngine::new(secret),
            syscalls: SyscallService::new(memory_map),
            violations: ViolationHandler::new(),
            serviced: 0,
        }
    }

    pub const fn security_state(&self) -> SecurityState {
        self.violations.state()
    }

    /// Syscalls that reached the service (including refused ones).
    pub const fn syscalls_serviced(&self) -> u32 {
        self.serviced
    }

    /// Trap dispatcher.
    ///
    /// Reads mcause and mepc from the saved frame, classifies, and routes:
    ///   - ecall from U-mode  → syscall service, status in a0, mepc += 4
    ///   - load/store fault   → violation handler, halt
    ///   - anything else      → violation handler, halt
    ///
    /// Once locked, every trap halts without servicing anything.
    pub fn handle_trap<M: UserMemory, L: Write>(
        &mut self,
        frame: &mut TrapFrame,
        memory: &mut M,
        link: &mut L,
    ) -> TrapOutcome {
        let cause = frame.cause();
        let pc = frame.mepc;
        trace!("[KERNEL] trap {cause:?} at {pc:#010x}");

        if self.violations.is_locked() {
            return TrapOutcome::Halt;
        }

        if cause.is_violation() {
            self.violations.on_violation(cause, pc, frame.mtval, link);
            return TrapOutcome::Halt;
        }

        let request = SyscallRequest::from_frame(frame);
        let result = self.syscalls.handle(request, memory, &self.crypto);
        self.serviced = self.serviced.wrapping_add(1);

        frame.a0 = SyscallStatus::from(result).word();
        // Resume after the ecall, not on it.
        frame.mepc = pc.wrapping_add(ECALL_WIDTH);
        TrapOutcome::Resume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, MEMORY_MAP, SECRET_KEY, SYSCALL_ENCRYPT};
    use crate::protocol::ALERT_LINE;
    use crate::syscall::test_support::OneBlock;
    use crate::trap::cause;

    fn kernel() -> Kernel {
        Kernel::new(Secret::new(SECRET_KEY), &MEMORY_MAP)
    }

    fn ecall(op: usize, arg: usize) -> TrapFrame {
        TrapFrame {
            a0: op,
            a1: arg,
            mepc: 0x8000_0400,
            mcause: cause::ECALL_FROM_U,
            ..TrapFrame::default()
        }
    }

    #[test]
    fn ecall_resumes_after_the_instruction() {
        let mut kernel = kernel();
        let addr = config::TASK_RAM.base;
        let mut memory = OneBlock { addr, data: *b"Temp: 20.0C     " };
        let mut link = String::new();
        let mut frame = ecall(SYSCALL_ENCRYPT, addr);

        let outcome = kernel.handle_trap(&mut frame, &mut memory, &mut link);

        assert_eq!(outcome, TrapOutcome::Resume);
        assert_eq!(frame.mepc, 0x8000_0404);
        assert_eq!(frame.a0, SyscallStatus::Ok.word());
        assert_ne!(&memory.data, b"Temp: 20.0C     ");
        assert!(link.is_empty());
        assert_eq!(kernel.syscalls_serviced(), 1);
    }

    #[test]
    fn bad_argument_resumes_with_status() {
        let mut kernel = kernel();
        let mut memory = OneBlock { addr: config::TASK_RAM.base, data: [1; 16] };
        let mut link = String::new();
        let mut frame = ecall(SYSCALL_ENCRYPT, config::KERNEL_RAM.base);

        let outcome = kernel.handle_trap(&mut frame, &mut memory, &mut link);

        assert_eq!(outcome, TrapOutcome::Resume);
        assert_eq!(frame.a0, SyscallStatus::BadArgument.word());
        assert_eq!(frame.mepc, 0x8000_0404);
        assert_eq!(memory.data, [1; 16]);
        assert_eq!(kernel.security_state(), SecurityState::Normal);
    }

    #[test]
    fn load_fault_halts_without_touching_pc() {
        let mut kernel = kernel();
        let mut memory = OneBlock { addr: 0, data: [0; 16] };
        let mut link = String::new();
        let mut frame = TrapFrame {
            mepc: 0x8000_0800,
            mcause: cause::LOAD_ACCESS_FAULT,
            mtval: config::KERNEL_RAM.base,
            ..TrapFrame::default()
        };

        let outcome = kernel.handle_trap(&mut frame, &mut memory, &mut link);

        assert_eq!(outcome, TrapOutcome::Halt);
        assert_eq!(frame.mepc, 0x8000_0800);
        assert_eq!(link, ALERT_LINE);
        assert_eq!(kernel.security_state(), SecurityState::Locked);
    }

    #[test]
    fn no_syscall_is_serviced_after_lockout() {
        let mut kernel = kernel();
        let addr = config::TASK_RAM.base;
        let mut memory = OneBlock { addr, data: [9; 16] };
        let mut link = String::new();

        let mut fault = TrapFrame { mcause: cause::ILLEGAL_INSTRUCTION, ..TrapFrame::default() };
        assert_eq!(kernel.handle_trap(&mut fault, &mut memory, &mut link), TrapOutcome::Halt);

        let mut frame = ecall(SYSCALL_ENCRYPT, addr);
        let before = frame;
        assert_eq!(kernel.handle_trap(&mut frame, &mut memory, &mut link), TrapOutcome::Halt);

        assert_eq!(frame, before);
        assert_eq!(memory.data, [9; 16]);
        assert_eq!(kernel.syscalls_serviced(), 0);
        assert_eq!(link, ALERT_LINE);
    }
}
