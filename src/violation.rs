//! Violation handler and the security state it owns.

use core::fmt::Write;

use log::error;

use crate::protocol::ALERT_LINE;
use crate::trap::TrapCause;

/// `Normal -> Locked`, once. `Locked` is absorbing: only a reset leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityState {
    Normal,
    Locked,
}

#[derive(Debug)]
pub struct ViolationHandler {
    state: SecurityState,
}

impl ViolationHandler {
    pub const fn new() -> Self {
        Self {
            state: SecurityState::Normal,
        }
    }

    pub const fn state(&self) -> SecurityState {
        self.state
    }

    pub const fn is_locked(&self) -> bool {
        matches!(self.state, SecurityState::Locked)
    }

    /// Report the violation and lock.
    ///
    /// In order: debug-console alert with the faulting pc, the alert line on
    /// the link, then `Locked`. The caller must stop the hart afterwards.
    /// Once locked this does nothing, so the link sees one alert per boot.
    pub fn on_violation<L: Write>(
        &mut self,
        cause: TrapCause,
        faulting_pc: usize,
        fault_addr: usize,
        link: &mut L,
    ) {
        if self.is_locked() {
            return;
        }

        match cause {
            TrapCause::IllegalLoad | TrapCause::IllegalStore => error!(
                "[KERNEL] !!! SECURITY ALERT !!! Illegal access at {faulting_pc:#010x} ({cause:?} of {fault_addr:#010x})"
            ),
            TrapCause::Unclassified(code) => error!(
                "[KERNEL] Unhandled trap: mcause {code:#x} at {faulting_pc:#010x} (mtval {fault_addr:#010x})"
            ),
            TrapCause::UserRequest => error!(
                "[KERNEL] syscall at {faulting_pc:#010x} routed to violation handler"
            ),
        }

        // Best effort: there is nothing left to fall back to if the link fails.
        let _ = link.write_str(ALERT_LINE);

        self.state = SecurityState::Locked;
    }
}

impl Default for ViolationHandler {
    fn default() -> Self {
        Self::new()
    }
}
