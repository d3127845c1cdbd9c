//! Privilege controller.
//!
//! The hart starts in M-mode (our Supervisor level). The only transition this
//! module performs is the one-way descent to U-mode at boot; the way back up
//! is a trap, which the hardware performs on its own.

use log::info;

/// `mstatus.MPP`: bits [12:11], the level `mret` returns to.
pub const MSTATUS_MPP_SHIFT: u32 = 11;
pub const MSTATUS_MPP_MASK: usize = 0b11 << MSTATUS_MPP_SHIFT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// M-mode: owns the secret and the trap vector.
    Supervisor,
    /// U-mode: the untrusted task.
    User,
}

impl PrivilegeLevel {
    /// Encoding used in `mstatus.MPP`.
    pub const fn mpp(self) -> usize {
        match self {
            PrivilegeLevel::Supervisor => 0b11,
            PrivilegeLevel::User => 0b00,
        }
    }

    /// The level a trap came from, as recorded by hardware in `mstatus.MPP`.
    /// S-mode (0b01) is not part of this design.
    pub const fn from_mstatus(mstatus: usize) -> Option<Self> {
        match (mstatus & MSTATUS_MPP_MASK) >> MSTATUS_MPP_SHIFT {
            0b11 => Some(PrivilegeLevel::Supervisor),
            0b00 => Some(PrivilegeLevel::User),
            _ => None,
        }
    }
}

/// CSR values that complete the descent: write both, then `mret`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    pub mstatus: usize,
    pub mepc: usize,
}

/// Proof that nothing has run below M-mode yet.
///
/// There is exactly one of these per boot and `descend_to_user` consumes
/// it, so privilege can be given up once and only once.
pub struct BootPrivilege {
    _private: (),
}

impl BootPrivilege {
    /// # Safety
    ///
    /// Call once per reset, from the boot path, before any U-mode code has
    /// executed.
    pub const unsafe fn take() -> Self {
        Self { _private: () }
    }

    /// Prepare the drop to U-mode at `entry`.
    ///
    /// `bring_up` runs here, still in M-mode: whatever the task depends on
    /// (the link UART) must be initialized before privilege is relinquished
    /// because the task cannot do privileged setup itself.
    pub fn descend_to_user<F: FnOnce()>(self, mstatus: usize, entry: usize, bring_up: F) -> Handoff {
        // MPP = 0b00 so that mret lands in U-mode.
        let mstatus = (mstatus & !MSTATUS_MPP_MASK) | (PrivilegeLevel::User.mpp() << MSTATUS_MPP_SHIFT);

        bring_up();

        info!("[KERNEL] Dropping privileges. Jumping to sandbox at {entry:#010x}...");
        Handoff { mstatus, mepc: entry }
    }
}
