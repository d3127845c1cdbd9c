//! CSR access and the two one-way exits (`mret` into U-mode, halt).
//!
//! Only built for `riscv32*-unknown-none-elf`. Everything here is a thin
//! register shim; the decisions are made by the host-tested modules.

use core::arch::asm;

use crate::pmp::PmpImage;
use crate::privilege::Handoff;

pub fn read_mstatus() -> usize {
    let value: usize;
    unsafe { asm!("csrr {0}, mstatus", out(reg) value) };
    value
}

/// # Safety
///
/// `vector` must be the 4-byte aligned address of a direct-mode trap vector.
pub unsafe fn write_mtvec(vector: usize) {
    asm!("csrw mtvec, {0}", in(reg) vector);
}

/// Top of the stack the trap vector switches to (swapped via mscratch).
///
/// # Safety
///
/// Must be the top of an M-mode-only stack that nothing else uses.
pub unsafe fn write_mscratch(value: usize) {
    asm!("csrw mscratch, {0}", in(reg) value);
}

/// Write pmpaddr0..7 then pmpcfg0..1.
///
/// Addresses go first so that no entry is ever enabled over a stale range.
/// Locked entries cannot be changed again until reset.
///
/// # Safety
///
/// Must run in M-mode before any U-mode code executes. A layout that locks
/// M-mode out of its own code or stack ends the boot.
pub unsafe fn program_pmp(image: &PmpImage) {
    let [a0, a1, a2, a3, a4, a5, a6, a7] = image.pmpaddr;
    asm!(
        "csrw  0x3B0, {a0}",
        "csrw  0x3B1, {a1}",
        "csrw  0x3B2, {a2}",
        "csrw  0x3B3, {a3}",
        "csrw  0x3B4, {a4}",
        "csrw  0x3B5, {a5}",
        "csrw  0x3B6, {a6}",
        "csrw  0x3B7, {a7}",
        a0 = in(reg) a0,
        a1 = in(reg) a1,
        a2 = in(reg) a2,
        a3 = in(reg) a3,
        a4 = in(reg) a4,
        a5 = in(reg) a5,
        a6 = in(reg) a6,
        a7 = in(reg) a7,
    );
    asm!(
        "csrw  0x3A0, {cfg0}",  // pmpcfg0
        "csrw  0x3A1, {cfg1}",  // pmpcfg1
        cfg0 = in(reg) image.pmpcfg[0],
        cfg1 = in(reg) image.pmpcfg[1],
    );
}

/// Complete the descent: mstatus/mepc from the handoff, sp on the task
/// stack, `mret`.
///
/// # Safety
///
/// PMP must already confine U-mode; `handoff` must come from
/// [`BootPrivilege::descend_to_user`](crate::privilege::BootPrivilege::descend_to_user).
pub unsafe fn enter_user(handoff: Handoff) -> ! {
    asm!(
        "csrw   mstatus, {mstatus}",
        "csrw   mepc, {entry}",
        "la     sp, _task_stack_top",
        "mret",
        mstatus = in(reg) handoff.mstatus,
        entry = in(reg) handoff.mepc,
        options(noreturn),
    );
}

/// Stop the hart. Interrupts are never enabled in this design, so this
/// spins instead of `wfi` to leave no wake-up path.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
