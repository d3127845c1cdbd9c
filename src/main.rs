//! RISC-V Secure Sandbox — firmware image
//!
//! Boot flow:
//!
//!   1. `_start`: kernel stack, zero `.bss`, copy `.data` (and with it the
//!      key) from kernel ROM into kernel RAM
//!   2. `kernel_main`: console logger, trap vector + trap stack, PMP
//!   3. Privilege descent: link UART brought up in M-mode, then `mret` into
//!      `sandbox_entry` at U-mode on the task stack
//!   4. From then on M-mode only runs inside `_trap_vector`
//!
//! Build: `cargo build --release --features firmware --target riscv32imac-unknown-none-elf`
//! Run:   `cargo run --release --features firmware --target riscv32imac-unknown-none-elf`

#![no_std]
#![no_main]

use core::arch::{asm, naked_asm};
use core::fmt::{self, Write};
use core::panic::PanicInfo;
use core::ptr::addr_of;

use log::{info, LevelFilter};
use spin::Mutex;

use riscv_secure_sandbox::arch;
use riscv_secure_sandbox::config::{self, MEMORY_MAP};
use riscv_secure_sandbox::logger::ConsoleLogger;
use riscv_secure_sandbox::sandbox::{SensorTask, UserEnvironment};
use riscv_secure_sandbox::uart::Uart16550;
use riscv_secure_sandbox::{
    BootPrivilege, DataBlock, Kernel, Secret, SyscallStatus, TrapFrame, TrapOutcome, UserBlock,
    UserMemory,
};

extern "C" {
    static _trap_stack_top: u8;
    static _kernel_secret_start: u8;
}

// ============================================================================
// Kernel state (M-mode only)
// ============================================================================

/// Console logger. Lives in kernel RAM, so U-mode must never log.
static CONSOLE: ConsoleLogger<Uart16550> = ConsoleLogger::new(
    unsafe { Uart16550::new(config::CONSOLE_UART_BASE) },
    LevelFilter::Info,
);

/// The kernel, key included. First thing in `.data`, at `_kernel_secret_start`.
#[link_section = ".kernel_secret"]
static KERNEL: Mutex<Kernel> = Mutex::new(Kernel::new(
    Secret::new(config::SECRET_KEY),
    &MEMORY_MAP,
));

// ============================================================================
// Boot Sequence (_start)
// ============================================================================

#[unsafe(naked)]
#[no_mangle]
#[link_section = ".text.init"]
pub unsafe extern "C" fn _start() -> ! {
    naked_asm!(
        // ── 1. Set up kernel stack ──
        "la     sp, _kernel_stack_top",

        // ── 2. Zero .bss ──
        "la     t0, _bss_start",
        "la     t1, _bss_end",
        "1: beq  t0, t1, 2f",
        "sw     zero, 0(t0)",
        "addi   t0, t0, 4",
        "j      1b",
        "2:",

        // ── 3. Copy .data from kernel ROM to kernel RAM ──
        "la     t0, _data_start",
        "la     t1, _data_end",
        "la     t2, _data_load",
        "3: beq  t0, t1, 4f",
        "lw     t3, 0(t2)",
        "sw     t3, 0(t0)",
        "addi   t0, t0, 4",
        "addi   t2, t2, 4",
        "j      3b",
        "4:",

        // ── 4. Jump to Rust (M-mode init) ──
        "call   {main}",

        // ── 5. Should not return ──
        "5: j   5b",
        main = sym kernel_main,
    )
}

// ============================================================================
// Trap Vector
// ============================================================================

/// Single direct-mode trap vector.
///
/// Swaps to the trap stack through mscratch, spills the caller-saved
/// registers and trap CSRs as a [`TrapFrame`], and hands the frame to
/// `trap_entry`. Returns only when the kernel resumes the task; the saved
/// (possibly advanced) mepc and a0 go back to the hardware.
///
/// Offsets are the `TrapFrame` field order.
#[unsafe(naked)]
#[no_mangle]
#[link_section = ".text.trap"]
unsafe extern "C" fn _trap_vector() {
    naked_asm!(
        ".align 2",
        // sp = trap stack, mscratch = interrupted sp
        "csrrw  sp, mscratch, sp",
        "addi   sp, sp, -{frame}",
        "sw     ra,  0(sp)",
        "sw     t0,  4(sp)",
        "sw     t1,  8(sp)",
        "sw     t2, 12(sp)",
        "sw     a0, 16(sp)",
        "sw     a1, 20(sp)",
        "sw     a2, 24(sp)",
        "sw     a3, 28(sp)",
        "sw     a4, 32(sp)",
        "sw     a5, 36(sp)",
        "sw     a6, 40(sp)",
        "sw     a7, 44(sp)",
        "sw     t3, 48(sp)",
        "sw     t4, 52(sp)",
        "sw     t5, 56(sp)",
        "sw     t6, 60(sp)",
        "csrr   t0, mepc",
        "sw     t0, 64(sp)",
        "csrr   t0, mcause",
        "sw     t0, 68(sp)",
        "csrr   t0, mtval",
        "sw     t0, 72(sp)",
        "csrr   t0, mstatus",
        "sw     t0, 76(sp)",

        "mv     a0, sp",
        "call   {entry}",

        // ── Resume ──
        "lw     t0, 64(sp)",
        "csrw   mepc, t0",
        "lw     ra,  0(sp)",
        "lw     t0,  4(sp)",
        "lw     t1,  8(sp)",
        "lw     t2, 12(sp)",
        "lw     a0, 16(sp)",
        "lw     a1, 20(sp)",
        "lw     a2, 24(sp)",
        "lw     a3, 28(sp)",
        "lw     a4, 32(sp)",
        "lw     a5, 36(sp)",
        "lw     a6, 40(sp)",
        "lw     a7, 44(sp)",
        "lw     t3, 48(sp)",
        "lw     t4, 52(sp)",
        "lw     t5, 56(sp)",
        "lw     t6, 60(sp)",
        "addi   sp, sp, {frame}",
        "csrrw  sp, mscratch, sp",
        "mret",
        frame = const TrapFrame::SIZE,
        entry = sym trap_entry,
    )
}

/// Task RAM as the kernel sees it.
struct TaskMemory;

impl UserMemory for TaskMemory {
    fn block_mut(&mut self, block: UserBlock) -> Option<&mut DataBlock> {
        // A UserBlock is only ever built for 16 bytes inside task RAM, and
        // the task is stopped for the duration of the trap.
        unsafe { (block.addr() as *mut DataBlock).as_mut() }
    }
}

extern "C" fn trap_entry(frame: &mut TrapFrame) {
    let outcome = match KERNEL.try_lock() {
        Some(mut kernel) => {
            let mut link = unsafe { Uart16550::new(config::LINK_UART_BASE) };
            kernel.handle_trap(frame, &mut TaskMemory, &mut link)
        }
        // Trapped while already handling a trap.
        None => TrapOutcome::Halt,
    };

    if outcome == TrapOutcome::Halt {
        arch::halt();
    }
}

// ============================================================================
// M-Mode Main
// ============================================================================

extern "C" fn kernel_main() -> ! {
    let _ = CONSOLE.install();
    CONSOLE.with_sink(|console| {
        let _ = console.write_str("\r\n--- RISC-V SECURE IOT BOOTING ---\r\n");
    });

    unsafe {
        arch::write_mscratch(addr_of!(_trap_stack_top) as usize);
        arch::write_mtvec(_trap_vector as usize);
    }
    info!("[KERNEL] trap vector at {:#010x}", _trap_vector as usize);

    let image = MEMORY_MAP.pmp_image();
    unsafe { arch::program_pmp(&image) };
    for (i, region) in MEMORY_MAP.regions().iter().enumerate() {
        info!(
            "[PMP] entry {i}: {:<10} {:#010x} {:>4}K U={:?}{}",
            region.name,
            region.base,
            region.size / 1024,
            region.user,
            if region.locked { " locked" } else { "" },
        );
    }

    // Reset path, nothing has run in U-mode yet.
    let boot = unsafe { BootPrivilege::take() };
    let handoff = boot.descend_to_user(arch::read_mstatus(), sandbox_entry as usize, || {
        let mut link = unsafe { Uart16550::new(config::LINK_UART_BASE) };
        link.init(config::UART_CLOCK_HZ, config::LINK_BAUD_RATE, config::LINK_FORMAT);
        info!("[KERNEL] link UART ready at {} baud", config::LINK_BAUD_RATE);
    });

    unsafe { arch::enter_user(handoff) }
}

// ============================================================================
// U-Mode Sandbox
// ============================================================================

/// The task's view of the machine: ecall for crypto, UART for output.
///
/// Holds no references into kernel memory; everything it owns lives on the
/// task stack.
struct FirmwareEnvironment {
    link: Uart16550,
    console: Uart16550,
}

impl UserEnvironment for FirmwareEnvironment {
    fn encrypt(&mut self, block: &mut DataBlock) -> SyscallStatus {
        let status: usize;
        unsafe {
            asm!(
                "ecall",
                inlateout("a0") config::SYSCALL_ENCRYPT => status,
                in("a1") block.as_mut_ptr(),
                options(nostack),
            );
        }
        SyscallStatus::from_word(status).unwrap_or(SyscallStatus::Unsupported)
    }

    fn send(&mut self, line: &str) {
        let _ = self.link.write_str(line);
    }

    fn debug(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.console.write_fmt(args);
        let _ = self.console.write_str("\r\n");
    }

    fn read_kernel_secret(&mut self) -> Option<u8> {
        let target = unsafe { addr_of!(_kernel_secret_start) };
        Some(unsafe { target.read_volatile() })
    }

    fn pause(&mut self) {
        for i in 0..config::REPORT_PERIOD_SPINS {
            core::hint::black_box(i);
        }
    }
}

extern "C" fn sandbox_entry() -> ! {
    let mut env = unsafe {
        FirmwareEnvironment {
            link: Uart16550::new(config::LINK_UART_BASE),
            console: Uart16550::new(config::CONSOLE_UART_BASE),
        }
    };
    let mut task = SensorTask::new(config::ATTACK_CYCLE);
    loop {
        task.run_cycle(&mut env);
    }
}

// ============================================================================
// Panic Handler
// ============================================================================

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    // Fresh handle: the panic may come from U-mode, which cannot reach
    // CONSOLE.
    let mut console = unsafe { Uart16550::new(config::CONSOLE_UART_BASE) };
    let _ = console.write_str("\r\n!!! SECURE SANDBOX PANIC !!!\r\n");
    if let Some(loc) = info.location() {
        let _ = writeln!(console, "  at {}:{}\r", loc.file(), loc.line());
    }
    let _ = console.write_str("  SYSTEM HALTED\r\n");
    arch::halt()
}
