//! A simulated hart for driving the kernel from host tests.
//!
//! Enforces the PMP memory map at User level, raises traps with the real
//! mcause codes into `Kernel::handle_trap`, and records what reaches the
//! link and the debug console. Once the kernel halts, the hart stops:
//! nothing further is executed or emitted.

#![allow(dead_code)]

use std::fmt;

use riscv_secure_sandbox::config::{self, MEMORY_MAP, SECRET_KEY, SYSCALL_ENCRYPT};
use riscv_secure_sandbox::pmp::Access;
use riscv_secure_sandbox::protocol::{ALERT_LINE, DATA_PREFIX};
use riscv_secure_sandbox::sandbox::UserEnvironment;
use riscv_secure_sandbox::trap::cause;
use riscv_secure_sandbox::{
    BootPrivilege, DataBlock, Kernel, PrivilegeLevel, Secret, SecurityState, SyscallStatus,
    TrapFrame, TrapOutcome, UserBlock, UserMemory, BLOCK_SIZE,
};

/// Where the sandbox is "entered"; only used as a pc.
pub const SANDBOX_ENTRY: usize = config::TEXT.base + 0x1000;

/// Scratch block near the top of the task stack, where the firmware task
/// keeps its reading.
pub const SCRATCH: usize = config::TASK_RAM.base + 0xC000;

/// First byte of the kernel's secret storage (start of kernel RAM).
pub const KERNEL_SECRET: usize = config::KERNEL_RAM.base;

/// Backing store for the task's RAM.
pub struct TaskRam {
    bytes: Vec<u8>,
}

impl TaskRam {
    fn new() -> Self {
        Self {
            bytes: vec![0; config::TASK_RAM.size],
        }
    }

    fn offset(addr: usize, len: usize) -> Option<usize> {
        config::TASK_RAM
            .contains_range(addr, len)
            .then(|| addr - config::TASK_RAM.base)
    }

    pub fn read(&self, addr: usize) -> DataBlock {
        let off = Self::offset(addr, BLOCK_SIZE).expect("block outside task RAM");
        self.bytes[off..off + BLOCK_SIZE].try_into().unwrap()
    }

    pub fn write(&mut self, addr: usize, block: &DataBlock) {
        let off = Self::offset(addr, BLOCK_SIZE).expect("block outside task RAM");
        self.bytes[off..off + BLOCK_SIZE].copy_from_slice(block);
    }
}

impl UserMemory for TaskRam {
    fn block_mut(&mut self, block: UserBlock) -> Option<&mut DataBlock> {
        let off = Self::offset(block.addr(), BLOCK_SIZE)?;
        (&mut self.bytes[off..off + BLOCK_SIZE]).try_into().ok()
    }
}

pub struct SimHart {
    pub kernel: Kernel,
    pub ram: TaskRam,
    pub link: String,
    pub console: String,
    level: PrivilegeLevel,
    pc: usize,
    halted: bool,
    link_ready: bool,
}

impl SimHart {
    /// Reset, then the boot path: descend to User at `SANDBOX_ENTRY`.
    pub fn boot() -> Self {
        let mut hart = Self {
            kernel: Kernel::new(Secret::new(SECRET_KEY), &MEMORY_MAP),
            ram: TaskRam::new(),
            link: String::new(),
            console: String::new(),
            level: PrivilegeLevel::Supervisor,
            pc: 0,
            halted: false,
            link_ready: false,
        };

        let mstatus = PrivilegeLevel::Supervisor.mpp() << 11;
        let boot = unsafe { BootPrivilege::take() };
        let mut link_ready = false;
        let handoff = boot.descend_to_user(mstatus, SANDBOX_ENTRY, || link_ready = true);

        hart.link_ready = link_ready;
        hart.level = PrivilegeLevel::from_mstatus(handoff.mstatus).expect("valid MPP");
        hart.pc = handoff.mepc;
        hart
    }

    pub fn level(&self) -> PrivilegeLevel {
        self.level
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn link_ready(&self) -> bool {
        self.link_ready
    }

    pub fn security_state(&self) -> SecurityState {
        self.kernel.security_state()
    }

    /// Take a trap from the current pc. Returns the final frame.
    pub fn trap(&mut self, mut frame: TrapFrame) -> (TrapOutcome, TrapFrame) {
        assert!(!self.halted, "a halted hart takes no traps");
        frame.mepc = self.pc;
        frame.mstatus = self.level.mpp() << 11;
        self.level = PrivilegeLevel::Supervisor;

        let outcome = self.kernel.handle_trap(&mut frame, &mut self.ram, &mut self.link);

        match outcome {
            TrapOutcome::Resume => {
                self.level = PrivilegeLevel::User;
                self.pc = frame.mepc;
            }
            TrapOutcome::Halt => self.halted = true,
        }
        (outcome, frame)
    }

    /// `ecall` from User. `None` if the kernel halted instead of resuming.
    pub fn ecall(&mut self, operation: usize, argument: usize) -> Option<usize> {
        if self.halted {
            return None;
        }
        let frame = TrapFrame {
            a0: operation,
            a1: argument,
            mcause: cause::ECALL_FROM_U,
            ..TrapFrame::default()
        };
        match self.trap(frame) {
            (TrapOutcome::Resume, frame) => Some(frame.a0),
            (TrapOutcome::Halt, _) => None,
        }
    }

    /// Any trap cause, e.g. an illegal instruction.
    pub fn raise(&mut self, mcause: usize, mtval: usize) -> TrapOutcome {
        let frame = TrapFrame {
            mcause,
            mtval,
            ..TrapFrame::default()
        };
        self.trap(frame).0
    }

    /// One-byte load at User level, checked against the memory map.
    pub fn user_load(&mut self, addr: usize) -> Option<u8> {
        self.user_access(Access::Load, addr)?;
        Some(
            TaskRam::offset(addr, 1)
                .map(|off| self.ram.bytes[off])
                .unwrap_or(0),
        )
    }

    /// One-byte store at User level, checked against the memory map.
    pub fn user_store(&mut self, addr: usize, value: u8) -> Option<()> {
        self.user_access(Access::Store, addr)?;
        if let Some(off) = TaskRam::offset(addr, 1) {
            self.ram.bytes[off] = value;
        }
        Some(())
    }

    fn user_access(&mut self, access: Access, addr: usize) -> Option<()> {
        if self.halted {
            return None;
        }
        assert_eq!(self.level, PrivilegeLevel::User);
        match MEMORY_MAP.check(PrivilegeLevel::User, access, addr, 1) {
            Ok(()) => Some(()),
            Err(fault) => {
                self.raise(fault.cause(), fault.addr);
                None
            }
        }
    }

    /// `ENCRYPT` on `block` placed at `SCRATCH`, as the firmware task does.
    pub fn encrypt_at_scratch(&mut self, block: &DataBlock) -> Option<(SyscallStatus, DataBlock)> {
        self.ram.write(SCRATCH, block);
        let word = self.ecall(SYSCALL_ENCRYPT, SCRATCH)?;
        let status = SyscallStatus::from_word(word).expect("known status word");
        Some((status, self.ram.read(SCRATCH)))
    }

    pub fn data_lines(&self) -> Vec<&str> {
        self.link
            .split_inclusive('\n')
            .filter(|line| line.starts_with(DATA_PREFIX))
            .collect()
    }

    pub fn alert_count(&self) -> usize {
        self.link.matches(ALERT_LINE).count()
    }
}

impl UserEnvironment for SimHart {
    fn encrypt(&mut self, block: &mut DataBlock) -> SyscallStatus {
        match self.encrypt_at_scratch(block) {
            Some((status, out)) => {
                *block = out;
                status
            }
            // Never observed by the task: the hart is stopped.
            None => SyscallStatus::Unsupported,
        }
    }

    fn send(&mut self, line: &str) {
        if !self.halted {
            self.link.push_str(line);
        }
    }

    fn debug(&mut self, args: fmt::Arguments<'_>) {
        if !self.halted {
            self.console.push_str(&args.to_string());
            self.console.push('\n');
        }
    }

    fn read_kernel_secret(&mut self) -> Option<u8> {
        self.user_load(KERNEL_SECRET)
    }

    fn pause(&mut self) {}
}

pub fn block(text: &str) -> DataBlock {
    text.as_bytes().try_into().expect("exactly 16 bytes")
}

pub fn pinned(hex_str: &str) -> DataBlock {
    hex::decode(hex_str)
        .expect("valid hex")
        .try_into()
        .expect("16 bytes")
}
