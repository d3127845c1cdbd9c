//! Physical Memory Protection layout.
//!
//! The same table is used twice: the firmware packs it into `pmpaddr` /
//! `pmpcfg` CSR values at boot, and the kernel (plus the host tests) asks it
//! whether a given access is legal for a given privilege level.
//!
//! RISC-V PMP rules modelled here (RV32, first 8 entries):
//!   - Entries are checked in priority order (0 = highest); first match wins
//!   - M-mode bypasses PMP unless the matching entry is Locked (L bit)
//!   - With no matching entry: M-mode = full access, U-mode = no access

use bitflags::bitflags;

use crate::error::AccessFault;
use crate::privilege::PrivilegeLevel;
use crate::trap::cause;

/// Number of PMP entries this kernel programs (pmpaddr0..7, pmpcfg0..1).
pub const PMP_ENTRIES: usize = 8;

/// PMP address mode: NAPOT (Naturally Aligned Power-Of-Two)
const PMP_NAPOT: u8 = 0x18; // A field = 0b11

/// PMP lock bit — locks entry and makes it apply to M-mode too
const PMP_L: u8 = 0x80;

bitflags! {
    /// Permission bits of a `pmpcfg` octet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const R = 0x01;
        const W = 0x02;
        const X = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Load,
    Store,
    Fetch,
}

impl Access {
    const fn permission(self) -> Permissions {
        match self {
            Access::Load => Permissions::R,
            Access::Store => Permissions::W,
            Access::Fetch => Permissions::X,
        }
    }
}

/// Who a region belongs to. Only `TaskData` may carry syscall arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    SharedCode,
    Kernel,
    TaskData,
    Peripheral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub base: usize,
    pub size: usize,
    pub kind: RegionKind,
    /// What U-mode may do here.
    pub user: Permissions,
    /// Also binds M-mode to `user`.
    pub locked: bool,
}

impl Region {
    /// NAPOT regions must be a power of two in size and size-aligned; a bad
    /// entry in a `const` table fails the build.
    pub const fn new(
        name: &'static str,
        base: usize,
        size: usize,
        kind: RegionKind,
        user: Permissions,
        locked: bool,
    ) -> Self {
        assert!(size >= 8 && size.is_power_of_two(), "NAPOT size must be a power of two >= 8");
        assert!(base % size == 0, "NAPOT base must be size-aligned");
        Self { name, base, size, kind, user, locked }
    }

    pub const fn end(&self) -> usize {
        self.base + self.size
    }

    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// True if `[addr, addr + len)` lies entirely inside this region.
    pub fn contains_range(&self, addr: usize, len: usize) -> bool {
        match addr.checked_add(len) {
            Some(end) => addr >= self.base && end <= self.end(),
            None => false,
        }
    }

    /// NAPOT encoding: pmpaddr = (base >> 2) | ((size >> 3) - 1)
    pub const fn pmpaddr(&self) -> usize {
        (self.base >> 2) | ((self.size >> 3) - 1)
    }

    pub const fn pmpcfg(&self) -> u8 {
        let lock = if self.locked { PMP_L } else { 0 };
        lock | PMP_NAPOT | self.user.bits()
    }

    fn permits(&self, level: PrivilegeLevel, access: Access) -> bool {
        match level {
            PrivilegeLevel::Supervisor if !self.locked => true,
            _ => self.user.contains(access.permission()),
        }
    }
}

/// CSR images for `configure_pmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmpImage {
    pub pmpaddr: [usize; PMP_ENTRIES],
    pub pmpcfg: [u32; PMP_ENTRIES / 4],
}

#[derive(Debug)]
pub struct MemoryMap {
    regions: &'static [Region],
}

impl MemoryMap {
    /// Regions must not overlap: `check` walks a range region by region and
    /// assumes nothing of higher priority starts inside the one it is in.
    pub const fn new(regions: &'static [Region]) -> Self {
        assert!(regions.len() <= PMP_ENTRIES, "more regions than PMP entries");
        let mut i = 0;
        while i < regions.len() {
            let mut j = i + 1;
            while j < regions.len() {
                let (a, b) = (&regions[i], &regions[j]);
                assert!(a.end() <= b.base || b.end() <= a.base, "PMP regions overlap");
                j += 1;
            }
            i += 1;
        }
        Self { regions }
    }

    pub fn regions(&self) -> &'static [Region] {
        self.regions
    }

    /// Highest-priority region matching `addr`.
    pub fn region_of(&self, addr: usize) -> Option<&'static Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    /// Apply PMP rules to every byte of `[addr, addr + len)`.
    pub fn check(
        &self,
        level: PrivilegeLevel,
        access: Access,
        addr: usize,
        len: usize,
    ) -> Result<(), AccessFault> {
        let fault = AccessFault { addr, access, level };
        let last = addr
            .checked_add(len.max(1) - 1)
            .ok_or(fault)?;

        let mut cursor = addr;
        loop {
            let allowed = match self.region_of(cursor) {
                Some(region) => region.permits(level, access),
                None => level == PrivilegeLevel::Supervisor,
            };
            if !allowed {
                return Err(AccessFault { addr: cursor, ..fault });
            }
            // Regions are contiguous blocks; jump to the next boundary.
            let next = match self.region_of(cursor) {
                Some(region) => region.end(),
                None => self
                    .regions
                    .iter()
                    .map(|r| r.base)
                    .filter(|&base| base > cursor)
                    .min()
                    .unwrap_or(usize::MAX),
            };
            if next == usize::MAX || next > last {
                return Ok(());
            }
            cursor = next;
        }
    }

    /// Pack the table into CSR values, 4 cfg octets per RV32 `pmpcfg` word.
    /// Unused entries stay OFF.
    pub fn pmp_image(&self) -> PmpImage {
        let mut image = PmpImage {
            pmpaddr: [0; PMP_ENTRIES],
            pmpcfg: [0; PMP_ENTRIES / 4],
        };
        for (i, region) in self.regions.iter().enumerate() {
            image.pmpaddr[i] = region.pmpaddr();
            image.pmpcfg[i / 4] |= u32::from(region.pmpcfg()) << ((i % 4) * 8);
        }
        image
    }
}

impl AccessFault {
    /// The mcause the hardware raises for this denial.
    pub const fn cause(&self) -> usize {
        match self.access {
            Access::Load => cause::LOAD_ACCESS_FAULT,
            Access::Store => cause::STORE_ACCESS_FAULT,
            Access::Fetch => cause::INSTRUCTION_ACCESS_FAULT,
        }
    }
}
