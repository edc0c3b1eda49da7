//! EL2 system register access
//!
//! Bit definitions for the registers the MMU bring-up programs, and the
//! narrow access trait that keeps the attribute/geometry logic testable
//! off-target.
//! Reference: ARM DDI 0487I.a, D13 - AArch64 System Register Descriptions

/// ID_AA64MMFR0_EL1 (Memory Model Feature Register 0) fields
pub mod id_aa64mmfr0 {
    /// PARange field mask (bits [3:0]) - supported physical address range
    pub const PARANGE_MASK: u64 = 0xf;
    /// TGran4 field shift (bits [31:28])
    pub const TGRAN4_SHIFT: u64 = 28;
    /// TGran4 field mask; a value of 0 means 4KB granules are supported
    pub const TGRAN4_MASK: u64 = 0xf;
}

/// VTCR_EL2 (Virtualization Translation Control Register) bits
pub mod vtcr_el2 {
    /// T0SZ (IPA size = 64 - T0SZ)
    pub const T0SZ_SHIFT: u64 = 0;
    /// SL0 (starting level for the stage-2 walk)
    pub const SL0_SHIFT: u64 = 6;
    /// IRGN0 (inner cacheability for table walks)
    pub const IRGN0_SHIFT: u64 = 8;
    /// ORGN0 (outer cacheability for table walks)
    pub const ORGN0_SHIFT: u64 = 10;
    /// SH0 (shareability for table walks)
    pub const SH0_SHIFT: u64 = 12;
    /// TG0 (stage-2 translation granule)
    pub const TG0_SHIFT: u64 = 14;
    /// PS (physical address size, same encoding as PARange)
    pub const PS_SHIFT: u64 = 16;
    /// RES1 (bit 31)
    pub const RES1: u64 = 1 << 31;

    /// IRGN0/ORGN0: normal memory, Write-Back Write-Allocate
    pub const RGN_WBWA: u64 = 1;
    /// SH0: inner shareable
    pub const SH0_ISH: u64 = 3;
    /// TG0: 4KB granule
    pub const TG0_4K: u64 = 0;
}

/// TCR_EL2 (Translation Control Register) bits
pub mod tcr_el2 {
    /// T0SZ (stage-1 input address size = 64 - T0SZ)
    pub const T0SZ_SHIFT: u64 = 0;
    /// IRGN0 (inner cacheability for table walks)
    pub const IRGN0_SHIFT: u64 = 8;
    /// ORGN0 (outer cacheability for table walks)
    pub const ORGN0_SHIFT: u64 = 10;
    /// SH0 (shareability for table walks)
    pub const SH0_SHIFT: u64 = 12;
    /// TG0 (stage-1 translation granule)
    pub const TG0_SHIFT: u64 = 14;
    /// PS (physical address size, same encoding as PARange)
    pub const PS_SHIFT: u64 = 16;
    /// TBI (top byte ignored in address matching)
    pub const TBI: u64 = 1 << 20;

    /// IRGN0/ORGN0: normal memory, Write-Back Write-Allocate
    pub const RGN_WBWA: u64 = 1;
    /// SH0: inner shareable
    pub const SH0_ISH: u64 = 3;
    /// TG0: 4KB granule
    pub const TG0_4K: u64 = 0;
    /// T0SZ for a 2^39-byte (512GB) hypervisor address space, the ceiling
    /// imposed by the fixed two-level stage-1 geometry
    pub const T0SZ_512GB: u64 = 25;
}

/// SCTLR_EL2 (System Control Register) bits
pub mod sctlr_el2 {
    /// M - MMU enable
    pub const M: u64 = 1 << 0;
    /// A - alignment check enable
    pub const A: u64 = 1 << 1;
    /// C - data cache enable
    pub const C: u64 = 1 << 2;
    /// SA - stack alignment check enable
    pub const SA: u64 = 1 << 3;
    /// I - instruction cache enable
    pub const I: u64 = 1 << 12;
    /// WXN - writable implies execute-never
    pub const WXN: u64 = 1 << 19;
    /// Bits that are RES1 without VHE
    pub const RES1: u64 =
        (3 << 4) | (1 << 11) | (1 << 16) | (1 << 18) | (3 << 22) | (3 << 28);
}

/// MAIR_EL2 (Memory Attribute Indirection Register) layout
///
/// The attribute indices here are the AttrIndx values stage-1 descriptors
/// carry; `mmu::attrs` and `mmu::init` must agree on them.
pub mod mair_el2 {
    /// Attribute index used for device mappings
    pub const DEVICE_INDEX: u64 = 0;
    /// Attribute index used for normal memory mappings
    pub const NORMAL_INDEX: u64 = 1;

    /// Device-nGnRnE memory
    pub const DEVICE_NGNRNE: u64 = 0x00;
    /// Normal memory, inner/outer Write-Back non-transient,
    /// Read-Allocate Write-Allocate
    pub const NORMAL_WBWA: u64 = 0xff;
}

/// CTR_EL0 (Cache Type Register) fields
pub mod ctr_el0 {
    /// DminLine shift (bits [19:16]) - log2 of the smallest data cache
    /// line, used to step cache maintenance by address
    pub const DMINLINE_SHIFT: u64 = 16;
    /// DminLine mask
    pub const DMINLINE_MASK: u64 = 0xf;
}

/// Access to the system registers MMU bring-up and cache maintenance
/// touch.
///
/// The attribute encoder and geometry selector are pure; everything that
/// reaches hardware goes through this trait, so the whole backend runs
/// against a fake implementation on a development host.
pub trait SysRegs {
    /// Read ID_AA64MMFR0_EL1
    fn read_id_aa64mmfr0(&self) -> u64;
    /// Read CTR_EL0
    fn read_ctr_el0(&self) -> u64;
    /// Write VTCR_EL2
    fn write_vtcr_el2(&mut self, value: u64);
    /// Write MAIR_EL2
    fn write_mair_el2(&mut self, value: u64);
    /// Write TTBR0_EL2
    fn write_ttbr0_el2(&mut self, value: u64);
    /// Write TCR_EL2
    fn write_tcr_el2(&mut self, value: u64);
    /// Write SCTLR_EL2
    fn write_sctlr_el2(&mut self, value: u64);
    /// Clean one data cache line to the point of coherency (`dc cvac`)
    fn dc_cvac(&mut self, line: usize);
    /// Full-system data synchronization barrier (`dsb sy`)
    fn dsb_sy(&mut self);
    /// Instruction synchronization barrier (`isb`)
    fn isb(&mut self);
}

#[cfg(target_arch = "aarch64")]
mod hw {
    use aarch64_cpu::asm::barrier;

    use super::SysRegs;

    /// The physical CPU's system registers
    pub struct Cpu;

    impl Cpu {
        /// # Safety
        ///
        /// The returned handle performs raw EL2 register writes; it must
        /// only be used while executing at EL2.
        pub const unsafe fn new() -> Self {
            Self
        }
    }

    impl SysRegs for Cpu {
        fn read_id_aa64mmfr0(&self) -> u64 {
            let value: u64;
            unsafe { core::arch::asm!("mrs {}, id_aa64mmfr0_el1", out(reg) value) };
            value
        }

        fn read_ctr_el0(&self) -> u64 {
            let value: u64;
            unsafe { core::arch::asm!("mrs {}, ctr_el0", out(reg) value) };
            value
        }

        fn write_vtcr_el2(&mut self, value: u64) {
            unsafe { core::arch::asm!("msr vtcr_el2, {}", in(reg) value) };
        }

        fn write_mair_el2(&mut self, value: u64) {
            unsafe { core::arch::asm!("msr mair_el2, {}", in(reg) value) };
        }

        fn write_ttbr0_el2(&mut self, value: u64) {
            unsafe { core::arch::asm!("msr ttbr0_el2, {}", in(reg) value) };
        }

        fn write_tcr_el2(&mut self, value: u64) {
            unsafe { core::arch::asm!("msr tcr_el2, {}", in(reg) value) };
        }

        fn write_sctlr_el2(&mut self, value: u64) {
            unsafe { core::arch::asm!("msr sctlr_el2, {}", in(reg) value) };
        }

        fn dc_cvac(&mut self, line: usize) {
            unsafe { core::arch::asm!("dc cvac, {}", in(reg) line, options(nostack)) };
        }

        fn dsb_sy(&mut self) {
            barrier::dsb(barrier::SY);
        }

        fn isb(&mut self) {
            barrier::isb(barrier::SY);
        }
    }
}

#[cfg(target_arch = "aarch64")]
pub use hw::Cpu;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sctlr_el2_bits() {
        assert_eq!(sctlr_el2::M, 1u64 << 0); // MMU enable
        assert_eq!(sctlr_el2::C, 1u64 << 2); // Data cache
        assert_eq!(sctlr_el2::I, 1u64 << 12); // Instruction cache
        assert_eq!(sctlr_el2::WXN, 1u64 << 19);
    }

    #[test]
    fn test_vtcr_el2_shifts() {
        assert_eq!(vtcr_el2::T0SZ_SHIFT, 0);
        assert_eq!(vtcr_el2::SL0_SHIFT, 6);
        assert_eq!(vtcr_el2::TG0_SHIFT, 14);
        assert_eq!(vtcr_el2::PS_SHIFT, 16);
    }

    #[test]
    fn test_mair_layout() {
        // The encoder's AttrIndx values must match this layout
        assert_ne!(mair_el2::DEVICE_INDEX, mair_el2::NORMAL_INDEX);
        assert_eq!(mair_el2::DEVICE_NGNRNE, 0x00);
        assert_eq!(mair_el2::NORMAL_WBWA, 0xff);
    }
}
