//! ARM64 (AArch64) translation backend
//!
//! Orevisor runs at EL2 and uses both translation stages: stage 1 for the
//! hypervisor's own address space, stage 2 for guest-physical to physical
//! translation. This module carries the VMSAv8-64 constants shared by the
//! MMU backend and the register access layer.
//!
//! ## References
//! - [ARM Architecture Reference Manual ARMv8-A](https://developer.arm.com/documentation/ddi0487/latest)

pub mod cpu;
pub mod mmu;


// Re-export the surface the generic memory-management layer consumes
pub use mmu::*;

/// Page size (4KB granule)
pub const PAGE_SIZE: usize = 4096;

/// Page shift
pub const PAGE_SHIFT: u32 = 12;

/// Address bits resolved per translation table level (512 entries)
pub const PAGE_LEVEL_BITS: u32 = 9;
