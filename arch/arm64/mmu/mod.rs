//! Memory Management Unit backend for ARM64
//!
//! Two-stage translation support for the hypervisor: descriptor attribute
//! encoding, stage-2 translation geometry, EL2 MMU bring-up, and the data
//! cache maintenance required when translation table memory changes.
//!
//! Nothing here walks or allocates tables; the generic memory-management
//! layer owns the tables and calls down into this module for the
//! architecture-specific answers.

/// Descriptor attribute encoding and combination
pub mod attrs;

/// Data cache maintenance for table memory
pub mod cache;

/// Stage-2 translation geometry selection
pub mod geometry;

/// EL2 MMU bring-up
pub mod init;

// Re-export the stable surface consumed by the generic layer
pub use attrs::{combine, encode, DescriptorAttrs};
pub use cache::write_back_range;
pub use geometry::TranslationGeometry;
pub use init::init;

use bitflags::bitflags;

/// Translation stage a request targets
///
/// Stage 1 translates the hypervisor's own virtual addresses at EL2;
/// stage 2 translates guest physical addresses on behalf of a guest.
/// Keeping the stage out of the mode flags makes a request for "both
/// stages at once" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Stage1,
    Stage2,
}

bitflags! {
    /// Abstract access mode for a mapping, as requested by the generic
    /// memory-management layer
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapMode: u32 {
        /// Read access
        const READ = 1 << 0;
        /// Write access
        const WRITE = 1 << 1;
        /// Instruction fetch allowed
        const EXECUTE = 1 << 2;
        /// Device memory rather than normal cacheable memory
        const DEVICE = 1 << 3;
    }
}

/// Physical address of a translation table, as handed over by the
/// generic memory-management layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PhysAddr(u64);

impl PhysAddr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_mode_flags() {
        let mode = MapMode::READ | MapMode::WRITE;
        assert!(mode.contains(MapMode::READ));
        assert!(mode.contains(MapMode::WRITE));
        assert!(!mode.contains(MapMode::EXECUTE));
        assert!(!mode.contains(MapMode::DEVICE));
    }

    #[test]
    fn test_phys_addr_roundtrip() {
        let pa = PhysAddr::new(0x4050_0000);
        assert_eq!(pa.as_u64(), 0x4050_0000);
    }
}
