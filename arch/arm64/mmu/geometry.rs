//! Stage-2 translation geometry for ARM64
//!
//! Derives the stage-2 table depth and root-table fan-out from the
//! physical address range the hardware reports. Tables are concatenated
//! at the root to keep the tree shallow and wide: every level is an extra
//! memory access on each hardware walk, so leftover index bits go into
//! the root fan-out instead of another level whenever they fit.

use super::Stage;
use crate::arch::arm64::{PAGE_LEVEL_BITS, PAGE_SHIFT};

/// Maximum number of address bits root-table concatenation can absorb.
/// Four bits concatenates up to 16 tables; past that, an extra level is
/// cheaper than a wider root.
const MAX_CONCAT_BITS: u32 = 4;

/// Stage-1 geometry is fixed at two levels and a single root table. That
/// caps the hypervisor's own address space at 512GB but saves one memory
/// access on every stage-1 walk.
const STAGE1_MAX_LEVEL: u8 = 2;
const STAGE1_ROOT_TABLES: u8 = 1;

/// Table depth and root fan-out of the stage-2 translation regime
///
/// Computed once during MMU bring-up on the boot core and read-only
/// afterwards; the generic layer threads it into every geometry query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationGeometry {
    s2_max_level: u8,
    s2_root_tables: u8,
}

impl TranslationGeometry {
    /// Chooses the shallowest stage-2 tree that still covers `pa_bits` of
    /// physical address space.
    pub fn select(pa_bits: u32) -> Self {
        let s2_max_level = if pa_bits >= 44 {
            3
        } else if pa_bits >= 35 {
            2
        } else {
            1
        };

        // Index bits that do not fill a whole level select one of the
        // concatenated root tables instead.
        let mut extend_bits = (pa_bits - PAGE_SHIFT) % PAGE_LEVEL_BITS;
        if extend_bits > MAX_CONCAT_BITS {
            extend_bits = 0;
        }

        Self {
            s2_max_level,
            s2_root_tables: 1 << extend_bits,
        }
    }

    /// Deepest table level for the given stage
    pub fn max_level(&self, stage: Stage) -> u8 {
        match stage {
            Stage::Stage1 => STAGE1_MAX_LEVEL,
            Stage::Stage2 => self.s2_max_level,
        }
    }

    /// Number of concatenated tables at the root for the given stage
    pub fn root_table_count(&self, stage: Stage) -> u8 {
        match stage {
            Stage::Stage1 => STAGE1_ROOT_TABLES,
            Stage::Stage2 => self.s2_root_tables,
        }
    }

    /// VTCR_EL2.SL0 encoding of the stage-2 starting level
    pub(super) fn start_level_sl0(&self) -> u64 {
        (self.s2_max_level - 1) as u64
    }
}
