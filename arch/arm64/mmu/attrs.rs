//! Translation descriptor attributes for ARM64
//!
//! Maps abstract access modes onto stage-1/stage-2 descriptor attribute
//! bits, and folds table-level permission restrictions into block-level
//! descriptors during table splits.
//! Reference: ARM DDI 0487I.a, D8.3 - Translation table descriptor formats

use super::{MapMode, Stage};
use crate::arch::arm64::cpu::sysreg::mair_el2;

/// Shareability field values (same encoding in both stages)
pub mod sh {
    /// Non-shareable
    pub const NON_SHAREABLE: u64 = 0;
    /// Outer shareable
    pub const OUTER_SHAREABLE: u64 = 2;
    /// Inner shareable
    pub const INNER_SHAREABLE: u64 = 3;
}

/// Stage-1 block/page descriptor attribute bits
pub mod stage1 {
    /// Execute-never at EL0 (bit 54)
    pub const XN: u64 = 1 << 54;
    /// Privileged execute-never (bit 53)
    pub const PXN: u64 = 1 << 53;
    /// Access flag (bit 10)
    pub const AF: u64 = 1 << 10;
    /// Shareability field (bits [9:8])
    pub const SH_SHIFT: u64 = 8;
    /// AP[2] - read-only (bit 7)
    pub const AP2: u64 = 1 << 7;
    /// AP[1] - unprivileged access (bit 6)
    pub const AP1: u64 = 1 << 6;
    /// Access permission field (bits [7:6])
    pub const AP_SHIFT: u64 = 6;
    /// Non-secure (bit 5)
    pub const NS: u64 = 1 << 5;
    /// Memory attribute index field (bits [4:2])
    pub const ATTRINDX_SHIFT: u64 = 2;

    /// AP field: read-only
    pub const AP_READONLY: u64 = 2;
    /// AP field: read-write
    pub const AP_READWRITE: u64 = 0;
}

/// Stage-2 block/page descriptor attribute bits
pub mod stage2 {
    /// Execute-never field (bits [54:53])
    pub const XN_SHIFT: u64 = 53;
    /// Access flag (bit 10)
    pub const AF: u64 = 1 << 10;
    /// Shareability field (bits [9:8])
    pub const SH_SHIFT: u64 = 8;
    /// Stage-2 access permission field (bits [7:6])
    pub const S2AP_SHIFT: u64 = 6;
    /// Memory attribute field (bits [5:2])
    pub const MEMATTR_SHIFT: u64 = 2;

    /// XN field: execution allowed at EL1 and EL0
    pub const XN_EXECUTE_ALL: u64 = 0;
    /// XN field: execution forbidden at every level
    pub const XN_EXECUTE_NONE: u64 = 2;

    /// S2AP read bit
    pub const S2AP_READ: u64 = 1;
    /// S2AP write bit
    pub const S2AP_WRITE: u64 = 2;

    /// MemAttr: Device-GRE
    pub const MEMATTR_DEVICE_GRE: u64 = 0b0011;
    /// MemAttr: normal memory, inner/outer Write-Back cacheable
    pub const MEMATTR_NORMAL_WB: u64 = 0b1111;
}

/// Stage-1 table descriptor attribute bits (bits [63:59])
///
/// These positions are res0 in stage-2 table descriptors.
pub mod table {
    /// NSTable - force the subtree non-secure
    pub const NS: u64 = 1 << 63;
    /// APTable[1] - force read-only
    pub const AP1: u64 = 1 << 62;
    /// APTable[0] - restrict to privileged access
    pub const AP0: u64 = 1 << 61;
    /// XNTable - force execute-never at EL0
    pub const XN: u64 = 1 << 60;
    /// PXNTable - force privileged execute-never
    pub const PXN: u64 = 1 << 59;
}

/// Attribute bits of a translation descriptor, without the address bits
///
/// Opaque to the generic layer; produced by [`encode`], narrowed by
/// [`combine`], and ORed into descriptors by the table walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct DescriptorAttrs(u64);

impl DescriptorAttrs {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }
}

/// Translates an abstract access mode into descriptor attribute bits for
/// the given stage.
///
/// Total over the whole input domain; every flag combination the generic
/// layer can hand over encodes to a valid descriptor.
pub fn encode(stage: Stage, mode: MapMode) -> DescriptorAttrs {
    match stage {
        Stage::Stage1 => encode_stage1(mode),
        Stage::Stage2 => encode_stage2(mode),
    }
}

fn encode_stage1(mode: MapMode) -> DescriptorAttrs {
    // Stage-1 mappings are visible to every observer of the hypervisor's
    // address space.
    let mut attrs = stage1::AF | (sh::OUTER_SHAREABLE << stage1::SH_SHIFT);

    if !mode.contains(MapMode::EXECUTE) {
        attrs |= stage1::XN;
    }

    // Write access implies read access at stage 1; READ alone maps
    // read-only.
    if mode.contains(MapMode::WRITE) {
        attrs |= stage1::AP_READWRITE << stage1::AP_SHIFT;
    } else {
        attrs |= stage1::AP_READONLY << stage1::AP_SHIFT;
    }

    if mode.contains(MapMode::DEVICE) {
        attrs |= mair_el2::DEVICE_INDEX << stage1::ATTRINDX_SHIFT;
    } else {
        attrs |= mair_el2::NORMAL_INDEX << stage1::ATTRINDX_SHIFT;
    }

    DescriptorAttrs(attrs)
}

fn encode_stage2(mode: MapMode) -> DescriptorAttrs {
    // Non-shareable is the neutral choice at stage 2; the stage-1 mapping
    // layered on top determines the effective shareability.
    let mut attrs = stage2::AF | (sh::NON_SHAREABLE << stage2::SH_SHIFT);

    // Unlike stage 1, the two permission bits are independent here.
    let mut access = 0;
    if mode.contains(MapMode::READ) {
        access |= stage2::S2AP_READ;
    }
    if mode.contains(MapMode::WRITE) {
        access |= stage2::S2AP_WRITE;
    }
    attrs |= access << stage2::S2AP_SHIFT;

    if mode.contains(MapMode::EXECUTE) {
        attrs |= stage2::XN_EXECUTE_ALL << stage2::XN_SHIFT;
    } else {
        attrs |= stage2::XN_EXECUTE_NONE << stage2::XN_SHIFT;
    }

    if mode.contains(MapMode::DEVICE) {
        attrs |= stage2::MEMATTR_DEVICE_GRE << stage2::MEMATTR_SHIFT;
    } else {
        attrs |= stage2::MEMATTR_NORMAL_WB << stage2::MEMATTR_SHIFT;
    }

    DescriptorAttrs(attrs)
}

/// Folds the restricting attributes of a table descriptor into a block or
/// page descriptor's attributes.
///
/// Every restriction narrows permissions, never widens them. The table
/// attribute bits are res0 in stage-2 table descriptors, so the fold
/// degrades to the identity there and is safe to apply for either stage.
pub fn combine(table_attrs: DescriptorAttrs, block_attrs: DescriptorAttrs) -> DescriptorAttrs {
    let table = table_attrs.bits();
    let mut block = block_attrs.bits();

    if table & table::NS != 0 {
        block |= stage1::NS;
    }
    if table & table::AP1 != 0 {
        block |= stage1::AP2;
    }
    if table & table::AP0 != 0 {
        // AP[1] grants unprivileged access, so this narrowing clears the
        // bit instead of setting one.
        block &= !stage1::AP1;
    }
    if table & table::XN != 0 {
        block |= stage1::XN;
    }
    if table & table::PXN != 0 {
        block |= stage1::PXN;
    }

    DescriptorAttrs(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test]
    fn test_stage1_execute_clears_xn() {
        let rx = encode(Stage::Stage1, MapMode::READ | MapMode::EXECUTE);
        assert_eq!(rx.bits() & stage1::XN, 0);

        let ro = encode(Stage::Stage1, MapMode::READ);
        assert_ne!(ro.bits() & stage1::XN, 0);
    }

    #[test]
    fn test_stage1_write_overrides_readonly() {
        // A writable mapping must never come out read-only, with or
        // without the READ flag.
        for mode in [MapMode::WRITE, MapMode::READ | MapMode::WRITE] {
            let attrs = encode(Stage::Stage1, mode);
            assert_eq!(
                (attrs.bits() >> stage1::AP_SHIFT) & 0x3,
                stage1::AP_READWRITE
            );
        }

        let ro = encode(Stage::Stage1, MapMode::READ);
        assert_eq!((ro.bits() >> stage1::AP_SHIFT) & 0x3, stage1::AP_READONLY);
    }

    #[test]
    fn test_stage1_read_flag_is_implied() {
        // Stage 1 cannot express a non-readable mapping, so READ does not
        // change the encoding.
        for mode in [
            MapMode::empty(),
            MapMode::WRITE,
            MapMode::EXECUTE,
            MapMode::WRITE | MapMode::DEVICE,
        ] {
            assert_eq!(
                encode(Stage::Stage1, mode),
                encode(Stage::Stage1, mode | MapMode::READ)
            );
        }
    }

    #[test]
    fn test_stage1_shareability_and_af() {
        let attrs = encode(Stage::Stage1, MapMode::READ | MapMode::WRITE);
        assert_ne!(attrs.bits() & stage1::AF, 0);
        assert_eq!(
            (attrs.bits() >> stage1::SH_SHIFT) & 0x3,
            sh::OUTER_SHAREABLE
        );
    }

    #[test]
    fn test_stage1_encodings_distinct() {
        // {WRITE} x {EXECUTE} x {DEVICE} are independent axes; all eight
        // combinations must encode differently.
        let mut seen = HashSet::new();
        for w in [MapMode::empty(), MapMode::WRITE] {
            for x in [MapMode::empty(), MapMode::EXECUTE] {
                for d in [MapMode::empty(), MapMode::DEVICE] {
                    assert!(seen.insert(encode(Stage::Stage1, w | x | d).bits()));
                }
            }
        }
        assert_eq!(seen.len(), 8);
    }

    #[test_case(MapMode::empty(), 0; "no access")]
    #[test_case(MapMode::READ, stage2::S2AP_READ; "read only")]
    #[test_case(MapMode::WRITE, stage2::S2AP_WRITE; "write only")]
    #[test_case(MapMode::READ | MapMode::WRITE, stage2::S2AP_READ | stage2::S2AP_WRITE; "read write")]
    fn test_stage2_access_field(mode: MapMode, expected: u64) {
        let attrs = encode(Stage::Stage2, mode);
        assert_eq!((attrs.bits() >> stage2::S2AP_SHIFT) & 0x3, expected);
    }

    #[test]
    fn test_stage2_execute_all_or_none() {
        let x = encode(Stage::Stage2, MapMode::READ | MapMode::EXECUTE);
        assert_eq!(
            (x.bits() >> stage2::XN_SHIFT) & 0x3,
            stage2::XN_EXECUTE_ALL
        );

        let nx = encode(Stage::Stage2, MapMode::READ);
        assert_eq!(
            (nx.bits() >> stage2::XN_SHIFT) & 0x3,
            stage2::XN_EXECUTE_NONE
        );
    }

    #[test_case(MapMode::DEVICE; "device alone")]
    #[test_case(MapMode::DEVICE | MapMode::READ; "device read")]
    #[test_case(MapMode::DEVICE | MapMode::READ | MapMode::WRITE; "device read write")]
    #[test_case(MapMode::DEVICE | MapMode::READ | MapMode::WRITE | MapMode::EXECUTE; "device rwx")]
    fn test_stage2_device_memattr(mode: MapMode) {
        // Device always maps to the strongest device ordering, whatever
        // the permission flags say.
        let attrs = encode(Stage::Stage2, mode);
        assert_eq!(
            (attrs.bits() >> stage2::MEMATTR_SHIFT) & 0xf,
            stage2::MEMATTR_DEVICE_GRE
        );
    }

    #[test]
    fn test_stage2_normal_memattr_and_shareability() {
        let attrs = encode(Stage::Stage2, MapMode::READ | MapMode::WRITE);
        assert_eq!(
            (attrs.bits() >> stage2::MEMATTR_SHIFT) & 0xf,
            stage2::MEMATTR_NORMAL_WB
        );
        assert_eq!((attrs.bits() >> stage2::SH_SHIFT) & 0x3, sh::NON_SHAREABLE);
        assert_ne!(attrs.bits() & stage2::AF, 0);
    }

    #[test]
    fn test_combine_identity() {
        for mode in [
            MapMode::READ,
            MapMode::READ | MapMode::WRITE,
            MapMode::READ | MapMode::EXECUTE,
            MapMode::DEVICE | MapMode::READ | MapMode::WRITE,
        ] {
            let block = encode(Stage::Stage1, mode);
            assert_eq!(combine(DescriptorAttrs::empty(), block), block);
        }
    }

    #[test]
    fn test_combine_narrows() {
        let table = DescriptorAttrs::from_bits(
            table::NS | table::AP1 | table::AP0 | table::XN | table::PXN,
        );
        let block = encode(Stage::Stage1, MapMode::READ | MapMode::WRITE | MapMode::EXECUTE);
        let combined = combine(table, block);

        assert_ne!(combined.bits() & stage1::NS, 0);
        assert_ne!(combined.bits() & stage1::AP2, 0);
        assert_eq!(combined.bits() & stage1::AP1, 0);
        assert_ne!(combined.bits() & stage1::XN, 0);
        assert_ne!(combined.bits() & stage1::PXN, 0);
    }

    #[test]
    fn test_combine_never_widens() {
        // A block that is already execute-never and read-only keeps those
        // restrictions under any table attributes.
        let block = encode(Stage::Stage1, MapMode::READ);
        for table_bits in [0, table::NS, table::AP1 | table::XN, table::PXN] {
            let combined = combine(DescriptorAttrs::from_bits(table_bits), block);
            assert_ne!(combined.bits() & stage1::XN, 0);
            assert_eq!(
                (combined.bits() >> stage1::AP_SHIFT) & stage1::AP_READONLY,
                stage1::AP_READONLY
            );
        }
    }

    #[test]
    fn test_combine_stage2_is_identity() {
        // Stage-2 table descriptors keep bits [63:59] res0, so combining
        // against one never changes the block.
        let table = encode(Stage::Stage2, MapMode::READ | MapMode::WRITE);
        assert_eq!(table.bits() & 0xf800_0000_0000_0000, 0);

        let block = encode(Stage::Stage2, MapMode::READ | MapMode::WRITE | MapMode::EXECUTE);
        assert_eq!(combine(table, block), block);
    }
}
