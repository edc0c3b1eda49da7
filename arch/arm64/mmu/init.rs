//! EL2 MMU bring-up for ARM64
//!
//! One-time per-core enablement of two-stage translation: translation
//! control for both stages, memory attribute indirection, stage-1 root
//! table installation, and the MMU/cache enable sequence.
//! Reference: ARM DDI 0487I.a, D8 - The AArch64 Virtual Memory System
//! Architecture

use log::{error, info};

use super::geometry::TranslationGeometry;
use super::{PhysAddr, Stage};
use crate::arch::arm64::cpu::sysreg::{
    id_aa64mmfr0, mair_el2, sctlr_el2, tcr_el2, vtcr_el2, SysRegs,
};
use crate::{Error, Result};

/// Physical address width by ID_AA64MMFR0_EL1.PARange code; zero marks a
/// reserved encoding.
const PA_RANGE_BITS: [u32; 16] = [32, 36, 40, 42, 44, 48, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Validates hardware capability, programs both translation stages, and
/// enables the stage-1 MMU, caches, alignment checking and WXN at EL2.
///
/// Runs once per physical core with `primary` set on the boot core only;
/// secondary cores re-derive the same register values from the same
/// immutable hardware capability, so repeating the call is safe. A
/// failure is terminal: nothing has been written to any register and the
/// boot sequence must abort.
pub fn init(
    regs: &mut impl SysRegs,
    root_table: PhysAddr,
    primary: bool,
) -> Result<TranslationGeometry> {
    let features = regs.read_id_aa64mmfr0();

    // 4KB granules are the only layout this hypervisor is built for.
    if (features >> id_aa64mmfr0::TGRAN4_SHIFT) & id_aa64mmfr0::TGRAN4_MASK != 0 {
        error!("4KB translation granules are not supported");
        return Err(Error::UnsupportedGranule);
    }

    let pa_range = features & id_aa64mmfr0::PARANGE_MASK;
    let pa_bits = PA_RANGE_BITS[pa_range as usize];
    if pa_bits == 0 {
        error!("Unsupported ID_AA64MMFR0_EL1.PARange: {:#x}", pa_range);
        return Err(Error::UnsupportedPaRange(pa_range));
    }

    if primary {
        info!("Supported bits in physical address: {}", pa_bits);
    }

    let geometry = TranslationGeometry::select(pa_bits);

    if primary {
        info!(
            "Stage 2 has {} page table levels with {} pages at the root",
            geometry.max_level(Stage::Stage2) + 1,
            geometry.root_table_count(Stage::Stage2)
        );
    }

    regs.write_vtcr_el2(
        vtcr_el2::RES1
            | (pa_range << vtcr_el2::PS_SHIFT)
            | (vtcr_el2::TG0_4K << vtcr_el2::TG0_SHIFT)
            | (vtcr_el2::SH0_ISH << vtcr_el2::SH0_SHIFT)
            | (vtcr_el2::RGN_WBWA << vtcr_el2::ORGN0_SHIFT)
            | (vtcr_el2::RGN_WBWA << vtcr_el2::IRGN0_SHIFT)
            | (geometry.start_level_sl0() << vtcr_el2::SL0_SHIFT)
            | ((64 - pa_bits as u64) << vtcr_el2::T0SZ_SHIFT),
    );

    // The encoder's AttrIndx values index into this layout.
    regs.write_mair_el2(
        (mair_el2::DEVICE_NGNRNE << (8 * mair_el2::DEVICE_INDEX))
            | (mair_el2::NORMAL_WBWA << (8 * mair_el2::NORMAL_INDEX)),
    );

    regs.write_ttbr0_el2(root_table.as_u64());

    regs.write_tcr_el2(
        tcr_el2::TBI
            | (pa_range << tcr_el2::PS_SHIFT)
            | (tcr_el2::TG0_4K << tcr_el2::TG0_SHIFT)
            | (tcr_el2::SH0_ISH << tcr_el2::SH0_SHIFT)
            | (tcr_el2::RGN_WBWA << tcr_el2::ORGN0_SHIFT)
            | (tcr_el2::RGN_WBWA << tcr_el2::IRGN0_SHIFT)
            | (tcr_el2::T0SZ_512GB << tcr_el2::T0SZ_SHIFT),
    );

    // No stale translation or prefetched instruction may cross the enable
    // boundary.
    regs.dsb_sy();
    regs.isb();
    regs.write_sctlr_el2(
        sctlr_el2::M
            | sctlr_el2::A
            | sctlr_el2::C
            | sctlr_el2::SA
            | sctlr_el2::I
            | sctlr_el2::WXN
            | sctlr_el2::RES1,
    );
    regs.isb();

    Ok(geometry)
}
