//! Orevisor memory-management backend
//!
//! Architecture-specific address-translation support for the Orevisor
//! Type-1 hypervisor: translation descriptor attribute encoding for both
//! stages, stage-2 translation geometry selection, the one-time EL2 MMU
//! bring-up, and the data-cache maintenance the generic page-table layer
//! needs after writing table memory.
//!
//! The generic walker/allocator lives in the main Orevisor tree; this
//! crate only answers "which bits" and "how deep", and performs the
//! register programming that turns translation on.

#![cfg_attr(not(test), no_std)]

// Architecture-specific code
pub mod arch;

/// Backend version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common error type for the translation backend
///
/// Both variants are detected once, during MMU bring-up, and are fatal:
/// the boot sequence must not enable translation it cannot trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The hardware does not implement 4KB translation granules
    UnsupportedGranule,
    /// ID_AA64MMFR0_EL1.PARange holds a reserved encoding
    UnsupportedPaRange(u64),
}

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;
