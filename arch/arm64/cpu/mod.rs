//! ARM64 CPU support for the translation backend

pub mod sysreg;

pub use sysreg::SysRegs;
