//! Architecture-specific code
//!
//! Each backend exposes the same translation surface; the active one is
//! selected by cargo feature so the pure logic also builds and tests on
//! non-target hosts.

cfg_if::cfg_if! {
    if #[cfg(feature = "arch_arm64")] {
        pub mod arm64;
    } else {
        compile_error!("an architecture backend feature must be enabled");
    }
}
