//! Architecture abstraction layer: selects the per-architecture
//! implementation module based on `target_arch`.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;
