//! Crate-wide ambient support: error types, the panic/abort path, the
//! serial console, and timeout helpers shared by the driver layer.
//!
//! None of this is part of any numbered layer in the dependency
//! tower — every layer calls into it directly.

pub mod console;
pub mod error;
pub mod panic;
pub mod timeout;
