//! y4ku kernel entry point.
//!
//! Built freestanding (`no_std`/`no_main`) for the `x86_64` target; when
//! compiled for `test` it drops both attributes so the unit test suites
//! scattered through every module run as an ordinary hosted binary. This
//! is the same split the freestanding-kernel corpus uses to keep `cargo
//! test` usable without a second crate.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]
#![feature(abi_x86_interrupt)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod arch;
pub mod boot;
pub mod drivers;
pub mod kernel;
pub mod lib;
pub mod process;
pub mod syscall;

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    lib::panic::handle_panic_info(info)
}

// A hosted `cargo test` run has no `_start`/`kmain_from_boot` to call
// into — the test harness provides its own `main`. This stub keeps the
// crate linkable as a binary target under `test` cfg without pulling in
// any of the freestanding boot path.
#[cfg(test)]
fn main() {}
