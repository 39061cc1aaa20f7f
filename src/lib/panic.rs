//! The single unrecoverable-exit path.
//!
//! The reference kernel scatters `panic()`/`assert()` macros across
//! every subsystem. Per the re-architecture note on panic/assertion
//! macros, all of that collapses to one function: print a banner,
//! disable interrupts, halt forever. Nothing in this crate unwinds;
//! `abort` is the only non-local exit, matching the Error Handling
//! Design's propagation rule.

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::x86_64::port;
use crate::lib::console;

static ABORTING: AtomicBool = AtomicBool::new(false);

/// Halts the system after printing `reason` and the call site.
///
/// If called re-entrantly (a fault while already aborting) it skips
/// straight to the halt loop rather than risking a second fault mid
/// console write.
pub fn abort(reason: &str, file: &str, line: u32) -> ! {
    if ABORTING.swap(true, Ordering::SeqCst) {
        halt_forever();
    }

    port::disable_interrupts();

    let mut out = console::writer();
    let _ = writeln!(out, "\n[PANIC] {reason}");
    let _ = writeln!(out, "  at {file}:{line}");

    halt_forever();
}

fn halt_forever() -> ! {
    loop {
        port::disable_interrupts();
        port::hlt();
    }
}

/// Installed as the crate's `#[panic_handler]`; formats the
/// `core::panic::PanicInfo` message into the same `abort` path so
/// `panic!()` call sites elsewhere in the kernel funnel through one
/// exit, as required.
pub fn handle_panic_info(info: &core::panic::PanicInfo) -> ! {
    let location = info.location();
    let (file, line) = location
        .map(|l| (l.file(), l.line()))
        .unwrap_or(("<unknown>", 0));

    if ABORTING.swap(true, Ordering::SeqCst) {
        halt_forever();
    }

    port::disable_interrupts();

    let mut out = console::writer();
    let _ = writeln!(out, "\n[PANIC] {}", info.message());
    let _ = writeln!(out, "  at {file}:{line}");

    halt_forever();
}

#[macro_export]
macro_rules! kabort {
    ($reason:expr) => {
        $crate::lib::panic::abort($reason, file!(), line!())
    };
}
