//! Power-on self-test (L7), behind the `self-test` feature.
//!
//! The hosted `#[cfg(test)]` suites scattered through every module check
//! pure logic; they can't reach the runtime state `bring_up` assembles
//! (PIC remap, registered IRQ/syscall gates, a ticking PIT) because that
//! state only exists after a real boot. This module re-checks a handful
//! of those invariants once, right after `bring_up` returns, the way the
//! teacher kernel's driver self-test framework re-validates GPIO/mailbox/
//! PMU state at runtime rather than trusting that bring-up "probably"
//! worked.

use crate::arch::x86_64::idt;
use crate::arch::x86_64::pic::Irq;
use crate::kprintln;
use crate::syscall::{self, numbers};

/// Runs every check, logging each as it runs. Never panics on failure —
/// a failed self-test is reported and boot continues, since halting on
/// a self-test miss would make the self-test itself a new boot hazard.
pub fn run() {
    kprintln!("  [self-test] running power-on self-test");
    check("timer IRQ registered", idt::is_registered(Irq::Timer.to_vector()));
    check("syscall gate registered", idt::is_registered(syscall::VECTOR));
    check("getpid syscall registered", syscall::name_of(numbers::GETPID).is_some());
    check("exit syscall registered", syscall::name_of(numbers::EXIT).is_some());
    check("timer is ticking", timer_is_ticking());
    kprintln!("  [self-test] done");
}

fn check(label: &str, ok: bool) {
    if ok {
        kprintln!("  [self-test]   ok: {label}");
    } else {
        kprintln!("  [self-test]   FAIL: {label}");
    }
}

/// Waits a few milliseconds and confirms the uptime counter actually
/// advanced, catching a PIT programmed but never firing.
fn timer_is_ticking() -> bool {
    let before = super::timer::get_uptime_ms();
    super::timer::wait(5);
    super::timer::get_uptime_ms() > before
}
