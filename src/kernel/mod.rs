//! Kernel bring-up (L7): the boot trampoline's landing pad, and the
//! sequencing that brings every lower layer up in dependency order.
//!
//! Mirrors the boot-sequence shape of the teacher repository's own
//! `kernel_main` — verify the handoff, bring up the CPU tables, then
//! devices, then the syscall ABI, log each step to the console — but
//! with this kernel's own layer tower in place of that kernel's heap
//! and scheduler bring-up.

pub mod rtc;
#[cfg(feature = "self-test")]
pub mod selftest;
pub mod timer;

use crate::boot::{MultibootInfo, MULTIBOOT_BOOTLOADER_MAGIC};
use crate::lib::console;
use crate::process::{self, Privilege, Process};
use crate::{kprintln, syscall};

const TIMER_FREQUENCY_HZ: u32 = 1000;
const INIT_PID: u32 = 1;

/// Entry point called by the boot trampoline in `boot::start`, already
/// running in long mode on the boot stack. `magic` and `info_addr` are
/// exactly the values the bootloader left in EAX/EBX at `_start`.
#[no_mangle]
pub extern "C" fn kmain_from_boot(magic: u32, info_addr: u32) -> ! {
    console::init();
    kprintln!("y4ku kernel booting");
    print_build_banner();

    if magic != MULTIBOOT_BOOTLOADER_MAGIC {
        panic!("invalid bootloader magic: 0x{magic:08x}");
    }

    let info = unsafe { MultibootInfo::from_addr(info_addr) };
    log_memory_map(info);

    unsafe {
        bring_up();
    }

    spawn_init_process();

    crate::arch::x86_64::port::enable_interrupts();
    kprintln!("y4ku kernel ready");

    idle_loop();
}

/// Prints the version/commit/profile banner `build.rs` stamps in via
/// `cargo:rustc-env`, once, during bring-up.
fn print_build_banner() {
    kprintln!(
        "y4ku {} ({}@{}, {} build, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("Y4KU_GIT_BRANCH"),
        env!("Y4KU_GIT_COMMIT"),
        env!("Y4KU_PROFILE"),
        env!("Y4KU_BUILD_TIMESTAMP"),
    );
}

fn log_memory_map(info: &MultibootInfo) {
    if !info.has_memory_map() {
        kprintln!("no multiboot memory map provided");
        return;
    }
    let mut available_kib: u64 = 0;
    for entry in info.memory_map() {
        if entry.is_available() {
            available_kib += entry.len / 1024;
        }
    }
    kprintln!("available memory: {} KiB", available_kib);
}

/// Brings up every layer beneath the syscall ABI, in dependency order:
/// CPU tables and interrupt dispatch (L1/L2), the timer (L3), drivers
/// (L4), then the syscall table (L5).
///
/// # Safety
/// Must run exactly once, early in boot, before interrupts are enabled.
unsafe fn bring_up() {
    unsafe {
        crate::arch::x86_64::init();
    }
    kprintln!("  [ok] CPU tables + interrupt dispatch");

    unsafe {
        timer::init(TIMER_FREQUENCY_HZ);
    }
    kprintln!("  [ok] timer ({} Hz, {} MHz TSC)", TIMER_FREQUENCY_HZ, timer::get_cpu_mhz());

    init_drivers();

    unsafe {
        syscall::init();
    }
    kprintln!("  [ok] syscall ABI (vector 0x{:02x})", syscall::VECTOR);

    #[cfg(feature = "self-test")]
    selftest::run();
}

/// Brings up the driver layer. Each driver's absence is logged and
/// treated as non-fatal — a missing PS/2 controller or ATA drive in a
/// minimal VM is routine, not a boot failure.
unsafe fn init_drivers() {
    match unsafe { crate::drivers::keyboard::init() } {
        Ok(()) => kprintln!("  [ok] PS/2 keyboard"),
        Err(e) => kprintln!("  [--] PS/2 keyboard: {e}"),
    }

    match unsafe { crate::drivers::mouse::init() } {
        Ok(()) => kprintln!("  [ok] PS/2 mouse (wheel: {})", crate::drivers::mouse::has_wheel()),
        Err(e) => kprintln!("  [--] PS/2 mouse: {e}"),
    }

    crate::drivers::pci::init();
    kprintln!("  [ok] PCI enumeration ({} device(s))", crate::drivers::pci::device_count());

    match crate::drivers::ata::identify() {
        Ok(info) => {
            let model = core::str::from_utf8(&info.model[..info.model_len]).unwrap_or("?");
            kprintln!("  [ok] ATA primary master: {model}");
        }
        Err(e) => kprintln!("  [--] ATA primary master: {e}"),
    }
}

/// Registers a single synthetic "init" process as the current process
/// so the permission gate has something other than kernel privilege to
/// observe. There is no scheduler to hand control to beyond this.
fn spawn_init_process() {
    process::set_current(Some(Process {
        pid: INIT_PID,
        ppid: 0,
        privilege: Privilege::User,
    }));
}

fn idle_loop() -> ! {
    loop {
        crate::arch::x86_64::port::hlt();
    }
}
