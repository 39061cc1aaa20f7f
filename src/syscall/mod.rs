//! The kernel's own system-call ABI (L5): vector 0x4D, six-register
//! argument layout, permission-gated 256-slot handler table.
//!
//! Deliberately not Linux-compatible — no vector 0x80, no shared
//! numbering, no shared calling convention. Grounded in the reference
//! kernel's `syscall_m4k.c` dispatch skeleton (the `0xM4K...` literal
//! pattern in its headers is a placeholder the reference source itself
//! can't compile; this implementation reserves the real prefix
//! `0xD400_0000` called out in the redesign notes).

pub mod entry;
pub mod numbers;

use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

use crate::arch::x86_64::{idt, port};
use crate::lib::console;
use crate::process::{self, Privilege};
use entry::SavedRegisters;

/// Entry vector for this kernel's syscall ABI.
pub const VECTOR: u8 = 0x4D;

pub const PERMISSION_KERNEL: u32 = 0xFFFF_FFFF;
pub const PERMISSION_SYSTEM: u32 = 0x0000_00FF;
pub const PERMISSION_USER: u32 = 0x0000_0001;

/// Reserved error namespace prefix. All error returns live at or above
/// this value; legitimate successful return values from this kernel's
/// syscalls never reach it in practice (file descriptors, pids, and
/// byte counts are all far below 2^31).
pub const ERROR_PREFIX: u64 = 0xD400_0000;

pub const ERR_GENERIC: u64 = ERROR_PREFIX;
pub const ERR_PERMISSION_DENIED: u64 = ERROR_PREFIX + 1;
pub const ERR_NULL_HANDLER: u64 = ERROR_PREFIX + 2;
pub const ERR_UNSUPPORTED: u64 = ERROR_PREFIX + 3;
pub const ERR_BAD_NUMBER: u64 = ERROR_PREFIX + 4;
pub const ERR_UNREGISTERED: u64 = ERROR_PREFIX + 5;

const REBOOT_MAGIC_1: u64 = 0x0123_4567;
const REBOOT_MAGIC_2: u64 = 0x89AB_CDEF;

pub const MAX_SYSCALLS: usize = 256;

pub type SyscallArgs = [u64; 6];
pub type SyscallHandlerFn = fn(&SyscallArgs) -> u64;

#[derive(Clone, Copy)]
enum Slot {
    Unregistered,
    Registered {
        handler: SyscallHandlerFn,
        permission: u32,
        name: &'static str,
    },
}

struct Table {
    slots: [Slot; MAX_SYSCALLS],
}

impl Table {
    const fn new() -> Self {
        Self {
            slots: [Slot::Unregistered; MAX_SYSCALLS],
        }
    }
}

static TABLE: Mutex<Table> = Mutex::new(Table::new());

static TOTAL_CALLS: AtomicU64 = AtomicU64::new(0);
static FAILED_CALLS: AtomicU64 = AtomicU64::new(0);
static PERMISSION_DENIED_COUNT: AtomicU64 = AtomicU64::new(0);
static CALLS_BY_TYPE: Mutex<[u64; MAX_SYSCALLS]> = Mutex::new([0; MAX_SYSCALLS]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallStats {
    pub total_calls: u64,
    pub failed_calls: u64,
    pub permission_denied: u64,
}

/// A read-only, interrupt-safe snapshot of the aggregate counters.
pub fn stats_snapshot() -> SyscallStats {
    port::without_interrupts(|| SyscallStats {
        total_calls: TOTAL_CALLS.load(Ordering::Relaxed),
        failed_calls: FAILED_CALLS.load(Ordering::Relaxed),
        permission_denied: PERMISSION_DENIED_COUNT.load(Ordering::Relaxed),
    })
}

/// Per-number call count.
pub fn calls_for(num: u32) -> u64 {
    if num as usize >= MAX_SYSCALLS {
        return 0;
    }
    port::without_interrupts(|| CALLS_BY_TYPE.lock()[num as usize])
}

/// Registers `handler` for `num` with permission defaulted to USER and
/// a display name taken from the canonical mapping (or `"unknown"` for
/// a non-canonical number). A number at or beyond [`MAX_SYSCALLS`] is a
/// no-op; Rust's sum-typed table makes a null-handler registration
/// impossible to express in the first place.
pub fn register(num: u32, handler: SyscallHandlerFn) {
    if num as usize >= MAX_SYSCALLS {
        console::console_write(b"[syscall] register: number out of range\n");
        return;
    }
    let name = numbers::canonical_name(num).unwrap_or("unknown");
    port::without_interrupts(|| {
        TABLE.lock().slots[num as usize] = Slot::Registered {
            handler,
            permission: PERMISSION_USER,
            name,
        };
    });
}

/// Updates the permission mask for an already-registered number. A
/// no-op if `num` is out of range or unregistered.
pub fn set_permission(num: u32, mask: u32) {
    if num as usize >= MAX_SYSCALLS {
        return;
    }
    port::without_interrupts(|| {
        if let Slot::Registered { permission, .. } = &mut TABLE.lock().slots[num as usize] {
            *permission = mask;
        }
    });
}

/// Display name for a registered number, if any.
pub fn name_of(num: u32) -> Option<&'static str> {
    if num as usize >= MAX_SYSCALLS {
        return None;
    }
    match TABLE.lock().slots[num as usize] {
        Slot::Registered { name, .. } => Some(name),
        Slot::Unregistered => None,
    }
}

fn current_permission() -> u32 {
    match process::get_current() {
        Some(p) if p.privilege == Privilege::User => PERMISSION_USER,
        _ => PERMISSION_KERNEL,
    }
}

/// Logs `num`, the resolved caller permission, and the dispatch outcome
/// to the console. Compiled out entirely unless `syscall-verbose` is
/// enabled — pure observability, not part of dispatch semantics.
#[cfg(feature = "syscall-verbose")]
fn trace(num: u32, permission: u32, outcome: u64) {
    crate::kprintln!("[syscall] num={num} permission=0x{permission:08x} outcome=0x{outcome:016x}");
}

#[cfg(not(feature = "syscall-verbose"))]
fn trace(_num: u32, _permission: u32, _outcome: u64) {}

/// The ten-step dispatch algorithm, called from the raw entry stub
/// with the just-saved register frame. Every early-return path leaves
/// `regs` untouched apart from `rax`, matching the failure model.
pub(crate) fn dispatch(regs: &mut SavedRegisters) {
    TOTAL_CALLS.fetch_add(1, Ordering::Relaxed);

    let num = regs.rax as u32;
    if num as usize >= MAX_SYSCALLS {
        FAILED_CALLS.fetch_add(1, Ordering::Relaxed);
        regs.rax = ERR_BAD_NUMBER;
        trace(num, 0, regs.rax);
        return;
    }

    let slot = TABLE.lock().slots[num as usize];
    let (handler, permission) = match slot {
        Slot::Registered {
            handler,
            permission,
            ..
        } => (handler, permission),
        Slot::Unregistered => {
            FAILED_CALLS.fetch_add(1, Ordering::Relaxed);
            regs.rax = ERR_UNREGISTERED;
            trace(num, 0, regs.rax);
            return;
        }
    };

    let caller_permission = current_permission();
    if caller_permission != PERMISSION_KERNEL && (caller_permission & permission) == 0 {
        PERMISSION_DENIED_COUNT.fetch_add(1, Ordering::Relaxed);
        regs.rax = ERR_PERMISSION_DENIED;
        trace(num, caller_permission, regs.rax);
        return;
    }

    let args: SyscallArgs = [regs.rdi, regs.rsi, regs.rdx, regs.rcx, regs.r8, regs.r9];
    let result = handler(&args);

    CALLS_BY_TYPE.lock()[num as usize] += 1;
    regs.rax = result;
    trace(num, caller_permission, regs.rax);
}

fn reboot_handler(args: &SyscallArgs) -> u64 {
    if args[0] != REBOOT_MAGIC_1 || args[1] != REBOOT_MAGIC_2 {
        return ERR_UNSUPPORTED;
    }
    unsafe {
        port::outb(0xFE, 0);
        port::outb(0x64, 0xFE);
    }
    loop {
        port::hlt();
    }
}

fn exit_handler(args: &SyscallArgs) -> u64 {
    process::exit(args[0] as i32)
}

fn write_handler(args: &SyscallArgs) -> u64 {
    let fd = args[0];
    let ptr = args[1] as *const u8;
    let len = args[2] as usize;
    if fd != 1 {
        return ERR_UNSUPPORTED;
    }
    let bytes = unsafe { core::slice::from_raw_parts(ptr, len) };
    console::console_write(bytes);
    len as u64
}

fn getpid_handler(_args: &SyscallArgs) -> u64 {
    process::current_pid() as u64
}

fn getppid_handler(_args: &SyscallArgs) -> u64 {
    process::current_ppid() as u64
}

fn unsupported_handler(_args: &SyscallArgs) -> u64 {
    ERR_UNSUPPORTED
}

/// Installs the raw entry stub on vector 0x4D and registers working
/// semantics for `exit`, `write`, `getpid`, `getppid`, and `reboot`;
/// every other canonical number is registered as `UNSUPPORTED` so a
/// lookup always finds a name, matching "register overwrites" and
/// keeping the statistics and permission-gate paths exercised for
/// numbers a future process/FS subsystem will take over.
///
/// # Safety
/// Must run after `arch::x86_64::init`, with interrupts disabled.
pub unsafe fn init() {
    unsafe {
        idt::install_raw_gate(VECTOR, entry::y4ku_syscall_entry as u64);
    }

    register(numbers::EXIT, exit_handler);
    register(numbers::WRITE, write_handler);
    register(numbers::GETPID, getpid_handler);
    register(numbers::GETPPID, getppid_handler);
    register(numbers::REBOOT, reboot_handler);

    for &num in &[
        numbers::FORK,
        numbers::READ,
        numbers::OPEN,
        numbers::CLOSE,
        numbers::WAITPID,
        numbers::EXECVE,
        numbers::BRK,
        numbers::GETCWD,
        numbers::CHDIR,
        numbers::TIME,
        numbers::UNAME,
        numbers::MMAP,
        numbers::MUNMAP,
        numbers::IOCTL,
        numbers::FCNTL,
        numbers::SELECT,
        numbers::POLL,
        numbers::DL_LOAD_LIBRARY,
        numbers::DL_UNLOAD_LIBRARY,
        numbers::DL_FIND_SYMBOL,
        numbers::DL_GET_ERROR,
    ] {
        register(num, unsupported_handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(num: u32, args: SyscallArgs) -> SavedRegisters {
        SavedRegisters {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            r11: 0,
            r10: 0,
            r9: args[5],
            r8: args[4],
            rdi: args[0],
            rsi: args[1],
            rbp: 0,
            rbx: 0,
            rdx: args[2],
            rcx: args[3],
            rax: num as u64,
        }
    }

    fn reset() {
        port::without_interrupts(|| {
            *TABLE.lock() = Table::new();
            *CALLS_BY_TYPE.lock() = [0; MAX_SYSCALLS];
        });
        TOTAL_CALLS.store(0, Ordering::Relaxed);
        FAILED_CALLS.store(0, Ordering::Relaxed);
        PERMISSION_DENIED_COUNT.store(0, Ordering::Relaxed);
        process::set_current(None);
    }

    #[test]
    fn bad_number_is_reported_and_counted() {
        reset();
        let mut regs = frame(300, [0; 6]);
        dispatch(&mut regs);
        assert_eq!(regs.rax, ERR_BAD_NUMBER);
        assert_eq!(stats_snapshot().failed_calls, 1);
    }

    #[test]
    fn unregistered_number_is_reported() {
        reset();
        let mut regs = frame(42, [0; 6]);
        dispatch(&mut regs);
        assert_eq!(regs.rax, ERR_UNREGISTERED);
    }

    #[test]
    fn registered_handler_runs_and_counts() {
        reset();
        fn double(args: &SyscallArgs) -> u64 {
            args[0] * 2
        }
        register(42, double);
        let mut regs = frame(42, [21, 0, 0, 0, 0, 0]);
        dispatch(&mut regs);
        assert_eq!(regs.rax, 42);
        assert_eq!(stats_snapshot().total_calls, 1);
        assert_eq!(calls_for(42), 1);
    }

    #[test]
    fn permission_gate_blocks_user_caller() {
        reset();
        fn noop(_args: &SyscallArgs) -> u64 {
            0
        }
        register(43, noop);
        set_permission(43, PERMISSION_SYSTEM);
        process::set_current(Some(process::Process {
            pid: 1,
            ppid: 0,
            privilege: Privilege::User,
        }));
        let mut regs = frame(43, [0; 6]);
        dispatch(&mut regs);
        assert_eq!(regs.rax, ERR_PERMISSION_DENIED);
        assert_eq!(stats_snapshot().permission_denied, 1);
        process::set_current(None);
    }

    #[test]
    fn boundary_numbers_0_and_255_dispatch_like_any_other() {
        reset();
        fn ok(_args: &SyscallArgs) -> u64 {
            1
        }
        register(0, ok);
        register(255, ok);
        let mut regs = frame(0, [0; 6]);
        dispatch(&mut regs);
        assert_eq!(regs.rax, 1);
        let mut regs = frame(255, [0; 6]);
        dispatch(&mut regs);
        assert_eq!(regs.rax, 1);
    }
}
