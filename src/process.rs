//! Process hook (L6).
//!
//! The process layer proper — scheduling, address spaces, the process
//! table — is out of scope; this module only provides the thin surface
//! the syscall ABI needs: "who is calling, and at what privilege."
//! Until a real scheduler exists there is never a current process, so
//! every syscall observes kernel privilege, which is the documented
//! default ("else KERNEL").

use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Kernel,
    User,
}

#[derive(Debug, Clone, Copy)]
pub struct Process {
    pub pid: u32,
    pub ppid: u32,
    pub privilege: Privilege,
}

static CURRENT: Mutex<Option<Process>> = Mutex::new(None);

/// Returns the process on behalf of which kernel code is currently
/// running, or `None` when the caller is the kernel itself.
pub fn get_current() -> Option<Process> {
    *CURRENT.lock()
}

/// Installs `process` as the current process. Exists for the init
/// process spawn step in the boot sequence and for tests; there is no
/// real scheduler to call it from yet.
pub fn set_current(process: Option<Process>) {
    *CURRENT.lock() = process;
}

/// PID of the current process, or 0 if running as the kernel.
pub fn current_pid() -> u32 {
    get_current().map(|p| p.pid).unwrap_or(0)
}

/// Parent PID of the current process, or 0 if running as the kernel.
pub fn current_ppid() -> u32 {
    get_current().map(|p| p.ppid).unwrap_or(0)
}

/// Terminates the current process. With no process table to reap into,
/// this degrades to halting the machine — there is nothing left to
/// schedule.
pub fn exit(_code: i32) -> ! {
    set_current(None);
    crate::arch::x86_64::port::disable_interrupts();
    loop {
        crate::arch::x86_64::port::hlt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_current_process_by_default() {
        set_current(None);
        assert!(get_current().is_none());
        assert_eq!(current_pid(), 0);
        assert_eq!(current_ppid(), 0);
    }

    #[test]
    fn current_process_round_trips() {
        set_current(Some(Process {
            pid: 7,
            ppid: 1,
            privilege: Privilege::User,
        }));
        assert_eq!(current_pid(), 7);
        assert_eq!(current_ppid(), 1);
        set_current(None);
    }
}
