//! Canonical syscall numbers.
//!
//! Numbers are assigned by this kernel, not borrowed from any existing
//! ABI — the whole point of vector 0x4D is that it is not
//! Linux-compatible, so there is no externally-imposed numbering to
//! match.

#![allow(dead_code)]

pub const EXIT: u32 = 0;
pub const FORK: u32 = 1;
pub const READ: u32 = 2;
pub const WRITE: u32 = 3;
pub const OPEN: u32 = 4;
pub const CLOSE: u32 = 5;
pub const WAITPID: u32 = 6;
pub const EXECVE: u32 = 7;
pub const GETPID: u32 = 8;
pub const GETPPID: u32 = 9;
pub const BRK: u32 = 10;
pub const GETCWD: u32 = 11;
pub const CHDIR: u32 = 12;
pub const TIME: u32 = 13;
pub const UNAME: u32 = 14;
pub const REBOOT: u32 = 15;
pub const MMAP: u32 = 16;
pub const MUNMAP: u32 = 17;
pub const IOCTL: u32 = 18;
pub const FCNTL: u32 = 19;
pub const SELECT: u32 = 20;
pub const POLL: u32 = 21;
pub const DL_LOAD_LIBRARY: u32 = 22;
pub const DL_UNLOAD_LIBRARY: u32 = 23;
pub const DL_FIND_SYMBOL: u32 = 24;
pub const DL_GET_ERROR: u32 = 25;

/// Returns the display name registered for a canonical syscall number,
/// or `None` for numbers outside the canonical set (which may still be
/// registered by a caller with a custom name).
pub fn canonical_name(num: u32) -> Option<&'static str> {
    Some(match num {
        EXIT => "exit",
        FORK => "fork",
        READ => "read",
        WRITE => "write",
        OPEN => "open",
        CLOSE => "close",
        WAITPID => "waitpid",
        EXECVE => "execve",
        GETPID => "getpid",
        GETPPID => "getppid",
        BRK => "brk",
        GETCWD => "getcwd",
        CHDIR => "chdir",
        TIME => "time",
        UNAME => "uname",
        REBOOT => "reboot",
        MMAP => "mmap",
        MUNMAP => "munmap",
        IOCTL => "ioctl",
        FCNTL => "fcntl",
        SELECT => "select",
        POLL => "poll",
        DL_LOAD_LIBRARY => "dl_load_library",
        DL_UNLOAD_LIBRARY => "dl_unload_library",
        DL_FIND_SYMBOL => "dl_find_symbol",
        DL_GET_ERROR => "dl_get_error",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_set_has_stable_names() {
        assert_eq!(canonical_name(EXIT), Some("exit"));
        assert_eq!(canonical_name(REBOOT), Some("reboot"));
        assert_eq!(canonical_name(255), None);
    }
}
