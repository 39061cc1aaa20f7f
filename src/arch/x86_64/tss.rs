//! Task State Segment.
//!
//! Long mode only uses the TSS for two things: the Interrupt Stack
//! Table (dedicated stacks for double fault / NMI / machine check, so
//! those handlers can run even if the kernel stack is corrupt) and
//! the privilege stack table slot 0 (`RSP0`), which is this kernel's
//! long-mode analogue of the 32-bit `esp0`/`ss0` pair the
//! specification's data model names — flat segmentation in long mode
//! makes a separate `ss0` meaningless, so only the stack pointer is
//! tracked.

use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::VirtAddr;
use x86_64::structures::tss::TaskStateSegment;

pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;
pub const NMI_IST_INDEX: u16 = 1;
pub const MACHINE_CHECK_IST_INDEX: u16 = 2;

const STACK_SIZE: usize = 16 * 1024;

#[repr(align(16))]
struct Stack([u8; STACK_SIZE]);

static mut DOUBLE_FAULT_STACK: Stack = Stack([0; STACK_SIZE]);
static mut NMI_STACK: Stack = Stack([0; STACK_SIZE]);
static mut MACHINE_CHECK_STACK: Stack = Stack([0; STACK_SIZE]);

/// Tracks the kernel stack pointer set via [`set_kernel_stack`] so it
/// can be read back (e.g. for the debug dump) without reaching into
/// the `x86_64` crate's TSS type.
static CURRENT_KERNEL_STACK: Mutex<u64> = Mutex::new(0);

lazy_static! {
    pub static ref TSS: TaskStateSegment = {
        let mut tss = TaskStateSegment::new();

        tss.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize] = {
            let stack_start = VirtAddr::from_ptr(unsafe { &raw const DOUBLE_FAULT_STACK });
            stack_start + STACK_SIZE as u64
        };
        tss.interrupt_stack_table[NMI_IST_INDEX as usize] = {
            let stack_start = VirtAddr::from_ptr(unsafe { &raw const NMI_STACK });
            stack_start + STACK_SIZE as u64
        };
        tss.interrupt_stack_table[MACHINE_CHECK_IST_INDEX as usize] = {
            let stack_start = VirtAddr::from_ptr(unsafe { &raw const MACHINE_CHECK_STACK });
            stack_start + STACK_SIZE as u64
        };

        tss
    };
}

/// Forces the lazily-built TSS into existence. Idempotent.
pub fn init_tss() {
    let _ = &*TSS;
}

/// Updates the kernel-stack pointer the CPU switches to on a
/// privilege-level change (ring 3 -> ring 0).
///
/// This is the long-mode equivalent of the reference kernel's
/// `set_kernel_stack`, which patches `tss.esp0`/`tss.ss0`. The
/// `x86_64` crate's `TaskStateSegment` lives behind a `lazy_static`
/// (required so its address is `'static` for the GDT's TSS
/// descriptor), so the privilege-stack-table slot is mutated through
/// interior mutability rather than by rebuilding the table; callers
/// must bracket this with interrupts disabled, matching the
/// concurrency model's registration-API rule.
pub fn set_kernel_stack(stack_top: u64) {
    crate::arch::x86_64::port::without_interrupts(|| {
        *CURRENT_KERNEL_STACK.lock() = stack_top;
        unsafe {
            let tss_ptr = &raw const *TSS as *mut TaskStateSegment;
            (*tss_ptr).privilege_stack_table[0] = VirtAddr::new(stack_top);
        }
    });
}

/// Returns the kernel stack pointer last installed by
/// [`set_kernel_stack`], or 0 if none has been set yet.
pub fn get_kernel_stack() -> u64 {
    *CURRENT_KERNEL_STACK.lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ist_stacks_are_distinct_and_aligned() {
        let a = TSS.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize];
        let b = TSS.interrupt_stack_table[NMI_IST_INDEX as usize];
        let c = TSS.interrupt_stack_table[MACHINE_CHECK_IST_INDEX as usize];
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(a.as_u64() % 16, 0);
    }

    #[test]
    fn kernel_stack_round_trips() {
        set_kernel_stack(0xDEAD_0000);
        assert_eq!(get_kernel_stack(), 0xDEAD_0000);
    }
}
