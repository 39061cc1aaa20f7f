//! Raw interrupt gate for vector 0x4D.
//!
//! The generic IDT dispatch table (`arch::x86_64::idt`) hands a bare
//! vector number to its handlers — enough for IRQs, not enough for a
//! syscall ABI whose whole contract is "arguments live in specific
//! general-purpose registers." This stub saves every GP register the
//! C calling convention doesn't already guarantee is preserved, hands
//! a pointer to the saved frame to [`dispatch_from_interrupt`], then
//! restores everything except `rax`, which carries the dispatcher's
//! return value back to the caller — matching the failure model's
//! "register file unchanged apart from the return register."

use core::arch::global_asm;

/// The saved register frame, in the exact order the stub pushes them.
/// Field order must track the `push` sequence below: the last `push`
/// (`r15`) ends up at the lowest address, i.e. first in this struct.
#[repr(C)]
pub struct SavedRegisters {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rbp: u64,
    pub rbx: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rax: u64,
}

extern "C" fn dispatch_from_interrupt(regs: *mut SavedRegisters) {
    let regs = unsafe { &mut *regs };
    super::dispatch(regs);
}

global_asm!(
    r#"
.section .text, "ax"
.code64
.global y4ku_syscall_entry
y4ku_syscall_entry:
    push rax
    push rcx
    push rdx
    push rbx
    push rbp
    push rsi
    push rdi
    push r8
    push r9
    push r10
    push r11
    push r12
    push r13
    push r14
    push r15

    mov rdi, rsp
    call {dispatch}

    pop r15
    pop r14
    pop r13
    pop r12
    pop r11
    pop r10
    pop r9
    pop r8
    pop rdi
    pop rsi
    pop rbp
    pop rbx
    pop rdx
    pop rcx
    pop rax
    iretq
"#,
    dispatch = sym dispatch_from_interrupt,
);

extern "C" {
    /// Address of the naked entry stub above, for installation as a
    /// raw IDT gate via `arch::x86_64::idt::install_raw_gate`.
    #[link_name = "y4ku_syscall_entry"]
    pub fn y4ku_syscall_entry();
}
