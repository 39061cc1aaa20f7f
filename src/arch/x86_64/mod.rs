//! x86_64 architecture layer: CPU tables, interrupt dispatch, and the
//! only module permitted to touch raw port I/O.

pub mod gdt;
pub mod idt;
pub mod pic;
pub mod port;
pub mod tss;

/// Brings up L1/L2 in the required order: TSS (so the GDT's descriptor
/// and the IDT's IST indices have somewhere to point), then GDT, then
/// PIC remap, then IDT. Must run once, early, with interrupts disabled.
///
/// # Safety
/// Must be the first arch bring-up call made by `kernel::kmain_from_boot`.
pub unsafe fn init() {
    tss::init_tss();
    unsafe {
        gdt::init();
        pic::init();
        idt::init();
    }
}
