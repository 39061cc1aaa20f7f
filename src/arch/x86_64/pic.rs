//! 8259A PIC remap (L2).
//!
//! Two cascaded 8259A controlles: master on 0x20/0x21, slave on
//! 0xA0/0xA1. Remaps IRQ 0-7 to vectors 0x20-0x27 and IRQ 8-15 to
//! 0x28-0x2F so they no longer collide with the CPU exception
//! vectors, masks every line until the owning driver explicitly
//! enables it, and exposes the End-of-Interrupt call every IRQ
//! trampoline must issue before invoking its registered handler.

use spin::Mutex;

use crate::arch::x86_64::port::{inb, outb};

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

const CMD_EOI: u8 = 0x20;
const ICW1_INIT: u8 = 0x10;
const ICW1_ICW4: u8 = 0x01;
const ICW4_8086: u8 = 0x01;

/// Master vector offset: IRQ 0-7 -> vectors 0x20-0x27.
pub const MASTER_OFFSET: u8 = 0x20;
/// Slave vector offset: IRQ 8-15 -> vectors 0x28-0x2F.
pub const SLAVE_OFFSET: u8 = 0x28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Irq {
    Timer = 0,
    Keyboard = 1,
    Cascade = 2,
    Com2 = 3,
    Com1 = 4,
    Lpt2 = 5,
    Floppy = 6,
    Lpt1 = 7,
    Rtc = 8,
    Acpi = 9,
    Free1 = 10,
    Free2 = 11,
    Mouse = 12,
    Fpu = 13,
    PrimaryAta = 14,
    SecondaryAta = 15,
}

impl Irq {
    pub fn to_vector(self) -> u8 {
        let irq = self as u8;
        if irq < 8 {
            MASTER_OFFSET + irq
        } else {
            SLAVE_OFFSET + (irq - 8)
        }
    }

    pub fn from_vector(vector: u8) -> Option<Self> {
        let irq = if (MASTER_OFFSET..MASTER_OFFSET + 8).contains(&vector) {
            vector - MASTER_OFFSET
        } else if (SLAVE_OFFSET..SLAVE_OFFSET + 8).contains(&vector) {
            (vector - SLAVE_OFFSET) + 8
        } else {
            return None;
        };
        Some(match irq {
            0 => Irq::Timer,
            1 => Irq::Keyboard,
            2 => Irq::Cascade,
            3 => Irq::Com2,
            4 => Irq::Com1,
            5 => Irq::Lpt2,
            6 => Irq::Floppy,
            7 => Irq::Lpt1,
            8 => Irq::Rtc,
            9 => Irq::Acpi,
            10 => Irq::Free1,
            11 => Irq::Free2,
            12 => Irq::Mouse,
            13 => Irq::Fpu,
            14 => Irq::PrimaryAta,
            _ => Irq::SecondaryAta,
        })
    }
}

struct ChainedPics {
    master_offset: u8,
    slave_offset: u8,
}

impl ChainedPics {
    const fn new(master_offset: u8, slave_offset: u8) -> Self {
        Self {
            master_offset,
            slave_offset,
        }
    }

    /// Full ICW1-4 remap sequence. Masks every IRQ once complete;
    /// bring-up unmasks lines one at a time as each driver comes up,
    /// per the IRQ policy.
    unsafe fn initialize(&mut self) {
        unsafe {
            outb(PIC1_COMMAND, ICW1_INIT | ICW1_ICW4);
            io_wait();
            outb(PIC2_COMMAND, ICW1_INIT | ICW1_ICW4);
            io_wait();

            outb(PIC1_DATA, self.master_offset);
            io_wait();
            outb(PIC2_DATA, self.slave_offset);
            io_wait();

            outb(PIC1_DATA, 0x04); // master: slave lives on IRQ2
            io_wait();
            outb(PIC2_DATA, 0x02); // slave: cascade identity 2
            io_wait();

            outb(PIC1_DATA, ICW4_8086);
            io_wait();
            outb(PIC2_DATA, ICW4_8086);
            io_wait();

            outb(PIC1_DATA, 0xFF);
            outb(PIC2_DATA, 0xFF);
        }
    }

    unsafe fn enable_irq(&mut self, irq: u8) {
        unsafe {
            if irq < 8 {
                let mask = inb(PIC1_DATA);
                outb(PIC1_DATA, mask & !(1 << irq));
            } else {
                let bit = irq - 8;
                let mask = inb(PIC2_DATA);
                outb(PIC2_DATA, mask & !(1 << bit));
                let master_mask = inb(PIC1_DATA);
                outb(PIC1_DATA, master_mask & !(1 << 2));
            }
        }
    }

    unsafe fn disable_irq(&mut self, irq: u8) {
        unsafe {
            if irq < 8 {
                let mask = inb(PIC1_DATA);
                outb(PIC1_DATA, mask | (1 << irq));
            } else {
                let bit = irq - 8;
                let mask = inb(PIC2_DATA);
                outb(PIC2_DATA, mask | (1 << bit));
            }
        }
    }

    /// Sends EOI. Per the IRQ policy, cascaded IRQ >= 8 sends EOI to
    /// both the slave and the master; master-only IRQs send it once.
    unsafe fn end_of_interrupt(&mut self, vector: u8) {
        unsafe {
            if vector >= self.slave_offset && vector < self.slave_offset + 8 {
                outb(PIC2_COMMAND, CMD_EOI);
            }
            outb(PIC1_COMMAND, CMD_EOI);
        }
    }
}

static PICS: Mutex<ChainedPics> = Mutex::new(ChainedPics::new(MASTER_OFFSET, SLAVE_OFFSET));

/// Remaps both PICs. Masks all IRQs; callers must `enable_irq` each
/// line their driver is ready to service. Idempotent in the sense
/// that re-running the ICW sequence always yields the same remapped,
/// fully-masked state.
///
/// # Safety
/// Must run with interrupts disabled, once, during L2 bring-up.
pub unsafe fn init() {
    unsafe {
        PICS.lock().initialize();
    }
}

/// Unmasks `irq`. The caller must already have a handler registered
/// for its vector — an unmasked, unhandled IRQ falls through to the
/// exception policy's unregistered-vector halt.
///
/// # Safety
/// Caller must have registered a handler for `irq`'s vector first.
pub unsafe fn enable_irq(irq: Irq) {
    unsafe {
        PICS.lock().enable_irq(irq as u8);
    }
}

/// Masks `irq`.
pub fn disable_irq(irq: Irq) {
    unsafe {
        PICS.lock().disable_irq(irq as u8);
    }
}

/// Sends End-of-Interrupt for `vector`. Every IRQ trampoline calls
/// this *before* invoking the registered handler, per the IRQ policy.
///
/// # Safety
/// Must be called exactly once per interrupt, from interrupt context.
pub unsafe fn end_of_interrupt(vector: u8) {
    unsafe {
        PICS.lock().end_of_interrupt(vector);
    }
}

#[inline]
fn io_wait() {
    unsafe { outb(0x80, 0) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_to_vector_mapping() {
        assert_eq!(Irq::Timer.to_vector(), 0x20);
        assert_eq!(Irq::Keyboard.to_vector(), 0x21);
        assert_eq!(Irq::Rtc.to_vector(), 0x28);
        assert_eq!(Irq::Mouse.to_vector(), 0x2C);
    }

    #[test]
    fn vector_to_irq_round_trip() {
        for irq in [Irq::Timer, Irq::Keyboard, Irq::Rtc, Irq::Mouse, Irq::SecondaryAta] {
            assert_eq!(Irq::from_vector(irq.to_vector()), Some(irq));
        }
        assert_eq!(Irq::from_vector(0x4D), None);
    }
}
