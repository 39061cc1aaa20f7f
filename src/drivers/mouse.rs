//! PS/2 mouse driver (L4).
//!
//! Grounded on this codebase's PS/2 keyboard driver for the controller
//! handshake idiom (Mutex-guarded state, `without_interrupts` on the
//! consumer accessors) and on a companion PS/2 mouse driver elsewhere in
//! the pack for the packet-cycle state machine and sign-extension math.
//! Diverges from both in two ways the reference firmware got wrong:
//! the wheel byte is only consumed when a wheel was actually detected at
//! init, not inferred from a stale packet-index comparison, and the
//! accumulated position is clamped to non-negative rather than to a
//! fixed screen rectangle (there is no display layer here to clamp to).

use super::error::{DriverError, DriverResult};
use crate::arch::x86_64::pic::Irq;
use crate::arch::x86_64::port;
use crate::arch::x86_64::{idt, pic};
use spin::Mutex;

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;
const COMMAND_PORT: u16 = 0x64;

const STATUS_OUTPUT_FULL: u8 = 0x01;
const STATUS_INPUT_FULL: u8 = 0x02;

const CMD_ENABLE_AUX: u8 = 0xA8;
const CMD_READ_CONFIG: u8 = 0x20;
const CMD_WRITE_CONFIG: u8 = 0x60;
const CMD_WRITE_AUX: u8 = 0xD4;

const CONFIG_MOUSE_INTERRUPT: u8 = 0x02;

const MOUSE_SET_SAMPLE_RATE: u8 = 0xF3;
const MOUSE_ENABLE_REPORTING: u8 = 0xF4;
const MOUSE_SET_RESOLUTION: u8 = 0xE8;
const MOUSE_GET_DEVICE_ID: u8 = 0xF2;
const MOUSE_ACK: u8 = 0xFA;

const PACKET_ALIGNMENT_BIT: u8 = 0x08;
const PACKET_X_SIGN: u8 = 0x10;
const PACKET_Y_SIGN: u8 = 0x20;
const PACKET_OVERFLOW: u8 = 0xC0;
const PACKET_BUTTON_MASK: u8 = 0x07;

struct MouseState {
    packet: [u8; 4],
    packet_index: usize,
    has_wheel: bool,
    x: i32,
    y: i32,
    buttons: u8,
    wheel_delta: i32,
}

impl MouseState {
    const fn new() -> Self {
        Self {
            packet: [0; 4],
            packet_index: 0,
            has_wheel: false,
            x: 0,
            y: 0,
            buttons: 0,
            wheel_delta: 0,
        }
    }

    fn packet_len(&self) -> usize {
        if self.has_wheel {
            4
        } else {
            3
        }
    }

    fn feed(&mut self, byte: u8) {
        if self.packet_index == 0 && byte & PACKET_ALIGNMENT_BIT == 0 {
            // Desynchronized from the controller; drop until byte 0
            // looks valid again.
            return;
        }
        self.packet[self.packet_index] = byte;
        self.packet_index += 1;
        if self.packet_index >= self.packet_len() {
            self.packet_index = 0;
            self.assemble();
        }
    }

    fn assemble(&mut self) {
        let flags = self.packet[0];
        if flags & PACKET_OVERFLOW != 0 {
            return;
        }

        let mut dx = self.packet[1] as i32;
        let mut dy = self.packet[2] as i32;
        if flags & PACKET_X_SIGN != 0 {
            dx |= !0xFF;
        }
        if flags & PACKET_Y_SIGN != 0 {
            dy |= !0xFF;
        }

        self.x = (self.x + dx).max(0);
        // PS/2 reports +Y as "up"; this kernel's coordinate space grows
        // downward, so the delta is subtracted rather than added.
        self.y = (self.y - dy).max(0);
        self.buttons = flags & PACKET_BUTTON_MASK;

        if self.has_wheel {
            let raw = self.packet[3] as i8;
            self.wheel_delta = raw as i32;
        }
    }
}

static MOUSE: Mutex<MouseState> = Mutex::new(MouseState::new());

fn wait_for_input_ready() -> bool {
    for _ in 0..100_000 {
        if inb(STATUS_PORT) & STATUS_INPUT_FULL == 0 {
            return true;
        }
    }
    false
}

fn wait_for_output_ready() -> bool {
    for _ in 0..100_000 {
        if inb(STATUS_PORT) & STATUS_OUTPUT_FULL != 0 {
            return true;
        }
    }
    false
}

#[inline]
fn inb(port_num: u16) -> u8 {
    unsafe { port::inb(port_num) }
}

#[inline]
fn outb(port_num: u16, value: u8) {
    unsafe { port::outb(port_num, value) }
}

fn write_to_mouse(data: u8) -> DriverResult<()> {
    if !wait_for_input_ready() {
        return Err(DriverError::Timeout);
    }
    outb(COMMAND_PORT, CMD_WRITE_AUX);
    if !wait_for_input_ready() {
        return Err(DriverError::Timeout);
    }
    outb(DATA_PORT, data);
    Ok(())
}

fn read_from_mouse() -> DriverResult<u8> {
    if !wait_for_output_ready() {
        return Err(DriverError::Timeout);
    }
    Ok(inb(DATA_PORT))
}

/// Probes for the Microsoft wheel-mouse extension: set sample rate to
/// 200, 100, 80 in sequence, then request the device ID. An ID of 3
/// means the device switched into wheel-reporting mode.
fn probe_wheel() -> DriverResult<bool> {
    for rate in [200u8, 100, 80] {
        write_to_mouse(MOUSE_SET_SAMPLE_RATE)?;
        read_from_mouse()?;
        write_to_mouse(rate)?;
        read_from_mouse()?;
    }
    write_to_mouse(MOUSE_GET_DEVICE_ID)?;
    read_from_mouse()?; // ack
    let id = read_from_mouse()?;
    Ok(id == 0x03)
}

/// Enables the auxiliary PS/2 port, negotiates the wheel extension, and
/// registers the IRQ 12 handler.
pub unsafe fn init() -> DriverResult<()> {
    if !wait_for_input_ready() {
        return Err(DriverError::Timeout);
    }
    outb(COMMAND_PORT, CMD_ENABLE_AUX);

    if !wait_for_input_ready() {
        return Err(DriverError::Timeout);
    }
    outb(COMMAND_PORT, CMD_READ_CONFIG);
    if !wait_for_output_ready() {
        return Err(DriverError::Timeout);
    }
    let mut config = inb(DATA_PORT);
    config |= CONFIG_MOUSE_INTERRUPT;

    if !wait_for_input_ready() {
        return Err(DriverError::Timeout);
    }
    outb(COMMAND_PORT, CMD_WRITE_CONFIG);
    if !wait_for_input_ready() {
        return Err(DriverError::Timeout);
    }
    outb(DATA_PORT, config);

    write_to_mouse(MOUSE_SET_RESOLUTION)?;
    read_from_mouse()?;
    write_to_mouse(0x03)?;
    read_from_mouse()?;

    let has_wheel = probe_wheel().unwrap_or(false);
    MOUSE.lock().has_wheel = has_wheel;

    write_to_mouse(MOUSE_ENABLE_REPORTING)?;
    let ack = read_from_mouse()?;
    if ack != MOUSE_ACK {
        return Err(DriverError::HardwareError);
    }

    idt::register_handler(Irq::Mouse.to_vector(), on_mouse_interrupt);
    pic::enable_irq(Irq::Mouse);

    Ok(())
}

fn on_mouse_interrupt(_vector: u8) {
    let byte = inb(DATA_PORT);
    MOUSE.lock().feed(byte);
}

/// Current accumulated position, clamped to non-negative coordinates.
pub fn position() -> (i32, i32) {
    port::without_interrupts(|| {
        let state = MOUSE.lock();
        (state.x, state.y)
    })
}

/// Raw button bitmask: bit 0 left, bit 1 right, bit 2 middle.
pub fn buttons() -> u8 {
    port::without_interrupts(|| MOUSE.lock().buttons)
}

/// Last wheel delta (0 if no wheel was detected at init).
pub fn wheel_delta() -> i32 {
    port::without_interrupts(|| MOUSE.lock().wheel_delta)
}

/// True if the Microsoft wheel extension was detected during [`init`].
pub fn has_wheel() -> bool {
    port::without_interrupts(|| MOUSE.lock().has_wheel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_byte_packet_assembles_without_wheel() {
        let mut state = MouseState::new();
        state.feed(0x08);
        state.feed(10);
        state.feed(0);
        assert_eq!(state.x, 10);
        assert_eq!(state.y, 0);
    }

    #[test]
    fn four_byte_packet_requires_wheel_flag() {
        let mut state = MouseState::new();
        state.has_wheel = true;
        state.feed(0x08);
        state.feed(5);
        state.feed(0);
        state.feed(1);
        assert_eq!(state.wheel_delta, 1);
    }

    #[test]
    fn wheel_byte_is_ignored_without_has_wheel_flag() {
        let mut state = MouseState::new();
        assert!(!state.has_wheel);
        state.feed(0x08);
        state.feed(0);
        state.feed(0);
        // Packet completed after 3 bytes; a following byte starts a new
        // packet rather than being consumed as a wheel delta.
        assert_eq!(state.packet_index, 0);
        assert_eq!(state.wheel_delta, 0);
    }

    #[test]
    fn negative_sign_extended_delta_clamps_position_to_zero() {
        let mut state = MouseState::new();
        state.feed(0x08 | PACKET_X_SIGN);
        state.feed(0xF0); // -16
        state.feed(0);
        assert_eq!(state.x, 0);
    }

    #[test]
    fn y_axis_is_inverted() {
        let mut state = MouseState::new();
        state.y = 20;
        state.feed(0x08);
        state.feed(0);
        state.feed(5); // dy = +5 in PS/2 terms (up)
        assert_eq!(state.y, 15);
    }

    #[test]
    fn overflow_bit_discards_the_packet() {
        let mut state = MouseState::new();
        state.x = 5;
        state.feed(0x08 | PACKET_OVERFLOW);
        state.feed(50);
        state.feed(50);
        assert_eq!(state.x, 5);
    }

    #[test]
    fn misaligned_first_byte_is_dropped() {
        let mut state = MouseState::new();
        state.feed(0x00); // missing alignment bit
        assert_eq!(state.packet_index, 0);
    }
}
