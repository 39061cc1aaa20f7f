//! PS/2 keyboard driver (L4).
//!
//! Controller programming follows the same disable/drain/configure/enable
//! sequence the PS/2 controller expects on any platform; the surrounding
//! module structure (port constants, a `Mutex`-guarded ring buffer state
//! struct, an ISR that only pushes bytes, translation done by the
//! consumer-facing call) is grounded on the PS/2 keyboard driver this
//! kernel's PS/2 mouse driver shares a controller with.
//!
//! Two differences from the simplest possible driver matter here: scancode
//! set 1 is translated through two full 128-entry tables rather than a
//! linear scan, and modifier scancodes are identified by an explicit
//! predicate rather than a range check that happens to always be true.

use super::error::{DriverError, DriverResult};
use crate::arch::x86_64::pic::Irq;
use crate::arch::x86_64::port;
use crate::arch::x86_64::{idt, pic};
use spin::Mutex;

#[inline]
fn inb(port_num: u16) -> u8 {
    unsafe { port::inb(port_num) }
}

#[inline]
fn outb(port_num: u16, value: u8) {
    unsafe { port::outb(port_num, value) }
}

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;
const COMMAND_PORT: u16 = 0x64;

const STATUS_OUTPUT_FULL: u8 = 0x01;
const STATUS_INPUT_FULL: u8 = 0x02;

const CMD_READ_CONFIG: u8 = 0x20;
const CMD_WRITE_CONFIG: u8 = 0x60;
const CMD_DISABLE_MOUSE: u8 = 0xA7;
const CMD_DISABLE_KEYBOARD: u8 = 0xAD;
const CMD_ENABLE_KEYBOARD: u8 = 0xAE;

const CONFIG_KEYBOARD_INTERRUPT: u8 = 0x01;
const CONFIG_MOUSE_INTERRUPT: u8 = 0x02;
const CONFIG_KEYBOARD_DISABLE: u8 = 0x10;
const CONFIG_MOUSE_DISABLE: u8 = 0x20;
const CONFIG_TRANSLATE: u8 = 0x40;

const SCANCODE_EXTENDED_PREFIX: u8 = 0xE0;
const RELEASE_BIT: u8 = 0x80;

const SC_LEFT_SHIFT: u8 = 0x2A;
const SC_RIGHT_SHIFT: u8 = 0x36;
const SC_LEFT_CTRL: u8 = 0x1D;
const SC_LEFT_ALT: u8 = 0x38;
const SC_CAPS_LOCK: u8 = 0x3A;
const SC_NUM_LOCK: u8 = 0x45;
const SC_SCROLL_LOCK: u8 = 0x46;

/// Bits returned by [`get_modifiers`].
pub const MOD_SHIFT: u32 = 1 << 0;
pub const MOD_CTRL: u32 = 1 << 1;
pub const MOD_ALT: u32 = 1 << 2;
pub const MOD_CAPS_LOCK: u32 = 1 << 3;
pub const MOD_NUM_LOCK: u32 = 1 << 4;
pub const MOD_SCROLL_LOCK: u32 = 1 << 5;

const LED_SCROLL_LOCK: u8 = 1 << 0;
const LED_NUM_LOCK: u8 = 1 << 1;
const LED_CAPS_LOCK: u8 = 1 << 2;
const SET_LEDS_COMMAND: u8 = 0xED;

const BUFFER_SIZE: usize = 256;

/// Lower-case scancode set 1 translation table. Index is the 7-bit key
/// code (release bit masked off); zero means "no printable character".
#[rustfmt::skip]
const LOWER_TABLE: [u8; 128] = [
    0, 0, 49, 50, 51, 52, 53, 54, 55, 56, 57, 48, 45, 61, 8, 9,
    113, 119, 101, 114, 116, 121, 117, 105, 111, 112, 91, 93, 10, 0, 97, 115,
    100, 102, 103, 104, 106, 107, 108, 59, 39, 96, 0, 92, 122, 120, 99, 118,
    98, 110, 109, 44, 46, 47, 0, 0, 0, 32, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Upper-case / shifted counterpart of [`LOWER_TABLE`].
#[rustfmt::skip]
const UPPER_TABLE: [u8; 128] = [
    0, 0, 33, 64, 35, 36, 37, 94, 38, 42, 40, 41, 95, 43, 8, 9,
    81, 87, 69, 82, 84, 89, 85, 73, 79, 80, 123, 125, 10, 0, 65, 83,
    68, 70, 71, 72, 74, 75, 76, 58, 34, 126, 0, 124, 90, 88, 67, 86,
    66, 78, 77, 60, 62, 63, 0, 0, 0, 32, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// True for any scancode (7-bit key code, release bit already masked)
/// that changes modifier/lock state rather than producing a character.
/// This is the corrected form of a check the reference firmware got
/// backwards.
fn is_modifier_scancode(key_code: u8) -> bool {
    matches!(
        key_code,
        SC_LEFT_SHIFT | SC_RIGHT_SHIFT | SC_LEFT_CTRL | SC_LEFT_ALT | SC_CAPS_LOCK | SC_NUM_LOCK | SC_SCROLL_LOCK
    )
}

struct KeyboardState {
    buffer: [u8; BUFFER_SIZE],
    write_pos: usize,
    read_pos: usize,
    shift: bool,
    ctrl: bool,
    alt: bool,
    caps_lock: bool,
    num_lock: bool,
    scroll_lock: bool,
    extended_pending: bool,
}

impl KeyboardState {
    const fn new() -> Self {
        Self {
            buffer: [0; BUFFER_SIZE],
            write_pos: 0,
            read_pos: 0,
            shift: false,
            ctrl: false,
            alt: false,
            caps_lock: false,
            num_lock: false,
            scroll_lock: false,
            extended_pending: false,
        }
    }

    fn push(&mut self, byte: u8) {
        let next = (self.write_pos + 1) % BUFFER_SIZE;
        if next == self.read_pos {
            return;
        }
        self.buffer[self.write_pos] = byte;
        self.write_pos = next;
    }

    fn pop(&mut self) -> Option<u8> {
        if self.read_pos == self.write_pos {
            return None;
        }
        let byte = self.buffer[self.read_pos];
        self.read_pos = (self.read_pos + 1) % BUFFER_SIZE;
        Some(byte)
    }

    fn has_data(&self) -> bool {
        self.read_pos != self.write_pos
    }

    fn modifiers(&self) -> u32 {
        let mut bits = 0;
        if self.shift {
            bits |= MOD_SHIFT;
        }
        if self.ctrl {
            bits |= MOD_CTRL;
        }
        if self.alt {
            bits |= MOD_ALT;
        }
        if self.caps_lock {
            bits |= MOD_CAPS_LOCK;
        }
        if self.num_lock {
            bits |= MOD_NUM_LOCK;
        }
        if self.scroll_lock {
            bits |= MOD_SCROLL_LOCK;
        }
        bits
    }

    fn led_mask(&self) -> u8 {
        let mut mask = 0;
        if self.scroll_lock {
            mask |= LED_SCROLL_LOCK;
        }
        if self.num_lock {
            mask |= LED_NUM_LOCK;
        }
        if self.caps_lock {
            mask |= LED_CAPS_LOCK;
        }
        mask
    }
}

static KEYBOARD: Mutex<KeyboardState> = Mutex::new(KeyboardState::new());

fn wait_for_input_ready() -> bool {
    for _ in 0..10_000 {
        if inb(STATUS_PORT) & STATUS_INPUT_FULL == 0 {
            return true;
        }
    }
    false
}

fn wait_for_output_ready() -> bool {
    for _ in 0..10_000 {
        if inb(STATUS_PORT) & STATUS_OUTPUT_FULL != 0 {
            return true;
        }
    }
    false
}

fn send_command(command: u8) {
    outb(COMMAND_PORT, command);
}

/// Sends the "set LEDs" command and the current lock-state byte. Called
/// on init and again every time a lock key toggles.
fn update_leds() {
    let mask = KEYBOARD.lock().led_mask();
    if !wait_for_input_ready() {
        return;
    }
    outb(DATA_PORT, SET_LEDS_COMMAND);
    if !wait_for_input_ready() {
        return;
    }
    outb(DATA_PORT, mask);
}

/// Programs the PS/2 controller for keyboard use and registers the IRQ 1
/// handler, following the controller's documented disable/drain/configure/
/// enable sequence. Disables both ports before reconfiguring so the drain
/// below can't race a wandering mouse byte; leaves the auxiliary port
/// disabled afterward for [`super::mouse::init`] to bring up itself.
pub unsafe fn init() -> DriverResult<()> {
    send_command(CMD_DISABLE_MOUSE);
    send_command(CMD_DISABLE_KEYBOARD);
    let _ = inb(DATA_PORT);

    send_command(CMD_READ_CONFIG);
    if !wait_for_output_ready() {
        return Err(DriverError::Timeout);
    }
    let mut config = inb(DATA_PORT);

    config |= CONFIG_KEYBOARD_INTERRUPT | CONFIG_TRANSLATE;
    config &= !(CONFIG_MOUSE_INTERRUPT | CONFIG_KEYBOARD_DISABLE | CONFIG_MOUSE_DISABLE);

    send_command(CMD_WRITE_CONFIG);
    if !wait_for_input_ready() {
        return Err(DriverError::Timeout);
    }
    outb(DATA_PORT, config);

    send_command(CMD_ENABLE_KEYBOARD);

    update_leds();

    idt::register_handler(Irq::Keyboard.to_vector(), on_keyboard_interrupt);
    pic::enable_irq(Irq::Keyboard);

    Ok(())
}

fn on_keyboard_interrupt(_vector: u8) {
    let scancode = inb(DATA_PORT);

    let mut kb = KEYBOARD.lock();

    if scancode == SCANCODE_EXTENDED_PREFIX {
        kb.extended_pending = true;
        return;
    }
    let was_extended = kb.extended_pending;
    kb.extended_pending = false;

    let released = scancode & RELEASE_BIT != 0;
    let key_code = scancode & !RELEASE_BIT;

    // Updates modifier/lock state; suppression of character emission for
    // these scancodes happens uniformly below, via `is_modifier_scancode`.
    match key_code {
        SC_LEFT_SHIFT | SC_RIGHT_SHIFT => kb.shift = !released,
        SC_LEFT_CTRL => kb.ctrl = !released,
        SC_LEFT_ALT => kb.alt = !released,
        SC_CAPS_LOCK if released => {
            kb.caps_lock = !kb.caps_lock;
            drop(kb);
            update_leds();
            return;
        }
        SC_NUM_LOCK if released => {
            kb.num_lock = !kb.num_lock;
            drop(kb);
            update_leds();
            return;
        }
        SC_SCROLL_LOCK if released => {
            kb.scroll_lock = !kb.scroll_lock;
            drop(kb);
            update_leds();
            return;
        }
        _ => {}
    }

    if released || was_extended || is_modifier_scancode(key_code) {
        return;
    }

    let shifted = kb.shift ^ kb.caps_lock;
    let table = if shifted { &UPPER_TABLE } else { &LOWER_TABLE };
    let ch = table[key_code as usize];
    if ch != 0 {
        kb.push(ch);
    }
}

/// True if a translated character is waiting in the ring buffer.
pub fn has_char() -> bool {
    port::without_interrupts(|| KEYBOARD.lock().has_data())
}

/// Pops one translated character, or 0 if the buffer is empty.
pub fn get_char() -> u8 {
    port::without_interrupts(|| KEYBOARD.lock().pop().unwrap_or(0))
}

/// Current modifier/lock state as a bitmask of the `MOD_*` constants.
pub fn get_modifiers() -> u32 {
    port::without_interrupts(|| KEYBOARD.lock().modifiers())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_round_trips_in_order() {
        let mut kb = KeyboardState::new();
        kb.push(b'a');
        kb.push(b'b');
        assert!(kb.has_data());
        assert_eq!(kb.pop(), Some(b'a'));
        assert_eq!(kb.pop(), Some(b'b'));
        assert_eq!(kb.pop(), None);
        assert!(!kb.has_data());
    }

    #[test]
    fn ring_buffer_drops_silently_on_overflow() {
        let mut kb = KeyboardState::new();
        for i in 0..(BUFFER_SIZE as u32 + 10) {
            kb.push((i % 256) as u8);
        }
        let mut count = 0;
        while kb.pop().is_some() {
            count += 1;
        }
        assert_eq!(count, BUFFER_SIZE - 1);
    }

    #[test]
    fn modifier_scancodes_are_identified_correctly() {
        assert!(is_modifier_scancode(SC_LEFT_SHIFT));
        assert!(is_modifier_scancode(SC_RIGHT_SHIFT));
        assert!(is_modifier_scancode(SC_LEFT_CTRL));
        assert!(is_modifier_scancode(SC_LEFT_ALT));
        assert!(is_modifier_scancode(SC_CAPS_LOCK));
        assert!(is_modifier_scancode(SC_NUM_LOCK));
        assert!(is_modifier_scancode(SC_SCROLL_LOCK));
        assert!(!is_modifier_scancode(0x1E)); // 'a'
        assert!(!is_modifier_scancode(0x39)); // space
    }

    #[test]
    fn lower_and_upper_tables_agree_on_letter_positions() {
        assert_eq!(LOWER_TABLE[0x1E], b'a');
        assert_eq!(UPPER_TABLE[0x1E], b'A');
        assert_eq!(LOWER_TABLE[0x10], b'q');
        assert_eq!(UPPER_TABLE[0x10], b'Q');
    }

    #[test]
    fn shift_xor_caps_selects_table() {
        let mut kb = KeyboardState::new();
        kb.shift = true;
        kb.caps_lock = false;
        assert!(kb.shift ^ kb.caps_lock);
        kb.shift = true;
        kb.caps_lock = true;
        assert!(!(kb.shift ^ kb.caps_lock));
    }

    #[test]
    fn led_mask_reflects_lock_state() {
        let mut kb = KeyboardState::new();
        assert_eq!(kb.led_mask(), 0);
        kb.caps_lock = true;
        kb.num_lock = true;
        assert_eq!(kb.led_mask(), LED_CAPS_LOCK | LED_NUM_LOCK);
    }

    #[test]
    fn modifiers_bitmask_matches_flags() {
        let mut kb = KeyboardState::new();
        kb.shift = true;
        kb.scroll_lock = true;
        assert_eq!(kb.modifiers(), MOD_SHIFT | MOD_SCROLL_LOCK);
    }
}
