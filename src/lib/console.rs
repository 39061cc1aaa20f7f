//! Write-only diagnostic console.
//!
//! Backed by a 16550 UART on COM1, exactly as the host repository's
//! own serial driver does it. The distilled specification treats the
//! console's internals as an unspecified support library and only
//! requires four entry points (`console_write`, `console_write_hex`,
//! `console_write_dec`, `console_put_char`); those are provided here
//! as free functions, plus a `core::fmt::Write` adapter so the rest of
//! the kernel can use `write!`/`writeln!` instead of hand-rolled
//! formatting, matching how the teacher repository's own
//! `serial_print!`/`serial_println!` macros are implemented.

use core::fmt;

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

const COM1_PORT: u16 = 0x3F8;

lazy_static! {
    static ref SERIAL1: Mutex<SerialPort> = {
        let mut port = unsafe { SerialPort::new(COM1_PORT) };
        port.init();
        Mutex::new(port)
    };
}

/// Initializes the console. Idempotent: repeated calls just re-touch
/// the lazily-initialized port.
pub fn init() {
    let _ = &*SERIAL1;
}

/// Writes raw bytes to the console.
pub fn console_write(bytes: &[u8]) {
    let mut guard = SERIAL1.lock();
    for &b in bytes {
        guard.send(b);
    }
}

/// Writes a single byte to the console.
pub fn console_put_char(byte: u8) {
    SERIAL1.lock().send(byte);
}

/// Writes `value` as zero-padded lowercase hex, e.g. `0x0000002a`.
pub fn console_write_hex(value: u32) {
    let mut buf = [0u8; 10];
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..8 {
        let nibble = (value >> (28 - i * 4)) & 0xF;
        buf[2 + i] = match nibble {
            0..=9 => b'0' + nibble as u8,
            _ => b'a' + (nibble as u8 - 10),
        };
    }
    console_write(&buf);
}

/// Writes `value` as an unsigned base-10 integer.
pub fn console_write_dec(value: u32) {
    let mut buf = [0u8; 10];
    let mut i = buf.len();
    let mut v = value;
    loop {
        i -= 1;
        buf[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    console_write(&buf[i..]);
}

/// A `core::fmt::Write` adapter over the console, for `write!`/
/// `writeln!` call sites (panic banners, boot-sequence logging).
pub struct ConsoleWriter;

impl fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        console_write(s.as_bytes());
        Ok(())
    }
}

pub fn writer() -> ConsoleWriter {
    ConsoleWriter
}

#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::lib::console::writer(), $($arg)*);
    }};
}

#[macro_export]
macro_rules! kprintln {
    () => { $crate::kprint!("\n") };
    ($fmt:expr) => { { $crate::kprint!($fmt); $crate::kprint!("\n") } };
    ($fmt:expr, $($arg:tt)*) => { $crate::kprint!(concat!($fmt, "\n"), $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_formatting_is_zero_padded() {
        // Smoke test only: console_write_hex has no return value to
        // assert on in a no_std context, so this just guards against
        // an index panic in the formatting loop.
        console_write_hex(0x2a);
        console_write_hex(0);
        console_write_hex(0xFFFF_FFFF);
    }

    #[test]
    fn dec_formatting_handles_zero() {
        console_write_dec(0);
        console_write_dec(42);
        console_write_dec(4_294_967_295);
    }
}
