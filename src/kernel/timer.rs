//! High-resolution timer: PIT programming, tick/nanosecond counters,
//! TSC calibration, and the 256-slot alarm wheel (L3).
//!
//! Grounded on the reference kernel's PIT driver (command byte 0x36,
//! lobyte/hibyte divisor, base frequency 1_193_182 Hz) and on
//! `timer.c`'s calibration loop — with one deliberate fix: the
//! reference implementation truncates the TSC delta to 32 bits before
//! dividing, which silently corrupts the computed CPU frequency once
//! the delta exceeds ~4 billion cycles (well within a single 100 ms
//! calibration window on anything built in the last decade). Every
//! accumulation here stays in `u64`.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use spin::Mutex;

use crate::arch::x86_64::pic::{self, Irq};
use crate::arch::x86_64::{idt, port};
use crate::lib::error::{KernelError, KernelResult};
use crate::lib::panic::abort;

/// PIT base oscillator frequency.
pub const PIT_BASE_FREQUENCY: u32 = 1_193_182;
/// Default tick frequency, matching the reference kernel's bring-up.
pub const DEFAULT_FREQUENCY: u32 = 1000;
/// Fixed alarm table size.
pub const MAX_ALARMS: usize = 256;

const PIT_COMMAND_PORT: u16 = 0x43;
const PIT_CHANNEL0_PORT: u16 = 0x40;
const PIT_COMMAND_CH0_SQUARE_WAVE: u8 = 0x36;

const CALIBRATION_MS: u32 = 100;
const FALLBACK_CPU_MHZ: u64 = 1000;

#[derive(Clone, Copy)]
struct Alarm {
    id: u32,
    interval_ms: u32,
    remaining_ms: u32,
    active: bool,
    callback: Option<fn()>,
}

impl Alarm {
    const fn empty() -> Self {
        Self {
            id: 0,
            interval_ms: 0,
            remaining_ms: 0,
            active: false,
            callback: None,
        }
    }
}

struct TimerState {
    frequency: u32,
    tick_ms: u32,
    cpu_mhz: u64,
    alarms: [Alarm; MAX_ALARMS],
    next_alarm_id: u32,
    tick_callback: Option<fn()>,
}

impl TimerState {
    const fn new() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            tick_ms: 1,
            cpu_mhz: FALLBACK_CPU_MHZ,
            alarms: [Alarm::empty(); MAX_ALARMS],
            next_alarm_id: 1,
            tick_callback: None,
        }
    }
}

static STATE: Mutex<TimerState> = Mutex::new(TimerState::new());
static TICKS: AtomicU32 = AtomicU32::new(0);
static NANOSECONDS: AtomicU64 = AtomicU64::new(0);

fn tick_ms_for(freq: u32) -> u32 {
    if freq == 0 {
        return 1;
    }
    ((1000 * 2 + freq) / (freq * 2)).max(1)
}

fn program_pit(freq: u32) {
    let divisor = (PIT_BASE_FREQUENCY / freq).clamp(1, 0xFFFF);
    unsafe {
        port::outb(PIT_COMMAND_PORT, PIT_COMMAND_CH0_SQUARE_WAVE);
        port::outb(PIT_CHANNEL0_PORT, (divisor & 0xFF) as u8);
        port::outb(PIT_CHANNEL0_PORT, ((divisor >> 8) & 0xFF) as u8);
    }
}

/// Busy-waits roughly `ms` milliseconds against the tick counter,
/// using `hlt` between polls so the CPU idles rather than spins.
fn hlt_wait_ms(ms: u32) {
    let start = TICKS.load(Ordering::Relaxed);
    let state = STATE.lock();
    let tick_ms = state.tick_ms.max(1);
    drop(state);
    let ticks_needed = (ms + tick_ms - 1) / tick_ms;
    while TICKS.load(Ordering::Relaxed).wrapping_sub(start) < ticks_needed {
        port::hlt();
    }
}

fn calibrate_tsc() -> u64 {
    let t0 = port::rdtsc();
    hlt_wait_ms(CALIBRATION_MS);
    let t1 = port::rdtsc();

    let elapsed_cycles = t1.wrapping_sub(t0);
    if CALIBRATION_MS == 0 {
        return FALLBACK_CPU_MHZ;
    }
    let mhz = elapsed_cycles / (CALIBRATION_MS as u64 * 1000);
    if mhz == 0 {
        FALLBACK_CPU_MHZ
    } else {
        mhz
    }
}

/// Programs the PIT at `freq` Hz, installs the IRQ0 handler, unmasks
/// it, then calibrates the TSC against the newly-running tick counter.
///
/// # Safety
/// Must run after `arch::x86_64::init`, with interrupts still disabled.
pub unsafe fn init(freq: u32) {
    let freq = freq.max(1);
    {
        let mut state = STATE.lock();
        state.frequency = freq;
        state.tick_ms = tick_ms_for(freq);
    }
    program_pit(freq);
    idt::register_handler(Irq::Timer.to_vector(), on_timer_interrupt);
    unsafe {
        pic::enable_irq(Irq::Timer);
    }

    let mhz = calibrate_tsc();
    STATE.lock().cpu_mhz = mhz;
}

/// Reprograms the PIT at a new frequency. Recomputes the per-tick
/// millisecond granularity used by the alarm wheel.
pub fn set_frequency(freq: u32) {
    let freq = freq.max(1);
    port::without_interrupts(|| {
        let mut state = STATE.lock();
        state.frequency = freq;
        state.tick_ms = tick_ms_for(freq);
        program_pit(freq);
    });
}

pub fn get_ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

pub fn get_nanoseconds() -> u64 {
    NANOSECONDS.load(Ordering::Relaxed)
}

pub fn get_uptime_ms() -> u64 {
    get_nanoseconds() / 1_000_000
}

pub fn get_cpu_mhz() -> u64 {
    STATE.lock().cpu_mhz
}

/// Returns the most recently sampled RTC wall-clock time.
pub fn read_rtc() -> super::rtc::RtcTime {
    super::rtc::read()
}

/// Busy-waits `ms` milliseconds, idling on `hlt` between ticks.
pub fn wait(ms: u32) {
    hlt_wait_ms(ms);
}

/// Busy-waits `us` microseconds, rounded up to whole milliseconds
/// (this timer's finest externally-visible grain is one tick).
pub fn usleep(us: u32) {
    wait((us + 999) / 1000);
}

/// Busy-waits `ns` nanoseconds, rounded up to whole milliseconds.
pub fn nsleep(ns: u64) {
    wait(((ns + 999_999) / 1_000_000) as u32);
}

/// Creates a periodic alarm firing every `interval_ms`. Returns 0 if
/// `interval_ms` is zero (single-shot-by-zero-interval is rejected, as
/// specified — a one-shot is expressed by deactivating in the
/// callback) or if the table is full.
pub fn create_alarm(interval_ms: u32, callback: fn()) -> u32 {
    if interval_ms == 0 {
        return 0;
    }
    port::without_interrupts(|| {
        let mut state = STATE.lock();
        let id = state.next_alarm_id;
        match state.alarms.iter_mut().find(|a| !a.active) {
            Some(slot) => {
                *slot = Alarm {
                    id,
                    interval_ms,
                    remaining_ms: interval_ms,
                    active: true,
                    callback: Some(callback),
                };
                state.next_alarm_id = state.next_alarm_id.wrapping_add(1).max(1);
                id
            }
            None => 0,
        }
    })
}

/// Deactivates the alarm with the given id.
pub fn destroy_alarm(id: u32) -> KernelResult<()> {
    port::without_interrupts(|| {
        let mut state = STATE.lock();
        match state.alarms.iter_mut().find(|a| a.active && a.id == id) {
            Some(slot) => {
                slot.active = false;
                slot.callback = None;
                Ok(())
            }
            None => Err(KernelError::NotRegistered),
        }
    })
}

/// Registers a callback invoked once at the end of every tick, after
/// any alarms due this tick have already fired.
pub fn register_tick_callback(callback: fn()) {
    port::without_interrupts(|| {
        STATE.lock().tick_callback = Some(callback);
    });
}

fn on_timer_interrupt(_vector: u8) {
    TICKS.fetch_add(1, Ordering::Relaxed);

    let mut state = STATE.lock();
    let ns_per_tick = 1_000_000_000u64 / state.frequency.max(1) as u64;
    NANOSECONDS.fetch_add(ns_per_tick, Ordering::Relaxed);
    let tick_ms = state.tick_ms.max(1);

    let mut due: [Option<fn()>; MAX_ALARMS] = [None; MAX_ALARMS];
    let mut due_count = 0;

    for alarm in state.alarms.iter_mut() {
        if !alarm.active {
            continue;
        }
        alarm.remaining_ms = alarm.remaining_ms.saturating_sub(tick_ms);
        if alarm.remaining_ms == 0 {
            due[due_count] = alarm.callback;
            due_count += 1;
            if alarm.interval_ms > 0 {
                alarm.remaining_ms = alarm.interval_ms;
            } else {
                alarm.active = false;
            }
        }
    }
    let tick_callback = state.tick_callback;
    drop(state);

    for callback in due.iter().take(due_count).flatten() {
        callback();
    }
    if let Some(callback) = tick_callback {
        callback();
    }
}

/// Reports an unrecoverable timer fault (e.g. PIT reprogrammed to an
/// impossible divisor) the way the rest of the kernel reports boot
/// faults: halt with a dump rather than silently limping on.
#[allow(dead_code)]
fn fatal(reason: &str) -> ! {
    abort(reason, file!(), line!())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_ms_rounds_to_nearest() {
        assert_eq!(tick_ms_for(1000), 1);
        assert_eq!(tick_ms_for(100), 10);
        assert_eq!(tick_ms_for(0), 1);
    }

    #[test]
    fn pit_divisor_for_1000hz_matches_reference() {
        assert_eq!(PIT_BASE_FREQUENCY / 1000, 1193);
    }

    #[test]
    fn alarm_rejects_zero_interval() {
        fn noop() {}
        assert_eq!(create_alarm(0, noop), 0);
    }

    #[test]
    fn alarm_create_and_destroy_round_trip() {
        fn noop() {}
        let id = create_alarm(250, noop);
        assert_ne!(id, 0);
        assert!(destroy_alarm(id).is_ok());
        assert_eq!(destroy_alarm(id), Err(KernelError::NotRegistered));
    }

    #[test]
    fn alarm_table_exhaustion_returns_zero() {
        fn noop() {}
        let mut created = 0;
        for _ in 0..MAX_ALARMS + 1 {
            let id = create_alarm(10, noop);
            if id != 0 {
                created += 1;
            }
        }
        assert!(created <= MAX_ALARMS as u32);
        for id in 1..=created {
            let _ = destroy_alarm(id);
        }
    }
}
