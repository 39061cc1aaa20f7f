//! Common driver error type.
//!
//! The specification's driver layer is specified mostly in terms of
//! plain booleans (`identify`, `read_sectors`, `write_sectors` all
//! "return false on failure"). Internally the ATA and PCI drivers need
//! to distinguish *why* an operation failed — no device present vs. a
//! spin budget exhausted vs. a status register reporting an error bit
//! — so they work in terms of [`DriverError`] and only flatten to a
//! bare `bool`/`Option` at the public API boundary.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// No device responded to the probe (e.g. ATA status 0xFF).
    NotPresent,
    /// A spin-count budget was exhausted waiting on a status bit.
    Timeout,
    /// The device's status register reported an error condition.
    HardwareError,
    /// A caller passed a value outside the driver's valid range
    /// (an LBA beyond the device's addressable range, a PCI slot
    /// index past the table, and so on).
    InvalidParameter,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriverError::NotPresent => "device not present",
            DriverError::Timeout => "operation timed out",
            DriverError::HardwareError => "device reported an error",
            DriverError::InvalidParameter => "invalid parameter",
        };
        f.write_str(s)
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
