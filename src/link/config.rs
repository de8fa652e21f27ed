// src/link/config.rs
//
// Line settings and timing policy for the serial link.
// Defaults match the attached target: 9600 baud 8N1, hardware flow control
// off, 8192 us post-write settle, 50 ms per-byte read timeout.

use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity as SpParity, StopBits};
use std::time::Duration;

// ============================================================================
// Types
// ============================================================================

/// Parity setting for the serial line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl Default for Parity {
    fn default() -> Self {
        Parity::None
    }
}

/// Serial link configuration, applied once at open time.
///
/// Every field has a default matching the target device's profile, so
/// `LinkConfig::default()` (or an empty JSON object) is the normal starting
/// point and overrides are the exception.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Baud rate - defaults to 9600
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8) - defaults to 8
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits (1, 2) - defaults to 1
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Parity ("none", "odd", "even") - defaults to "none"
    #[serde(default)]
    pub parity: Parity,
    /// Turnaround timing for writes and per-byte reads
    #[serde(default)]
    pub timing: TimingPolicy,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
            timing: TimingPolicy::default(),
        }
    }
}

/// Timing policy for the half-duplex turnaround.
///
/// Both values were tuned against one target at 9600 baud and do not
/// generalize to other devices or rates, hence a policy rather than
/// constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Pause after every write, letting the physical transmission drain
    /// before the line direction flips again (microseconds).
    #[serde(default = "default_write_settle_us")]
    pub write_settle_us: u64,
    /// Upper bound on the wait for each single byte during a read
    /// (milliseconds). Must be non-zero.
    #[serde(default = "default_byte_timeout_ms")]
    pub byte_timeout_ms: u64,
}

fn default_write_settle_us() -> u64 {
    8192
}
fn default_byte_timeout_ms() -> u64 {
    50
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            write_settle_us: default_write_settle_us(),
            byte_timeout_ms: default_byte_timeout_ms(),
        }
    }
}

impl TimingPolicy {
    /// Post-write settle delay as a `Duration`.
    pub fn write_settle(&self) -> Duration {
        Duration::from_micros(self.write_settle_us)
    }

    /// Per-byte read timeout as a `Duration`.
    pub fn byte_timeout(&self) -> Duration {
        Duration::from_millis(self.byte_timeout_ms)
    }
}

// ============================================================================
// Conversions to serialport types
// ============================================================================

impl LinkConfig {
    /// Data bits as the serialport crate's type. Out-of-range counts fall
    /// back to eight.
    pub(crate) fn to_data_bits(&self) -> DataBits {
        match self.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        }
    }

    /// Stop bits as the serialport crate's type. Anything but 2 means one.
    pub(crate) fn to_stop_bits(&self) -> StopBits {
        match self.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        }
    }

    /// Parity as the serialport crate's type.
    pub(crate) fn to_parity(&self) -> SpParity {
        match self.parity {
            Parity::None => SpParity::None,
            Parity::Odd => SpParity::Odd,
            Parity::Even => SpParity::Even,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
