//! Engine status flags and the report mailbox
//!
//! The engine thread posts a description whenever a callback arrives with
//! status flags set. The application thread takes the latest report; taking
//! clears it. Only the newest unread report is kept.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Per-callback status bits reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusFlags(u32);

impl StatusFlags {
    /// Input data was discarded because the stream could not supply it in time
    pub const INPUT_UNDERFLOW: StatusFlags = StatusFlags(0x01);
    /// Input data was discarded because the callback could not keep up
    pub const INPUT_OVERFLOW: StatusFlags = StatusFlags(0x02);
    /// Output was padded because the callback delivered too late
    pub const OUTPUT_UNDERFLOW: StatusFlags = StatusFlags(0x04);
    /// Output data was discarded
    pub const OUTPUT_OVERFLOW: StatusFlags = StatusFlags(0x08);
    /// The engine is priming its output buffers
    pub const PRIMING_OUTPUT: StatusFlags = StatusFlags(0x10);

    /// No flags set
    pub const fn empty() -> Self {
        StatusFlags(0)
    }

    /// Build from raw bits, ignoring unknown ones
    pub const fn from_bits_truncate(bits: u32) -> Self {
        StatusFlags(bits & 0x1f)
    }

    /// Raw bits
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Whether no flag is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every flag in `other` is set
    pub const fn contains(&self, other: StatusFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Human-readable summary, `None` when no flag is set
    pub fn describe(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut text = String::from("status - ");
        for (flag, name) in [
            (Self::INPUT_UNDERFLOW, "input underflow "),
            (Self::INPUT_OVERFLOW, "input overflow "),
            (Self::OUTPUT_UNDERFLOW, "output underflow "),
            (Self::OUTPUT_OVERFLOW, "output overflow "),
            (Self::PRIMING_OUTPUT, "priming output "),
        ] {
            if self.contains(flag) {
                text.push_str(name);
            }
        }
        Some(text)
    }
}

impl std::ops::BitOr for StatusFlags {
    type Output = StatusFlags;

    fn bitor(self, rhs: StatusFlags) -> StatusFlags {
        StatusFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for StatusFlags {
    fn bitor_assign(&mut self, rhs: StatusFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe() {
            Some(text) => f.write_str(text.trim_end()),
            None => f.write_str("status - ok"),
        }
    }
}

/// Single-slot, latest-value channel from the engine thread to the application
#[derive(Debug, Default)]
pub struct StatusMailbox {
    slot: Mutex<Option<String>>,
}

impl StatusMailbox {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a report, replacing any unread one
    pub fn post(&self, report: String) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
    }

    /// Post the description of `flags` if any flag is set
    pub fn post_flags(&self, flags: StatusFlags) {
        if let Some(report) = flags.describe() {
            self.post(report);
        }
    }

    /// Take the latest report, leaving the mailbox empty
    pub fn take(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
