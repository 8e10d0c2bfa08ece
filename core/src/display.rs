//! Clock-to-display formatting
//!
//! The split-flap row is six modules wide. The clock string `HH:MM:SS` is
//! reduced to its six digits in reading order, and only forwarded when it
//! changes so the modules are not commanded once per loop pass.

use heapless::String;

use crate::error::DisplayFormError;

/// Number of split-flap modules showing the time
pub const DISPLAY_WIDTH: usize = 6;

/// Byte offsets of the separators in `HH:MM:SS`
const SEPARATORS: [usize; 2] = [2, 5];

/// Exactly six ASCII digits, ready for the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayString([u8; DISPLAY_WIDTH]);

impl DisplayString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only ever built from validated ASCII digits
        core::str::from_utf8(&self.0).unwrap_or("")
    }
}

/// Strip the separators from `HH:MM:SS`
///
/// Anything other than two digits, `:`, two digits, `:`, two digits is
/// rejected, so a short or garbled string never reaches the display.
pub fn to_display_form(formatted: &str) -> Result<DisplayString, DisplayFormError> {
    let bytes = formatted.as_bytes();
    if bytes.len() != DISPLAY_WIDTH + SEPARATORS.len() {
        return Err(DisplayFormError::WrongLength { len: bytes.len() });
    }

    let mut digits = [0u8; DISPLAY_WIDTH];
    let mut out = 0;
    for (index, &b) in bytes.iter().enumerate() {
        if SEPARATORS.contains(&index) {
            if b != b':' {
                return Err(DisplayFormError::MissingSeparator { index });
            }
            continue;
        }
        if !b.is_ascii_digit() {
            return Err(DisplayFormError::NotADigit { index });
        }
        digits[out] = b;
        out += 1;
    }

    Ok(DisplayString(digits))
}

/// Result of offering a freshly formatted time to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayUpdate {
    /// Same as the previous tick, nothing to write
    Unchanged,
    /// New value to forward to the display
    Render(DisplayString),
    /// New value that failed validation, the display keeps its old content
    Rejected(DisplayFormError),
}

/// Change detection between consecutive ticks
#[derive(Debug, Default)]
pub struct DisplayTracker {
    last: Option<String<8>>,
}

impl DisplayTracker {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Compare `formatted` with the previous tick and derive the display form
    ///
    /// A rejected value still becomes the baseline so the same malformed
    /// input is reported once rather than on every pass.
    pub fn observe(&mut self, formatted: &str) -> DisplayUpdate {
        if self.last.as_ref().map(|s| s.as_str()) == Some(formatted) {
            return DisplayUpdate::Unchanged;
        }

        // Values longer than the buffer can never match again, keep no baseline
        self.last = String::try_from(formatted).ok();

        match to_display_form(formatted) {
            Ok(form) => DisplayUpdate::Render(form),
            Err(e) => DisplayUpdate::Rejected(e),
        }
    }

    /// Most recent formatted value seen
    pub fn last(&self) -> Option<&str> {
        self.last.as_ref().map(|s| s.as_str())
    }
}
