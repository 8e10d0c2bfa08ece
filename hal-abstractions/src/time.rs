//! Local tick source

/// Free-running millisecond counter
///
/// Starts at an arbitrary value at boot and never goes backwards.
pub trait Monotonic {
    fn now_ms(&self) -> u64;
}
