//! Display consumer

/// Write-only sink driving the physical split-flap modules
pub trait DisplaySink {
    /// Show `text` on the display
    ///
    /// `force_full_rotation` asks every module to spin a full revolution even
    /// when its character is unchanged. Command text sets it; the per-second
    /// clock string does not.
    fn show(&mut self, text: &[u8], force_full_rotation: bool);
}
