//! Progress update callbacks

/// Progress update callbacks.
///
/// Implementations receive one `init` with the dump's start address and total
/// byte count, one `update` per transferred word, and a final `finish`.
/// Purely observational; nothing here feeds back into the transfer.
pub trait ProgressCallbacks {
    /// Initialize some progress report.
    fn init(&mut self, addr: u64, total: u64);
    /// Update some progress report with a transferred word.
    fn update(&mut self, addr: u64, len: usize, data: &str);
    /// Finish some progress report.
    fn finish(&mut self);
}

/// An empty implementation of [ProgressCallbacks] that does nothing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultProgressCallback;

impl ProgressCallbacks for DefaultProgressCallback {
    fn init(&mut self, _addr: u64, _total: u64) {}
    fn update(&mut self, _addr: u64, _len: usize, _data: &str) {}
    fn finish(&mut self) {}
}
