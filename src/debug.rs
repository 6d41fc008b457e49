//! Optional character/pin debug side-channel (`debug-io` feature).
//!
//! Intended for scope-level timing diagnostics on targets where even `log`
//! is too heavy: the dispatcher raises a pin around interesting phases and
//! emits single-character event markers. Purely observational: with or
//! without a sink attached, protocol behavior is identical.

/// Pin raised for the duration of a tick.
pub const PIN_TICK: u8 = 0;
/// Pin raised while handlers are being advanced.
pub const PIN_HANDLERS: u8 = 1;

/// A character sink plus pin writer, attached via
/// [`MemProgBuilder::with_debug_io`](crate::MemProgBuilder::with_debug_io).
pub trait DebugIo {
    /// Emit one event-marker character.
    ///
    /// The dispatcher emits `b'C'` when a command is ingested and `b'R'`
    /// when a result is posted back to the host.
    fn putc(&mut self, c: u8);

    /// Drive a debug pin. The default implementation discards the write,
    /// for sinks that only care about characters.
    fn pin(&mut self, pin: u8, high: bool) {
        let _ = (pin, high);
    }
}
