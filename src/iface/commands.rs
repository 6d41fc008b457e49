//! The per-command handler traits.

use crate::dispatch::Exchange;
use crate::iface::{CmdResult, Step};

/// Handler for `MASS_ERASE`: erase the entire region covered by this
/// interface.
pub trait MassErase {
    /// Advance the erase by one bounded step.
    fn mass_erase(&mut self, cx: &mut Exchange<'_>) -> CmdResult<Step>;
}

/// Handler for `ERASE_RANGE`: erase `length` bytes starting at `start`.
///
/// The host guarantees nothing about alignment; drivers validate `start`
/// and `length` against their own sector geometry and return
/// [`CmdError::Param`](crate::iface::CmdError::Param) on a miss.
pub trait EraseRange {
    /// Advance the erase by one bounded step. `start` and `length` are the
    /// command's `P1` and `P2`, re-presented on every invocation.
    fn erase_range(&mut self, start: u32, length: u32, cx: &mut Exchange<'_>) -> CmdResult<Step>;
}

/// Handler for `PROG_VERIFY`: program the data stream carried by the
/// buffers, read it back, and leave the CRC-32 of the readback in `P1`.
///
/// Buffers must be consumed in sequence order via
/// [`Exchange::next_full_buffer`]; the descriptor's address/length say
/// where each payload goes. The stream ends with the terminal-marked
/// buffer.
///
/// [`Exchange::next_full_buffer`]: crate::Exchange::next_full_buffer
pub trait ProgVerify {
    /// Consume whatever buffers are available this tick.
    fn prog_verify(&mut self, cx: &mut Exchange<'_>) -> CmdResult<Step>;
}

/// Handler for `CRC`: CRC-32 the address ranges named by the incoming
/// buffers (their payloads carry no data) and leave the result in `P1`.
pub trait CrcRegion {
    /// Consume whatever range descriptors are available this tick.
    fn crc(&mut self, cx: &mut Exchange<'_>) -> CmdResult<Step>;
}

/// Handler for `READ`: for each incoming range descriptor, send back a
/// buffer filled with the data read from that range.
pub trait ReadRegion {
    /// Advance the read by one bounded step.
    fn read(&mut self, cx: &mut Exchange<'_>) -> CmdResult<Step>;
}

/// Handler for interface-specific commands (opcodes `0x80..=0xFF`).
pub trait CustomCmd {
    /// Advance the command by one bounded step. `opcode` is the raw command
    /// byte from the parameter block.
    fn custom_cmd(&mut self, opcode: u8, cx: &mut Exchange<'_>) -> CmdResult<Step>;
}
