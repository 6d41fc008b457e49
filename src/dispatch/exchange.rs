//! The [`Exchange`] context handed to command handlers.

use crate::common::{MemMap, Param, Status};
use crate::mem::SharedMem;

use super::pool;

/// A full buffer received from the host, in stream order.
///
/// Consuming methods take the handle by value: a received buffer must
/// either be released back to the host via
/// [`Exchange::release_buffer`] or held (by keeping the handle); it cannot
/// be forgotten mid-protocol by accident.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Inbound {
    /// Descriptor index.
    pub index: u8,
    /// Target address the payload should be written to (or read from,
    /// for range-only commands).
    pub address: u32,
    /// Valid payload bytes.
    pub length: u32,
    /// Whether this buffer ends the stream.
    pub last: bool,
}

/// A free buffer claimed for transmission.
///
/// Publish it with [`Exchange::commit_buffer`]; until then it stays
/// `PENDING` and invisible to the host.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Outbound {
    /// Descriptor index.
    pub index: u8,
    /// Usable payload capacity, in bytes.
    pub capacity: u32,
}

/// A handler's window onto its command: the working parameters and the
/// buffer pool, scoped to the handler's own interface.
pub struct Exchange<'x> {
    pub(crate) mem: &'x mut dyn SharedMem,
    pub(crate) map: &'x MemMap,
    pub(crate) index: u8,
    pub(crate) param: &'x mut Param,
    pub(crate) tx_seq: &'x mut u8,
    pub(crate) rx_seq: &'x mut u8,
}

impl Exchange<'_> {
    /// True on the first invocation after the command was ingested.
    ///
    /// The conventional point for a handler to reset its per-command
    /// scratch state.
    pub fn is_first_call(&self) -> bool {
        self.param.status == Status::Start
    }

    /// The working parameters (the private copy of the parameter block this
    /// command was ingested with).
    pub fn param(&self) -> &Param {
        self.param
    }

    /// Mutable working parameters, for staging outputs (`Code`,
    /// `P1`..`P6`). `Status` and `Token` are managed by the dispatcher; a
    /// handler's writes to them are overwritten from its return value.
    pub fn param_mut(&mut self) -> &mut Param {
        self.param
    }

    /// Payload capacity of each pool buffer, in bytes.
    pub fn buffer_size(&self) -> u32 {
        self.map.buffer_size
    }

    /// Number of buffers in the pool.
    pub fn num_buffers(&self) -> u8 {
        self.map.num_buffers
    }

    /// Take the next full buffer addressed to this interface, in stream
    /// order. `None` when nothing (new) has arrived this tick: return
    /// `Ok(Step::Pending)` and try again on the next invocation.
    pub fn next_full_buffer(&mut self) -> Option<Inbound> {
        let (index, address, length, last) =
            pool::next_full(self.mem, self.map, self.index, self.rx_seq)?;
        Some(Inbound {
            index,
            address,
            length,
            last,
        })
    }

    /// Copy payload bytes out of a received buffer, starting `offset` bytes
    /// in. Copies at most `buf.length - offset` bytes; returns the count.
    pub fn read_payload(&self, buf: &Inbound, offset: u32, out: &mut [u8]) -> usize {
        let available = buf.length.saturating_sub(offset) as usize;
        let n = out.len().min(available);
        self.mem
            .read_bytes(self.map.buffer_addr(buf.index) + offset, &mut out[..n]);
        n
    }

    /// Hand a consumed buffer back to the host (`FULL → FREE`, token
    /// released).
    pub fn release_buffer(&mut self, buf: Inbound) {
        pool::release(self.mem, self.map, buf.index);
    }

    /// Claim a free buffer for transmission (`FREE → PENDING`). `None` when
    /// the host holds every buffer; try again next tick.
    pub fn acquire_buffer(&mut self) -> Option<Outbound> {
        let index = pool::acquire(self.mem, self.map, self.index)?;
        Some(Outbound {
            index,
            capacity: self.map.buffer_size,
        })
    }

    /// Copy payload bytes into a claimed buffer, starting `offset` bytes
    /// in. Copies at most `capacity - offset` bytes; returns the count.
    pub fn write_payload(&mut self, buf: &Outbound, offset: u32, data: &[u8]) -> usize {
        let available = buf.capacity.saturating_sub(offset) as usize;
        let n = data.len().min(available);
        self.mem
            .write_bytes(self.map.buffer_addr(buf.index) + offset, &data[..n]);
        n
    }

    /// Publish a claimed buffer to the host (`PENDING → FULL`, token
    /// released), stamped with `address`, `length`, and this interface's
    /// next transmit sequence number (terminal-marked when `last`).
    pub fn commit_buffer(&mut self, buf: Outbound, address: u32, length: u32, last: bool) {
        pool::commit(
            self.mem,
            self.map,
            buf.index,
            self.index,
            self.tx_seq,
            address,
            length,
            last,
        );
    }
}
