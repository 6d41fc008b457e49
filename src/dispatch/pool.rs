//! The four buffer-pool primitives.
//!
//! Producers claim and fill descriptors; consumers drain and release them.
//! Which agent plays which role depends on the command's data direction;
//! the primitives are symmetric, and the host runs the mirror image of this
//! code. Every ownership-publishing write (a `FULL`/`FREE` transition or a
//! token flip) happens behind a barrier so the other agent observes payload
//! writes first.

use log::*;

use crate::common::{BufferStatus, MemMap, Token};
use crate::mem::SharedMem;
use crate::protocol::bdt;

/// Claim a free target-owned descriptor for `iface`: `FREE → PENDING`.
/// Returns the descriptor index, or `None` if the host currently holds
/// every free buffer.
pub(crate) fn acquire(mem: &mut dyn SharedMem, map: &MemMap, iface: u8) -> Option<u8> {
    for i in 0..map.num_buffers {
        let base = map.bdt_addr(i);
        if bdt::read_token(mem, base) != Some(Token::Target) {
            continue;
        }
        mem.barrier();
        if bdt::read_status(mem, base) != Some(BufferStatus::Free) {
            continue;
        }
        bdt::write_status(mem, base, BufferStatus::Pending);
        bdt::write_interface(mem, base, iface);
        trace!("bdt {}: acquired by iface {}", i, iface);
        return Some(i);
    }
    None
}

/// Publish a pending descriptor to the host: `PENDING → FULL`, token
/// handed over. `tx_seq` advances mod 128 unless this was the terminal
/// buffer.
pub(crate) fn commit(
    mem: &mut dyn SharedMem,
    map: &MemMap,
    index: u8,
    iface: u8,
    tx_seq: &mut u8,
    address: u32,
    length: u32,
    last: bool,
) {
    let base = map.bdt_addr(index);
    let seq = if last {
        *tx_seq | bdt::SEQ_LAST
    } else {
        *tx_seq
    };
    bdt::write_status(mem, base, BufferStatus::Full);
    bdt::write_interface(mem, base, iface);
    bdt::write_sequence(mem, base, seq);
    bdt::write_address(mem, base, address);
    bdt::write_length(mem, base, length);
    mem.barrier();
    bdt::write_token(mem, base, Token::Host);
    trace!(
        "bdt {}: committed by iface {} (seq {:#04x}, {} bytes @ {:#010x})",
        index,
        iface,
        seq,
        length,
        address
    );
    if !last {
        *tx_seq = (*tx_seq + 1) & bdt::SEQ_MASK;
    }
}

/// Find the next full buffer addressed to `iface`, in stream order.
///
/// Two scan passes: first an exact match on `rx_seq`, then any
/// terminal-marked buffer. The second pass lets a lone terminal buffer be
/// accepted out of sequence (its sequence bits are not trustworthy), while
/// the first guarantees it can never jump ahead of an in-order buffer that
/// is already waiting.
///
/// On success returns `(index, address, length, last)` and advances
/// `rx_seq` (to the `0x80` end-of-stream sentinel when `last`).
pub(crate) fn next_full(
    mem: &mut dyn SharedMem,
    map: &MemMap,
    iface: u8,
    rx_seq: &mut u8,
) -> Option<(u8, u32, u32, bool)> {
    let found = scan_full(mem, map, iface, *rx_seq, false)
        .or_else(|| scan_full(mem, map, iface, *rx_seq, true))?;

    let (index, seq) = found;
    let base = map.bdt_addr(index);
    let last = seq & bdt::SEQ_LAST != 0;
    let address = bdt::read_address(mem, base);
    let length = bdt::read_length(mem, base);
    *rx_seq = if last {
        bdt::SEQ_LAST
    } else {
        (*rx_seq + 1) & bdt::SEQ_MASK
    };
    trace!(
        "bdt {}: consumed by iface {} (seq {:#04x}, {} bytes @ {:#010x})",
        index,
        iface,
        seq,
        length,
        address
    );
    Some((index, address, length, last))
}

fn scan_full(
    mem: &mut dyn SharedMem,
    map: &MemMap,
    iface: u8,
    rx_seq: u8,
    terminal: bool,
) -> Option<(u8, u8)> {
    for i in 0..map.num_buffers {
        let base = map.bdt_addr(i);
        if bdt::read_token(mem, base) != Some(Token::Target) {
            continue;
        }
        mem.barrier();
        if bdt::read_status(mem, base) != Some(BufferStatus::Full) {
            continue;
        }
        if bdt::read_interface(mem, base) != iface {
            continue;
        }
        let seq = bdt::read_sequence(mem, base);
        let hit = if terminal {
            seq & bdt::SEQ_LAST != 0
        } else {
            seq == rx_seq
        };
        if hit {
            return Some((i, seq));
        }
    }
    None
}

/// Return a consumed descriptor to the host: `FULL → FREE`, token handed
/// over.
pub(crate) fn release(mem: &mut dyn SharedMem, map: &MemMap, index: u8) {
    let base = map.bdt_addr(index);
    bdt::write_status(mem, base, BufferStatus::Free);
    mem.barrier();
    bdt::write_token(mem, base, Token::Host);
    trace!("bdt {}: released", index);
}

/// Whether any descriptor is still target-held and non-free on behalf of
/// `iface`. Used at completion time to detect leaked buffers.
pub(crate) fn iface_holds_buffers(mem: &mut dyn SharedMem, map: &MemMap, iface: u8) -> bool {
    for i in 0..map.num_buffers {
        let base = map.bdt_addr(i);
        if bdt::read_token(mem, base) != Some(Token::Target) {
            continue;
        }
        mem.barrier();
        match bdt::read_status(mem, base) {
            Some(BufferStatus::Free) | None => {}
            Some(_) => {
                if bdt::read_interface(mem, base) == iface {
                    return true;
                }
            }
        }
    }
    false
}
