//! Traits to access the shared RAM regions the protocol lives in.

mod impls;

pub use impls::{RawMem, SliceMem};

/// Byte-level access to the target RAM shared with the host, plus the
/// barrier primitive every ownership hand-off is published behind.
///
/// Addresses are the same 32-bit target addresses the wire format carries,
/// so `QUERY_CAP` can report region bases without translation.
///
/// The crate ships two implementations: [`SliceMem`] (an ordinary byte
/// slice, for hosted simulation and tests) and [`RawMem`] (volatile access
/// to absolute addresses, for real targets).
pub trait SharedMem {
    /// Read one byte from `addr`.
    fn read_u8(&self, addr: u32) -> u8;

    /// Write one byte to `addr`.
    fn write_u8(&mut self, addr: u32, val: u8);

    /// Read a little-endian `u32` from `addr`.
    ///
    /// The default implementation composes four byte reads; override it if
    /// the platform can issue an aligned word access instead.
    fn read_u32(&self, addr: u32) -> u32 {
        let mut bytes = [0; 4];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = self.read_u8(addr + i as u32);
        }
        u32::from_le_bytes(bytes)
    }

    /// Write a little-endian `u32` to `addr`.
    fn write_u32(&mut self, addr: u32, val: u32) {
        for (i, b) in val.to_le_bytes().iter().enumerate() {
            self.write_u8(addr + i as u32, *b);
        }
    }

    /// Copy `buf.len()` bytes out of shared memory starting at `addr`.
    ///
    /// This method's default implementation calls `read_u8` per byte, which
    /// can be quite slow for buffer payloads; implementations backed by
    /// ordinary memory should override it with a bulk copy.
    fn read_bytes(&self, addr: u32, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_u8(addr + i as u32);
        }
    }

    /// Copy `data` into shared memory starting at `addr`.
    fn write_bytes(&mut self, addr: u32, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.write_u8(addr + i as u32, *b);
        }
    }

    /// Full memory barrier.
    ///
    /// Called between payload writes and the ownership write that publishes
    /// them (release), and between an ownership read and the payload reads
    /// that depend on it (acquire). On ARM targets this should be the
    /// strongest sequence available (`DMB; DSB; ISB`); on hosted platforms a
    /// compiler fence is sufficient because both agents are simulated in one
    /// address space.
    fn barrier(&mut self);
}
