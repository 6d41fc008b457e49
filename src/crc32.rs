//! CRC-32 helper for verify/checksum commands.
//!
//! Hosts compare `PROG_VERIFY`/`CRC` results against a locally computed
//! CRC-32, so every driver must use the same algorithm: polynomial
//! `0xEDB88320` (bit-reflected), initial value `!0`, final XOR `!0`, i.e.
//! the ubiquitous zlib/IEEE variant.

use crc::{Crc, CRC_32_ISO_HDLC};

static ALGORITHM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// One-shot CRC-32 of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    ALGORITHM.checksum(data)
}

/// Streaming CRC-32, for commands that consume data one buffer at a time.
pub struct Crc32 {
    digest: crc::Digest<'static, u32>,
}

impl Crc32 {
    /// Start a fresh digest.
    pub fn new() -> Crc32 {
        Crc32 {
            digest: ALGORITHM.digest(),
        }
    }

    /// Feed `data` into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Finish and return the checksum.
    pub fn finalize(self) -> u32 {
        self.digest.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Crc32 {
        Crc32::new()
    }
}
