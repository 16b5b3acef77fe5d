//! Frame checksum.
//!
//! Both ends of the link use CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF,
//! no reflection, no final xor). The algorithm is a fixed protocol parameter.

use crc::{Crc, Digest, CRC_16_IBM_3740};

static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Checksum of a single byte range.
pub fn checksum(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Running checksum fed one byte range at a time.
///
/// Feeding `a` then `b` yields the same value as [`checksum`] over `a ‖ b`.
pub struct Checksum {
    digest: Digest<'static, u16>,
}

impl Checksum {
    pub fn new() -> Self {
        Self {
            digest: CRC16.digest(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    pub fn finalize(self) -> u16 {
        self.digest.finalize()
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}
