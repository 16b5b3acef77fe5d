//! Consistent Overhead Byte Stuffing with zero-pair and zero-run elimination.
//!
//! Stuffed output never contains a zero byte, so a single `0x00` can delimit
//! frames on the wire. Each block starts with one code byte:
//!
//! ```text
//! 0x01..=0xD1   n-1 literal bytes, then one zero
//! 0xD2          209 literal bytes, no zero
//! 0xD3..=0xDF   3..=15 zeros, no literals
//! 0xE0..=0xFF   0..=31 literal bytes, then two zeros
//! ```
//!
//! The encoder always terminates its input with one implicit zero, which the
//! decoder drops again. An empty input therefore stuffs to `[0x01]`.

use crate::error::StuffingError;

type Result<T> = std::result::Result<T, StuffingError>;

const DIFF_ZERO: u8 = 0x01;
const DIFF: u8 = 0xD2;
const RUN_ZERO: u8 = 0xD3;
const RUN_ZERO_MAX: u8 = 0xDF;
const DIFF_2_ZERO: u8 = 0xE0;

/// Offset from a single-zero code to the matching double-zero code.
const CONVERT_ZP: u8 = DIFF_2_ZERO - DIFF_ZERO;

/// Highest single-zero code that still has a double-zero form.
const MAX_CONVERTIBLE: u8 = 0xFF - CONVERT_ZP;

/// Longest run of literal bytes in one block.
pub const MAX_BLOCK_LITERALS: usize = (DIFF - 1) as usize;

/// Worst-case stuffed size for `size` input bytes.
pub const fn max_stuffed_size(size: usize) -> usize {
    size + size / 208 + 1
}

fn is_run_zero(code: u8) -> bool {
    (RUN_ZERO..=RUN_ZERO_MAX).contains(&code)
}

fn is_diff_2_zero(code: u8) -> bool {
    code >= DIFF_2_ZERO
}

/// Incremental stuffing encoder writing into a caller-supplied buffer.
///
/// A frame built from several pieces (payload, sequence number, checksum) is
/// streamed through one encoder without first concatenating the pieces.
///
/// ```
/// use uavcom_frame::stuffing::{decode, max_stuffed_size, Encoder};
///
/// let mut out = [0u8; max_stuffed_size(5)];
/// let mut enc = Encoder::start(5, &mut out).unwrap();
/// enc.feed_block(b"ab");
/// enc.feed_block(&[0, 0, b'c']);
/// let len = enc.finalize().unwrap();
///
/// let mut back = [0u8; 5];
/// let n = decode(&out[..len], &mut back).unwrap();
/// assert_eq!(&back[..n], b"ab\0\0c");
/// ```
pub struct Encoder<'a> {
    out: &'a mut [u8],
    code: u8,
    code_pos: usize,
    pos: usize,
    overflow: bool,
}

impl<'a> Encoder<'a> {
    /// Begin encoding `size_in` bytes into `out`.
    ///
    /// Fails if `out` cannot hold the worst case for `size_in` bytes.
    pub fn start(size_in: usize, out: &'a mut [u8]) -> Result<Self> {
        let required = max_stuffed_size(size_in);
        if out.len() < required {
            return Err(StuffingError::NotEnoughMemory { required });
        }
        Ok(Self {
            out,
            code: DIFF_ZERO,
            code_pos: 0,
            pos: 1,
            overflow: false,
        })
    }

    /// Feed one input byte.
    pub fn feed(&mut self, byte: u8) {
        if byte == 0 {
            if is_run_zero(self.code) && self.code < RUN_ZERO_MAX {
                self.code += 1;
            } else if self.code == DIFF_2_ZERO {
                self.code = RUN_ZERO;
            } else if self.code <= MAX_CONVERTIBLE {
                self.code += CONVERT_ZP;
            } else {
                self.close_block(self.code);
            }
            return;
        }

        if is_diff_2_zero(self.code) {
            self.close_block(self.code - CONVERT_ZP);
        } else if self.code == RUN_ZERO {
            self.close_block(DIFF_2_ZERO);
        } else if is_run_zero(self.code) {
            self.close_block(self.code - 1);
        }

        self.put(self.pos, byte);
        self.pos += 1;

        self.code += 1;
        if self.code == DIFF {
            self.close_block(DIFF);
        }
    }

    /// Feed a slice of input bytes.
    pub fn feed_block(&mut self, data: &[u8]) {
        for &byte in data {
            self.feed(byte);
        }
    }

    /// Flush the open block and return the stuffed length.
    ///
    /// Fails if more bytes were fed than the output buffer could take.
    pub fn finalize(mut self) -> Result<usize> {
        self.put(self.code_pos, self.code);
        if self.overflow {
            return Err(StuffingError::NotEnoughMemory { required: self.pos });
        }
        Ok(self.pos)
    }

    fn close_block(&mut self, code: u8) {
        self.put(self.code_pos, code);
        self.code_pos = self.pos;
        self.pos += 1;
        self.code = DIFF_ZERO;
    }

    fn put(&mut self, idx: usize, byte: u8) {
        match self.out.get_mut(idx) {
            Some(slot) => *slot = byte,
            None => self.overflow = true,
        }
    }
}

/// Stuff `input` into `out`, returning the number of bytes written.
pub fn encode(input: &[u8], out: &mut [u8]) -> Result<usize> {
    let mut enc = Encoder::start(input.len(), out)?;
    enc.feed_block(input);
    enc.finalize()
}

/// Unstuff `input` into `out`, returning the decoded length.
///
/// Never writes past `out`. If the decoded data does not fit, the error
/// carries the length that would have been produced.
pub fn decode(input: &[u8], out: &mut [u8]) -> Result<usize> {
    if input.is_empty() {
        return Err(StuffingError::EmptyInput);
    }

    // Counts the implicit trailing zero as well.
    let mut total = 0usize;
    let mut i = 0usize;

    while i < input.len() {
        let code = input[i];
        let (literals, zeros) = match code {
            0 => return Err(StuffingError::InvalidCode { offset: i }),
            DIFF => (MAX_BLOCK_LITERALS, 0),
            RUN_ZERO..=RUN_ZERO_MAX => (0, usize::from(code & 0x0F)),
            DIFF_2_ZERO..=0xFF => (usize::from(code & 0x1F), 2),
            _ => (usize::from(code) - 1, 1),
        };
        i += 1;

        let block = input
            .get(i..i + literals)
            .ok_or(StuffingError::Truncated)?;
        i += literals;

        for &byte in block {
            if let Some(slot) = out.get_mut(total) {
                *slot = byte;
            }
            total += 1;
        }
        for _ in 0..zeros {
            if let Some(slot) = out.get_mut(total) {
                *slot = 0;
            }
            total += 1;
        }
    }

    let written = total.saturating_sub(1);
    if written > out.len() {
        return Err(StuffingError::NotEnoughMemory { required: written });
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stuff(input: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; max_stuffed_size(input.len())];
        let n = encode(input, &mut out).unwrap();
        out.truncate(n);
        out
    }

    fn unstuff(input: &[u8], cap: usize) -> Vec<u8> {
        let mut out = vec![0u8; cap];
        let n = decode(input, &mut out).unwrap();
        out.truncate(n);
        out
    }

    fn roundtrip(input: &[u8]) {
        let stuffed = stuff(input);
        assert!(
            !stuffed.contains(&0),
            "stuffed output contains zero for {input:?}"
        );
        assert!(stuffed.len() <= max_stuffed_size(input.len()));
        assert_eq!(unstuff(&stuffed, input.len()), input);
    }

    #[test]
    fn empty_input_is_single_code() {
        assert_eq!(stuff(&[]), vec![0x01]);
        assert_eq!(unstuff(&[0x01], 0), Vec::<u8>::new());
    }

    #[test]
    fn known_encodings() {
        assert_eq!(stuff(&[0x11, 0x22]), vec![0x03, 0x11, 0x22]);
        assert_eq!(stuff(&[0x11, 0x00, 0x22]), vec![0x02, 0x11, 0x02, 0x22]);
        // one literal then two zeros collapse into a zero-pair code
        assert_eq!(stuff(&[0x11, 0x00, 0x00, 0x22]), vec![0xE1, 0x11, 0x02, 0x22]);
        assert_eq!(stuff(&[0x00]), vec![0xE0]);
        assert_eq!(stuff(&[0x00, 0x00]), vec![0xD3]);
        assert_eq!(stuff(&[0x00, 0x00, 0x00, 0x00]), vec![0xD5]);
    }

    #[test]
    fn roundtrip_small_patterns() {
        roundtrip(&[]);
        roundtrip(&[0]);
        roundtrip(&[0, 0]);
        roundtrip(&[1]);
        roundtrip(&[1, 0]);
        roundtrip(&[0, 1]);
        roundtrip(&[1, 0, 0, 1]);
        roundtrip(&[1, 0, 0, 0, 1]);
        roundtrip(b"hello\0world\0\0\0\0\0!");
    }

    #[test]
    fn roundtrip_all_zero_lengths() {
        for len in 0..64 {
            roundtrip(&vec![0u8; len]);
        }
    }

    #[test]
    fn roundtrip_long_literal_runs() {
        for len in [207, 208, 209, 210, 418, 419, 600] {
            let input: Vec<u8> = (0..len).map(|i| (i % 255) as u8 + 1).collect();
            roundtrip(&input);
        }
    }

    #[test]
    fn roundtrip_literals_around_zero_pair_limit() {
        for literals in 28..36 {
            let mut input = vec![0xAAu8; literals];
            input.extend_from_slice(&[0, 0, 0xBB]);
            roundtrip(&input);
        }
    }

    #[test]
    fn roundtrip_mixed_content() {
        let input: Vec<u8> = (0..1000u32)
            .map(|i| match i % 7 {
                0 | 3 => 0,
                _ => (i.wrapping_mul(31) % 256) as u8,
            })
            .collect();
        roundtrip(&input);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let parts: [&[u8]; 3] = [b"\x01\x00\x02", &[0, 0, 0], b"\xff\x00"];
        let whole: Vec<u8> = parts.concat();

        let mut out = vec![0u8; max_stuffed_size(whole.len())];
        let mut enc = Encoder::start(whole.len(), &mut out).unwrap();
        for part in parts {
            enc.feed_block(part);
        }
        let n = enc.finalize().unwrap();

        assert_eq!(&out[..n], stuff(&whole).as_slice());
    }

    #[test]
    fn encode_rejects_small_output() {
        let mut out = [0u8; 4];
        let err = encode(&[1, 2, 3, 4], &mut out).unwrap_err();
        assert_eq!(err, StuffingError::NotEnoughMemory { required: 5 });
    }

    #[test]
    fn encoder_detects_overfeeding() {
        let mut out = [0u8; 3];
        let mut enc = Encoder::start(2, &mut out).unwrap();
        enc.feed_block(&[1, 2, 3, 4]);
        assert!(matches!(
            enc.finalize(),
            Err(StuffingError::NotEnoughMemory { .. })
        ));
    }

    #[test]
    fn decode_reports_required_size() {
        let stuffed = stuff(&[7u8; 10]);
        let mut out = [0u8; 4];
        let err = decode(&stuffed, &mut out).unwrap_err();
        assert_eq!(err, StuffingError::NotEnoughMemory { required: 10 });
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let mut out = [0u8; 32];
        assert_eq!(decode(&[], &mut out), Err(StuffingError::EmptyInput));
        assert_eq!(decode(&[0x05, 1, 2], &mut out), Err(StuffingError::Truncated));
        assert_eq!(
            decode(&[0x02, 1, 0x00], &mut out),
            Err(StuffingError::InvalidCode { offset: 2 })
        );
    }
}
