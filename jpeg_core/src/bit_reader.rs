// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use crate::error::{Error, Result};

pub const MAX_BITS_PER_CALL: usize = 32;

/// Reads bits from a sequence of bytes, most significant bit of each byte first.
///
/// The cursor carries an explicit bit-length bound, which may end in the middle of the
/// last byte. Every read is checked against it; nothing past the bound is ever
/// returned, not even as zeros.
#[derive(Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    bit_len: usize,
    position: usize,
}

impl Debug for BitCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitCursor{{ data: [{} bytes], bit_len: {}, position: {} }}",
            self.data.len(),
            self.bit_len,
            self.position,
        )
    }
}

impl<'a> BitCursor<'a> {
    /// Constructs a cursor covering every bit of `data`.
    pub fn new(data: &'a [u8]) -> BitCursor<'a> {
        BitCursor {
            data,
            bit_len: data.len() * 8,
            position: 0,
        }
    }

    /// Constructs a cursor over the first `bit_len` bits of `data`.
    /// ```
    /// # use jpeg_core::bit_reader::BitCursor;
    /// let mut br = BitCursor::with_bit_len(&[0b1010_0000], 3)?;
    /// assert_eq!(br.read_bits(3)?, 0b101);
    /// assert!(br.read_bit().is_err());
    /// assert!(BitCursor::with_bit_len(&[0], 9).is_err());
    /// # Ok::<(), jpeg_core::error::Error>(())
    /// ```
    pub fn with_bit_len(data: &'a [u8], bit_len: usize) -> Result<BitCursor<'a>> {
        if bit_len > data.len() * 8 {
            return Err(Error::InvalidBitLength {
                bit_len,
                bytes: data.len(),
            });
        }
        Ok(BitCursor {
            data,
            bit_len,
            position: 0,
        })
    }

    /// Returns the bit at absolute position `pos` without moving the cursor.
    pub fn bit_at(&self, pos: usize) -> Result<u8> {
        if pos >= self.bit_len {
            return Err(Error::StreamExhausted {
                position: pos,
                bit_len: self.bit_len,
            });
        }
        Ok((self.data[pos / 8] >> (7 - (pos % 8))) & 1)
    }

    /// Assembles `num` bits starting at `pos`, first bit in the most significant
    /// position, without moving the cursor.
    /// ```
    /// # use jpeg_core::bit_reader::BitCursor;
    /// let br = BitCursor::new(&[0b0000_0110, 0b1100_0000]);
    /// assert_eq!(br.read_bits_at(5, 5)?, 0b11011);
    /// assert_eq!(br.read_bits_at(0, 0)?, 0);
    /// assert!(br.read_bits_at(12, 5).is_err());
    /// # Ok::<(), jpeg_core::error::Error>(())
    /// ```
    pub fn read_bits_at(&self, pos: usize, num: usize) -> Result<u32> {
        if num > MAX_BITS_PER_CALL {
            return Err(Error::ReadTooLarge(num));
        }
        let mut value = 0u32;
        for offset in 0..num {
            value = (value << 1) | self.bit_at(pos + offset)? as u32;
        }
        Ok(value)
    }

    /// Reads one bit and advances past it.
    pub fn read_bit(&mut self) -> Result<u8> {
        let bit = self.bit_at(self.position)?;
        self.position += 1;
        Ok(bit)
    }

    /// Reads `num` bits MSB-first and advances past them. The cursor does not move if
    /// the read fails.
    /// ```
    /// # use jpeg_core::bit_reader::BitCursor;
    /// let mut br = BitCursor::new(&[0b1000_0001, 0xff]);
    /// assert_eq!(br.read_bits(1)?, 1);
    /// assert_eq!(br.read_bits(7)?, 1);
    /// assert_eq!(br.position(), 8);
    /// assert!(br.read_bits(9).is_err());
    /// assert_eq!(br.position(), 8);
    /// assert_eq!(br.read_bits(8)?, 0xff);
    /// # Ok::<(), jpeg_core::error::Error>(())
    /// ```
    pub fn read_bits(&mut self, num: usize) -> Result<u32> {
        let value = self.read_bits_at(self.position, num)?;
        self.position += num;
        Ok(value)
    }

    /// Returns the absolute position of the next bit to be read.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of bits that can still be read.
    pub fn bits_remaining(&self) -> usize {
        self.bit_len - self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.bit_len
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    #[test]
    fn msb_first_within_byte() {
        let br = BitCursor::new(&[0b1000_0000, 0b0000_0001]);
        assert_eq!(br.bit_at(0).unwrap(), 1);
        for pos in 1..15 {
            assert_eq!(br.bit_at(pos).unwrap(), 0, "bit {pos}");
        }
        assert_eq!(br.bit_at(15).unwrap(), 1);
    }

    #[test]
    fn bound_inside_last_byte() {
        let mut br = BitCursor::with_bit_len(&[0xff], 5).unwrap();
        assert_eq!(br.read_bits(5).unwrap(), 0b11111);
        assert!(br.is_exhausted());
        match br.read_bit() {
            Err(Error::StreamExhausted { position, bit_len }) => {
                assert_eq!(position, 5);
                assert_eq!(bit_len, 5);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn partial_read_fails_without_zero_fill() {
        // Three readable bits, asking for four must not pad with a zero.
        let mut br = BitCursor::with_bit_len(&[0b1110_0000], 3).unwrap();
        assert!(matches!(
            br.read_bits(4),
            Err(Error::StreamExhausted { position: 3, .. })
        ));
        assert_eq!(br.position(), 0);
        assert_eq!(br.bits_remaining(), 3);
    }

    #[test]
    fn empty_stream() {
        let mut br = BitCursor::new(&[]);
        assert!(br.is_exhausted());
        assert_eq!(br.read_bits(0).unwrap(), 0);
        assert!(br.read_bit().is_err());
    }

    #[test]
    fn read_too_large() {
        let br = BitCursor::new(&[0; 8]);
        assert!(matches!(br.read_bits_at(0, 33), Err(Error::ReadTooLarge(33))));
        assert_eq!(br.read_bits_at(0, 32).unwrap(), 0);
    }

    #[test]
    fn sequential_matches_positional() {
        arbtest::arbtest(|u| {
            let data: Vec<u8> = u.arbitrary()?;
            let mut br = BitCursor::new(&data);
            let reference = br.clone();
            while !br.is_exhausted() {
                let num = u.int_in_range(0..=br.bits_remaining().min(MAX_BITS_PER_CALL))?;
                let pos = br.position();
                assert_eq!(br.read_bits(num).unwrap(), reference.read_bits_at(pos, num).unwrap());
                if num == 0 && u.is_empty() {
                    break;
                }
            }
            Ok(())
        });
    }
}
