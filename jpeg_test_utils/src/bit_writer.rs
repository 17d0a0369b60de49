// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Appends bits to a byte buffer, most significant bit of each byte first, the way a
/// JPEG encoder lays out its entropy-coded segment.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the low `num` bits of `value`, highest of those bits first.
    pub fn write_bits(&mut self, value: u32, num: usize) {
        assert!(num <= 32, "cannot write {num} bits at once");
        for shift in (0..num).rev() {
            self.write_bit(((value >> shift) & 1) as u8);
        }
    }

    pub fn write_bit(&mut self, bit: u8) {
        if self.bit_len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit != 0 {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Number of meaningful bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Fills the rest of the last byte with ones, as T.81 requires before a marker.
    /// The reported bit length is not changed.
    pub fn pad_with_ones(&mut self) {
        if self.bit_len % 8 != 0 {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0xff >> (self.bit_len % 8);
        }
    }

    /// Returns the buffer and the number of meaningful bits in it.
    pub fn finish(self) -> (Vec<u8>, usize) {
        (self.bytes, self.bit_len)
    }
}
