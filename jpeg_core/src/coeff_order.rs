// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::{BLOCK_DIM, BLOCK_SIZE, Block};

/// Natural (row-major) position of each zigzag index.
pub const ZIGZAG_TO_NATURAL: [usize; BLOCK_SIZE] = natural_coeff_order();

/// Zigzag index of each natural position.
pub const NATURAL_TO_ZIGZAG: [usize; BLOCK_SIZE] = {
    let mut out = [0; BLOCK_SIZE];
    let mut k = 0;
    while k < BLOCK_SIZE {
        out[ZIGZAG_TO_NATURAL[k]] = k;
        k += 1;
    }
    out
};

/// Walks the anti-diagonals of the block, alternating direction, first the upper-left
/// triangle and then the lower-right one.
pub const fn natural_coeff_order() -> [usize; BLOCK_SIZE] {
    let mut out = [0; BLOCK_SIZE];
    let mut cur = 0;
    let mut i = 0;
    while i < BLOCK_DIM {
        let mut j = 0;
        while j <= i {
            let (x, y) = if i % 2 != 0 { (i - j, j) } else { (j, i - j) };
            out[cur] = y * BLOCK_DIM + x;
            cur += 1;
            j += 1;
        }
        i += 1;
    }
    let mut ir = 1;
    while ir < BLOCK_DIM {
        let i = BLOCK_DIM - ir - 1;
        let mut j = 0;
        while j <= i {
            let a = BLOCK_DIM - 1 - (i - j);
            let b = BLOCK_DIM - 1 - j;
            let (x, y) = if i % 2 != 0 { (b, a) } else { (a, b) };
            out[cur] = y * BLOCK_DIM + x;
            cur += 1;
            j += 1;
        }
        ir += 1;
    }
    out
}

/// Reorders a block from zigzag to natural order.
/// ```
/// # use jpeg_core::coeff_order::dezigzag;
/// let mut zigzag = [0i16; 64];
/// zigzag[2] = 7;
/// let natural = dezigzag(&zigzag);
/// // Zigzag index 2 is row 1, column 0.
/// assert_eq!(natural[8], 7);
/// ```
pub fn dezigzag(block: &Block) -> Block {
    let mut out = [0; BLOCK_SIZE];
    for (k, &coeff) in block.iter().enumerate() {
        out[ZIGZAG_TO_NATURAL[k]] = coeff;
    }
    out
}

pub fn dezigzag_in_place(block: &mut Block) {
    *block = dezigzag(block);
}

/// Reorders a block from natural to zigzag order.
pub fn zigzag(block: &Block) -> Block {
    std::array::from_fn(|k| block[ZIGZAG_TO_NATURAL[k]])
}
