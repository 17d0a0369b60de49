// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::sync::OnceLock;

use super::dct_slow::{alpha, basis};
use crate::{BLOCK_DIM, BLOCK_SIZE, SampleBlock};

/// `COSINES[freq][spatial] = C(freq) / 2 * cos((2 spatial + 1) freq pi / 16)`.
type CosineTable = [[f64; BLOCK_DIM]; BLOCK_DIM];

fn cosines() -> &'static CosineTable {
    static COSINES: OnceLock<CosineTable> = OnceLock::new();
    COSINES.get_or_init(|| {
        std::array::from_fn(|freq| std::array::from_fn(|n| alpha(freq) / 2.0 * basis(n, freq)))
    })
}

/// Separable 8x8 inverse DCT: one 1D pass over the rows, then one over the columns.
/// Same layout and scaling as [`super::dct_slow::idct8x8_slow`].
pub fn idct8x8(coefficients: &[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE] {
    let table = cosines();
    let mut rows = [0.0; BLOCK_SIZE];
    for v in 0..BLOCK_DIM {
        let input = &coefficients[v * BLOCK_DIM..(v + 1) * BLOCK_DIM];
        for x in 0..BLOCK_DIM {
            rows[v * BLOCK_DIM + x] = (0..BLOCK_DIM).map(|u| table[u][x] * input[u]).sum();
        }
    }
    let mut out = [0.0; BLOCK_SIZE];
    for y in 0..BLOCK_DIM {
        for x in 0..BLOCK_DIM {
            out[y * BLOCK_DIM + x] = (0..BLOCK_DIM)
                .map(|v| table[v][y] * rows[v * BLOCK_DIM + x])
                .sum();
        }
    }
    out
}

/// Adds 128 and rounds to the nearest integer. Results outside the i16 range, which
/// only a scaler can produce, saturate at its ends; clamping to 8 bits happens in the
/// color converter.
/// ```
/// # use jpeg_core::var_dct::level_shift;
/// let mut samples = [0.0; 64];
/// samples[0] = -128.4;
/// samples[1] = 127.6;
/// let shifted = level_shift(&samples);
/// assert_eq!(shifted[0], 0);
/// assert_eq!(shifted[1], 256);
/// assert_eq!(shifted[2], 128);
/// ```
pub fn level_shift(samples: &[f64; BLOCK_SIZE]) -> SampleBlock {
    samples.map(|s| {
        (s + 128.0)
            .round()
            .clamp(i16::MIN as f64, i16::MAX as f64) as i16
    })
}
