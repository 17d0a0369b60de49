// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Reference 8x8 transforms evaluated straight from their definition, O(N^4).

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::{BLOCK_DIM, BLOCK_SIZE};

#[inline(always)]
pub(crate) fn alpha(u: usize) -> f64 {
    if u == 0 { FRAC_1_SQRT_2 } else { 1.0 }
}

#[inline(always)]
pub(crate) fn basis(spatial: usize, freq: usize) -> f64 {
    ((2 * spatial + 1) as f64 * freq as f64 * PI / (2 * BLOCK_DIM) as f64).cos()
}

/// `f(x, y) = 1/4 sum_u sum_v C(u) C(v) F(u, v) cos((2x+1)u pi/16) cos((2y+1)v pi/16)`.
///
/// Coefficients are indexed `v * 8 + u`, samples `y * 8 + x`.
pub fn idct8x8_slow(coefficients: &[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE] {
    let mut out = [0.0; BLOCK_SIZE];
    for y in 0..BLOCK_DIM {
        for x in 0..BLOCK_DIM {
            let mut sum = 0.0;
            for v in 0..BLOCK_DIM {
                for u in 0..BLOCK_DIM {
                    sum += alpha(u)
                        * alpha(v)
                        * coefficients[v * BLOCK_DIM + u]
                        * basis(x, u)
                        * basis(y, v);
                }
            }
            out[y * BLOCK_DIM + x] = sum / 4.0;
        }
    }
    out
}

/// Forward transform matching [`idct8x8_slow`], so that the two are exact inverses.
pub fn dct8x8_slow(samples: &[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE] {
    let mut out = [0.0; BLOCK_SIZE];
    for v in 0..BLOCK_DIM {
        for u in 0..BLOCK_DIM {
            let mut sum = 0.0;
            for y in 0..BLOCK_DIM {
                for x in 0..BLOCK_DIM {
                    sum += samples[y * BLOCK_DIM + x] * basis(x, u) * basis(y, v);
                }
            }
            out[v * BLOCK_DIM + u] = alpha(u) * alpha(v) * sum / 4.0;
        }
    }
    out
}
