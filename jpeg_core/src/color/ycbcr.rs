// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Full-range BT.601 YCbCr to RGB, as defined by JFIF (T.871 clause 7), in 16-bit fixed
//! point.

use crate::{
    BLOCK_SIZE, SampleBlock,
    error::{Error, Result},
};

const FIX_BITS: u32 = 16;
const ROUND: i32 = 1 << (FIX_BITS - 1);
// Constants scaled by 2^16 and rounded.
const CR_TO_R: i32 = 91881; // 1.402
const CB_TO_G: i32 = 22554; // 0.344136
const CR_TO_G: i32 = 46802; // 0.714136
const CB_TO_B: i32 = 116130; // 1.772

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTransform {
    /// Luma only, replicated into every output channel.
    Grayscale,
    YCbCr,
}

impl ColorTransform {
    /// Picks the transform for a scan with `num_components` components. A single
    /// component is always grayscale; three are converted unless `force_grayscale`.
    pub fn for_components(num_components: usize, force_grayscale: bool) -> Result<ColorTransform> {
        match num_components {
            1 => Ok(ColorTransform::Grayscale),
            3 if force_grayscale => Ok(ColorTransform::Grayscale),
            3 => Ok(ColorTransform::YCbCr),
            n => Err(Error::InvalidComponentCount(n)),
        }
    }
}

impl std::fmt::Display for ColorTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorTransform::Grayscale => write!(f, "grayscale"),
            ColorTransform::YCbCr => write!(f, "YCbCr to RGB"),
        }
    }
}

/// Clamps to the 8-bit sample range.
#[inline]
pub fn saturate(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Products of full-range i16 chroma with the 2^16 scaled constants need more than 32 bits.
#[inline]
fn scaled(factor: i32, value: i32) -> i32 {
    ((factor as i64 * value as i64 + ROUND as i64) >> FIX_BITS) as i32
}

/// ```
/// # use jpeg_core::color::ycbcr::ycbcr_to_rgb;
/// assert_eq!(ycbcr_to_rgb(128, 128, 128), [128, 128, 128]);
/// assert_eq!(ycbcr_to_rgb(255, 128, 255), [255, 164, 255]);
/// assert_eq!(ycbcr_to_rgb(0, 0, 0), [0, 135, 0]);
/// ```
pub fn ycbcr_to_rgb(y: i16, cb: i16, cr: i16) -> [u8; 3] {
    let y = y as i32;
    let cb = cb as i32 - 128;
    let cr = cr as i32 - 128;
    [
        saturate(y + scaled(CR_TO_R, cr)),
        saturate(y - scaled(CB_TO_G, cb) - scaled(CR_TO_G, cr)),
        saturate(y + scaled(CB_TO_B, cb)),
    ]
}

/// Converts one pixel with `transform`. Chroma is ignored for [`ColorTransform::Grayscale`].
pub fn convert_pixel(transform: ColorTransform, y: i16, cb: i16, cr: i16) -> [u8; 3] {
    match transform {
        ColorTransform::Grayscale => [saturate(y as i32); 3],
        ColorTransform::YCbCr => ycbcr_to_rgb(y, cb, cr),
    }
}

/// Saturates a luma block in place.
pub fn convert_luma_block_in_place(y: &mut SampleBlock) {
    for sample in y.iter_mut() {
        *sample = saturate(*sample as i32) as i16;
    }
}

/// Converts the co-sited blocks of one MCU in place, writing R, G and B back into the
/// Y, Cb and Cr blocks respectively.
pub fn convert_block_in_place(
    transform: ColorTransform,
    y: &mut SampleBlock,
    cb: &mut SampleBlock,
    cr: &mut SampleBlock,
) {
    for i in 0..BLOCK_SIZE {
        let [r, g, b] = convert_pixel(transform, y[i], cb[i], cr[i]);
        y[i] = r as i16;
        cb[i] = g as i16;
        cr[i] = b as i16;
    }
}
