// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Magnitude categories: a coefficient is sent as its category `M` followed by `M`
//! raw bits, with negative values stored as `value + 2^M - 1`.

use crate::bit_reader::BitCursor;
use crate::error::{CoefficientKind, Error, Result};

/// Largest DC difference category for 8-bit samples.
pub const MAX_DC_MAGNITUDE: u8 = 11;
/// Largest AC coefficient category for 8-bit samples.
pub const MAX_AC_MAGNITUDE: u8 = 10;

/// Recovers the signed value of the `magnitude` raw bits `bits` (the EXTEND procedure
/// of T.81 F.2.2.1).
/// ```
/// # use jpeg_core::entropy_coding::magnitude::extend;
/// assert_eq!(extend(0, 0), 0);
/// assert_eq!(extend(0b0, 1), -1);
/// assert_eq!(extend(0b1, 1), 1);
/// assert_eq!(extend(0b010, 3), -5);
/// assert_eq!(extend(0b110, 3), 6);
/// ```
pub fn extend(bits: u32, magnitude: u8) -> i32 {
    if magnitude == 0 {
        return 0;
    }
    let value = bits as i32;
    if value < 1 << (magnitude - 1) {
        value - ((1 << magnitude) - 1)
    } else {
        value
    }
}

/// Number of bits needed to send `value`, i.e. its magnitude category.
pub fn magnitude_category(value: i32) -> u8 {
    (u32::BITS - value.unsigned_abs().leading_zeros()) as u8
}

/// Inverse of [`extend`]: returns the category of `value` and the raw bits that encode
/// it.
pub fn magnitude_bits(value: i32) -> (u8, u32) {
    let magnitude = magnitude_category(value);
    let bits = if value < 0 {
        (value + (1 << magnitude) - 1) as u32
    } else {
        value as u32
    };
    (magnitude, bits)
}

/// Checks `magnitude` against the range allowed for `kind`, then reads and extends its
/// raw bits.
pub fn read_extended(br: &mut BitCursor, kind: CoefficientKind, magnitude: u8) -> Result<i32> {
    let valid = match kind {
        CoefficientKind::Dc => magnitude <= MAX_DC_MAGNITUDE,
        CoefficientKind::Ac => (1..=MAX_AC_MAGNITUDE).contains(&magnitude),
    };
    if !valid {
        return Err(Error::InvalidMagnitude { kind, magnitude });
    }
    let bits = br.read_bits(magnitude as usize)?;
    Ok(extend(bits, magnitude))
}
