// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod dct;
pub mod dct_slow;

pub use dct::{idct8x8, level_shift};
