// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Entropy decoding and block reconstruction for baseline (sequential, Huffman coded)
//! JPEG scans.
//!
//! The crate starts where marker parsing ends: it receives the entropy-coded segment,
//! the DHT tables and the per-component table assignments, and produces coefficient
//! blocks, spatial blocks and finally RGB or grayscale samples.
//!
//! ```
//! use jpeg_core::decode::{
//!     DecodeOptions, HuffmanTables, ScanComponent, ScanInput, Unscaled, decode_scan,
//!     reconstruct,
//! };
//! use jpeg_core::entropy_coding::huffman::HuffmanTable;
//!
//! // One code of length 1 in each table: DC category 0 and EOB.
//! let mut counts = [0u8; 16];
//! counts[0] = 1;
//! let mut tables = HuffmanTables::default();
//! tables.set_dc(0, HuffmanTable::new(counts, vec![0x00])?)?;
//! tables.set_ac(0, HuffmanTable::new(counts, vec![0x00])?)?;
//!
//! let data = [0b0000_0000];
//! let scan = ScanInput {
//!     data: &data,
//!     bit_len: 2,
//!     width: 8,
//!     height: 8,
//!     components: vec![ScanComponent::new(0, 0)],
//!     tables: &tables,
//! };
//! let planes = decode_scan(&scan)?;
//! assert!(planes.block(0, 0).iter().all(|&c| c == 0));
//!
//! let image = reconstruct(&planes, &Unscaled, &DecodeOptions::default())?;
//! assert_eq!(image.to_interleaved(), vec![128u8; 64]);
//! # Ok::<(), jpeg_core::error::Error>(())
//! ```

#![deny(unsafe_code)]
pub mod bit_reader;
pub mod coeff_order;
pub mod color;
pub mod decode;
pub mod entropy_coding;
pub mod error;
pub mod util;
pub mod var_dct;

pub const BLOCK_DIM: usize = 8;
pub const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;

/// 64 quantized coefficients of one 8x8 block. Zigzag order as decoded, natural
/// (row-major) order after [`coeff_order::dezigzag`].
pub type Block = [i16; BLOCK_SIZE];

/// 64 spatial-domain samples of one 8x8 block, row-major.
pub type SampleBlock = [i16; BLOCK_SIZE];
