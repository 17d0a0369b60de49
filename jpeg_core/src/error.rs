// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

/// Which coefficient class a magnitude category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientKind {
    Dc,
    Ac,
}

impl std::fmt::Display for CoefficientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoefficientKind::Dc => write!(f, "DC"),
            CoefficientKind::Ac => write!(f, "AC"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // Huffman table errors
    #[error("Malformed Huffman table: {0}")]
    MalformedTable(&'static str),
    #[error(
        "Malformed Huffman table: {count} codes of length {length}, at most {} allowed",
        (1u32 << length) - 1
    )]
    OversubscribedLength { length: usize, count: u8 },
    #[error("Invalid Huffman table id {0}, must be below 4")]
    InvalidTableId(u8),
    // Entropy decoding errors
    #[error("Invalid Huffman code ending at bit {position}")]
    InvalidCode { position: usize },
    #[error("Invalid {kind} magnitude category {magnitude}")]
    InvalidMagnitude {
        kind: CoefficientKind,
        magnitude: u8,
    },
    #[error("Bitstream exhausted: read at bit {position}, stream is {bit_len} bits long")]
    StreamExhausted { position: usize, bit_len: usize },
    #[error("Zero run of {run} after {filled} coefficients exceeds the 64-entry block")]
    RunLengthOverflow { filled: usize, run: usize },
    #[error("Cannot read {0} bits at once, max is 32")]
    ReadTooLarge(usize),
    #[error("Bit length {bit_len} exceeds the {bytes}-byte buffer")]
    InvalidBitLength { bit_len: usize, bytes: usize },
    #[error("MCU {mcu}, component {component}: {source}")]
    Block {
        mcu: usize,
        component: usize,
        #[source]
        source: Box<Error>,
    },
    // Scan setup errors
    #[error("Invalid component count {0}, expected 1 or 3")]
    InvalidComponentCount(usize),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("No {kind} Huffman table with id {id}")]
    MissingHuffmanTable { kind: CoefficientKind, id: u8 },
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    // Generic arithmetic overflow. Prefer using other errors if possible.
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl Error {
    /// True for every way a Huffman table can be rejected before decoding starts.
    pub fn is_malformed_table(&self) -> bool {
        matches!(
            self,
            Error::MalformedTable(_) | Error::OversubscribedLength { .. }
        )
    }

    /// Strips the MCU/component context added by the scan driver.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Block { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn in_block(self, mcu: usize, component: usize) -> Error {
        Error::Block {
            mcu,
            component,
            source: Box::new(self),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
