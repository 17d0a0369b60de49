// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Sequential (baseline) decoding of the 64 coefficients of each block.

use crate::{
    BLOCK_SIZE, Block,
    bit_reader::BitCursor,
    entropy_coding::{huffman::HuffmanTree, magnitude::read_extended},
    error::{CoefficientKind, Error, Result},
    util::tracing_wrappers::*,
};

/// End of block: every remaining coefficient is zero.
pub const EOB: u8 = 0x00;
/// Zero run length: sixteen zero coefficients (run 15 followed by a zero of size 0).
pub const ZRL: u8 = 0xf0;
const ZRL_RUN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    AwaitDcLeaf,
    AwaitAcLeaf,
    HandleEob,
    HandleZrl,
    HandleValue { run: u8, magnitude: u8 },
    Complete,
}

fn after_ac(filled: usize) -> DecodeState {
    if filled == BLOCK_SIZE {
        DecodeState::Complete
    } else {
        DecodeState::AwaitAcLeaf
    }
}

/// The DC and AC trees a component was assigned in the scan header.
#[derive(Debug, Clone, Copy)]
pub struct ComponentTrees<'a> {
    pub dc: &'a HuffmanTree,
    pub ac: &'a HuffmanTree,
}

/// Decodes blocks in scan order, carrying the DC predictor of every component.
///
/// The cursor is owned by the caller and shared by all blocks of the scan: each block
/// starts exactly where the previous one ended.
#[derive(Debug)]
pub struct McuDecoder<'a> {
    components: Vec<ComponentTrees<'a>>,
    dc_predictors: Vec<i32>,
}

impl<'a> McuDecoder<'a> {
    pub fn new(components: Vec<ComponentTrees<'a>>) -> McuDecoder<'a> {
        let dc_predictors = vec![0; components.len()];
        McuDecoder {
            components,
            dc_predictors,
        }
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// The last absolute DC value decoded for `component` (0 before its first block).
    pub fn dc_predictor(&self, component: usize) -> i32 {
        self.dc_predictors[component]
    }

    /// Decodes one block of `component` into `block`, in zigzag order.
    pub fn decode_block(
        &mut self,
        component: usize,
        br: &mut BitCursor,
        block: &mut Block,
    ) -> Result<()> {
        let trees = self.components[component];
        let mut filled = 0;
        let mut state = DecodeState::AwaitDcLeaf;
        loop {
            state = match state {
                DecodeState::AwaitDcLeaf => {
                    let (magnitude, _) = trees.dc.read_symbol(br)?;
                    let diff = read_extended(br, CoefficientKind::Dc, magnitude)?;
                    let dc = self.dc_predictors[component] + diff;
                    block[0] = i16::try_from(dc).map_err(|_| Error::ArithmeticOverflow)?;
                    self.dc_predictors[component] = dc;
                    filled = 1;
                    trace!(component, magnitude, dc, "DC coefficient");
                    DecodeState::AwaitAcLeaf
                }
                DecodeState::AwaitAcLeaf => {
                    let (run_size, _) = trees.ac.read_symbol(br)?;
                    match run_size {
                        EOB => DecodeState::HandleEob,
                        ZRL => DecodeState::HandleZrl,
                        _ => DecodeState::HandleValue {
                            run: run_size >> 4,
                            magnitude: run_size & 0x0f,
                        },
                    }
                }
                DecodeState::HandleEob => {
                    trace!(filled, "EOB");
                    block[filled..].fill(0);
                    filled = BLOCK_SIZE;
                    DecodeState::Complete
                }
                DecodeState::HandleZrl => {
                    if filled + ZRL_RUN > BLOCK_SIZE {
                        return Err(Error::RunLengthOverflow {
                            filled,
                            run: ZRL_RUN,
                        });
                    }
                    block[filled..filled + ZRL_RUN].fill(0);
                    filled += ZRL_RUN;
                    after_ac(filled)
                }
                DecodeState::HandleValue { run, magnitude } => {
                    let run = run as usize;
                    if filled + run + 1 > BLOCK_SIZE {
                        return Err(Error::RunLengthOverflow { filled, run });
                    }
                    let value = read_extended(br, CoefficientKind::Ac, magnitude)?;
                    block[filled..filled + run].fill(0);
                    filled += run;
                    // At most 10 magnitude bits, always within i16.
                    block[filled] = value as i16;
                    filled += 1;
                    after_ac(filled)
                }
                DecodeState::Complete => return Ok(()),
            };
        }
    }

    /// Decodes one block per component, in component order. Errors carry the MCU and
    /// component index they occurred at. `blocks` must hold exactly one block per
    /// component.
    pub fn decode_mcu(
        &mut self,
        mcu: usize,
        br: &mut BitCursor,
        blocks: &mut [Block],
    ) -> Result<()> {
        if blocks.len() != self.components.len() {
            return Err(Error::InvalidComponentCount(blocks.len()));
        }
        for (component, block) in blocks.iter_mut().enumerate() {
            self.decode_block(component, br, block)
                .map_err(|e| e.in_block(mcu, component))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use jpeg_test_utils::{BitWriter, tables::*};
    use test_log::test;

    use super::*;
    use crate::entropy_coding::{
        huffman::{HUFFMAN_MAX_BITS, HuffmanTable},
        magnitude::magnitude_bits,
    };

    fn tree(counts: &[u8], symbols: &[u8]) -> HuffmanTree {
        let mut c = [0u8; HUFFMAN_MAX_BITS];
        c[..counts.len()].copy_from_slice(counts);
        HuffmanTree::build(&HuffmanTable::new(c, symbols.to_vec()).unwrap()).unwrap()
    }

    fn annex_k_trees() -> (HuffmanTree, HuffmanTree) {
        (
            tree(&DC_LUMINANCE_COUNTS, &DC_LUMINANCE_SYMBOLS),
            tree(&AC_LUMINANCE_COUNTS, &AC_LUMINANCE_SYMBOLS),
        )
    }

    fn write_symbol(writer: &mut BitWriter, tree: &HuffmanTree, symbol: u8) -> usize {
        let code = tree.code_for(symbol).unwrap();
        writer.write_bits(code.code as u32, code.length as usize);
        code.length as usize
    }

    fn write_value(writer: &mut BitWriter, tree: &HuffmanTree, run: u8, value: i32) {
        let (magnitude, bits) = magnitude_bits(value);
        write_symbol(writer, tree, (run << 4) | magnitude);
        writer.write_bits(bits, magnitude as usize);
    }

    /// Sequential encoder for one zigzag-ordered block.
    fn encode_block(
        writer: &mut BitWriter,
        dc_tree: &HuffmanTree,
        ac_tree: &HuffmanTree,
        previous_dc: i32,
        block: &Block,
    ) {
        let (magnitude, bits) = magnitude_bits(block[0] as i32 - previous_dc);
        write_symbol(writer, dc_tree, magnitude);
        writer.write_bits(bits, magnitude as usize);
        let mut run = 0u8;
        for &coeff in &block[1..] {
            if coeff == 0 {
                run += 1;
                continue;
            }
            while run > 15 {
                write_symbol(writer, ac_tree, ZRL);
                run -= 16;
            }
            write_value(writer, ac_tree, run, coeff as i32);
            run = 0;
        }
        if run > 0 {
            write_symbol(writer, ac_tree, EOB);
        }
    }

    #[test]
    fn single_mcu_zero_block() {
        let dc = tree(&[1], &[0]);
        let ac = tree(&[1], &[EOB]);
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        // DC category 0, then EOB.
        let data = [0b0000_0000];
        let mut br = BitCursor::with_bit_len(&data, 2).unwrap();
        let mut block = [0x55; BLOCK_SIZE];
        decoder.decode_block(0, &mut br, &mut block).unwrap();
        assert_eq!(block, [0; BLOCK_SIZE]);
        assert_eq!(br.position(), 2);
    }

    #[test]
    fn truncated_before_dc_leaf() {
        let dc = tree(&[1], &[0]);
        let ac = tree(&[1], &[EOB]);
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let data = [0u8];
        let mut br = BitCursor::with_bit_len(&data, 0).unwrap();
        let mut block = [0; BLOCK_SIZE];
        let err = decoder.decode_mcu(0, &mut br, &mut [block]).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::StreamExhausted {
                position: 0,
                bit_len: 0
            }
        ));
        assert!(matches!(
            err,
            Error::Block {
                mcu: 0,
                component: 0,
                ..
            }
        ));
        // Truncated after the DC leaf, before the AC code.
        let mut br = BitCursor::with_bit_len(&data, 1).unwrap();
        assert!(matches!(
            decoder.decode_block(0, &mut br, &mut block),
            Err(Error::StreamExhausted { position: 1, .. })
        ));
    }

    #[test]
    fn eob_consumes_only_its_code() {
        let (dc, ac) = annex_k_trees();
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let mut expected = [0i16; BLOCK_SIZE];
        expected[0] = 5;
        expected[1] = -3;
        expected[2] = 1;
        let mut writer = BitWriter::new();
        encode_block(&mut writer, &dc, &ac, 0, &expected);
        let before_eob = writer.bit_len() - ac.code_for(EOB).unwrap().length as usize;
        // Trailing bits that must not be consumed.
        writer.write_bits(0b1010_1010, 8);
        let (bytes, bit_len) = writer.finish();

        let mut br = BitCursor::with_bit_len(&bytes, bit_len).unwrap();
        let mut block = [0x7f; BLOCK_SIZE];
        decoder.decode_block(0, &mut br, &mut block).unwrap();
        assert_eq!(block, expected);
        assert_eq!(
            br.position(),
            before_eob + ac.code_for(EOB).unwrap().length as usize
        );
        assert_eq!(br.bits_remaining(), 8);
    }

    #[test]
    fn zrl_writes_sixteen_zeros() {
        let (dc, ac) = annex_k_trees();
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let mut expected = [0i16; BLOCK_SIZE];
        expected[18] = 7;
        let mut writer = BitWriter::new();
        encode_block(&mut writer, &dc, &ac, 0, &expected);
        let (bytes, bit_len) = writer.finish();
        // DC "00", ZRL, run 1 size 3 + 3 bits, EOB.
        let expected_len = 2
            + ac.code_for(ZRL).unwrap().length as usize
            + ac.code_for(0x13).unwrap().length as usize
            + 3
            + ac.code_for(EOB).unwrap().length as usize;
        assert_eq!(bit_len, expected_len);

        let mut br = BitCursor::with_bit_len(&bytes, bit_len).unwrap();
        let mut block = [1; BLOCK_SIZE];
        decoder.decode_block(0, &mut br, &mut block).unwrap();
        assert_eq!(block, expected);
        assert_eq!(br.position(), bit_len);
    }

    #[test]
    fn zrl_fills_block_exactly() {
        let (dc, ac) = annex_k_trees();
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let mut writer = BitWriter::new();
        write_symbol(&mut writer, &dc, 0);
        // 1 + 15 values, then 3 ZRLs fill slots 16..64.
        for _ in 0..15 {
            write_value(&mut writer, &ac, 0, 1);
        }
        for _ in 0..3 {
            write_symbol(&mut writer, &ac, ZRL);
        }
        let (bytes, bit_len) = writer.finish();
        let mut br = BitCursor::with_bit_len(&bytes, bit_len).unwrap();
        let mut block = [0; BLOCK_SIZE];
        decoder.decode_block(0, &mut br, &mut block).unwrap();
        assert!(block[1..16].iter().all(|&c| c == 1));
        assert!(block[16..].iter().all(|&c| c == 0));
        assert_eq!(br.position(), bit_len);
    }

    #[test]
    fn zrl_overflow() {
        let (dc, ac) = annex_k_trees();
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let mut writer = BitWriter::new();
        write_symbol(&mut writer, &dc, 0);
        // 1 + 50 coefficients leave 13 slots, too few for a ZRL.
        for _ in 0..50 {
            write_value(&mut writer, &ac, 0, -1);
        }
        write_symbol(&mut writer, &ac, ZRL);
        let (bytes, bit_len) = writer.finish();
        let mut br = BitCursor::with_bit_len(&bytes, bit_len).unwrap();
        let mut block = [0; BLOCK_SIZE];
        assert!(matches!(
            decoder.decode_block(0, &mut br, &mut block),
            Err(Error::RunLengthOverflow {
                filled: 51,
                run: 16
            })
        ));
    }

    #[test]
    fn run_overflow() {
        let (dc, ac) = annex_k_trees();
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let mut writer = BitWriter::new();
        write_symbol(&mut writer, &dc, 0);
        for _ in 0..60 {
            write_value(&mut writer, &ac, 0, 2);
        }
        // 61 filled, a run of 5 zeros plus a value needs 6 more.
        write_value(&mut writer, &ac, 5, 2);
        let (bytes, bit_len) = writer.finish();
        let mut br = BitCursor::with_bit_len(&bytes, bit_len).unwrap();
        let mut block = [0; BLOCK_SIZE];
        assert!(matches!(
            decoder.decode_block(0, &mut br, &mut block),
            Err(Error::RunLengthOverflow { filled: 61, run: 5 })
        ));
    }

    #[test]
    fn invalid_dc_magnitude() {
        let dc = tree(&[0, 1], &[12]);
        let ac = tree(&[1], &[EOB]);
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let mut br = BitCursor::new(&[0; 4]);
        let mut block = [0; BLOCK_SIZE];
        assert!(matches!(
            decoder.decode_block(0, &mut br, &mut block),
            Err(Error::InvalidMagnitude {
                kind: CoefficientKind::Dc,
                magnitude: 12
            })
        ));
    }

    #[test]
    fn invalid_ac_magnitude() {
        let dc = tree(&[1], &[0]);
        for symbol in [0x10u8, 0x0b, 0x3f] {
            let ac = tree(&[1], &[symbol]);
            let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
            let mut br = BitCursor::new(&[0; 8]);
            let mut block = [0; BLOCK_SIZE];
            assert!(matches!(
                decoder.decode_block(0, &mut br, &mut block),
                Err(Error::InvalidMagnitude {
                    kind: CoefficientKind::Ac,
                    ..
                })
            ));
        }
    }

    #[test]
    fn invalid_code() {
        let dc = tree(&[1], &[0]);
        let ac = tree(&[1], &[EOB]);
        let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
        let mut br = BitCursor::new(&[0b0100_0000]);
        let mut block = [0; BLOCK_SIZE];
        assert!(matches!(
            decoder.decode_block(0, &mut br, &mut block),
            Err(Error::InvalidCode { position: 1 })
        ));
    }

    #[test]
    fn mcu_block_count_must_match_components() {
        let dc = tree(&[1], &[0]);
        let ac = tree(&[1], &[EOB]);
        let trees = ComponentTrees { dc: &dc, ac: &ac };
        let mut decoder = McuDecoder::new(vec![trees, trees, trees]);
        let data = [0u8; 2];
        let mut br = BitCursor::new(&data);
        for len in [1, 2, 4] {
            let mut blocks = vec![[0; BLOCK_SIZE]; len];
            assert!(matches!(
                decoder.decode_mcu(0, &mut br, &mut blocks),
                Err(Error::InvalidComponentCount(n)) if n == len
            ));
        }
        // Nothing was consumed by the rejected calls.
        assert_eq!(br.position(), 0);
        let mut blocks = [[0; BLOCK_SIZE]; 3];
        decoder.decode_mcu(0, &mut br, &mut blocks).unwrap();
        assert_eq!(br.position(), 6);
    }

    #[test]
    fn dc_prediction_per_component() {
        let (dc, ac) = annex_k_trees();
        let trees = ComponentTrees { dc: &dc, ac: &ac };
        let mut decoder = McuDecoder::new(vec![trees, trees]);
        let dc_values = [[10i16, -20], [13, -20], [-400, 1000]];
        let mut writer = BitWriter::new();
        let mut previous = [0i32; 2];
        for mcu in dc_values {
            for (component, &value) in mcu.iter().enumerate() {
                let mut block = [0; BLOCK_SIZE];
                block[0] = value;
                encode_block(&mut writer, &dc, &ac, previous[component], &block);
                previous[component] = value as i32;
            }
        }
        let (bytes, bit_len) = writer.finish();
        let mut br = BitCursor::with_bit_len(&bytes, bit_len).unwrap();
        for (mcu, values) in dc_values.iter().enumerate() {
            let mut blocks = [[0; BLOCK_SIZE]; 2];
            decoder.decode_mcu(mcu, &mut br, &mut blocks).unwrap();
            assert_eq!(blocks[0][0], values[0]);
            assert_eq!(blocks[1][0], values[1]);
            assert_eq!(decoder.dc_predictor(1), values[1] as i32);
        }
        assert!(br.is_exhausted());
    }

    #[test]
    fn random_blocks_round_trip() {
        let (dc, ac) = annex_k_trees();
        arbtest::arbtest(|u| {
            let mut decoder = McuDecoder::new(vec![ComponentTrees { dc: &dc, ac: &ac }]);
            let num_blocks = u.int_in_range(1..=4)?;
            let mut blocks = Vec::new();
            let mut writer = BitWriter::new();
            let mut previous = 0;
            for _ in 0..num_blocks {
                let mut block = [0i16; BLOCK_SIZE];
                block[0] = u.int_in_range(-1024..=1023)?;
                for coeff in block[1..].iter_mut() {
                    if u.ratio(1, 4)? {
                        *coeff = u.int_in_range(-1023..=1023)?;
                    }
                }
                encode_block(&mut writer, &dc, &ac, previous, &block);
                previous = block[0] as i32;
                blocks.push(block);
            }
            writer.pad_with_ones();
            let (bytes, bit_len) = writer.finish();
            let mut br = BitCursor::with_bit_len(&bytes, bit_len).unwrap();
            for expected in &blocks {
                let mut block = [0; BLOCK_SIZE];
                decoder.decode_block(0, &mut br, &mut block).unwrap();
                assert_eq!(&block, expected);
            }
            assert_eq!(br.position(), bit_len);
            Ok(())
        });
    }
}
