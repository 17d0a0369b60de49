// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Scan-level drivers: entropy decoding of a whole scan into coefficient planes, and
//! reconstruction of those planes into pixels.

use crate::{
    BLOCK_DIM, BLOCK_SIZE, Block, SampleBlock,
    bit_reader::BitCursor,
    coeff_order::dezigzag,
    color::ycbcr::{
        ColorTransform, convert_block_in_place, convert_luma_block_in_place, saturate,
    },
    entropy_coding::{
        huffman::{HuffmanTable, HuffmanTree},
        mcu::{ComponentTrees, McuDecoder},
    },
    error::{CoefficientKind, Error, Result},
    util::tracing_wrappers::*,
    var_dct::{idct8x8, level_shift},
};

/// Number of table ids per table class.
pub const MAX_HUFFMAN_TABLES: usize = 4;
/// Largest width or height a frame header can carry.
pub const MAX_IMAGE_DIM: usize = 65535;

/// The DC and AC Huffman tables of a frame, keyed by table id.
#[derive(Debug, Clone, Default)]
pub struct HuffmanTables {
    dc: [Option<HuffmanTable>; MAX_HUFFMAN_TABLES],
    ac: [Option<HuffmanTable>; MAX_HUFFMAN_TABLES],
}

fn table_slot(id: u8) -> Result<usize> {
    let slot = id as usize;
    if slot >= MAX_HUFFMAN_TABLES {
        return Err(Error::InvalidTableId(id));
    }
    Ok(slot)
}

impl HuffmanTables {
    /// Installs a DC table, replacing any previous table with the same id.
    pub fn set_dc(&mut self, id: u8, table: HuffmanTable) -> Result<()> {
        self.dc[table_slot(id)?] = Some(table);
        Ok(())
    }

    pub fn set_ac(&mut self, id: u8, table: HuffmanTable) -> Result<()> {
        self.ac[table_slot(id)?] = Some(table);
        Ok(())
    }

    pub fn dc(&self, id: u8) -> Option<&HuffmanTable> {
        self.dc.get(id as usize)?.as_ref()
    }

    pub fn ac(&self, id: u8) -> Option<&HuffmanTable> {
        self.ac.get(id as usize)?.as_ref()
    }

    fn get(&self, kind: CoefficientKind, id: u8) -> Result<&HuffmanTable> {
        let tables = match kind {
            CoefficientKind::Dc => &self.dc,
            CoefficientKind::Ac => &self.ac,
        };
        tables[table_slot(id)?]
            .as_ref()
            .ok_or(Error::MissingHuffmanTable { kind, id })
    }
}

/// Table assignment of one scan component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponent {
    pub dc_table: u8,
    pub ac_table: u8,
}

impl ScanComponent {
    pub fn new(dc_table: u8, ac_table: u8) -> ScanComponent {
        ScanComponent { dc_table, ac_table }
    }
}

/// Everything needed to entropy decode one scan.
#[derive(Debug, Clone)]
pub struct ScanInput<'a> {
    /// Entropy-coded segment, without markers or stuffed bytes.
    pub data: &'a [u8],
    /// Number of meaningful bits in `data`.
    pub bit_len: usize,
    pub width: usize,
    pub height: usize,
    /// Components in interleaving order; 1 (grayscale) or 3 (YCbCr).
    pub components: Vec<ScanComponent>,
    pub tables: &'a HuffmanTables,
}

/// The MCU layout of a frame. Every MCU holds one 8x8 block per component; partial MCUs
/// at the right and bottom edges are still coded in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McuGrid {
    pub width: usize,
    pub height: usize,
    pub mcus_x: usize,
    pub mcus_y: usize,
}

impl McuGrid {
    pub fn new(width: usize, height: usize) -> Result<McuGrid> {
        if width == 0 || height == 0 || width > MAX_IMAGE_DIM || height > MAX_IMAGE_DIM {
            return Err(Error::InvalidImageSize(width, height));
        }
        Ok(McuGrid {
            width,
            height,
            mcus_x: width.div_ceil(BLOCK_DIM),
            mcus_y: height.div_ceil(BLOCK_DIM),
        })
    }

    pub fn num_mcus(&self) -> usize {
        self.mcus_x * self.mcus_y
    }

    /// Returns the MCU index and the in-block index of pixel (`x`, `y`).
    pub fn locate(&self, x: usize, y: usize) -> (usize, usize) {
        let mcu = (y / BLOCK_DIM) * self.mcus_x + x / BLOCK_DIM;
        (mcu, (y % BLOCK_DIM) * BLOCK_DIM + x % BLOCK_DIM)
    }
}

fn allocate_plane<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut plane = Vec::new();
    plane.try_reserve_exact(len)?;
    plane.resize(len, value);
    Ok(plane)
}

/// Quantized coefficients of a decoded scan, in zigzag order, one plane per component.
#[derive(Debug, Clone)]
pub struct CoefficientPlanes {
    grid: McuGrid,
    planes: Vec<Vec<Block>>,
}

impl CoefficientPlanes {
    pub fn grid(&self) -> McuGrid {
        self.grid
    }

    pub fn num_components(&self) -> usize {
        self.planes.len()
    }

    pub fn block(&self, component: usize, mcu: usize) -> &Block {
        &self.planes[component][mcu]
    }

    pub fn blocks(&self, component: usize) -> &[Block] {
        &self.planes[component]
    }

    /// Coefficient `index` (zigzag order) of the block of `component` in `mcu`.
    pub fn coefficient(&self, component: usize, mcu: usize, index: usize) -> i16 {
        self.planes[component][mcu][index]
    }
}

/// Builds every tree referenced by the scan exactly once, keyed by table id.
fn build_trees(
    scan: &ScanInput,
    kind: CoefficientKind,
) -> Result<[Option<HuffmanTree>; MAX_HUFFMAN_TABLES]> {
    let mut trees: [Option<HuffmanTree>; MAX_HUFFMAN_TABLES] = Default::default();
    for component in &scan.components {
        let id = match kind {
            CoefficientKind::Dc => component.dc_table,
            CoefficientKind::Ac => component.ac_table,
        };
        let table = scan.tables.get(kind, id)?;
        let slot = &mut trees[id as usize];
        if slot.is_none() {
            debug!(%kind, id, "building Huffman tree");
            *slot = Some(HuffmanTree::build(table)?);
        }
    }
    Ok(trees)
}

fn tree(
    trees: &[Option<HuffmanTree>; MAX_HUFFMAN_TABLES],
    kind: CoefficientKind,
    id: u8,
) -> Result<&HuffmanTree> {
    trees[table_slot(id)?]
        .as_ref()
        .ok_or(Error::MissingHuffmanTable { kind, id })
}

/// Entropy decodes every MCU of a scan, in order, with one shared cursor and one DC
/// predictor per component.
#[cfg_attr(
    feature = "tracing",
    instrument(skip_all, err, fields(width = scan.width, height = scan.height))
)]
pub fn decode_scan(scan: &ScanInput) -> Result<CoefficientPlanes> {
    let num_components = scan.components.len();
    if num_components != 1 && num_components != 3 {
        return Err(Error::InvalidComponentCount(num_components));
    }
    let grid = McuGrid::new(scan.width, scan.height)?;
    let mut br = BitCursor::with_bit_len(scan.data, scan.bit_len)?;

    let dc_trees = build_trees(scan, CoefficientKind::Dc)?;
    let ac_trees = build_trees(scan, CoefficientKind::Ac)?;
    let component_trees = scan
        .components
        .iter()
        .map(|c| {
            Ok(ComponentTrees {
                dc: tree(&dc_trees, CoefficientKind::Dc, c.dc_table)?,
                ac: tree(&ac_trees, CoefficientKind::Ac, c.ac_table)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let num_mcus = grid.num_mcus();
    let mut planes = Vec::new();
    planes.try_reserve_exact(num_components)?;
    for _ in 0..num_components {
        let mut plane = Vec::new();
        plane.try_reserve_exact(num_mcus)?;
        planes.push(plane);
    }

    debug!(
        num_mcus,
        num_components,
        bit_len = scan.bit_len,
        "decoding scan"
    );
    let mut decoder = McuDecoder::new(component_trees);
    let mut scratch = vec![[0; BLOCK_SIZE]; num_components];
    for mcu in 0..num_mcus {
        decoder.decode_mcu(mcu, &mut br, &mut scratch)?;
        for (plane, block) in planes.iter_mut().zip(scratch.iter()) {
            plane.push(*block);
        }
    }
    if !br.is_exhausted() {
        // Padding up to the next byte boundary, or garbage before the next marker.
        debug!(bits_remaining = br.bits_remaining(), "trailing bits after scan");
    }
    Ok(CoefficientPlanes { grid, planes })
}

/// Turns the natural-order quantized coefficients of one block into IDCT input.
///
/// This is where dequantization plugs in; the core never applies quantization tables
/// itself.
pub trait CoefficientScaler: Sync {
    fn scale(&self, component: usize, coefficients: &Block) -> [f64; BLOCK_SIZE];
}

/// Passes coefficients through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unscaled;

impl CoefficientScaler for Unscaled {
    fn scale(&self, _component: usize, coefficients: &Block) -> [f64; BLOCK_SIZE] {
        coefficients.map(f64::from)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Output luma only, even for YCbCr scans. The luma is replicated into all three
    /// channels so the output layout does not depend on this flag.
    pub force_grayscale: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 64 output samples of one block, row-major.
pub type PixelBlock = [u8; BLOCK_SIZE];

/// Final pixels, one plane of blocks per output channel.
#[derive(Debug, Clone)]
pub struct ReconstructedImage {
    grid: McuGrid,
    transform: ColorTransform,
    channels: Vec<Vec<PixelBlock>>,
}

impl ReconstructedImage {
    pub fn grid(&self) -> McuGrid {
        self.grid
    }

    pub fn transform(&self) -> ColorTransform {
        self.transform
    }

    /// 1 for grayscale scans, 3 (R, G, B) otherwise.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn block(&self, channel: usize, mcu: usize) -> &PixelBlock {
        &self.channels[channel][mcu]
    }

    pub fn sample(&self, channel: usize, mcu: usize, index: usize) -> u8 {
        self.channels[channel][mcu][index]
    }

    /// Returns the pixel at (`x`, `y`), one value per channel.
    pub fn pixel(&self, x: usize, y: usize) -> Vec<u8> {
        let (mcu, index) = self.grid.locate(x, y);
        self.channels.iter().map(|c| c[mcu][index]).collect()
    }

    /// Interleaves the channels into a `width * height * num_channels` buffer, dropping
    /// the padding of partial edge MCUs.
    pub fn to_interleaved(&self) -> Vec<u8> {
        let num_channels = self.num_channels();
        let mut out = Vec::with_capacity(self.grid.width * self.grid.height * num_channels);
        for y in 0..self.grid.height {
            for x in 0..self.grid.width {
                let (mcu, index) = self.grid.locate(x, y);
                out.extend(self.channels.iter().map(|c| c[mcu][index]));
            }
        }
        out
    }
}

/// Dezigzag, scaling, IDCT and level shift of one block.
pub fn block_to_samples(
    scaler: &dyn CoefficientScaler,
    component: usize,
    block: &Block,
) -> SampleBlock {
    level_shift(&idct8x8(&scaler.scale(component, &dezigzag(block))))
}

#[cfg(feature = "parallel")]
fn for_each_block<T: Send>(blocks: &mut [T], f: impl Fn(usize, &mut T) + Sync + Send) {
    use rayon::prelude::*;
    blocks
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, block)| f(i, block));
}

#[cfg(not(feature = "parallel"))]
fn for_each_block<T>(blocks: &mut [T], f: impl Fn(usize, &mut T)) {
    blocks
        .iter_mut()
        .enumerate()
        .for_each(|(i, block)| f(i, block));
}

#[cfg(feature = "parallel")]
fn convert_planes(
    transform: ColorTransform,
    y: &mut [SampleBlock],
    cb: &mut [SampleBlock],
    cr: &mut [SampleBlock],
) {
    use rayon::prelude::*;
    y.par_iter_mut()
        .zip(cb.par_iter_mut())
        .zip(cr.par_iter_mut())
        .for_each(|((y, cb), cr)| convert_block_in_place(transform, y, cb, cr));
}

#[cfg(not(feature = "parallel"))]
fn convert_planes(
    transform: ColorTransform,
    y: &mut [SampleBlock],
    cb: &mut [SampleBlock],
    cr: &mut [SampleBlock],
) {
    y.iter_mut()
        .zip(cb.iter_mut())
        .zip(cr.iter_mut())
        .for_each(|((y, cb), cr)| convert_block_in_place(transform, y, cb, cr));
}

/// Reconstructs pixels from decoded coefficients: every block goes through dezigzag,
/// `scaler`, IDCT and level shift, then every MCU through color conversion.
#[cfg_attr(feature = "tracing", instrument(skip_all, err))]
pub fn reconstruct(
    planes: &CoefficientPlanes,
    scaler: &dyn CoefficientScaler,
    options: &DecodeOptions,
) -> Result<ReconstructedImage> {
    let transform =
        ColorTransform::for_components(planes.num_components(), options.force_grayscale)?;
    let num_mcus = planes.grid.num_mcus();
    debug!(%transform, num_mcus, "reconstructing");

    let mut samples = Vec::new();
    samples.try_reserve_exact(planes.num_components())?;
    for (component, coefficients) in planes.planes.iter().enumerate() {
        let mut plane = allocate_plane(num_mcus, [0i16; BLOCK_SIZE])?;
        for_each_block(&mut plane, |mcu, out| {
            *out = block_to_samples(scaler, component, &coefficients[mcu]);
        });
        samples.push(plane);
    }

    let num_components = samples.len();
    match samples.as_mut_slice() {
        [y] => for_each_block(y, |_, block| convert_luma_block_in_place(block)),
        [y, cb, cr] => convert_planes(transform, y, cb, cr),
        _ => return Err(Error::InvalidComponentCount(num_components)),
    }

    let mut channels = Vec::new();
    channels.try_reserve_exact(samples.len())?;
    for plane in &samples {
        let mut pixels = allocate_plane(num_mcus, [0u8; BLOCK_SIZE])?;
        for_each_block(&mut pixels, |mcu, out| {
            *out = plane[mcu].map(|s| saturate(s as i32));
        });
        channels.push(pixels);
    }
    Ok(ReconstructedImage {
        grid: planes.grid,
        transform,
        channels,
    })
}
