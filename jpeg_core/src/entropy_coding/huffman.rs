// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::bit_reader::BitCursor;
use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

pub const HUFFMAN_MAX_BITS: usize = 16;
/// A DHT table can assign at most one code per byte value.
pub const HUFFMAN_MAX_SYMBOLS: usize = 256;

/// Length counts and symbols of one DHT table, validated but not yet turned into a
/// decode tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    counts: [u8; HUFFMAN_MAX_BITS],
    symbols: Vec<u8>,
}

impl HuffmanTable {
    /// `counts[i]` is the number of codes of length `i + 1`; `symbols` lists the
    /// symbols in code order.
    pub fn new(counts: [u8; HUFFMAN_MAX_BITS], symbols: Vec<u8>) -> Result<HuffmanTable> {
        check_length_counts(&counts)?;
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total > HUFFMAN_MAX_SYMBOLS {
            return Err(Error::MalformedTable("more than 256 codes"));
        }
        if total != symbols.len() {
            return Err(Error::MalformedTable("symbol count does not match length counts"));
        }
        Ok(HuffmanTable { counts, symbols })
    }

    /// Parses the DHT payload layout: 16 length counts followed by the symbols.
    /// Bytes after the last symbol are ignored, see [`HuffmanTable::encoded_len`].
    pub fn from_dht_bytes(data: &[u8]) -> Result<HuffmanTable> {
        let Some((counts, rest)) = data.split_first_chunk::<HUFFMAN_MAX_BITS>() else {
            return Err(Error::MalformedTable("missing length counts"));
        };
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        let Some(symbols) = rest.get(..total) else {
            return Err(Error::MalformedTable("missing symbols"));
        };
        HuffmanTable::new(*counts, symbols.to_vec())
    }

    pub fn counts(&self) -> &[u8; HUFFMAN_MAX_BITS] {
        &self.counts
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Number of bytes this table occupies in a DHT payload.
    pub fn encoded_len(&self) -> usize {
        HUFFMAN_MAX_BITS + self.symbols.len()
    }
}

/// Rejects any length `L` that has more than `2^L - 1` codes.
fn check_length_counts(counts: &[u8; HUFFMAN_MAX_BITS]) -> Result<()> {
    for (i, &count) in counts.iter().enumerate() {
        let length = i + 1;
        if count as u32 > (1u32 << length) - 1 {
            return Err(Error::OversubscribedLength { length, count });
        }
    }
    Ok(())
}

type NodeId = u16;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Internal {
        left: Option<NodeId>,
        right: Option<NodeId>,
    },
    Leaf(u8),
}

impl Node {
    const EMPTY: Node = Node::Internal {
        left: None,
        right: None,
    };
}

/// One canonical code of a table: `length` bits of `code`, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanCode {
    pub symbol: u8,
    pub code: u16,
    pub length: u8,
}

/// Binary decode tree of a canonical Huffman code, stored as an arena.
///
/// Node 0 is the root. Bit 0 goes to the left child, bit 1 to the right child.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    codes: Vec<HuffmanCode>,
}

impl HuffmanTree {
    /// Assigns canonical codes (T.81 Annex C) to the symbols of `table` and inserts
    /// them into a fresh tree.
    pub fn build(table: &HuffmanTable) -> Result<HuffmanTree> {
        check_length_counts(&table.counts)?;
        let mut tree = HuffmanTree {
            nodes: vec![Node::EMPTY],
            codes: Vec::with_capacity(table.symbols.len()),
        };
        let mut symbols = table.symbols.iter();
        let mut code = 0u32;
        for length in 1..=HUFFMAN_MAX_BITS {
            for _ in 0..table.counts[length - 1] {
                if code >= 1 << length {
                    return Err(Error::MalformedTable("code space exhausted"));
                }
                let Some(&symbol) = symbols.next() else {
                    return Err(Error::MalformedTable("fewer symbols than codes"));
                };
                tree.insert(code, length, symbol)?;
                tree.codes.push(HuffmanCode {
                    symbol,
                    code: code as u16,
                    length: length as u8,
                });
                code += 1;
            }
            code <<= 1;
        }
        debug!(
            num_codes = tree.codes.len(),
            num_nodes = tree.nodes.len(),
            "built Huffman tree"
        );
        Ok(tree)
    }

    fn insert(&mut self, code: u32, length: usize, symbol: u8) -> Result<()> {
        let mut node = ROOT;
        for shift in (0..length).rev() {
            let bit = (code >> shift) & 1;
            let child = match self.nodes[node as usize] {
                Node::Leaf(_) => {
                    return Err(Error::MalformedTable("code extends a shorter code"));
                }
                Node::Internal { left, right } => {
                    if bit == 1 {
                        right
                    } else {
                        left
                    }
                }
            };
            node = match (child, shift) {
                (Some(_), 0) => {
                    return Err(Error::MalformedTable("duplicate code"));
                }
                (Some(child), _) => child,
                (None, 0) => self.push_child(node, bit, Node::Leaf(symbol)),
                (None, _) => self.push_child(node, bit, Node::EMPTY),
            };
        }
        Ok(())
    }

    fn push_child(&mut self, parent: NodeId, bit: u32, child: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(child);
        if let Node::Internal { left, right } = &mut self.nodes[parent as usize] {
            if bit == 1 {
                *right = Some(id);
            } else {
                *left = Some(id);
            }
        }
        id
    }

    /// Walks the tree one bit at a time from the cursor position. Returns the symbol
    /// and the number of bits its code occupied.
    pub fn read_symbol(&self, br: &mut BitCursor) -> Result<(u8, usize)> {
        let mut node = ROOT;
        let mut length = 0;
        loop {
            let bit = br.read_bit()?;
            length += 1;
            let child = match self.nodes[node as usize] {
                Node::Internal { left, right } => {
                    if bit == 1 {
                        right
                    } else {
                        left
                    }
                }
                // The root is never a leaf and leaves are never descended into.
                Node::Leaf(_) => None,
            };
            let Some(child) = child else {
                return Err(Error::InvalidCode {
                    position: br.position() - 1,
                });
            };
            match self.nodes[child as usize] {
                Node::Leaf(symbol) => return Ok((symbol, length)),
                Node::Internal { .. } => node = child,
            }
        }
    }

    /// Lists every code in canonical order.
    pub fn codes(&self) -> &[HuffmanCode] {
        &self.codes
    }

    /// Returns the code assigned to `symbol`, if any.
    pub fn code_for(&self, symbol: u8) -> Option<HuffmanCode> {
        self.codes.iter().copied().find(|c| c.symbol == symbol)
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count()
    }
}
