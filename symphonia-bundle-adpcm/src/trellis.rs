// Symphonia
// Copyright (c) 2019-2025 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A bounded beam search over ADPCM code sequences.
//!
//! The search keeps the `W` cheapest partial encodings (the frontier) in a binary min-heap of
//! node indices. Every frontier node is extended by a narrow window of candidate codes, and the
//! resulting nodes compete for the `W` slots of the next frontier. Nodes that decode to the same
//! sample in one generation are merged. Every `FREEZE_INTERVAL` samples the path of the best node
//! is committed and the path arena is recycled, so memory use does not depend on the input
//! length.

use log::debug;

use symphonia_core::errors::{unsupported_error, Result};

use crate::rule::TrellisRule;
use crate::state::ChannelState;

/// The number of samples after which the best path is committed.
pub const FREEZE_INTERVAL: usize = 128;

/// The largest supported trellis size. The frontier holds `1 << trellis` nodes.
pub const MAX_TRELLIS: u32 = 16;

/// Relative costs are rebased once the best cost exceeds this value.
const SSD_REBASE_THRESHOLD: u64 = 1 << 28;

/// The generation value that marks an unused merge hash entry.
const HASH_EMPTY: u8 = 0xff;

#[derive(Copy, Clone, Debug, Default)]
struct TrellisNode {
    /// Sum of squared errors up to and including this node.
    ssd: u64,
    /// Index of the newest path entry of this node.
    path: usize,
    /// The predictor state after this node's code.
    state: ChannelState,
}

#[derive(Copy, Clone, Debug, Default)]
struct TrellisPath {
    code: u8,
    prev: usize,
}

/// `TrellisEncoder` picks the sequence of codes that minimizes the squared reconstruction error of
/// a channel, within a bounded search width.
pub struct TrellisEncoder {
    frontier: usize,
    /// Node arena. Generations alternate between the two halves.
    nodes: Vec<TrellisNode>,
    /// Min-heap, by cost, of the current generation.
    heap: Vec<Option<usize>>,
    /// Min-heap, by cost, of the generation being built.
    next: Vec<Option<usize>>,
    /// Path arena, recycled on every freeze.
    paths: Vec<TrellisPath>,
    /// Generation in which a decoded sample value was last reached.
    hash: Vec<u8>,
    /// Best cost above which all costs are rebased.
    rebase_threshold: u64,
}

impl TrellisEncoder {
    /// Instantiate a `TrellisEncoder` with a frontier of `1 << trellis` nodes. A `trellis` of 0
    /// disables the search, and each rule's direct quantizer is used instead.
    pub fn try_new(trellis: u32) -> Result<Self> {
        if trellis > MAX_TRELLIS {
            return unsupported_error("adpcm: trellis size out of range");
        }

        let frontier = 1 << trellis;

        if frontier == 1 {
            return Ok(TrellisEncoder {
                frontier,
                nodes: Vec::new(),
                heap: Vec::new(),
                next: Vec::new(),
                paths: Vec::new(),
                hash: Vec::new(),
                rebase_threshold: SSD_REBASE_THRESHOLD,
            });
        }

        Ok(TrellisEncoder {
            frontier,
            nodes: vec![Default::default(); 2 * frontier],
            heap: vec![None; frontier],
            next: vec![None; frontier],
            paths: vec![Default::default(); frontier * FREEZE_INTERVAL],
            hash: vec![HASH_EMPTY; 1 << 16],
            rebase_threshold: SSD_REBASE_THRESHOLD,
        })
    }

    /// Gets the number of nodes in the frontier.
    pub fn frontier(&self) -> usize {
        self.frontier
    }

    /// Gets the capacity of the path arena. It is fixed when the encoder is instantiated.
    pub fn path_capacity(&self) -> usize {
        self.paths.len()
    }

    /// Encodes `samples` of one channel into `codes`, one code per sample, starting from `state`.
    ///
    /// On return, `state` holds the predictor state after the chosen codes, which is exactly the
    /// state a decoder reaches by expanding them. If `codes` is shorter than `samples`, only as
    /// many samples as there are codes are encoded.
    pub fn encode<R: TrellisRule>(
        &mut self,
        rule: &R,
        state: &mut ChannelState,
        samples: &[i16],
        codes: &mut [u8],
    ) {
        let n = samples.len().min(codes.len());

        if self.frontier == 1 {
            for (&sample, code) in samples[..n].iter().zip(codes.iter_mut()) {
                *code = rule.quantize(state, sample);
                rule.expand(state, *code);
            }
            return;
        }

        let width = self.frontier;
        let half_width = width / 2;

        self.hash.fill(HASH_EMPTY);
        self.heap.fill(None);

        let mut generation = 0u8;
        let mut pathn = 0;
        let mut frozen = 0;

        // The root lives in the half of the arena the first generation does not allocate from.
        self.nodes[width] = TrellisNode { ssd: 0, path: 0, state: *state };
        self.heap[0] = Some(width);

        for (i, &sample) in samples[..n].iter().enumerate() {
            let mut alloc = width * (i & 1);
            let mut heap_pos = 0;

            self.next.fill(None);

            for j in 0..width {
                let parent = match self.heap[j] {
                    Some(index) => self.nodes[index],
                    None => break,
                };

                // Nodes in the worse half of the frontier are extended by a narrower window.
                let range = if j < half_width { 1 } else { 0 };

                for &code in rule.candidates(&parent.state, sample, range).as_slice() {
                    let mut child = parent.state;
                    let decoded = rule.expand(&mut child, code);

                    let d = i64::from(sample) - i64::from(decoded);
                    let ssd = parent.ssd + (d * d) as u64;

                    let key = usize::from(decoded as u16);
                    if self.hash[key] == generation {
                        continue;
                    }

                    let mut pos = if heap_pos < width {
                        heap_pos
                    }
                    else {
                        // Try to displace a leaf, a different one each time.
                        let pos = half_width + (heap_pos & (half_width - 1));

                        if let Some(index) = self.next[pos] {
                            if ssd >= self.nodes[index].ssd {
                                continue;
                            }
                        }
                        pos
                    };

                    heap_pos += 1;
                    self.hash[key] = generation;

                    let index = match self.next[pos] {
                        Some(index) => index,
                        None => {
                            debug_assert!(pathn < self.paths.len());
                            let index = alloc;
                            alloc += 1;
                            self.nodes[index].path = pathn;
                            pathn += 1;
                            self.next[pos] = Some(index);
                            index
                        }
                    };

                    let node = &mut self.nodes[index];
                    node.ssd = ssd;
                    node.state = child;
                    self.paths[node.path] = TrellisPath { code, prev: parent.path };

                    // Sift up.
                    while pos > 0 {
                        let up = (pos - 1) >> 1;
                        match self.next[up] {
                            Some(up_index) if self.nodes[up_index].ssd > ssd => {
                                self.next.swap(up, pos);
                                pos = up;
                            }
                            _ => break,
                        }
                    }
                }
            }

            std::mem::swap(&mut self.heap, &mut self.next);

            generation += 1;
            if generation == HASH_EMPTY {
                self.hash.fill(HASH_EMPTY);
                generation = 0;
            }

            let best = match self.heap[0] {
                Some(best) => best,
                None => break,
            };

            let base = self.nodes[best].ssd;
            if base > self.rebase_threshold {
                for index in self.heap.iter().flatten() {
                    self.nodes[*index].ssd -= base;
                }
            }

            if i + 1 == frozen + FREEZE_INTERVAL {
                self.backtrace(best, &mut codes[frozen..=i]);

                debug!("adpcm: trellis froze samples {}..{}, {} paths used", frozen, i + 1, pathn);

                frozen = i + 1;
                pathn = 0;

                // Paths not ending in the committed one are dropped.
                self.heap[1..].fill(None);
            }
        }

        if let Some(best) = self.heap[0] {
            self.backtrace(best, &mut codes[frozen..n]);
            *state = self.nodes[best].state;
        }
    }

    /// Writes the codes of the path ending at `node`, newest last, into `codes`.
    fn backtrace(&self, node: usize, codes: &mut [u8]) {
        let mut path = self.nodes[node].path;

        for code in codes.iter_mut().rev() {
            *code = self.paths[path].code;
            path = self.paths[path].prev;
        }
    }
}
