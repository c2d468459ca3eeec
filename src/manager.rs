// Copyright (C) 2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The FEC manager (C5): the protocol-layer state machine that ties the
//! frame codec, the block codec, the coding window and the repair queue
//! together into the two halves a host connection actually calls —
//! "produce a source symbol, maybe get repair frames back" on the sender
//! side, and "hand me a frame, maybe get an application payload back" on
//! the receiver side.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::block::Block;
use crate::frame::Frame;
use crate::ids::BlockId;
use crate::ids::FecSchemeId;
use crate::ids::FecWindowEpoch;
use crate::ids::FecWindowSize;
use crate::ids::SourceSymbolId;
use crate::queue::RepairQueue;
use crate::scheme::Scheme;
use crate::window::FecWindow;
use crate::Config;
use crate::Error;
use crate::Result;

pub struct FecManager {
    enabled: bool,
    k: u64,
    total_repair: u64,
    scheme: Option<Scheme>,

    next_ssid: AtomicU64,

    blocks: HashMap<BlockId, Block>,
    processed_blocks: BTreeSet<BlockId>,
    latest_completed_block_id: Option<BlockId>,

    window: FecWindow,
    repair_queue: RepairQueue,
}

impl FecManager {
    /// Builds a manager from a `Config`. `has_data` is the callback the
    /// repair queue invokes every time a frame is enqueued; a host
    /// connection typically uses it to wake its packet scheduler.
    ///
    /// `FecSchemeId` validation and `Scheme` construction both happen
    /// here, at connection-construction time, rather than lazily on the
    /// first block — a malformed configuration should never surface as a
    /// hot-path error.
    pub fn new(
        config: &Config, has_data: impl Fn() + Send + Sync + 'static,
    ) -> Result<FecManager> {
        let (k, total_repair, scheme) = if !config.enable_fec {
            (0, 0, None)
        } else {
            match config.scheme {
                FecSchemeId::FecDisabled => (0, 0, None),

                FecSchemeId::XorFecScheme => {
                    let r = config.xor_n - config.xor_k;
                    (
                        config.xor_k,
                        r,
                        Some(Scheme::new(config.scheme, config.xor_k, r)?),
                    )
                },

                FecSchemeId::ReedSolomonFecScheme => (
                    config.rs_k,
                    config.rs_r,
                    Some(Scheme::new(config.scheme, config.rs_k, config.rs_r)?),
                ),
            }
        };

        Ok(FecManager {
            enabled: config.enable_fec && scheme.is_some(),
            k,
            total_repair,
            scheme,
            next_ssid: AtomicU64::new(0),
            blocks: HashMap::new(),
            processed_blocks: BTreeSet::new(),
            latest_completed_block_id: None,
            window: FecWindow::new(),
            repair_queue: RepairQueue::new(has_data),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the current SSID counter value, then increments it.
    /// Lock-free: a single `AtomicU64::fetch_add` satisfies the
    /// monotonic-allocation requirement even if callers produce source
    /// symbols from more than one task.
    pub fn next_ssid(&self) -> SourceSymbolId {
        self.next_ssid.fetch_add(1, Ordering::SeqCst)
    }

    pub fn sid_to_block_id(&self, ssid: SourceSymbolId) -> BlockId {
        ssid / self.k
    }

    pub fn repair_queue(&self) -> &RepairQueue {
        &self.repair_queue
    }

    pub fn set_initial_coding_window(&mut self, size: FecWindowSize) {
        self.window.set_initial_coding_window(size);
    }

    pub fn update_window_size(
        &mut self, new_size: FecWindowSize, new_epoch: FecWindowEpoch,
    ) -> Result<()> {
        self.window.update(new_size, new_epoch)?;
        self.evict_processed_blocks();
        Ok(())
    }

    pub fn window_size(&self) -> FecWindowSize {
        self.window.size()
    }

    pub fn window_epoch(&self) -> FecWindowEpoch {
        self.window.epoch()
    }

    /// Sender half: accepts a just-produced SOURCE_SYMBOL frame, files it
    /// into its block, and — if the block is now complete — returns the
    /// REPAIR frames the scheme computed for it. Those frames are also
    /// pushed onto the repair queue; the return value exists so the
    /// caller doesn't have to drain the queue to know what was just
    /// produced (and so tests can assert on it directly).
    pub fn add_source_symbol_frame(&mut self, frame: &Frame) -> Result<Vec<Frame>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let (ssid, payload) = expect_source_symbol(frame)?;
        let block_id = self.sid_to_block_id(ssid);

        let k = self.k;
        let total_repair = self.total_repair;
        let block = self
            .blocks
            .entry(block_id)
            .or_insert_with(|| Block::new(block_id, k, total_repair));

        block.add_source_symbol(ssid, payload)?;

        if !block.is_complete() {
            return Ok(Vec::new());
        }

        let scheme = self.scheme.as_ref().expect("enabled manager always has a scheme");
        let frames = scheme.repair_symbols(self.blocks.get(&block_id).unwrap())?;

        self.finish_block(block_id);

        for f in &frames {
            // Repair generation lives on the sender's hot path and must
            // never block; a full queue drops this block's repair
            // frames rather than stalling the caller.
            if let Err(e) = self.repair_queue.add(f.clone()) {
                warn!(
                    "dropping repair frame for block {} ({:?}): {:?}",
                    block_id, f, e
                );
            }
        }

        Ok(frames)
    }

    /// Receiver half: files an incoming SOURCE_SYMBOL frame. Returns the
    /// payload on its first observation (surfaced immediately, whether or
    /// not this symbol happens to complete its block), or `None` for a
    /// duplicate or an out-of-range symbol on an already-processed block.
    pub fn handle_source_symbol_frame(
        &mut self, frame: &Frame,
    ) -> Result<Option<Vec<u8>>> {
        if !self.enabled {
            return Ok(None);
        }

        let (ssid, payload) = expect_source_symbol(frame)?;
        let block_id = self.sid_to_block_id(ssid);

        if self.processed_blocks.contains(&block_id) {
            trace!("dropping source symbol {} for processed block {}", ssid, block_id);
            return Ok(None);
        }

        let k = self.k;
        let total_repair = self.total_repair;
        let block = self
            .blocks
            .entry(block_id)
            .or_insert_with(|| Block::new(block_id, k, total_repair));

        let first_observation = block.add_source_symbol(ssid, payload.clone())?;
        let is_complete = block.is_complete();

        if is_complete {
            debug!("block {} complete on receiver", block_id);
            self.finish_block(block_id);
        }

        Ok(if first_observation { Some(payload) } else { None })
    }

    /// Receiver half: files an incoming REPAIR frame. Returns the
    /// concatenation (in ascending SSID order) of every source payload
    /// the scheme could reconstruct, if this repair symbol just made the
    /// block recoverable without already being complete.
    pub fn handle_repair_frame(&mut self, frame: &Frame) -> Result<Option<Vec<u8>>> {
        if !self.enabled {
            return Ok(None);
        }

        let (block_id, parity_id, payload) = expect_repair(frame)?;

        if self.processed_blocks.contains(&block_id) {
            trace!("dropping repair symbol for processed block {}", block_id);
            return Ok(None);
        }

        let k = self.k;
        let total_repair = self.total_repair;
        // Repair-first arrival is ordinary under loss: the block is
        // created here exactly as it would be for a source symbol.
        let block = self
            .blocks
            .entry(block_id)
            .or_insert_with(|| Block::new(block_id, k, total_repair));

        block.add_repair_symbol(block_id, parity_id, payload)?;

        let is_complete = block.is_complete();
        let is_recoverable = block.is_recoverable();

        if is_recoverable && !is_complete {
            let scheme =
                self.scheme.as_ref().expect("enabled manager always has a scheme");
            let recovered =
                scheme.recover_symbol_payloads(self.blocks.get(&block_id).unwrap())?;

            if !self.blocks.get(&block_id).unwrap().is_complete() {
                // a scheme that claims recoverability but doesn't
                // actually fill in every missing source symbol is a bug
                // in the underlying coding library, not something a
                // caller can react to.
                return Err(Error::RecoveryInvariantViolated);
            }

            debug!("block {} recovered on receiver", block_id);
            self.finish_block(block_id);
            return Ok(Some(recovered));
        }

        if is_complete {
            self.finish_block(block_id);
        }

        Ok(None)
    }

    fn finish_block(&mut self, block_id: BlockId) {
        self.blocks.remove(&block_id);
        self.processed_blocks.insert(block_id);

        self.latest_completed_block_id = Some(match self.latest_completed_block_id {
            Some(latest) => latest.max(block_id),
            None => block_id,
        });

        self.evict_processed_blocks();
    }

    /// Bounds the otherwise ever-growing `processed_blocks` set: any
    /// block more than `window_size / k` blocks behind the most recently
    /// completed one is evicted. A window size of zero means no window
    /// has been negotiated yet, in which case nothing is evicted — we'd
    /// rather leak a little bookkeeping than evict a block that might
    /// still legitimately be inside the (unknown) admissible window.
    fn evict_processed_blocks(&mut self) {
        if self.k == 0 {
            return;
        }

        let window_blocks = self.window.size() as u64 / self.k;
        if window_blocks == 0 {
            return;
        }

        let latest = match self.latest_completed_block_id {
            Some(latest) => latest,
            None => return,
        };

        let window_base = latest.saturating_sub(window_blocks);
        self.processed_blocks.retain(|&b| b >= window_base);
    }
}

fn expect_source_symbol(frame: &Frame) -> Result<(SourceSymbolId, Vec<u8>)> {
    match frame {
        Frame::SourceSymbol { ssid, payload } => Ok((*ssid, payload.clone())),
        _ => Err(Error::InvalidFrame),
    }
}

fn expect_repair(frame: &Frame) -> Result<(BlockId, crate::ids::ParityId, Vec<u8>)> {
    match frame {
        Frame::Repair {
            block_id,
            parity_id,
            payload,
        } => Ok((*block_id, *parity_id, payload.clone())),
        _ => Err(Error::InvalidFrame),
    }
}
