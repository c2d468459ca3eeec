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

//! Systematic Reed-Solomon `(k, r)` scheme over GF(2^8), backed by the
//! `reed-solomon-erasure` crate (the same Cauchy-matrix construction used
//! throughout this ecosystem's FEC crates).

use reed_solomon_erasure::galois_8::ReedSolomon;

use crate::block::Block;
use crate::ids::ParityId;
use crate::ids::REPAIR_PAYLOAD_METADATA_LEN;
use crate::frame::Frame;
use crate::Error;
use crate::Result;

pub struct ReedSolomonScheme {
    k: usize,
    r: usize,
    codec: ReedSolomon,
}

impl ReedSolomonScheme {
    pub fn new(k: u64, r: u64) -> Result<ReedSolomonScheme> {
        let k = k as usize;
        let r = r as usize;

        let codec =
            ReedSolomon::new(k, r).map_err(|_| Error::InvalidFecScheme)?;

        Ok(ReedSolomonScheme { k, r, codec })
    }

    pub fn k(&self) -> u64 {
        self.k as u64
    }

    pub fn r(&self) -> u64 {
        self.r as u64
    }

    pub fn repair_symbols(&self, block: &Block) -> Result<Vec<Frame>> {
        if !block.is_complete() {
            return Err(Error::SchemeNotReady);
        }

        let shard_len = block.biggest_source_symbol_len() + REPAIR_PAYLOAD_METADATA_LEN;

        let mut shards: Vec<Vec<u8>> = Vec::with_capacity(self.k + self.r);

        for i in 0..self.k as u64 {
            let ssid = block.smallest_ssid() + i;
            let payload = block
                .source_payload(ssid)
                .ok_or(Error::SchemeNotReady)?;

            shards.push(padded_shard(payload, shard_len));
        }

        for _ in 0..self.r {
            shards.push(vec![0u8; shard_len]);
        }

        self.codec
            .encode(&mut shards)
            .map_err(|_| Error::SchemeNotReady)?;

        let mut frames = Vec::with_capacity(self.r);
        for (j, shard) in shards.into_iter().skip(self.k).enumerate() {
            frames.push(Frame::Repair {
                block_id: block.id(),
                parity_id: j as ParityId,
                payload: shard,
            });
        }

        Ok(frames)
    }

    pub fn recover_symbol_payloads(&self, block: &Block) -> Result<Vec<u8>> {
        if !block.is_recoverable() || block.is_complete() {
            return Err(Error::SchemeNotReady);
        }

        let shard_len = block.biggest_source_symbol_len() + REPAIR_PAYLOAD_METADATA_LEN;

        let mut shards: Vec<Option<Vec<u8>>> = vec![None; self.k + self.r];

        for i in 0..self.k as u64 {
            let ssid = block.smallest_ssid() + i;
            if let Some(payload) = block.source_payload(ssid) {
                shards[i as usize] = Some(padded_shard(payload, shard_len));
            }
        }

        for (parity_id, payload) in block.repair_payloads_ascending() {
            if parity_id >= self.r as ParityId {
                return Err(Error::UnknownParityId);
            }
            shards[self.k + parity_id as usize] = Some(payload.to_vec());
        }

        self.codec
            .reconstruct_data(&mut shards)
            .map_err(|_| Error::RecoveryInvariantViolated)?;

        let mut recovered = Vec::new();
        for ssid in block.missing_ssids() {
            let i = (ssid - block.smallest_ssid()) as usize;
            let shard = shards[i].as_ref().ok_or(Error::RecoveryInvariantViolated)?;

            let len = ((shard[shard_len - 2] as usize) << 8) |
                (shard[shard_len - 1] as usize);
            if len > block.biggest_source_symbol_len() {
                return Err(Error::RecoveryInvariantViolated);
            }

            recovered.extend_from_slice(&shard[..len]);
        }

        Ok(recovered)
    }
}

/// Zero-pads `payload` out to `shard_len` bytes and appends the original
/// length as a two-byte big-endian suffix in the final
/// `REPAIR_PAYLOAD_METADATA_LEN` bytes.
fn padded_shard(payload: &[u8], shard_len: usize) -> Vec<u8> {
    let mut shard = vec![0u8; shard_len];
    shard[..payload.len()].copy_from_slice(payload);

    let len = payload.len() as u16;
    shard[shard_len - 2] = (len >> 8) as u8;
    shard[shard_len - 1] = (len & 0xff) as u8;

    shard
}
