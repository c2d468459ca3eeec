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

//! Single-parity XOR scheme, `(k + 1, k)` only.

use crate::block::Block;
use crate::frame::Frame;
use crate::ids::REPAIR_PAYLOAD_METADATA_LEN;
use crate::Error;
use crate::Result;

#[derive(Default)]
pub struct XorScheme;

impl XorScheme {
    pub fn new() -> XorScheme {
        XorScheme
    }

    pub fn repair_symbols(&self, block: &Block) -> Result<Vec<Frame>> {
        if block.total_repair() != 1 {
            return Err(Error::InvalidFecScheme);
        }

        if !block.is_complete() {
            return Err(Error::SchemeNotReady);
        }

        let big = block.biggest_source_symbol_len();
        let mut shard = vec![0u8; big + REPAIR_PAYLOAD_METADATA_LEN];

        for (_, payload) in block.source_payloads_ascending() {
            xor_into(&mut shard, payload);
            xor_len_into(&mut shard, big, payload.len());
        }

        Ok(vec![Frame::Repair {
            block_id: block.id(),
            parity_id: 0,
            payload: shard,
        }])
    }

    pub fn recover_symbol_payloads(&self, block: &Block) -> Result<Vec<u8>> {
        if !block.is_recoverable() || block.is_complete() {
            return Err(Error::SchemeNotReady);
        }

        // XOR can only ever reconstruct a single missing source symbol.
        let missing = block.missing_ssids();
        if missing.len() != 1 || block.repair_symbol_count() != 1 {
            return Err(Error::SchemeNotReady);
        }

        let big = block.biggest_source_symbol_len();
        let mut buf = vec![0u8; big + REPAIR_PAYLOAD_METADATA_LEN];

        let (_, repair_payload) = block
            .repair_payloads_ascending()
            .next()
            .ok_or(Error::SchemeNotReady)?;
        xor_into(&mut buf, repair_payload);

        for (_, payload) in block.source_payloads_ascending() {
            xor_into(&mut buf, payload);
            xor_len_into(&mut buf, big, payload.len());
        }

        let recovered_len = ((buf[big] as usize) << 8) | (buf[big + 1] as usize);
        if recovered_len > big {
            return Err(Error::RecoveryInvariantViolated);
        }

        Ok(buf[..recovered_len].to_vec())
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
}

fn xor_len_into(dst: &mut [u8], big: usize, len: usize) {
    let len = len as u16;
    dst[big] ^= (len >> 8) as u8;
    dst[big + 1] ^= (len & 0xff) as u8;
}
