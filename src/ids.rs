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

//! Identifiers shared by the frame codec, the block codec and the manager.

/// Identifies a source symbol. Allocated sequentially by the sender,
/// starting at 0.
pub type SourceSymbolId = u64;

/// Identifies a block. `BlockId = SourceSymbolId / k`.
pub type BlockId = u64;

/// Identifies a repair symbol within its block, in `[0, n - k)`.
pub type ParityId = u64;

/// The epoch at which a FEC_WINDOW update was produced. Window updates
/// with a non-increasing epoch (other than the very first one) are
/// rejected.
pub type FecWindowEpoch = u16;

/// The maximum number of in-flight source symbols a receiver admits.
pub type FecWindowSize = u32;

/// Identifies which block a repair symbol belongs to and where within
/// that block's parity shards it sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockMetadata {
    pub block_id: BlockId,
    pub parity_id: ParityId,
}

/// Maximum length of a source symbol payload. Chosen to match a QUIC max
/// datagram size minus typical per-packet overhead; kept configurable by
/// downstream callers rather than hardcoded into the codec itself.
pub const MAX_FEC_PACKET_BUFFER_SIZE: usize = 1452;

/// Number of trailing bytes a repair (and a coded source) shard carries to
/// record the original source symbol's length.
pub const REPAIR_PAYLOAD_METADATA_LEN: usize = 2;

/// Capacity of the outbound repair queue (C6).
pub const MAX_REPAIR_SEND_QUEUE_LEN: usize = 32;

/// Identifies the coding scheme in use. Negotiated out-of-band (e.g. via
/// transport parameters); both peers MUST agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FecSchemeId {
    /// FEC is disabled entirely.
    FecDisabled = 0,
    /// Single-parity XOR, `(k + 1, k)` only.
    XorFecScheme = 1,
    /// Systematic Reed-Solomon, general `(k, r)`.
    ReedSolomonFecScheme = 2,
}

impl FecSchemeId {
    /// Converts a raw byte received from a peer (or a config file) into a
    /// `FecSchemeId`. Unknown values are a protocol error.
    pub fn from_byte(b: u8) -> crate::Result<FecSchemeId> {
        match b {
            0 => Ok(FecSchemeId::FecDisabled),
            1 => Ok(FecSchemeId::XorFecScheme),
            2 => Ok(FecSchemeId::ReedSolomonFecScheme),
            _ => Err(crate::Error::InvalidFecScheme),
        }
    }
}

impl std::fmt::Display for FecSchemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            FecSchemeId::FecDisabled => "disabled",
            FecSchemeId::XorFecScheme => "XOR",
            FecSchemeId::ReedSolomonFecScheme => "ReedSolomon",
        };
        write!(f, "{}", s)
    }
}

/// `k, n` pair for the XOR scheme's single supported configuration.
pub const DEFAULT_XOR_K: u64 = 2;
pub const DEFAULT_XOR_N: u64 = 3;

/// `k, r` pair for the default Reed-Solomon configuration.
pub const DEFAULT_RS_K: u64 = 20;
pub const DEFAULT_RS_R: u64 = 10;
