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

//! Wire encoding and decoding of the FEC frames (C1).
//!
//! SOURCE_SYMBOL, REPAIR, SYMBOL_ACK and FEC_WINDOW are new frame types
//! layered on top of the host QUIC frame parser. This module only knows
//! how to turn bytes into `Frame` values and back; it has no opinion on
//! how those frames are scheduled or what a host connection does with
//! them once parsed.

use crate::ids::BlockId;
use crate::ids::FecWindowEpoch;
use crate::ids::FecWindowSize;
use crate::ids::ParityId;
use crate::ids::SourceSymbolId;
use crate::Error;
use crate::Result;

/// Type code for a SOURCE_SYMBOL frame.
pub const SOURCE_SYMBOL_FRAME_TYPE_ID: u64 = 0x32a8_0fec_55;

/// Type code for a REPAIR frame.
pub const REPAIR_FRAME_TYPE_ID: u64 = 0x32a8_0fec;

/// Type code for a SYMBOL_ACK frame.
pub const SYMBOL_ACK_FRAME_TYPE_ID: u64 = 0x32a8_0fec_ac;

/// Type code for a FEC_WINDOW frame.
pub const FEC_WINDOW_FRAME_TYPE_ID: u64 = 0x32a8_0fec_c0;

/// The QUIC packet number space a frame was seen in, as far as FEC frame
/// admissibility is concerned. The host connection owns the real
/// encryption-level type; this is the minimal surface the FEC codec needs
/// from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionLevel {
    Initial,
    ZeroRtt,
    Handshake,
    OneRtt,
}

/// One inclusive ACK range within a SYMBOL_ACK frame, identical in shape
/// to a QUIC ACK frame's ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AckRange {
    pub smallest: u64,
    pub largest: u64,
}

/// A parsed FEC frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    SourceSymbol {
        ssid: SourceSymbolId,
        payload: Vec<u8>,
    },

    Repair {
        block_id: BlockId,
        parity_id: ParityId,
        payload: Vec<u8>,
    },

    SymbolAck {
        ack_ranges: Vec<AckRange>,
    },

    FecWindow {
        epoch: FecWindowEpoch,
        size: FecWindowSize,
    },
}

impl Frame {
    /// Parses a frame body given its type code, which the caller has
    /// already read off the wire (mirroring how the host frame parser
    /// dispatches on the leading varint before delegating to us).
    pub fn from_bytes(frame_type: u64, b: &mut octets::Octets) -> Result<Frame> {
        match frame_type {
            SOURCE_SYMBOL_FRAME_TYPE_ID => parse_source_symbol_frame(b),
            REPAIR_FRAME_TYPE_ID => parse_repair_frame(b),
            SYMBOL_ACK_FRAME_TYPE_ID => parse_symbol_ack_frame(b),
            FEC_WINDOW_FRAME_TYPE_ID => parse_fec_window_frame(b),
            _ => Err(Error::UnknownFrameType),
        }
    }

    /// Appends the frame's type code and body to `b`, returning the
    /// number of bytes written.
    pub fn to_bytes(&self, b: &mut octets::OctetsMut) -> Result<usize> {
        let before = b.cap();

        match self {
            Frame::SourceSymbol { ssid, payload } => {
                b.put_varint(SOURCE_SYMBOL_FRAME_TYPE_ID)?;
                b.put_varint(*ssid)?;
                b.put_varint(payload.len() as u64)?;
                b.put_bytes(payload)?;
            },

            Frame::Repair {
                block_id,
                parity_id,
                payload,
            } => {
                b.put_varint(REPAIR_FRAME_TYPE_ID)?;
                b.put_varint(*block_id)?;
                b.put_varint(*parity_id)?;
                b.put_varint(payload.len() as u64)?;
                b.put_bytes(payload)?;
            },

            Frame::SymbolAck { ack_ranges } => {
                write_symbol_ack_frame(b, ack_ranges)?;
            },

            Frame::FecWindow { epoch, size } => {
                b.put_varint(FEC_WINDOW_FRAME_TYPE_ID)?;
                b.put_varint(u64::from(*epoch))?;
                b.put_varint(u64::from(*size))?;
            },
        }

        Ok(before - b.cap())
    }

    /// Number of bytes `to_bytes` would produce for this frame.
    pub fn wire_len(&self) -> usize {
        match self {
            Frame::SourceSymbol { ssid, payload } => {
                octets::varint_len(SOURCE_SYMBOL_FRAME_TYPE_ID) +
                    octets::varint_len(*ssid) +
                    octets::varint_len(payload.len() as u64) +
                    payload.len()
            },

            Frame::Repair {
                block_id,
                parity_id,
                payload,
            } => {
                octets::varint_len(REPAIR_FRAME_TYPE_ID) +
                    octets::varint_len(*block_id) +
                    octets::varint_len(*parity_id) +
                    octets::varint_len(payload.len() as u64) +
                    payload.len()
            },

            Frame::SymbolAck { ack_ranges } => symbol_ack_wire_len(ack_ranges),

            Frame::FecWindow { epoch, size } => {
                octets::varint_len(FEC_WINDOW_FRAME_TYPE_ID) +
                    octets::varint_len(u64::from(*epoch)) +
                    octets::varint_len(u64::from(*size))
            },
        }
    }

    /// Whether this frame type is allowed at the given encryption level.
    /// All four FEC frames require 1-RTT protection: their authenticity
    /// derives entirely from the enclosing packet's AEAD, so they must
    /// not appear before the handshake completes.
    pub fn allowed_at(level: EncryptionLevel) -> bool {
        matches!(level, EncryptionLevel::OneRtt)
    }
}

fn parse_source_symbol_frame(b: &mut octets::Octets) -> Result<Frame> {
    let ssid = b.get_varint()?;
    let payload_len = b.get_varint()? as usize;
    let payload = b.get_bytes(payload_len)?.as_ref().to_vec();

    Ok(Frame::SourceSymbol { ssid, payload })
}

fn parse_repair_frame(b: &mut octets::Octets) -> Result<Frame> {
    let block_id = b.get_varint()?;
    let parity_id = b.get_varint()?;
    let payload_len = b.get_varint()? as usize;
    let payload = b.get_bytes(payload_len)?.as_ref().to_vec();

    Ok(Frame::Repair {
        block_id,
        parity_id,
        payload,
    })
}

fn parse_fec_window_frame(b: &mut octets::Octets) -> Result<Frame> {
    let epoch = b.get_varint()?;
    let size = b.get_varint()?;

    let epoch = FecWindowEpoch::try_from(epoch).map_err(|_| Error::InvalidFrame)?;
    let size = FecWindowSize::try_from(size).map_err(|_| Error::InvalidFrame)?;

    Ok(Frame::FecWindow { epoch, size })
}

// SYMBOL_ACK ranges are parsed identically to a QUIC ACK frame: the first
// range is `[largestAcked - firstRange, largestAcked]`, and each
// subsequent range walks further back using a `(gap, length)` pair.
fn parse_symbol_ack_frame(b: &mut octets::Octets) -> Result<Frame> {
    let largest_acked = b.get_varint()?;
    let num_blocks = b.get_varint()?;

    let first_range = b.get_varint()?;
    if first_range > largest_acked {
        return Err(Error::InvalidFrame);
    }

    let mut ack_ranges = Vec::with_capacity(1 + num_blocks as usize);
    let mut smallest = largest_acked - first_range;
    ack_ranges.push(AckRange {
        smallest,
        largest: largest_acked,
    });

    for _ in 0..num_blocks {
        let gap = b.get_varint()?;

        if smallest < gap + 2 {
            return Err(Error::InvalidFrame);
        }

        let largest = smallest - gap - 2;

        let ack_block = b.get_varint()?;
        if ack_block > largest {
            return Err(Error::InvalidFrame);
        }

        smallest = largest - ack_block;
        ack_ranges.push(AckRange { smallest, largest });
    }

    if !validate_ack_ranges(&ack_ranges) {
        return Err(Error::InvalidFrame);
    }

    Ok(Frame::SymbolAck { ack_ranges })
}

fn validate_ack_ranges(ack_ranges: &[AckRange]) -> bool {
    if ack_ranges.is_empty() {
        return false;
    }

    for r in ack_ranges {
        if r.smallest > r.largest {
            return false;
        }
    }

    for i in 1..ack_ranges.len() {
        let prev = ack_ranges[i - 1];
        let cur = ack_ranges[i];

        if prev.smallest <= cur.smallest {
            return false;
        }

        if prev.smallest <= cur.largest + 1 {
            return false;
        }
    }

    true
}

fn write_symbol_ack_frame(
    b: &mut octets::OctetsMut, ack_ranges: &[AckRange],
) -> Result<()> {
    if ack_ranges.is_empty() {
        return Err(Error::InvalidFrame);
    }

    b.put_varint(SYMBOL_ACK_FRAME_TYPE_ID)?;
    b.put_varint(ack_ranges[0].largest)?;
    b.put_varint((ack_ranges.len() - 1) as u64)?;
    b.put_varint(ack_ranges[0].largest - ack_ranges[0].smallest)?;

    for i in 1..ack_ranges.len() {
        let prev = ack_ranges[i - 1];
        let cur = ack_ranges[i];

        let gap = prev.smallest - cur.largest - 2;
        let len = cur.largest - cur.smallest;

        b.put_varint(gap)?;
        b.put_varint(len)?;
    }

    Ok(())
}

fn symbol_ack_wire_len(ack_ranges: &[AckRange]) -> usize {
    if ack_ranges.is_empty() {
        return octets::varint_len(SYMBOL_ACK_FRAME_TYPE_ID);
    }

    let mut len = octets::varint_len(SYMBOL_ACK_FRAME_TYPE_ID);
    len += octets::varint_len(ack_ranges[0].largest);
    len += octets::varint_len((ack_ranges.len() - 1) as u64);
    len += octets::varint_len(ack_ranges[0].largest - ack_ranges[0].smallest);

    for i in 1..ack_ranges.len() {
        let prev = ack_ranges[i - 1];
        let cur = ack_ranges[i];

        let gap = prev.smallest - cur.largest - 2;
        let l = cur.largest - cur.smallest;

        len += octets::varint_len(gap);
        len += octets::varint_len(l);
    }

    len
}
