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

/// A FEC subsystem error.
///
/// These map onto the error taxonomy the host connection is expected to
/// act on: framing errors and out-of-range symbols are protocol violations
/// that should close the connection, window and queue errors are local
/// conditions the caller can choose how to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The provided buffer is too short to hold the requested data, or the
    /// reader ran out of bytes while parsing a frame.
    BufferTooShort,

    /// The frame has an invalid wire encoding (e.g. invalid SYMBOL_ACK
    /// ranges, or a field that could not be represented in its expected
    /// width).
    InvalidFrame,

    /// The frame's type code does not match any of the known FEC frames.
    UnknownFrameType,

    /// A FEC frame was seen at an encryption level that does not allow it.
    NotAllowedAtEncryptionLevel,

    /// A SOURCE_SYMBOL frame's SSID falls outside of its block's
    /// `[smallestSSID, largestSSID]` range.
    OutOfRangeSourceSymbol,

    /// A REPAIR frame's BlockID does not match the block it was routed to.
    BlockIdMismatch,

    /// A REPAIR frame's ParityID is `>= totalRepair` for its scheme.
    UnknownParityId,

    /// `repairSymbols` was called on a block that is not complete, or
    /// `recoverSymbolPayloads` was called on a block that is not
    /// recoverable. Should never escape the manager; if it does, it is a
    /// bug in the caller.
    SchemeNotReady,

    /// The configured (or negotiated) `FECSchemeID` is not one of the
    /// known schemes.
    InvalidFecScheme,

    /// A source symbol's payload (or a block's `biggestSourceSymbolLen`)
    /// exceeds `MAX_FEC_PACKET_BUFFER_SIZE`.
    PayloadTooLarge,

    /// An update to the coding window violated epoch monotonicity.
    InvalidFecWindow,

    /// The repair queue is at `MAX_REPAIR_SEND_QUEUE_LEN` capacity.
    RepairQueueFull,

    /// The repair queue has been closed; see the stored reason.
    RepairQueueClosed,

    /// Reconstruction ran but the block still isn't complete afterwards.
    /// This is an internal invariant violation in the underlying coding
    /// library, not a condition callers can recover from.
    RecoveryInvariantViolated,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl From<octets::BufferTooShortError> for Error {
    fn from(_err: octets::BufferTooShortError) -> Self {
        Error::BufferTooShort
    }
}

pub type Result<T> = std::result::Result<T, Error>;
