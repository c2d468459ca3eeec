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

//! Forward Error Correction (FEC) for a QUIC-like transport.
//!
//! This crate is the FEC subsystem layered on top of a QUIC connection: the
//! block-based codec (source symbols, repair symbols, blocks), the XOR and
//! Reed-Solomon coding schemes, the [`manager::FecManager`] state machine
//! that drives both, and the four wire frames ([`frame::Frame`]) the host
//! connection's frame parser delegates to this crate.
//!
//! It deliberately knows nothing about the host connection, stream
//! multiplexing, congestion control, the packet scheduler, the TLS
//! handshake or HTTP/3: those are named external collaborators, not
//! dependencies of this crate.

#![warn(missing_docs)]
#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;

pub mod block;
pub mod error;
pub mod frame;
pub mod ids;
pub mod manager;
pub mod queue;
pub mod scheme;
pub mod window;

pub use error::Error;
pub use error::Result;
pub use ids::FecSchemeId;
pub use manager::FecManager;

/// Configuration surface for the FEC subsystem, set once at connection
/// construction time (distilled-spec §6).
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// If `false`, [`FecManager`] is a no-op: no SSID is ever allocated,
    /// no block is ever created, no frame is ever generated.
    pub enable_fec: bool,

    /// The negotiated coding scheme. Both peers MUST agree on this value
    /// out of band (e.g. via transport parameters); an unrecognized value
    /// is a construction-time error, not a hot-path one.
    pub scheme: FecSchemeId,

    /// Whether SOURCE_SYMBOL frames are allowed to carry DATAGRAM
    /// payloads. This crate does not itself carve symbols out of
    /// STREAM/DATAGRAM frames; the flag exists purely so a host
    /// connection can gate that behavior against its own datagram
    /// support.
    pub enable_datagrams: bool,

    /// `k` for the XOR scheme. XOR only ever supports `(k + 1, k)`, so
    /// `xor_n` must equal `xor_k + 1`.
    pub xor_k: u64,
    /// `n` for the XOR scheme.
    pub xor_n: u64,

    /// `k` for the Reed-Solomon scheme (number of source symbols per
    /// block).
    pub rs_k: u64,
    /// `r` for the Reed-Solomon scheme (number of repair symbols per
    /// block).
    pub rs_r: u64,
}

impl Config {
    /// A `Config` with the v1 defaults from distilled-spec §6:
    /// `EnableFEC = false`, XOR `(k, n) = (2, 3)`, Reed-Solomon
    /// `(k, r) = (20, 10)`.
    pub fn new(scheme: FecSchemeId) -> Config {
        Config {
            enable_fec: false,
            scheme,
            enable_datagrams: false,
            xor_k: ids::DEFAULT_XOR_K,
            xor_n: ids::DEFAULT_XOR_N,
            rs_k: ids::DEFAULT_RS_K,
            rs_r: ids::DEFAULT_RS_R,
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new(FecSchemeId::FecDisabled)
    }
}
