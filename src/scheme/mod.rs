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

//! The block scheme capability (C3): `{ repair_symbols, recover_symbol_payloads }`,
//! with two concrete implementations selected at `FecManager` construction
//! time. Go's interface + struct polymorphism becomes a tagged enum here —
//! there is no need for dynamic dispatch since the set of schemes is closed
//! and fixed for the lifetime of a connection.

pub mod reed_solomon;
pub mod xor;

use crate::block::Block;
use crate::frame::Frame;
use crate::ids::FecSchemeId;
use crate::Error;
use crate::Result;

pub use reed_solomon::ReedSolomonScheme;
pub use xor::XorScheme;

pub enum Scheme {
    Xor(XorScheme),
    ReedSolomon(ReedSolomonScheme),
}

impl Scheme {
    /// Builds the scheme named by `id`, with a `(k, n)` or `(k, r)`
    /// configuration appropriate to it. `FecSchemeId::FecDisabled` has no
    /// corresponding `Scheme` value; callers check `Config::enable_fec`
    /// and the scheme id before ever reaching this constructor.
    pub fn new(id: FecSchemeId, k: u64, total_repair: u64) -> Result<Scheme> {
        match id {
            FecSchemeId::XorFecScheme => {
                if total_repair != 1 {
                    return Err(Error::InvalidFecScheme);
                }
                Ok(Scheme::Xor(XorScheme::new()))
            },

            FecSchemeId::ReedSolomonFecScheme =>
                Ok(Scheme::ReedSolomon(ReedSolomonScheme::new(k, total_repair)?)),

            FecSchemeId::FecDisabled => Err(Error::InvalidFecScheme),
        }
    }

    pub fn repair_symbols(&self, block: &Block) -> Result<Vec<Frame>> {
        match self {
            Scheme::Xor(s) => s.repair_symbols(block),
            Scheme::ReedSolomon(s) => s.repair_symbols(block),
        }
    }

    pub fn recover_symbol_payloads(&self, block: &Block) -> Result<Vec<u8>> {
        match self {
            Scheme::Xor(s) => s.recover_symbol_payloads(block),
            Scheme::ReedSolomon(s) => s.recover_symbol_payloads(block),
        }
    }
}
