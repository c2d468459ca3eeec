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

//! The receiver-side coding window (C4): an epoch-ordered bound on the
//! number of source symbols the manager admits as in-flight.

use crate::ids::FecWindowEpoch;
use crate::ids::FecWindowSize;
use crate::Error;
use crate::Result;

/// `{ size, epoch, hasBeenSet }` from the distilled spec's data model.
#[derive(Clone, Copy, Debug, Default)]
pub struct FecWindow {
    size: FecWindowSize,
    epoch: FecWindowEpoch,
    has_been_set: bool,
}

impl FecWindow {
    pub fn new() -> FecWindow {
        FecWindow {
            size: 0,
            epoch: 0,
            has_been_set: false,
        }
    }

    pub fn size(&self) -> FecWindowSize {
        self.size
    }

    pub fn epoch(&self) -> FecWindowEpoch {
        self.epoch
    }

    /// Assigns the initial window size without touching the epoch. Does
    /// not count as the "first update" for `update`'s purposes.
    pub fn set_initial_coding_window(&mut self, size: FecWindowSize) {
        self.size = size;
    }

    /// Applies a FEC_WINDOW update. The very first update is accepted
    /// regardless of its epoch; every later one must carry a strictly
    /// greater epoch than the one currently retained.
    pub fn update(
        &mut self, new_size: FecWindowSize, new_epoch: FecWindowEpoch,
    ) -> Result<()> {
        let is_first_update = self.epoch == 0 && !self.has_been_set;

        if !is_first_update && new_epoch <= self.epoch {
            return Err(Error::InvalidFecWindow);
        }

        self.size = new_size;
        self.epoch = new_epoch;
        self.has_been_set = true;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_window_update_sequence() {
        let mut w = FecWindow::new();
        w.set_initial_coding_window(64);
        assert_eq!(w.size(), 64);
        assert_eq!(w.epoch(), 0);

        w.update(128, 1).unwrap();
        assert_eq!((w.size(), w.epoch()), (128, 1));

        let err = w.update(256, 1).unwrap_err();
        assert_eq!(err, Error::InvalidFecWindow);
        assert_eq!((w.size(), w.epoch()), (128, 1));

        w.update(256, 2).unwrap();
        assert_eq!((w.size(), w.epoch()), (256, 2));
    }

    #[test]
    fn first_update_accepted_even_at_epoch_zero() {
        let mut w = FecWindow::new();
        w.update(10, 0).unwrap();
        assert_eq!((w.size(), w.epoch()), (10, 0));

        // the second update, even at the same epoch, is now rejected.
        let err = w.update(20, 0).unwrap_err();
        assert_eq!(err, Error::InvalidFecWindow);
    }

    #[test]
    fn initial_window_does_not_unlock_epoch_zero_updates() {
        let mut w = FecWindow::new();
        w.update(5, 0).unwrap();
        w.set_initial_coding_window(99);
        // still gated on epoch monotonicity: a second epoch-0 update
        // must fail even after set_initial_coding_window.
        let err = w.update(6, 0).unwrap_err();
        assert_eq!(err, Error::InvalidFecWindow);
    }
}
