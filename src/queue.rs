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

//! The bounded, nonblocking repair-send queue (C6) sitting between the
//! manager (producer, on the sender's hot path) and the host's packet
//! scheduler (consumer).

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Mutex;

use crate::frame::Frame;
use crate::ids::MAX_REPAIR_SEND_QUEUE_LEN;
use crate::Error;
use crate::Result;

struct Inner {
    frames: VecDeque<Frame>,
    closed: Option<Error>,
}

/// A FIFO of outbound REPAIR frames, capped at `MAX_REPAIR_SEND_QUEUE_LEN`.
///
/// `add()` never blocks: once full it fails with `Error::RepairQueueFull`
/// rather than applying backpressure to the caller, since repair frames
/// are generated on the sender's hot path and must not stall it. The
/// `sendMx` referenced by the distilled spec's concurrency model is the
/// internal mutex guarding `frames`; `has_data` is invoked outside the
/// lock so it can safely wake the packet scheduler.
pub struct RepairQueue {
    inner: Mutex<Inner>,
    capacity: usize,
    has_data: Box<dyn Fn() + Send + Sync>,
    sent_tx: Mutex<mpsc::Sender<()>>,
    sent_rx: Mutex<mpsc::Receiver<()>>,
}

impl RepairQueue {
    /// `has_data` is called every time a frame is successfully enqueued;
    /// it is the hook a host connection uses to wake its packet scheduler.
    pub fn new(has_data: impl Fn() + Send + Sync + 'static) -> RepairQueue {
        RepairQueue::with_capacity(MAX_REPAIR_SEND_QUEUE_LEN, has_data)
    }

    pub fn with_capacity(
        capacity: usize, has_data: impl Fn() + Send + Sync + 'static,
    ) -> RepairQueue {
        let (sent_tx, sent_rx) = mpsc::channel();

        RepairQueue {
            inner: Mutex::new(Inner {
                frames: VecDeque::new(),
                closed: None,
            }),
            capacity,
            has_data: Box::new(has_data),
            sent_tx: Mutex::new(sent_tx),
            sent_rx: Mutex::new(sent_rx),
        }
    }

    /// Enqueues `frame`. Fails with `RepairQueueFull` if the queue is at
    /// capacity, or with the stored error if the queue was closed.
    pub fn add(&self, frame: Frame) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();

            if let Some(err) = &inner.closed {
                return Err(err.clone());
            }

            if inner.frames.len() >= self.capacity {
                return Err(Error::RepairQueueFull);
            }

            inner.frames.push_back(frame);
        }

        (self.has_data)();
        Ok(())
    }

    /// Returns a clone of the front frame without removing it.
    pub fn peek(&self) -> Option<Frame> {
        self.inner.lock().unwrap().frames.front().cloned()
    }

    /// Removes and returns the front frame, signalling one waiter on the
    /// `sent` channel.
    pub fn pop(&self) -> Option<Frame> {
        let front = self.inner.lock().unwrap().frames.pop_front();

        if front.is_some() {
            // best-effort: nobody waiting is not an error.
            let _ = self.sent_tx.lock().unwrap().send(());
        }

        front
    }

    /// Blocks the calling thread until a frame has been popped, or
    /// returns immediately if one already has been since the last call.
    pub fn wait_for_sent(&self) {
        let _ = self.sent_rx.lock().unwrap().recv();
    }

    /// Puts the queue into a terminal closed state; every subsequent
    /// `add` fails with `err`.
    pub fn close_with_error(&self, err: Error) {
        self.inner.lock().unwrap().closed = Some(err);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn repair(block_id: u64, parity_id: u64) -> Frame {
        Frame::Repair {
            block_id,
            parity_id,
            payload: vec![0; 4],
        }
    }

    #[test]
    fn add_invokes_has_data_and_peek_does_not_remove() {
        let woken = Arc::new(AtomicUsize::new(0));
        let woken_clone = woken.clone();
        let q = RepairQueue::with_capacity(2, move || {
            woken_clone.fetch_add(1, Ordering::SeqCst);
        });

        q.add(repair(0, 0)).unwrap();
        assert_eq!(woken.load(Ordering::SeqCst), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(q.peek(), Some(repair(0, 0)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn fails_when_full() {
        let q = RepairQueue::with_capacity(1, || {});
        q.add(repair(0, 0)).unwrap();
        let err = q.add(repair(0, 1)).unwrap_err();
        assert_eq!(err, Error::RepairQueueFull);
    }

    #[test]
    fn pop_removes_in_fifo_order() {
        let q = RepairQueue::with_capacity(4, || {});
        q.add(repair(0, 0)).unwrap();
        q.add(repair(0, 1)).unwrap();

        assert_eq!(q.pop(), Some(repair(0, 0)));
        assert_eq!(q.pop(), Some(repair(0, 1)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn closed_queue_rejects_further_adds() {
        let q = RepairQueue::with_capacity(4, || {});
        q.close_with_error(Error::RepairQueueClosed);
        let err = q.add(repair(0, 0)).unwrap_err();
        assert_eq!(err, Error::RepairQueueClosed);
    }
}
