// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `queue` module provides the bounded FIFO containers used by the decoder session.
//!
//! The decoder session peeks at queued records before committing to consume them, so both
//! containers expose random access and front/back references that do not remove elements.

use std::collections::VecDeque;

use log::debug;

use crate::errors::{buffer_error, Result};

/// A strongly-typed FIFO with a fixed capacity.
///
/// Unlike `VecDeque` alone, a push onto a full `BoundedQueue` is rejected with a
/// [`BufferError`](crate::errors::Error::BufferError) and leaves the queue untouched.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Instantiate a queue holding at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        BoundedQueue { items: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append an element, or reject the push if the queue is full.
    pub fn push_back(&mut self, item: T) -> Result<()> {
        if self.items.len() >= self.capacity {
            debug!("rejecting push onto full queue (capacity={})", self.capacity);
            return buffer_error("core (queue): queue full");
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Remove and return the oldest element.
    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Remove and return the newest element.
    pub fn pop_back(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    /// Get a reference to the oldest element without removing it.
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Get a mutable reference to the oldest element without removing it.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.items.front_mut()
    }

    /// Get a reference to the newest element without removing it.
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// Get a reference to the element at position `idx` (0 is the oldest) without removing it.
    pub fn at(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    /// Mutably iterate the queued elements from oldest to newest.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// A bounded FIFO of interleaved PCM samples with bulk operations.
///
/// Fade ramps are multiplied into queued samples in place, so the queue also provides mutable
/// range access relative to the front.
#[derive(Debug)]
pub struct SampleQueue {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleQueue {
    /// Instantiate a queue holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        SampleQueue { samples: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a block of samples, or reject the push if there is not enough room for all of it.
    pub fn push_slice(&mut self, src: &[f32]) -> Result<()> {
        if self.samples.len() + src.len() > self.capacity {
            return buffer_error("core (queue): sample queue full");
        }
        self.samples.extend(src.iter().copied());
        Ok(())
    }

    /// Append `count` zero samples, or reject the push if there is not enough room.
    pub fn push_zeros(&mut self, count: usize) -> Result<()> {
        if self.samples.len() + count > self.capacity {
            return buffer_error("core (queue): sample queue full");
        }
        self.samples.extend(std::iter::repeat(0.0).take(count));
        Ok(())
    }

    /// Remove up-to `dst.len()` samples from the front of the queue into `dst`. Returns the
    /// number of samples written.
    pub fn pop_into(&mut self, dst: &mut [f32]) -> usize {
        let count = dst.len().min(self.samples.len());
        for (out, sample) in dst[..count].iter_mut().zip(self.samples.drain(..count)) {
            *out = sample;
        }
        count
    }

    /// Remove `count` samples from the front of the queue without copying them out.
    pub fn discard(&mut self, count: usize) {
        let count = count.min(self.samples.len());
        self.samples.drain(..count);
    }

    /// Remove `count` samples from the back of the queue.
    pub fn trim_back(&mut self, count: usize) {
        let new_len = self.samples.len().saturating_sub(count);
        self.samples.truncate(new_len);
    }

    /// Mutably iterate `len` samples starting `start` samples from the front of the queue. The
    /// range is clamped to the queued samples.
    pub fn range_mut(&mut self, start: usize, len: usize) -> impl Iterator<Item = &mut f32> {
        let end = (start + len).min(self.samples.len());
        let start = start.min(end);
        self.samples.range_mut(start..end)
    }

    /// Immutably iterate `len` samples starting `start` samples from the front of the queue.
    pub fn range(&self, start: usize, len: usize) -> impl Iterator<Item = &f32> {
        let end = (start + len).min(self.samples.len());
        let start = start.min(end);
        self.samples.range(start..end)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundedQueue, SampleQueue};

    #[test]
    fn verify_bounded_queue_capacity() {
        let mut queue = BoundedQueue::new(2);

        assert!(queue.push_back(1u64).is_ok());
        assert!(queue.push_back(2).is_ok());
        assert!(queue.is_full());

        // A rejected push must leave the queue untouched.
        assert!(queue.push_back(3).is_err());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front(), Some(&1));
        assert_eq!(queue.back(), Some(&2));

        assert_eq!(queue.pop_front(), Some(1));
        assert!(queue.push_back(3).is_ok());
        assert_eq!(queue.at(0), Some(&2));
        assert_eq!(queue.at(1), Some(&3));
    }

    #[test]
    fn verify_peek_does_not_consume() {
        let mut queue = BoundedQueue::new(4);
        queue.push_back(7u32).unwrap();

        assert_eq!(queue.front(), Some(&7));
        assert_eq!(queue.front(), Some(&7));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn verify_sample_queue_bulk_ops() {
        let mut queue = SampleQueue::new(8);

        queue.push_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        queue.push_zeros(2).unwrap();
        assert_eq!(queue.len(), 6);

        // Push past capacity is rejected whole.
        assert!(queue.push_zeros(3).is_err());
        assert_eq!(queue.len(), 6);

        let mut out = [0.0; 3];
        assert_eq!(queue.pop_into(&mut out), 3);
        assert_eq!(out, [1.0, 2.0, 3.0]);
        assert_eq!(queue.len(), 3);

        queue.trim_back(1);
        assert_eq!(queue.len(), 2);

        let mut out = [9.0; 4];
        assert_eq!(queue.pop_into(&mut out), 2);
        assert_eq!(&out[..2], &[4.0, 0.0]);
    }

    #[test]
    fn verify_sample_queue_range_mut() {
        let mut queue = SampleQueue::new(8);
        queue.push_slice(&[1.0; 6]).unwrap();

        // Consume one sample so the mutable range is offset from the ring start.
        let mut out = [0.0; 1];
        queue.pop_into(&mut out);

        for sample in queue.range_mut(1, 2) {
            *sample = 0.5;
        }

        let mut out = [0.0; 5];
        queue.pop_into(&mut out);
        assert_eq!(out, [1.0, 0.5, 0.5, 1.0, 1.0]);
    }
}
