// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fixed pool of exclusively locked runtime sessions
//!
//! A caller takes the first free slot, starting from a rotating index, and
//! only blocks when every slot is busy. A slot poisoned by a panicking holder
//! fails the request that finds it and is then cleared for later callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};
use tracing::warn;

use crate::vision::errors::DetectError;

pub struct SessionPool<T> {
    slots: Vec<Mutex<T>>,
    next: AtomicUsize,
}

impl<T> SessionPool<T> {
    /// Returns `None` for an empty set of sessions
    pub fn new(sessions: Vec<T>) -> Option<Self> {
        if sessions.is_empty() {
            return None;
        }
        Some(Self {
            slots: sessions.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Take the first free session, or wait on the next one in rotation
    pub fn acquire(&self) -> Result<MutexGuard<'_, T>, DetectError> {
        let count = self.slots.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed);

        for offset in 0..count {
            let index = (start + offset) % count;
            match self.slots[index].try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => return Err(self.recover(index)),
            }
        }

        let index = start % count;
        self.slots[index].lock().map_err(|_| self.recover(index))
    }

    fn recover(&self, index: usize) -> DetectError {
        warn!("Runtime session {} was poisoned by a failed run; resetting it", index);
        self.slots[index].clear_poison();
        DetectError::Inference(format!(
            "runtime session {} was poisoned by an earlier failure",
            index
        ))
    }
}
