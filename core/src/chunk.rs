/*
 * chunk.rs
 * Copyright (C) 2026 Conduit Contributors
 *
 * This file is part of Conduit, an embeddable HTTP mediation engine.
 *
 * Conduit is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Conduit is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Conduit.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Process-wide chunk store: 32-bit ID -> host-visible byte buffer.
//!
//! Ownership transfers on `WBOD`: the engine owns the buffer until it hands the ID to the host via a
//! `WBOD` command, after which the host owns it and must call `release` exactly once. `release` drops
//! the boxed slice, so the ABI's `release_chunk` is the only free path — no raw `free()` crosses the
//! boundary (contrast with `ffi::CString::into_raw` / `free_string`, which this mirrors for bytes
//! instead of NUL-terminated strings).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// A single allocated chunk: contiguous, host-readable bytes plus a raw (ptr, len) view.
pub struct ChunkStore {
    table: Mutex<HashMap<u32, Box<[u8]>>>,
    next_id: AtomicU32,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Copy `data` into a fresh host-visible allocation and return its ID. Never returns 0.
    pub fn allocate(&self, data: &[u8]) -> u32 {
        let id = self.alloc_id();
        let boxed: Box<[u8]> = data.to_vec().into_boxed_slice();
        self.table.lock().unwrap().insert(id, boxed);
        id
    }

    fn alloc_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    /// Raw `(ptr, len)` for a live chunk. `None` if unknown.
    pub fn get(&self, id: u32) -> Option<(*const u8, usize)> {
        let table = self.table.lock().unwrap();
        table.get(&id).map(|b| (b.as_ptr(), b.len()))
    }

    /// Drop the allocation. The host must call this exactly once per chunk it receives via `WBOD`.
    pub fn release(&self, id: u32) {
        self.table.lock().unwrap().remove(&id);
    }

    /// Test/debug convenience: read the bytes back and release in one step.
    pub fn read_and_release(&self, id: u32) -> Option<Vec<u8>> {
        self.table.lock().unwrap().remove(&id).map(|b| b.into_vec())
    }
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_never_returns_zero() {
        let store = ChunkStore::new();
        for _ in 0..4 {
            assert_ne!(store.allocate(b"x"), 0);
        }
    }

    #[test]
    fn allocate_get_release_round_trip() {
        let store = ChunkStore::new();
        let id = store.allocate(b"hello");
        let (ptr, len) = store.get(id).unwrap();
        let slice = unsafe { std::slice::from_raw_parts(ptr, len) };
        assert_eq!(slice, b"hello");
        store.release(id);
        assert!(store.get(id).is_none());
    }

    #[test]
    fn unknown_id_returns_none() {
        let store = ChunkStore::new();
        assert!(store.get(999).is_none());
    }

    #[test]
    fn read_and_release_returns_bytes_and_frees() {
        let store = ChunkStore::new();
        let id = store.allocate(b"payload");
        assert_eq!(store.read_and_release(id), Some(b"payload".to_vec()));
        assert!(store.get(id).is_none());
    }
}
