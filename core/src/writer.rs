/*
 * writer.rs
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

//! The response-writer surface shared by the request stage (switch from proxy to origin mode) and
//! the response stage (switch from relaying the origin response to producing one directly).
//!
//! Unlike `Request`/`Response`, writes are eager rather than diffed at flush time: each call emits
//! its command immediately, mirroring the original's `httpResponse.Write`/`WriteHeader` pair.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::chunk::ChunkStore;
use crate::command::Command;
use crate::header::{self, HeaderMap};

/// Default status used when the handler writes a body without first setting one explicitly,
/// mirroring `net/http`'s `ResponseWriter.Write` behavior.
const DEFAULT_STATUS: u16 = 200;

pub struct ResponseWriter {
    cmd_tx: mpsc::Sender<Command>,
    chunks: Arc<ChunkStore>,
    headers: HeaderMap,
    flushed: bool,
}

impl ResponseWriter {
    pub(crate) fn new(cmd_tx: mpsc::Sender<Command>, chunks: Arc<ChunkStore>) -> Self {
        Self {
            cmd_tx,
            chunks,
            headers: HeaderMap::new(),
            flushed: false,
        }
    }

    /// True once this writer has emitted `SWCH` (the request/response is no longer relayed as-is).
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Stage a header to be sent with the flush. Ignored once flushed.
    pub fn header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        if self.flushed {
            return;
        }
        self.headers.append(name, value);
    }

    /// Switch with the given status, without writing a body. No-op if already flushed.
    pub async fn write_status(&mut self, status: u16) {
        self.flush(status).await;
    }

    /// Switch (with the default status if not already flushed) and emit a body chunk.
    pub async fn write(&mut self, data: &[u8]) {
        self.flush(DEFAULT_STATUS).await;
        if !data.is_empty() {
            let id = self.chunks.allocate(data);
            tracing::trace!(chunk_id = id, "emitting WBOD from writer");
            let _ = self.cmd_tx.send(Command::Wbod(id)).await;
        }
    }

    async fn flush(&mut self, status: u16) {
        if self.flushed {
            return;
        }
        self.flushed = true;
        tracing::debug!(status, "emitting SWCH");
        let _ = self.cmd_tx.send(Command::Swch(status)).await;
        if !self.headers.is_empty() {
            tracing::trace!("emitting WHDR from writer");
            let _ = self
                .cmd_tx
                .send(Command::Whdr(header::serialize_simple_headers(&self.headers)))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_status_then_write_emits_swch_whdr_wbod_once() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let chunks = Arc::new(ChunkStore::new());
        let mut writer = ResponseWriter::new(cmd_tx, chunks);
        writer.header("X-Apigee-Test", "Return Header Test");
        writer.write_status(200).await;
        writer.write_status(201).await; // ignored, already flushed
        assert_eq!(cmd_rx.recv().await.unwrap(), Command::Swch(200));
        assert_eq!(
            cmd_rx.recv().await.unwrap(),
            Command::Whdr("X-Apigee-Test: Return Header Test\n".to_string())
        );
    }

    #[tokio::test]
    async fn write_without_status_defaults_to_200_and_each_call_emits_a_chunk() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let chunks = Arc::new(ChunkStore::new());
        let mut writer = ResponseWriter::new(cmd_tx, chunks.clone());
        writer.write(b"Hello Again! ").await;
        writer.write(b"Time for a complete rewrite!").await;
        assert_eq!(cmd_rx.recv().await.unwrap(), Command::Swch(200));
        let Command::Wbod(id1) = cmd_rx.recv().await.unwrap() else {
            panic!("expected Wbod");
        };
        let Command::Wbod(id2) = cmd_rx.recv().await.unwrap() else {
            panic!("expected Wbod");
        };
        assert_ne!(id1, id2);
        assert_eq!(
            chunks.read_and_release(id1).unwrap(),
            b"Hello Again! ".to_vec()
        );
        assert_eq!(
            chunks.read_and_release(id2).unwrap(),
            b"Time for a complete rewrite!".to_vec()
        );
    }
}
