/*
 * response.rs
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

//! The origin response object handed to a pipe's response stage.
//!
//! Status/header mutations flush lazily: on the first body read (because once body flow starts,
//! status and headers are frozen on the host side) or, if the body is never read, once after the
//! handler returns. Both call sites share `flush_headers`.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::command::Command;
use crate::header::{self, HeaderMap};

pub(crate) enum ResponseBody {
    Streamed(mpsc::Receiver<Bytes>),
    Replaced(Bytes),
}

/// The mutable response object exposed to a pipe's response stage.
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,

    pub(crate) body: ResponseBody,
    pub(crate) read_started: bool,
    pub(crate) header_flushed: bool,
    original_status: u16,
    original_headers: HeaderMap,
    cmd_tx: mpsc::Sender<Command>,
}

impl Response {
    pub(crate) fn new(
        status: u16,
        headers: HeaderMap,
        body_rx: mpsc::Receiver<Bytes>,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            status,
            headers: headers.clone(),
            body: ResponseBody::Streamed(body_rx),
            read_started: false,
            header_flushed: false,
            original_status: status,
            original_headers: headers,
            cmd_tx,
        }
    }

    /// Read the next origin-body chunk. First call flushes pending header changes and emits `RBOD`.
    pub async fn read_body_chunk(&mut self) -> Option<Bytes> {
        if !self.read_started {
            self.read_started = true;
            self.flush_headers().await;
            tracing::trace!("emitting RBOD for response body");
            let _ = self.cmd_tx.send(Command::Rbod).await;
        }
        match &mut self.body {
            ResponseBody::Streamed(rx) => rx.recv().await,
            ResponseBody::Replaced(_) => None,
        }
    }

    pub async fn read_all(&mut self) -> Bytes {
        let mut buf = Vec::new();
        while let Some(chunk) = self.read_body_chunk().await {
            buf.extend_from_slice(&chunk);
        }
        Bytes::from(buf)
    }

    /// Replace the origin body with a fixed buffer, by identity.
    pub fn replace_body(&mut self, data: impl Into<Bytes>) {
        self.body = ResponseBody::Replaced(data.into());
    }

    pub(crate) fn replaced_body(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Replaced(b) => Some(b),
            ResponseBody::Streamed(_) => None,
        }
    }

    /// Emit `WSTA` if status changed and `WHDR` if headers changed, exactly once.
    pub(crate) async fn flush_headers(&mut self) {
        if self.header_flushed {
            return;
        }
        self.header_flushed = true;
        if self.status != self.original_status {
            tracing::trace!(status = self.status, "emitting WSTA");
            let _ = self.cmd_tx.send(Command::Wsta(self.status)).await;
        }
        if self.headers != self.original_headers {
            tracing::trace!("emitting WHDR for mutated response headers");
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
    async fn flush_headers_is_idempotent_and_emits_once() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let (_body_tx, body_rx) = mpsc::channel(2);
        let mut resp = Response::new(200, HeaderMap::new(), body_rx, cmd_tx);
        resp.status = 500;
        resp.flush_headers().await;
        resp.headers.set("X-Late", "ignored");
        resp.flush_headers().await;
        drop(resp);
        let first = cmd_rx.recv().await.unwrap();
        assert_eq!(first, Command::Wsta(500));
        assert!(cmd_rx.recv().await.is_none());
    }
}
