/*
 * request.rs
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

//! The request object handed to a pipe's request stage: a plain mutable value. The mediator diffs
//! its final state against a snapshot taken before the handler ran, rather than instrumenting every
//! setter — see `mediator::request`.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::header::HeaderMap;

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Other(s) => s,
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        }
    }
}

/// Either still reading from the host-fed channel, or replaced wholesale by the handler.
pub(crate) enum RequestBody {
    Streamed(mpsc::Receiver<Bytes>),
    Replaced(Bytes),
}

/// The mutable request object exposed to a pipe's request stage.
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub version: (u8, u8),
    pub headers: HeaderMap,
    pub host: Option<String>,
    pub content_length: Option<u64>,

    pub(crate) body: RequestBody,
    pub(crate) body_read_started: bool,
    pub(crate) cmd_tx: mpsc::Sender<crate::command::Command>,
}

impl Request {
    /// Read the next body chunk. `None` once the body channel closes. The first call emits `RBOD`.
    pub async fn read_body_chunk(&mut self) -> Option<Bytes> {
        if !self.body_read_started {
            self.body_read_started = true;
            tracing::trace!("emitting RBOD for request body");
            let _ = self.cmd_tx.send(crate::command::Command::Rbod).await;
        }
        match &mut self.body {
            RequestBody::Streamed(rx) => rx.recv().await,
            RequestBody::Replaced(_) => None,
        }
    }

    /// Read the whole body to completion.
    pub async fn read_all(&mut self) -> Bytes {
        let mut buf = Vec::new();
        while let Some(chunk) = self.read_body_chunk().await {
            buf.extend_from_slice(&chunk);
        }
        Bytes::from(buf)
    }

    /// Replace the body with a fixed buffer, by identity. Drained and emitted as `WBOD` at flush
    /// time if the handler does not also switch to the response-writer.
    pub fn replace_body(&mut self, data: impl Into<Bytes>) {
        self.body = RequestBody::Replaced(data.into());
    }

    pub(crate) fn replaced_body(&self) -> Option<&Bytes> {
        match &self.body {
            RequestBody::Replaced(b) => Some(b),
            RequestBody::Streamed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_from_wire_round_trips_known_verbs() {
        for m in ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"] {
            assert_eq!(Method::from_wire(m).as_str(), m);
        }
    }

    #[test]
    fn unknown_method_preserved_verbatim() {
        let m = Method::from_wire("PROPFIND");
        assert_eq!(m.as_str(), "PROPFIND");
    }
}
