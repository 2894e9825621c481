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

//! Request-stage mediator: parses the wire request, snapshots URI/headers, runs the handler on a
//! cooperative task, and diffs the post-handler state against the snapshot to emit `WURI`/`WHDR`/
//! `WBOD` — unless the handler switched, in which case the response-writer already emitted eagerly.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::chunk::ChunkStore;
use crate::command::Command;
use crate::config_engine;
use crate::error::EngineError;
use crate::header;
use crate::message_id;
use crate::pipe::PipelineFactory;
use crate::request::{Request, RequestBody};
use crate::writer::ResponseWriter;

struct Inner {
    cmd_rx: mpsc::Receiver<Command>,
    body_tx: Option<mpsc::Sender<Bytes>>,
}

pub struct RequestMediator {
    pipeline: Arc<dyn PipelineFactory>,
    chunks: Arc<ChunkStore>,
    inner: Mutex<Option<Inner>>,
    uri: Mutex<Option<String>>,
}

impl RequestMediator {
    pub fn new(pipeline: Arc<dyn PipelineFactory>, chunks: Arc<ChunkStore>) -> Self {
        Self {
            pipeline,
            chunks,
            inner: Mutex::new(None),
            uri: Mutex::new(None),
        }
    }

    /// The request path as parsed at `begin`, used by the response stage for routing. `None`
    /// before `begin` or if parsing failed.
    pub fn uri(&self) -> Option<String> {
        self.uri.lock().unwrap().clone()
    }

    /// Parse `raw_headers`, snapshot state, and launch the handler task on `handle`. On parse
    /// failure, queues a single `ERRR` instead of starting a task. Errs only on a double `begin`.
    pub fn begin(&self, raw_headers: &str, handle: &Handle) -> Result<(), EngineError> {
        let mut guard = self.inner.lock().unwrap();
        if guard.is_some() {
            return Err(EngineError::Handler("request already begun".to_string()));
        }

        let cfg = config_engine::config();
        let (cmd_tx, cmd_rx) = mpsc::channel(cfg.command_capacity);

        let parsed = match header::parse_wire_request(raw_headers) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "request parse failure");
                let _ = cmd_tx.try_send(Command::Errr(e.as_errr_payload()));
                *guard = Some(Inner { cmd_rx, body_tx: None });
                return Ok(());
            }
        };

        *self.uri.lock().unwrap() = Some(parsed.uri.clone());

        let (body_tx, body_rx) = mpsc::channel(cfg.body_capacity);
        let original_uri = parsed.uri.clone();
        let original_headers = parsed.headers.clone();

        let req = Request {
            method: parsed.method,
            uri: parsed.uri,
            version: parsed.version,
            headers: parsed.headers,
            host: parsed.host,
            content_length: parsed.content_length,
            body: RequestBody::Streamed(body_rx),
            body_read_started: false,
            cmd_tx: cmd_tx.clone(),
        };

        let pipeline = self.pipeline.clone();
        let chunks_for_writer = self.chunks.clone();
        let chunks_for_body = self.chunks.clone();
        let cmd_tx_task = cmd_tx.clone();

        handle.spawn(async move {
            let message_id = message_id::generate_message_id();
            let pipe = pipeline.create_pipe(&message_id);
            let mut req = req;
            let mut writer = ResponseWriter::new(cmd_tx_task.clone(), chunks_for_writer);

            match pipe.handle_request(&mut req, &mut writer).await {
                Err(e) => {
                    tracing::error!(error = %e, "request handler failed");
                    let _ = cmd_tx_task.send(Command::Errr(e.as_errr_payload())).await;
                    return;
                }
                Ok(()) => {
                    if !writer.is_flushed() {
                        if req.uri != original_uri {
                            tracing::trace!(uri = %req.uri, "emitting WURI");
                            let _ = cmd_tx_task.send(Command::Wuri(req.uri.clone())).await;
                        }
                        if req.headers != original_headers {
                            tracing::trace!("emitting WHDR for mutated request headers");
                            let _ = cmd_tx_task
                                .send(Command::Whdr(header::serialize_simple_headers(&req.headers)))
                                .await;
                        }
                        if let Some(bytes) = req.replaced_body() {
                            let id = chunks_for_body.allocate(bytes);
                            tracing::trace!(chunk_id = id, "emitting WBOD for replaced request body");
                            let _ = cmd_tx_task.send(Command::Wbod(id)).await;
                        }
                    }
                }
            }
            tracing::debug!("emitting DONE for request stage");
            let _ = cmd_tx_task.send(Command::Done).await;
        });

        *guard = Some(Inner {
            cmd_rx,
            body_tx: Some(body_tx),
        });
        Ok(())
    }

    /// Next command, as a wire string. Empty string if nothing is pending (non-blocking) or if
    /// `begin` hasn't run yet.
    pub fn poll(&self, block: bool) -> String {
        let mut guard = self.inner.lock().unwrap();
        let Some(inner) = guard.as_mut() else {
            return String::new();
        };
        let received = if block {
            inner.cmd_rx.blocking_recv()
        } else {
            inner.cmd_rx.try_recv().ok()
        };
        received.map(|c| c.to_wire()).unwrap_or_default()
    }

    /// Push a body chunk. When `last` is true, closes the body channel after this chunk.
    pub fn send_body_chunk(&self, data: Bytes, last: bool) {
        let mut guard = self.inner.lock().unwrap();
        let Some(inner) = guard.as_mut() else {
            return;
        };
        if let Some(tx) = inner.body_tx.as_ref() {
            if !data.is_empty() {
                let _ = tx.blocking_send(data);
            }
        }
        if last {
            inner.body_tx = None;
        }
    }
}
