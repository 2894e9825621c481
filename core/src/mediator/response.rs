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

//! Response-stage mediator: parses the simplified header block, binds to the originating request's
//! URL, runs the handler, and flushes any pending header change that survived an unread body.

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
use crate::response::Response;
use crate::writer::ResponseWriter;

struct Inner {
    cmd_rx: mpsc::Receiver<Command>,
    body_tx: Option<mpsc::Sender<Bytes>>,
}

pub struct ResponseMediator {
    pipeline: Arc<dyn PipelineFactory>,
    chunks: Arc<ChunkStore>,
    inner: Mutex<Option<Inner>>,
}

impl ResponseMediator {
    pub fn new(pipeline: Arc<dyn PipelineFactory>, chunks: Arc<ChunkStore>) -> Self {
        Self {
            pipeline,
            chunks,
            inner: Mutex::new(None),
        }
    }

    /// Parse `raw_headers` (simplified format), bind to `request_uri`, and launch the handler task.
    pub fn begin(
        &self,
        status: u16,
        raw_headers: &str,
        request_uri: String,
        handle: &Handle,
    ) -> Result<(), EngineError> {
        let mut guard = self.inner.lock().unwrap();
        if guard.is_some() {
            return Err(EngineError::Handler("response already begun".to_string()));
        }

        let cfg = config_engine::config();
        let (cmd_tx, cmd_rx) = mpsc::channel(cfg.command_capacity);
        let (body_tx, body_rx) = mpsc::channel(cfg.body_capacity);

        let headers = header::parse_simple_headers(raw_headers);
        let resp = Response::new(status, headers, body_rx, cmd_tx.clone());

        let pipeline = self.pipeline.clone();
        let chunks = self.chunks.clone();
        let cmd_tx_task = cmd_tx.clone();

        handle.spawn(async move {
            let message_id = message_id::generate_message_id();
            let pipe = pipeline.create_pipe(&message_id);
            let mut resp = resp;
            let mut writer = ResponseWriter::new(cmd_tx_task.clone(), chunks.clone());

            match pipe.handle_response(&request_uri, &mut resp, &mut writer).await {
                Err(e) => {
                    tracing::error!(error = %e, "response handler failed");
                    let _ = cmd_tx_task.send(Command::Errr(e.as_errr_payload())).await;
                    return;
                }
                Ok(()) => {
                    if !writer.is_flushed() {
                        resp.flush_headers().await;
                        if let Some(bytes) = resp.replaced_body() {
                            let id = chunks.allocate(bytes);
                            tracing::trace!(chunk_id = id, "emitting WBOD for replaced response body");
                            let _ = cmd_tx_task.send(Command::Wbod(id)).await;
                        }
                    }
                }
            }
            tracing::debug!("emitting DONE for response stage");
            let _ = cmd_tx_task.send(Command::Done).await;
        });

        *guard = Some(Inner {
            cmd_rx,
            body_tx: Some(body_tx),
        });
        Ok(())
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::{Pipe, PipeFuture};
    use crate::request::Request;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    struct TransformBodyPipe;
    impl Pipe for TransformBodyPipe {
        fn handle_request<'a>(&'a self, _req: &'a mut Request, _writer: &'a mut ResponseWriter) -> PipeFuture<'a> {
            Box::pin(async { Ok(()) })
        }
        fn handle_response<'a>(
            &'a self,
            _uri: &'a str,
            resp: &'a mut Response,
            _writer: &'a mut ResponseWriter,
        ) -> PipeFuture<'a> {
            resp.replace_body(Bytes::from_static(b"We have transformed the response!"));
            Box::pin(async { Ok(()) })
        }
    }
    struct TransformBodyFactory;
    impl PipelineFactory for TransformBodyFactory {
        fn create_pipe(&self, _message_id: &str) -> Box<dyn Pipe> {
            Box::new(TransformBodyPipe)
        }
    }

    #[test]
    fn replaced_body_emits_single_wbod_then_done() {
        let rt = runtime();
        let chunks = Arc::new(ChunkStore::new());
        let mediator = ResponseMediator::new(Arc::new(TransformBodyFactory), chunks.clone());
        mediator
            .begin(200, "", "/transformbody".to_string(), rt.handle())
            .unwrap();
        let cmd = mediator.poll(true);
        assert!(cmd.starts_with("WBOD"));
        let id = u32::from_str_radix(&cmd[4..], 16).unwrap();
        assert_eq!(
            chunks.read_and_release(id).unwrap(),
            b"We have transformed the response!".to_vec()
        );
        assert_eq!(mediator.poll(true), "DONE");
    }

    struct HeaderThenReadPipe;
    impl Pipe for HeaderThenReadPipe {
        fn handle_request<'a>(&'a self, _req: &'a mut Request, _writer: &'a mut ResponseWriter) -> PipeFuture<'a> {
            Box::pin(async { Ok(()) })
        }
        fn handle_response<'a>(
            &'a self,
            _uri: &'a str,
            resp: &'a mut Response,
            _writer: &'a mut ResponseWriter,
        ) -> PipeFuture<'a> {
            Box::pin(async move {
                resp.headers.set("X-Apigee-Transformed", "yes");
                let body = resp.read_all().await;
                let mut transformed = Vec::new();
                transformed.push(b'{');
                transformed.extend_from_slice(&body);
                transformed.push(b'}');
                resp.replace_body(Bytes::from(transformed));
                resp.headers.set("X-Apigee-Invisible", "yes");
                Ok(())
            })
        }
    }
    struct HeaderThenReadFactory;
    impl PipelineFactory for HeaderThenReadFactory {
        fn create_pipe(&self, _message_id: &str) -> Box<dyn Pipe> {
            Box::new(HeaderThenReadPipe)
        }
    }

    #[test]
    fn header_set_before_read_flushes_but_late_header_is_dropped() {
        let rt = runtime();
        let chunks = Arc::new(ChunkStore::new());
        let mediator = ResponseMediator::new(Arc::new(HeaderThenReadFactory), chunks.clone());
        mediator
            .begin(200, "", "/transformbodychunks".to_string(), rt.handle())
            .unwrap();
        let whdr = mediator.poll(true);
        assert_eq!(whdr, "WHDRX-Apigee-Transformed: yes\n");
        assert_eq!(mediator.poll(true), "RBOD");
        mediator.send_body_chunk(Bytes::from_static(b"Hello, Response Server!"), true);
        let wbod = mediator.poll(true);
        assert!(wbod.starts_with("WBOD"));
        let id = u32::from_str_radix(&wbod[4..], 16).unwrap();
        assert_eq!(
            chunks.read_and_release(id).unwrap(),
            b"{Hello, Response Server!}".to_vec()
        );
        assert_eq!(mediator.poll(true), "DONE");
    }
}
