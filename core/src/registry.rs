/*
 * registry.rs
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

//! Process-wide registry: one mutex over three tables (pipeline definitions, request mediators,
//! response mediators), one monotonic ID allocator, and the tokio runtime every mediator spawns on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use bytes::Bytes;

use crate::chunk::ChunkStore;
use crate::error::EngineError;
use crate::mediator::{RequestMediator, ResponseMediator};
use crate::pipe::PipelineFactory;
use crate::test_pipeline::TestPipelineFactory;

const RESERVED_SCHEME: &str = "urn";
const TEST_HANDLER_NAME: &str = "test-handler";
const BAD_HANDLER_NAME: &str = "bad-handler";

struct Tables {
    pipelines: HashMap<String, Arc<dyn PipelineFactory>>,
    factories_by_scheme: HashMap<String, Arc<dyn PipelineFactory>>,
    requests: HashMap<u32, Arc<RequestMediator>>,
    responses: HashMap<u32, Arc<ResponseMediator>>,
}

/// Hosts the shared tokio runtime every mediator task spawns on, plus the chunk store.
pub struct Registry {
    runtime: tokio::runtime::Runtime,
    tables: Mutex<Tables>,
    next_id: AtomicU32,
    chunks: Arc<ChunkStore>,
}

pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("failed to create tokio runtime");
        Registry {
            runtime,
            tables: Mutex::new(Tables {
                pipelines: HashMap::new(),
                factories_by_scheme: HashMap::new(),
                requests: HashMap::new(),
                responses: HashMap::new(),
            }),
            next_id: AtomicU32::new(1),
            chunks: Arc::new(ChunkStore::new()),
        }
    })
}

impl Registry {
    pub fn chunks(&self) -> &ChunkStore {
        &self.chunks
    }

    /// Register a `PipelineFactory` to handle non-reserved URI schemes, e.g. `register_scheme_factory("file", f)`
    /// so `create_handler(id, "file:///etc/pipeline.json")` delegates to `f`. The pluggable factory
    /// mechanism itself is a host-embedding concern; this is the registration point for it.
    pub fn register_scheme_factory(&self, scheme: &str, factory: Arc<dyn PipelineFactory>) {
        self.tables
            .lock()
            .unwrap()
            .factories_by_scheme
            .insert(scheme.to_string(), factory);
    }

    fn alloc_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    /// Parse `uri`; dispatch to the built-in test pipeline, fail synchronously for the `bad-handler`
    /// test hook, or delegate to a registered scheme factory. Replaces any prior entry under `id`.
    pub fn create_handler(&self, id: &str, uri: &str) -> Result<(), EngineError> {
        let factory: Arc<dyn PipelineFactory> = if let Some(name) = uri.strip_prefix("urn:") {
            match name {
                TEST_HANDLER_NAME => Arc::new(TestPipelineFactory),
                BAD_HANDLER_NAME => {
                    return Err(EngineError::Handler(format!("{}: test hook failure", uri)));
                }
                other => {
                    return Err(EngineError::Parse(format!(
                        "unknown {} handler name: {}",
                        RESERVED_SCHEME, other
                    )));
                }
            }
        } else {
            let scheme = uri.split_once(':').map(|(s, _)| s).unwrap_or(uri);
            let tables = self.tables.lock().unwrap();
            match tables.factories_by_scheme.get(scheme) {
                Some(f) => f.clone(),
                None => {
                    return Err(EngineError::Parse(format!(
                        "no pipeline factory registered for uri: {}",
                        uri
                    )));
                }
            }
        };

        tracing::debug!(handler_id = id, uri, "registering handler");
        self.tables
            .lock()
            .unwrap()
            .pipelines
            .insert(id.to_string(), factory);
        Ok(())
    }

    pub fn destroy_handler(&self, id: &str) {
        tracing::debug!(handler_id = id, "removing handler");
        self.tables.lock().unwrap().pipelines.remove(id);
    }

    /// Returns 0 if `handler_id` is unregistered.
    pub fn create_request(&self, handler_id: &str) -> u32 {
        let pipeline = {
            let tables = self.tables.lock().unwrap();
            match tables.pipelines.get(handler_id) {
                Some(p) => p.clone(),
                None => return 0,
            }
        };
        let id = self.alloc_id();
        let mediator = Arc::new(RequestMediator::new(pipeline, self.chunks.clone()));
        self.tables.lock().unwrap().requests.insert(id, mediator);
        tracing::debug!(request_id = id, handler_id, "created request mediator");
        id
    }

    /// Returns 0 if `handler_id` is unregistered.
    pub fn create_response(&self, handler_id: &str) -> u32 {
        let pipeline = {
            let tables = self.tables.lock().unwrap();
            match tables.pipelines.get(handler_id) {
                Some(p) => p.clone(),
                None => return 0,
            }
        };
        let id = self.alloc_id();
        let mediator = Arc::new(ResponseMediator::new(pipeline, self.chunks.clone()));
        self.tables.lock().unwrap().responses.insert(id, mediator);
        tracing::debug!(response_id = id, handler_id, "created response mediator");
        id
    }

    pub fn begin_request(&self, id: u32, raw_headers: &str) -> Result<(), EngineError> {
        let mediator = self
            .tables
            .lock()
            .unwrap()
            .requests
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownRequest(id))?;
        mediator.begin(raw_headers, self.runtime.handle())
    }

    pub fn begin_response(
        &self,
        resp_id: u32,
        req_id: u32,
        status: u16,
        raw_headers: &str,
    ) -> Result<(), EngineError> {
        let request_uri = {
            let tables = self.tables.lock().unwrap();
            tables
                .requests
                .get(&req_id)
                .cloned()
                .ok_or(EngineError::UnknownRequest(req_id))?
                .uri()
                .unwrap_or_default()
        };
        let mediator = self
            .tables
            .lock()
            .unwrap()
            .responses
            .get(&resp_id)
            .cloned()
            .ok_or(EngineError::UnknownResponse(resp_id))?;
        mediator.begin(status, raw_headers, request_uri, self.runtime.handle())
    }

    /// Next command for request `id`, as a wire string. An unknown `id` is surfaced in-band as an
    /// `ERRR` token rather than an out-of-band error, matching every other poll outcome.
    pub fn poll_request(&self, id: u32, block: bool) -> Result<String, EngineError> {
        let mediator = self.tables.lock().unwrap().requests.get(&id).cloned();
        match mediator {
            Some(mediator) => Ok(mediator.poll(block)),
            None => Ok(format!("ERRR{}", EngineError::UnknownRequest(id).as_errr_payload())),
        }
    }

    /// Next command for response `id`. See `poll_request`.
    pub fn poll_response(&self, id: u32, block: bool) -> Result<String, EngineError> {
        let mediator = self.tables.lock().unwrap().responses.get(&id).cloned();
        match mediator {
            Some(mediator) => Ok(mediator.poll(block)),
            None => Ok(format!("ERRR{}", EngineError::UnknownResponse(id).as_errr_payload())),
        }
    }

    pub fn send_request_body_chunk(&self, id: u32, data: Bytes, last: bool) -> Result<(), EngineError> {
        let mediator = self
            .tables
            .lock()
            .unwrap()
            .requests
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownRequest(id))?;
        mediator.send_body_chunk(data, last);
        Ok(())
    }

    pub fn send_response_body_chunk(&self, id: u32, data: Bytes, last: bool) -> Result<(), EngineError> {
        let mediator = self
            .tables
            .lock()
            .unwrap()
            .responses
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownResponse(id))?;
        mediator.send_body_chunk(data, last);
        Ok(())
    }

    pub fn free_request(&self, id: u32) {
        self.tables.lock().unwrap().requests.remove(&id);
        tracing::debug!(request_id = id, "freed request mediator");
    }

    pub fn free_response(&self, id: u32) {
        self.tables.lock().unwrap().responses.remove(&id);
        tracing::debug!(response_id = id, "freed response mediator");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_urn_registers_built_in_pipeline() {
        let reg = registry();
        reg.create_handler("t1", "urn:test-handler").unwrap();
        let req_id = reg.create_request("t1");
        assert_ne!(req_id, 0);
        reg.free_request(req_id);
        reg.destroy_handler("t1");
    }

    #[test]
    fn bad_handler_urn_fails_synchronously() {
        let reg = registry();
        let err = reg.create_handler("t2", "urn:bad-handler").unwrap_err();
        assert!(matches!(err, EngineError::Handler(_)));
    }

    #[test]
    fn unregistered_handler_id_yields_zero() {
        let reg = registry();
        assert_eq!(reg.create_request("no-such-handler"), 0);
    }

    #[test]
    fn unknown_request_id_yields_an_errr_token() {
        let reg = registry();
        let wire = reg.poll_request(999_999, false).unwrap();
        assert!(wire.starts_with("ERRR"));
        assert!(wire.contains("999999"));
    }

    #[test]
    fn ids_are_distinct_under_concurrent_allocation() {
        use std::collections::HashSet;
        use std::thread;

        let reg = registry();
        reg.create_handler("concurrent", "urn:test-handler").unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            handles.push(thread::spawn(|| {
                let reg = registry();
                (0..50).map(|_| reg.create_request("concurrent")).collect::<Vec<_>>()
            }));
        }
        let mut ids = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert_ne!(id, 0);
                assert!(ids.insert(id), "duplicate id allocated");
            }
        }
        for id in &ids {
            reg.free_request(*id);
        }
        reg.destroy_handler("concurrent");
    }
}
