/*
 * pipe.rs
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

//! The handler extension point. A `PipelineFactory` is registered under a handler id (see
//! `registry`); each request/response pair gets its own `Pipe` via `create_pipe`, named with a
//! fresh message id for correlation.
//!
//! Stage methods return boxed futures rather than using `async fn` in a trait, so pipes can be
//! trait objects without pulling in `async-trait` (the teacher pack never needed that crate; the
//! `protocol/http/handler.rs` push-model trait this is grounded on is plain sync callbacks, so the
//! boxed-future shape is the smallest idiomatic step from that pattern to an async pull model).

use std::future::Future;
use std::pin::Pin;

use crate::error::EngineError;
use crate::request::Request;
use crate::response::Response;
use crate::writer::ResponseWriter;

pub type PipeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

/// Per-request handler instance. Produced by a `PipelineFactory`.
pub trait Pipe: Send + Sync {
    /// Mediate the outgoing request. May mutate `req` in place, or switch to an engine-generated
    /// response by writing to `writer`.
    fn handle_request<'a>(&'a self, req: &'a mut Request, writer: &'a mut ResponseWriter) -> PipeFuture<'a>;

    /// Mediate the origin response for the request whose URL is `request_uri`. May mutate `resp`
    /// in place, or switch by writing to `writer`.
    fn handle_response<'a>(
        &'a self,
        request_uri: &'a str,
        resp: &'a mut Response,
        writer: &'a mut ResponseWriter,
    ) -> PipeFuture<'a>;
}

/// Registered under a handler id; produces a fresh `Pipe` per request/response pair.
pub trait PipelineFactory: Send + Sync {
    fn create_pipe(&self, message_id: &str) -> Box<dyn Pipe>;
}
