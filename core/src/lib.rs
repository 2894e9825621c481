/*
 * lib.rs
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

//! Core mediation engine. A pipe mediates one request and, separately, one response: it may
//! inspect or rewrite the URI/headers/body, or switch to producing the HTTP exchange itself via
//! a `ResponseWriter`. The `registry` module is the crate's single entry point from the ABI layer.

pub mod chunk;
pub mod command;
pub mod config_engine;
pub mod error;
pub mod header;
pub mod mediator;
pub mod message_id;
pub mod pipe;
pub mod registry;
pub mod request;
pub mod response;
pub mod test_pipeline;
pub mod writer;

pub use error::EngineError;
pub use pipe::{Pipe, PipeFuture, PipelineFactory};
pub use registry::{registry, Registry};
pub use request::Request;
pub use response::Response;
pub use writer::ResponseWriter;
