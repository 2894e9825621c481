/*
 * test_pipeline.rs
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

//! The built-in `urn:test-handler` pipeline. A test hook, not a real mediation pipeline: every
//! path under the request and response stages exists to exercise one corner of the command
//! protocol, mirroring the original implementation's own `test_handler.go`.

use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;

use crate::pipe::{Pipe, PipeFuture, PipelineFactory};
use crate::request::Request;
use crate::response::Response;
use crate::writer::ResponseWriter;

/// Last body a request-stage path captured, for test introspection only — mirrors the original's
/// package-level `lastTestBody` variable. Not read by any handler path itself.
static LAST_REQUEST_BODY: Mutex<Vec<u8>> = Mutex::new(Vec::new());

pub fn last_request_body() -> Vec<u8> {
    LAST_REQUEST_BODY.lock().unwrap().clone()
}

pub struct TestPipelineFactory;

impl PipelineFactory for TestPipelineFactory {
    fn create_pipe(&self, _message_id: &str) -> Box<dyn Pipe> {
        Box::new(TestPipe)
    }
}

pub struct TestPipe;

impl Pipe for TestPipe {
    fn handle_request<'a>(&'a self, req: &'a mut Request, writer: &'a mut ResponseWriter) -> PipeFuture<'a> {
        Box::pin(async move {
            match req.uri.as_str() {
                "/pass" => {}

                "/slowpass" => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }

                "/readbody" => {
                    let body = req.read_all().await;
                    *LAST_REQUEST_BODY.lock().unwrap() = body.to_vec();
                }

                "/readanddiscard" => {
                    req.read_body_chunk().await;
                }

                "/replacebody" => {
                    req.replace_body(Bytes::from_static(b"Hello! I am the server!"));
                }

                "/writeheaders" => {
                    req.headers.append("Server", "Go Test Stuff");
                    req.headers.append("X-Apigee-Test", "HeaderTest");
                }

                "/writepath" => {
                    req.uri = "/newpath".to_string();
                }

                "/return201" => {
                    writer.write_status(201).await;
                }

                "/returnheaders" => {
                    writer.header("X-Apigee-Test", "Return Header Test");
                    writer.write_status(200).await;
                }

                "/returnbody" => {
                    writer.write(b"Hello! I am the server!").await;
                }

                "/completerequest" => {
                    req.uri = "/totallynewurl".to_string();
                    req.headers.append("X-Apigee-Test", "Complete");
                    req.replace_body(Bytes::from_static(b"Hello Again! Time for a complete rewrite!"));
                }

                "/completeresponse" => {
                    req.read_all().await;
                    writer.header("X-Apigee-Test", "Complete");
                    writer.write_status(201).await;
                    writer.write(b"Hello Again! ").await;
                    writer.write(b"Time for a complete rewrite!").await;
                }

                "/writeresponseheaders" | "/transformbody" | "/transformbodychunks" | "/responseerror"
                | "/responseerror2" => {
                    // nothing to do at the request stage; these paths are mediated on the response.
                }

                _ => {
                    writer.write_status(404).await;
                }
            }
            Ok(())
        })
    }

    fn handle_response<'a>(
        &'a self,
        request_uri: &'a str,
        resp: &'a mut Response,
        writer: &'a mut ResponseWriter,
    ) -> PipeFuture<'a> {
        Box::pin(async move {
            match request_uri {
                "/writeresponseheaders" => {
                    resp.headers.set("X-Apigee-ResponseHeader", "yes");
                }

                "/transformbody" => {
                    resp.replace_body(Bytes::from_static(b"We have transformed the response!"));
                }

                "/responseerror" => {
                    resp.status = 500;
                    resp.replace_body(Bytes::from_static(b"Error in the server!"));
                }

                "/responseerror2" => {
                    writer.header("X-Apigee-Response", "error");
                    writer.write_status(504).await;
                    writer.write(b"Response Error").await;
                }

                "/transformbodychunks" => {
                    resp.headers.set("X-Apigee-Transformed", "yes");
                    let body = resp.read_all().await;
                    let mut wrapped = Vec::with_capacity(body.len() + 2);
                    wrapped.push(b'{');
                    wrapped.extend_from_slice(&body);
                    wrapped.push(b'}');
                    resp.replace_body(Bytes::from(wrapped));
                    resp.headers.set("X-Apigee-Invisible", "yes");
                }

                _ => {}
            }
            Ok(())
        })
    }
}
