/*
 * error.rs
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

//! Engine error taxonomy. Every variant renders a message usable directly as an `ERRR` payload.

use thiserror::Error;

/// Errors raised by the registry, mediators, or handler code.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed request line, header line, or status line. Embeds the offending text.
    #[error("parse error: {0}")]
    Parse(String),

    /// `create_request`/`create_response`/`begin_request` referenced an unregistered handler id.
    #[error("unknown handler: {0}")]
    UnknownHandler(String),

    /// A poll/send/free call referenced a request id with no live mediator.
    #[error("unknown request: {0}")]
    UnknownRequest(u32),

    /// A poll/send/free call referenced a response id with no live mediator.
    #[error("unknown response: {0}")]
    UnknownResponse(u32),

    /// Error surfaced from user pipe code.
    #[error("handler error: {0}")]
    Handler(String),
}

impl EngineError {
    /// Render as an `ERRR` command payload (just the message, no tag).
    pub fn as_errr_payload(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_embeds_detail() {
        let e = EngineError::Parse("GET /foo BOGUS".to_string());
        assert_eq!(e.to_string(), "parse error: GET /foo BOGUS");
        assert_eq!(e.as_errr_payload(), "parse error: GET /foo BOGUS");
    }

    #[test]
    fn unknown_request_includes_id() {
        let e = EngineError::UnknownRequest(42);
        assert!(e.to_string().contains("42"));
    }
}
