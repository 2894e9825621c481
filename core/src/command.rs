/*
 * command.rs
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

//! The 4-byte-tagged command protocol a mediator emits to the host.

use std::fmt;

/// One command on the wire: a fixed 4-byte ASCII tag followed by a UTF-8 payload.
///
/// `Done` and `Errr` are terminal: a mediator never emits anything after either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Handler or parse error. Terminal.
    Errr(String),
    /// Engine is ready to consume a body; host must push chunks.
    Rbod,
    /// Replace outgoing headers (simplified header block payload).
    Whdr(String),
    /// Rewrite the outgoing request URI.
    Wuri(String),
    /// A chunk of outgoing body is available in the chunk store.
    Wbod(u32),
    /// Override outgoing response status (response stage only).
    Wsta(u16),
    /// Switch from proxy to origin mode, beginning with this status.
    Swch(u16),
    /// No more commands for this stage. Terminal.
    Done,
}

impl Command {
    /// The 4-byte tag, as it appears on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Errr(_) => "ERRR",
            Command::Rbod => "RBOD",
            Command::Whdr(_) => "WHDR",
            Command::Wuri(_) => "WURI",
            Command::Wbod(_) => "WBOD",
            Command::Wsta(_) => "WSTA",
            Command::Swch(_) => "SWCH",
            Command::Done => "DONE",
        }
    }

    /// True for the two commands after which a mediator emits nothing further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Command::Errr(_) | Command::Done)
    }

    /// Render as the wire string: tag immediately followed by payload.
    pub fn to_wire(&self) -> String {
        match self {
            Command::Errr(msg) => format!("ERRR{}", msg),
            Command::Rbod => "RBOD".to_string(),
            Command::Whdr(hdrs) => format!("WHDR{}", hdrs),
            Command::Wuri(uri) => format!("WURI{}", uri),
            Command::Wbod(id) => format!("WBOD{:x}", id),
            Command::Wsta(status) => format!("WSTA{}", status),
            Command::Swch(status) => format!("SWCH{}", status),
            Command::Done => "DONE".to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wbod_payload_is_lowercase_hex() {
        assert_eq!(Command::Wbod(0xabc).to_wire(), "WBODabc");
    }

    #[test]
    fn status_payloads_are_decimal() {
        assert_eq!(Command::Wsta(500).to_wire(), "WSTA500");
        assert_eq!(Command::Swch(404).to_wire(), "SWCH404");
    }

    #[test]
    fn terminal_commands() {
        assert!(Command::Done.is_terminal());
        assert!(Command::Errr("boom".into()).is_terminal());
        assert!(!Command::Rbod.is_terminal());
    }

    #[test]
    fn errr_embeds_message_with_no_separator() {
        assert_eq!(Command::Errr("oops".to_string()).to_wire(), "ERRRoops");
    }
}
